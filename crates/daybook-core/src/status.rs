//! Task status keywords and their display buckets.

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Raw task keyword recognized at the start of a block's head line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusToken {
    /// `LATER`
    #[serde(rename = "LATER")]
    Later,
    /// `NOW`
    #[serde(rename = "NOW")]
    Now,
    /// `TODO`
    #[serde(rename = "TODO")]
    Todo,
    /// `DOING`
    #[serde(rename = "DOING")]
    Doing,
    /// `IN-PROGRESS`
    #[serde(rename = "IN-PROGRESS")]
    InProgress,
    /// `WAITING`
    #[serde(rename = "WAITING")]
    Waiting,
    /// `DONE`
    #[serde(rename = "DONE")]
    Done,
    /// `CANCELLED`
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

/// A token outside the status vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl StatusToken {
    /// Every token, in vocabulary order.
    pub const ALL: [Self; 8] = [
        Self::Later,
        Self::Now,
        Self::Todo,
        Self::Doing,
        Self::InProgress,
        Self::Waiting,
        Self::Done,
        Self::Cancelled,
    ];

    /// Exact spelling used in journal files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Later => "LATER",
            Self::Now => "NOW",
            Self::Todo => "TODO",
            Self::Doing => "DOING",
            Self::InProgress => "IN-PROGRESS",
            Self::Waiting => "WAITING",
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Case-sensitive lookup used by the tokenizer (`todo` is not a task).
    #[must_use]
    pub fn from_keyword(word: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|token| token.as_str() == word)
    }

    /// Canonical display bucket for this token.
    #[must_use]
    pub const fn category(self) -> StatusCategory {
        match self {
            Self::Later | Self::Now | Self::Todo => StatusCategory::Todo,
            Self::Doing | Self::InProgress | Self::Waiting => StatusCategory::InProgress,
            Self::Done => StatusCategory::Done,
            Self::Cancelled => StatusCategory::Cancelled,
        }
    }
}

impl fmt::Display for StatusToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusToken {
    type Err = UnknownStatus;

    /// Lenient parse for user input: trims and upper-cases before lookup.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::from_keyword(&normalized).ok_or_else(|| UnknownStatus(s.trim().to_owned()))
    }
}

/// Canonical status buckets used for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusCategory {
    /// Not started (`LATER`, `NOW`, `TODO`).
    #[serde(rename = "TODO")]
    Todo,
    /// Started (`DOING`, `IN-PROGRESS`, `WAITING`).
    #[serde(rename = "IN-PROGRESS")]
    InProgress,
    /// Completed.
    #[serde(rename = "DONE")]
    Done,
    /// Abandoned.
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

impl StatusCategory {
    /// Raw tokens that collapse into this bucket.
    #[must_use]
    pub const fn tokens(self) -> &'static [StatusToken] {
        match self {
            Self::Todo => &[StatusToken::Todo, StatusToken::Now, StatusToken::Later],
            Self::InProgress => &[
                StatusToken::InProgress,
                StatusToken::Doing,
                StatusToken::Waiting,
            ],
            Self::Done => &[StatusToken::Done],
            Self::Cancelled => &[StatusToken::Cancelled],
        }
    }

    /// Bucket name as shown to clients.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Todo => "TODO",
            Self::InProgress => "IN-PROGRESS",
            Self::Done => "DONE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Expand a client-supplied status into the raw tokens it matches.
///
/// Category names (`TODO`, `IN-PROGRESS`, `DONE`, `CANCELLED`) expand to their
/// whole bucket; any other vocabulary word matches only itself.
///
/// # Errors
/// Returns [`UnknownStatus`] when the input is not in the vocabulary.
pub fn expand_status_filter(raw: &str) -> Result<&'static [StatusToken], UnknownStatus> {
    let token: StatusToken = raw.parse()?;
    Ok(match token {
        StatusToken::Todo => StatusCategory::Todo.tokens(),
        StatusToken::InProgress => StatusCategory::InProgress.tokens(),
        StatusToken::Done => StatusCategory::Done.tokens(),
        StatusToken::Cancelled => StatusCategory::Cancelled.tokens(),
        StatusToken::Later => &[StatusToken::Later],
        StatusToken::Now => &[StatusToken::Now],
        StatusToken::Doing => &[StatusToken::Doing],
        StatusToken::Waiting => &[StatusToken::Waiting],
    })
}
