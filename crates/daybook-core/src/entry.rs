//! Structured journal entries and day records.

use crate::date::DayKey;
use crate::identity::BlockHash;
use crate::status::{StatusCategory, StatusToken};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use time::OffsetDateTime;

/// External entry type label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Block with a status keyword.
    Task,
    /// Any other block (serialized as `misc`).
    Misc,
}

/// Unrecognized entry type name.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid entry type: {0}")]
pub struct UnknownEntryType(pub String);

impl EntryType {
    /// Wire name (`task` or `misc`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Misc => "misc",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = UnknownEntryType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "task" => Ok(Self::Task),
            "misc" | "note" => Ok(Self::Misc),
            _ => Err(UnknownEntryType(s.trim().to_owned())),
        }
    }
}

/// Task-only fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFields {
    /// Raw status keyword from the head line.
    pub status: StatusToken,
    /// First `SCHEDULED:` value in the body, brackets stripped.
    pub scheduled_at: Option<String>,
    /// First `DEADLINE:` value in the body, brackets stripped.
    pub deadline_at: Option<String>,
}

/// Task or note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EntryKind {
    /// Head line starts with a status keyword.
    Task(TaskFields),
    /// Plain outline item.
    #[serde(rename = "misc")]
    Note,
}

/// Parsed form of one block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Head text without `- `, status keyword and tag markup.
    pub title: String,
    /// Head line exactly as it appears in the file.
    pub raw_line: String,
    /// Identity of the raw block.
    pub hash: BlockHash,
    /// Head text without `- ` followed by the body lines, trailing blanks removed.
    pub body: String,
    /// Lower-cased tags referenced anywhere in the block.
    pub tags: Vec<String>,
    /// Task or note payload.
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl Entry {
    /// External type label.
    #[must_use]
    pub const fn entry_type(&self) -> EntryType {
        match self.kind {
            EntryKind::Task(_) => EntryType::Task,
            EntryKind::Note => EntryType::Misc,
        }
    }

    /// Task payload, if this is a task.
    #[must_use]
    pub const fn task(&self) -> Option<&TaskFields> {
        match &self.kind {
            EntryKind::Task(fields) => Some(fields),
            EntryKind::Note => None,
        }
    }

    /// Raw status keyword, if this is a task.
    #[must_use]
    pub fn status(&self) -> Option<StatusToken> {
        self.task().map(|fields| fields.status)
    }

    /// Canonical status bucket, if this is a task.
    #[must_use]
    pub fn status_category(&self) -> Option<StatusCategory> {
        self.status().map(StatusToken::category)
    }

    /// Tasks whose title is empty are not indexed.
    #[must_use]
    pub fn is_indexable(&self) -> bool {
        !(matches!(self.kind, EntryKind::Task(_)) && self.title.trim().is_empty())
    }
}

/// Entry row as kept in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Store-assigned row id.
    pub id: i64,
    /// Day the entry belongs to.
    pub date: DayKey,
    /// Ordinal within the day as of the last sync.
    pub position: u32,
    /// Parsed content.
    #[serde(flatten)]
    pub entry: Entry,
    /// Row creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Row update time.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Day row: whole-file identity plus the file-wide tag union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalDay {
    /// Date of the backing file.
    pub date: DayKey,
    /// File length in bytes at the last changed sync.
    pub size_bytes: u64,
    /// Hex SHA-256 at the last changed sync.
    pub hash: String,
    /// Lower-cased, deduplicated, sorted tags of the whole file.
    pub tags: Vec<String>,
    /// Last time a sync looked at the file.
    #[serde(with = "time::serde::rfc3339")]
    pub last_checked_at: OffsetDateTime,
    /// Row creation time.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last time the row content changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
