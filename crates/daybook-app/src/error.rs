//! Error taxonomy surfaced to hosts.

use daybook_core::{Address, DayKey, DayKeyError, DraftError, UnknownEntryType, UnknownStatus};
use thiserror::Error;

use crate::filter_util::FilterBuildError;

/// How a host should report a [`JournalError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Something addressed does not exist.
    NotFound,
    /// The request itself is invalid.
    BadRequest,
    /// Storage or filesystem failure.
    Internal,
}

/// Errors surfaced by the journal engine.
#[derive(Debug, Error)]
pub enum JournalError {
    /// No usable journal folder is configured.
    #[error("journals folder not found")]
    FolderNotConfigured,
    /// Invalid input.
    #[error("{0}")]
    MalformedRequest(String),
    /// No block at the given address.
    #[error("entry not found: {date} {address}")]
    EntryNotFound {
        /// Day that was searched.
        date: DayKey,
        /// Position or hash that did not resolve.
        address: Address,
    },
    /// The day file does not exist.
    #[error("journal not found: {0}")]
    DayNotFound(DayKey),
    /// No graph node for the tag.
    #[error("tag not found: {0}")]
    TagNotFound(String),
    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Backing store returned an error.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl JournalError {
    /// Classification for the host.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FolderNotConfigured
            | Self::EntryNotFound { .. }
            | Self::DayNotFound(_)
            | Self::TagNotFound(_) => ErrorKind::NotFound,
            Self::MalformedRequest(_) => ErrorKind::BadRequest,
            Self::Io(_) | Self::Store(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn store<E: Into<anyhow::Error>>(err: E) -> Self {
        Self::Store(err.into())
    }
}

macro_rules! malformed_from {
    ($($source:ty),* $(,)?) => {
        $(
            impl From<$source> for JournalError {
                fn from(err: $source) -> Self {
                    Self::MalformedRequest(err.to_string())
                }
            }
        )*
    };
}

malformed_from!(DayKeyError, DraftError, FilterBuildError, UnknownEntryType, UnknownStatus);

/// Result alias for journal operations.
pub type JournalResult<T> = Result<T, JournalError>;
