//! Application layer for daybook.
//!
//! Ties the tokenizer and renderer from `daybook-core` to a journal folder on
//! disk and a transactional index: folder sync, text mutations, listings and
//! the tag graph, plus configuration shared by hosts.

pub mod async_service;
pub mod clock;
pub mod config;
pub mod error;
pub mod filter_util;
pub mod service;
pub mod settings;
pub mod store;
pub mod sync;
pub mod writer;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use async_service::AsyncJournalService;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DaybookConfig, JournalConfig, StorageConfig};
pub use error::{ErrorKind, JournalError, JournalResult};
pub use filter_util::{EntryFilterBuilder, FilterBuildError, FilterBuildResult, split_list};
pub use service::{JournalLock, JournalService, journal_lock};
pub use settings::{
    JOURNALS_FOLDER_KEY, SettingsLookup, SettingsOverlay, StaticSettings, expand_home, journals_folder,
};
pub use store::{JournalStore, JournalTx};
pub use sync::{SyncOutcome, SyncReport, sync_day, with_transaction};
pub use writer::JournalWriter;
