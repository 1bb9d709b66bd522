//! Reconcile day files with the index.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use daybook_core::tags::extract_tags;
use daybook_core::{DayKey, FileIdentity, parse_entries};
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use crate::error::{JournalError, JournalResult};
use crate::store::{JournalStore, JournalTx};

/// What a single day sync did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Identity matched; only `last_checked_at` moved.
    Unchanged,
    /// Day row rewritten and entries replaced.
    Reindexed {
        /// Entries inserted.
        entries: usize,
    },
}

/// Totals of a folder sync.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Day files read.
    pub scanned: usize,
    /// Days whose entries were replaced.
    pub reindexed: usize,
    /// Days left untouched apart from `last_checked_at`.
    pub unchanged: usize,
}

impl SyncReport {
    fn record(&mut self, outcome: SyncOutcome) {
        self.scanned += 1;
        match outcome {
            SyncOutcome::Unchanged => self.unchanged += 1,
            SyncOutcome::Reindexed { .. } => self.reindexed += 1,
        }
    }
}

/// Bring the index of `date` in line with `bytes`.
///
/// Runs inside the caller's transaction; the caller decides whether to
/// commit. Task entries without a title are skipped but keep their ordinal,
/// so positions always match block order in the file.
///
/// # Errors
/// Returns [`JournalError::Store`] when any store call fails.
pub fn sync_day<T: JournalTx>(
    tx: &T,
    date: DayKey,
    bytes: &[u8],
    now: OffsetDateTime,
) -> JournalResult<SyncOutcome> {
    let identity = FileIdentity::of(bytes);
    if let Some(day) = tx.get_day(date).map_err(JournalError::store)?
        && identity.matches(day.size_bytes, &day.hash)
    {
        tx.touch_day_last_checked(date, now).map_err(JournalError::store)?;
        debug!(%date, "Journal day unchanged");
        return Ok(SyncOutcome::Unchanged);
    }

    let text = String::from_utf8_lossy(bytes);
    tx.upsert_day(date, &identity, &extract_tags(&text), now)
        .map_err(JournalError::store)?;
    let removed = tx.delete_entries_for_day(date).map_err(JournalError::store)?;

    let mut entries = 0;
    for (position, entry) in (0u32..).zip(parse_entries(&text)) {
        if !entry.is_indexable() {
            debug!(%date, position, "Skipping task without title");
            continue;
        }
        tx.insert_entry(date, position, &entry, now)
            .map_err(JournalError::store)?;
        entries += 1;
    }
    info!(%date, removed, entries, size = identity.size_bytes, "Reindexed journal day");
    Ok(SyncOutcome::Reindexed { entries })
}

/// Run `op` in a fresh transaction, committing on success.
///
/// Any error rolls the transaction back before it is returned.
///
/// # Errors
/// Returns the error of `op`, or a store error from begin/commit.
pub fn with_transaction<S, R, F>(store: &S, op: F) -> JournalResult<R>
where
    S: JournalStore,
    F: FnOnce(&S::Tx<'_>) -> JournalResult<R>,
{
    let tx = store.begin().map_err(JournalError::store)?;
    match op(&tx) {
        Ok(value) => {
            tx.commit().map_err(JournalError::store)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) = tx.rollback() {
                let rollback: anyhow::Error = rollback.into();
                warn!(error = %rollback, "Rollback failed");
            }
            Err(err)
        }
    }
}

/// Journal files of `folder` keyed by date, oldest first.
///
/// Directories and names that are not `YYYY_MM_DD.md` are ignored.
///
/// # Errors
/// Returns [`JournalError::Io`] when the folder cannot be listed.
pub fn journal_files(folder: &Path) -> JournalResult<Vec<(DayKey, PathBuf)>> {
    let mut files = Vec::new();
    for item in fs::read_dir(folder)? {
        let item = item?;
        if item.file_type()?.is_dir() {
            continue;
        }
        let name = item.file_name();
        let Some(date) = name.to_str().and_then(DayKey::from_file_name) else {
            continue;
        };
        files.push((date, item.path()));
    }
    files.sort_by_key(|(date, _)| *date);
    Ok(files)
}

/// Sync every journal file of `folder` (optionally one month) through `tx`.
///
/// # Errors
/// Returns the first I/O or store error; the caller rolls back.
pub fn sync_files<T: JournalTx>(
    tx: &T,
    files: &[(DayKey, PathBuf)],
    month: Option<(u16, u8)>,
    now: OffsetDateTime,
) -> JournalResult<SyncReport> {
    let mut report = SyncReport::default();
    for (date, path) in files {
        if month.is_some_and(|(year, month)| date.year() != year || date.month() != month) {
            continue;
        }
        let bytes = fs::read(path)?;
        report.record(sync_day(tx, *date, &bytes, now)?);
    }
    Ok(report)
}

/// Raw text of the day file, or [`JournalError::DayNotFound`].
///
/// # Errors
/// Also returns [`JournalError::Io`] for any other read failure.
pub fn read_day(folder: &Path, date: DayKey) -> JournalResult<String> {
    match fs::read_to_string(folder.join(date.file_name())) {
        Ok(text) => Ok(text),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(JournalError::DayNotFound(date)),
        Err(err) => Err(err.into()),
    }
}
