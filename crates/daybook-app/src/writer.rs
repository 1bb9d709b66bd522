//! Text mutations of day files followed by a resync.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use daybook_core::address::{LineRange, replace_line, resolve, splice_remove, splice_replace};
use daybook_core::render::status_head_line;
use daybook_core::{Address, Block, DayKey, DraftEntry, JournalEntry, StatusToken, tokenize};
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::error::{JournalError, JournalResult};
use crate::store::{JournalStore, JournalTx};
use crate::sync::{SyncOutcome, SyncReport, journal_files, read_day, sync_day, sync_files, with_transaction};

/// Applies edits to day files and keeps the index in step.
///
/// Every method writes the file first and then resyncs that day in its own
/// transaction. Callers serialize access with the journal lock.
pub struct JournalWriter<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S> JournalWriter<S> {
    /// Writer backed by `store` using the system clock.
    pub fn new(store: S) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Borrow the backing store.
    pub const fn store(&self) -> &S {
        &self.store
    }
}

impl<S: JournalStore> JournalWriter<S> {
    /// Sync every journal file of `folder` in one transaction.
    ///
    /// # Errors
    /// Returns the first I/O or store error; nothing is committed then.
    pub fn sync_folder(&self, folder: &Path) -> JournalResult<SyncReport> {
        let files = journal_files(folder)?;
        let now = self.clock.now();
        let report = with_transaction(&self.store, |tx| sync_files(tx, &files, None, now))?;
        info!(
            scanned = report.scanned,
            reindexed = report.reindexed,
            unchanged = report.unchanged,
            "Synced journal folder"
        );
        Ok(report)
    }

    /// Drop the month from the index and rebuild it from its files.
    ///
    /// # Errors
    /// Returns the first I/O or store error; nothing is committed then.
    pub fn refresh_month(&self, folder: &Path, year: u16, month: u8) -> JournalResult<SyncReport> {
        let files = journal_files(folder)?;
        let now = self.clock.now();
        let report = with_transaction(&self.store, |tx| {
            tx.delete_month(year, month).map_err(JournalError::store)?;
            sync_files(tx, &files, Some((year, month)), now)
        })?;
        info!(year, month, scanned = report.scanned, "Refreshed journal month");
        Ok(report)
    }

    /// Append a rendered block to today's file.
    ///
    /// # Errors
    /// Returns [`JournalError::MalformedRequest`] for an invalid draft, or an
    /// I/O or store error.
    pub fn create(&self, folder: &Path, draft: &DraftEntry) -> JournalResult<DayKey> {
        let block = draft.render(self.clock.local_offset())?;
        let date = self.clock.today();
        fs::create_dir_all(folder)?;
        let path = folder.join(date.file_name());
        let mut text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(err) => return Err(err.into()),
        };
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&block);
        text.push('\n');
        fs::write(&path, &text)?;
        self.resync(date, &text)?;
        info!(%date, "Appended journal entry");
        Ok(date)
    }

    /// Replace the addressed block with `raw` and return the new entry.
    ///
    /// Position edits return whatever now sits at that position; hash edits
    /// return the first indexed block written in place of the old one.
    ///
    /// # Errors
    /// Returns [`JournalError::MalformedRequest`] for blank text (or, for hash
    /// edits, text without an indexable block), [`JournalError::DayNotFound`]
    /// or [`JournalError::EntryNotFound`] when the target is missing, or an
    /// I/O or store error.
    pub fn update(&self, folder: &Path, date: DayKey, address: Address, raw: &str) -> JournalResult<JournalEntry> {
        if raw.trim().is_empty() {
            return Err(JournalError::MalformedRequest("raw text is required".into()));
        }
        if matches!(address, Address::Hash(_))
            && !tokenize(raw.trim_end_matches('\n'))
                .iter()
                .any(|block| block.entry.is_indexable())
        {
            return Err(JournalError::MalformedRequest(
                "replacement text must contain an entry".into(),
            ));
        }

        let text = read_day(folder, date)?;
        let range = locate(&text, date, address)?;
        let updated = splice_replace(&text, range, raw);
        self.write_and_resync(folder, date, &updated)?;
        info!(%date, %address, "Updated journal entry");
        let lookup = match address {
            Address::Position(_) => address,
            Address::Hash(_) => first_indexed_from(&updated, range.start)
                .map_or(address, Address::Position),
        };
        self.lookup(date, lookup)
    }

    /// Rewrite the head line of a task with a new status.
    ///
    /// # Errors
    /// Returns [`JournalError::MalformedRequest`] when the block is not a
    /// task, a not-found error for a missing day or position, or an I/O or
    /// store error.
    pub fn set_status(
        &self,
        folder: &Path,
        date: DayKey,
        position: u32,
        status: StatusToken,
    ) -> JournalResult<JournalEntry> {
        let address = Address::Position(position);
        let text = read_day(folder, date)?;
        let blocks = tokenize(&text);
        let block = find(&blocks, date, address)?;
        if block.entry.task().is_none() {
            return Err(JournalError::MalformedRequest(format!(
                "entry at position {position} is not a task"
            )));
        }
        let head = status_head_line(status, &block.head_tags, &block.entry.title);
        let updated = replace_line(&text, block.start_line, &head);
        self.write_and_resync(folder, date, &updated)?;
        info!(%date, position, %status, "Changed task status");
        self.lookup(date, address)
    }

    /// Remove the addressed block.
    ///
    /// # Errors
    /// Returns a not-found error for a missing day or block, or an I/O or
    /// store error.
    pub fn delete(&self, folder: &Path, date: DayKey, address: Address) -> JournalResult<()> {
        let text = read_day(folder, date)?;
        let range = locate(&text, date, address)?;
        let updated = splice_remove(&text, range);
        self.write_and_resync(folder, date, &updated)?;
        info!(%date, %address, "Deleted journal entry");
        Ok(())
    }

    fn write_and_resync(&self, folder: &Path, date: DayKey, text: &str) -> JournalResult<SyncOutcome> {
        fs::write(folder.join(date.file_name()), text)?;
        self.resync(date, text)
    }

    fn resync(&self, date: DayKey, text: &str) -> JournalResult<SyncOutcome> {
        let now = self.clock.now();
        with_transaction(&self.store, |tx| sync_day(tx, date, text.as_bytes(), now))
    }

    fn lookup(&self, date: DayKey, address: Address) -> JournalResult<JournalEntry> {
        let found = match address {
            Address::Position(position) => self.store.entry_by_position(date, position),
            Address::Hash(hash) => self.store.entry_by_hash(date, hash),
        }
        .map_err(JournalError::store)?;
        found.ok_or(JournalError::EntryNotFound { date, address })
    }
}

fn find(blocks: &[Block], date: DayKey, address: Address) -> JournalResult<&Block> {
    resolve(blocks, address).ok_or(JournalError::EntryNotFound { date, address })
}

/// Ordinal of the first indexable block starting at or after `line`.
fn first_indexed_from(text: &str, line: usize) -> Option<u32> {
    tokenize(text)
        .iter()
        .position(|block| block.start_line >= line && block.entry.is_indexable())
        .and_then(|index| u32::try_from(index).ok())
}

fn locate(text: &str, date: DayKey, address: Address) -> JournalResult<LineRange> {
    let blocks = tokenize(text);
    find(&blocks, date, address).map(LineRange::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::test_support::MockStore;
    use daybook_core::{BlockHash, EntryType};
    use tempfile::TempDir;
    use time::macros::datetime;

    struct Fixture {
        dir: TempDir,
        store: MockStore,
        writer: JournalWriter<MockStore>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap_or_else(|err| panic!("tempdir: {err}"));
            let store = MockStore::default();
            let writer = JournalWriter::new(store.clone())
                .with_clock(FixedClock::new(datetime!(2025-01-01 10:00 UTC)));
            Self { dir, store, writer }
        }

        fn folder(&self) -> &Path {
            self.dir.path()
        }

        fn seed(&self, date: DayKey, text: &str) -> JournalResult<()> {
            fs::write(self.folder().join(date.file_name()), text)?;
            self.writer.sync_folder(self.folder()).map(|_| ())
        }

        fn text(&self, date: DayKey) -> String {
            fs::read_to_string(self.folder().join(date.file_name())).unwrap_or_default()
        }
    }

    fn key(raw: &str) -> DayKey {
        raw.parse().unwrap_or_else(|err| panic!("bad key {raw}: {err}"))
    }

    #[test]
    fn create_appends_a_note_to_today() -> JournalResult<()> {
        let fx = Fixture::new();
        let draft = DraftEntry {
            description: "Buy milk".into(),
            tags: vec!["home".into()],
            ..DraftEntry::default()
        };
        let date = fx.writer.create(fx.folder(), &draft)?;
        assert_eq!(date, key("2025-01-01"));
        assert_eq!(fx.text(date), "- [[home]] Buy milk\n");

        let entries = fx.store.entries(date);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].position, 0);
        assert_eq!(entries[0].entry.entry_type(), EntryType::Misc);
        Ok(())
    }

    #[test]
    fn create_terminates_the_previous_last_line() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-01");
        fs::write(fx.folder().join(date.file_name()), "- first")?;
        let draft = DraftEntry {
            description: "second".into(),
            status: Some(StatusToken::Todo),
            deadline: Some("2025-01-10".into()),
            ..DraftEntry::default()
        };
        fx.writer.create(fx.folder(), &draft)?;
        assert_eq!(fx.text(date), "- first\n- TODO second\n  DEADLINE: <2025-01-10 Fri>\n");
        assert_eq!(fx.store.entries(date).len(), 2);
        Ok(())
    }

    #[test]
    fn create_rejects_timestamps_without_status() {
        let fx = Fixture::new();
        let draft = DraftEntry {
            description: "x".into(),
            scheduled: Some("2025-01-02".into()),
            ..DraftEntry::default()
        };
        let result = fx.writer.create(fx.folder(), &draft);
        assert!(matches!(result, Err(JournalError::MalformedRequest(_))));
        assert!(!fx.folder().join("2025_01_01.md").exists());
    }

    #[test]
    fn update_by_position_splices_the_whole_block() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-02");
        fx.seed(date, "intro\n- a\n  body\n\n- b\n")?;

        let updated = fx.writer.update(fx.folder(), date, Address::Position(0), "- A [[x]]\n  new body\n")?;
        assert_eq!(fx.text(date), "intro\n- A [[x]]\n  new body\n- b\n");
        assert_eq!(updated.entry.title, "A");
        assert_eq!(updated.entry.tags, vec!["x"]);
        assert_eq!(updated.position, 0);
        Ok(())
    }

    #[test]
    fn update_by_hash_returns_the_new_block() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-03");
        fx.seed(date, "- a\n- b\n")?;
        let target = fx.store.entries(date)[1].entry.hash;

        let updated = fx.writer.update(fx.folder(), date, Address::Hash(target), "- b2")?;
        assert_eq!(updated.entry.title, "b2");
        assert_eq!(updated.entry.hash, BlockHash::of("- b2"));
        assert_eq!(fx.text(date), "- a\n- b2\n");

        let stale = fx.writer.update(fx.folder(), date, Address::Hash(target), "- b3");
        assert!(matches!(stale, Err(JournalError::EntryNotFound { .. })));
        Ok(())
    }

    #[test]
    fn update_by_hash_skips_a_titleless_head() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-03");
        fx.seed(date, "- a\n- b\n- c\n")?;
        let target = fx.store.entries(date)[1].entry.hash;

        let updated = fx
            .writer
            .update(fx.folder(), date, Address::Hash(target), "- TODO\n- b2 [[y]]\n")?;
        assert_eq!(fx.text(date), "- a\n- TODO\n- b2 [[y]]\n- c\n");
        assert_eq!(updated.entry.title, "b2");
        assert_eq!(updated.position, 2);
        Ok(())
    }

    #[test]
    fn update_by_hash_needs_an_indexable_block() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-03");
        fx.seed(date, "- a\n")?;
        let target = fx.store.entries(date)[0].entry.hash;

        for raw in ["- TODO\n", "just prose\n"] {
            let result = fx.writer.update(fx.folder(), date, Address::Hash(target), raw);
            assert!(matches!(result, Err(JournalError::MalformedRequest(_))), "{raw:?}");
        }
        assert_eq!(fx.text(date), "- a\n");
        Ok(())
    }

    #[test]
    fn update_by_position_with_prose_folds_into_the_previous_block() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-05");
        fx.seed(date, "- a\n- b\n- c\n")?;

        let updated = fx.writer.update(fx.folder(), date, Address::Position(1), "no head here")?;
        assert_eq!(fx.text(date), "- a\nno head here\n- c\n");
        assert_eq!(updated.entry.title, "c");
        assert_eq!(updated.position, 1);
        let first = &fx.store.entries(date)[0];
        assert_eq!(first.entry.body, "a\nno head here");
        Ok(())
    }

    #[test]
    fn update_rejects_blank_text_and_missing_targets() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-04");
        fx.seed(date, "- only\n")?;

        let blank = fx.writer.update(fx.folder(), date, Address::Position(0), "  \n");
        assert!(matches!(blank, Err(JournalError::MalformedRequest(_))));
        let out_of_range = fx.writer.update(fx.folder(), date, Address::Position(1), "- x");
        assert!(matches!(out_of_range, Err(JournalError::EntryNotFound { .. })));
        let no_file = fx.writer.update(fx.folder(), key("2025-02-01"), Address::Position(0), "- x");
        assert!(matches!(no_file, Err(JournalError::DayNotFound(_))));
        assert_eq!(fx.text(date), "- only\n");
        Ok(())
    }

    #[test]
    fn set_status_rewrites_only_the_head_line() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-01");
        let original = "- TODO [[work]] Ship release\n  DEADLINE: <2025-01-10>\n";
        fx.seed(date, original)?;
        let before = fx.store.entries(date)[0].entry.hash;

        let done = fx.writer.set_status(fx.folder(), date, 0, StatusToken::Done)?;
        assert_eq!(fx.text(date), "- DONE [[work]] Ship release\n  DEADLINE: <2025-01-10>\n");
        assert_eq!(done.entry.status(), Some(StatusToken::Done));
        assert_eq!(done.entry.tags, vec!["work"]);
        assert_eq!(done.entry.title, "Ship release");
        assert_ne!(done.entry.hash, before);
        Ok(())
    }

    #[test]
    fn set_status_requires_a_task() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-05");
        fx.seed(date, "- just a note\n")?;
        let result = fx.writer.set_status(fx.folder(), date, 0, StatusToken::Done);
        assert!(matches!(result, Err(JournalError::MalformedRequest(_))));
        Ok(())
    }

    #[test]
    fn deleting_the_sole_entry_empties_the_day() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-06");
        fx.seed(date, "- gone\n  with body\n")?;
        let hash = fx.store.entries(date)[0].entry.hash;

        fx.writer.delete(fx.folder(), date, Address::Hash(hash))?;
        assert_eq!(fx.text(date), "");
        assert!(fx.store.entries(date).is_empty());
        assert_eq!(fx.store.day(date).map(|day| day.size_bytes), Some(0));
        Ok(())
    }

    #[test]
    fn delete_by_position_keeps_neighbours_and_their_hashes() -> JournalResult<()> {
        let fx = Fixture::new();
        let date = key("2025-01-07");
        fx.seed(date, "- a\n- b\n- c\n")?;
        let hash_c = fx.store.entries(date)[2].entry.hash;

        fx.writer.delete(fx.folder(), date, Address::Position(1))?;
        assert_eq!(fx.text(date), "- a\n- c\n");
        let entries = fx.store.entries(date);
        assert_eq!(entries[1].entry.hash, hash_c);
        assert_eq!(entries[1].position, 1);
        Ok(())
    }

    #[test]
    fn refresh_month_rebuilds_only_that_month() -> JournalResult<()> {
        let fx = Fixture::new();
        fx.seed(key("2025-01-08"), "- jan\n")?;
        fx.seed(key("2025-02-08"), "- feb\n")?;
        fs::remove_file(fx.folder().join("2025_01_08.md"))?;

        let report = fx.writer.refresh_month(fx.folder(), 2025, 1)?;
        assert_eq!(report.scanned, 0);
        assert!(fx.store.day(key("2025-01-08")).is_none());
        assert!(fx.store.day(key("2025-02-08")).is_some());
        Ok(())
    }
}
