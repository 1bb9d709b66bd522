//! Journal service façade used by hosts.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use daybook_core::tag_graph::find_node;
use daybook_core::{
    Address, BlockHash, DayFilter, DayKey, DraftEntry, EntryFilter, JournalDay, JournalEntry,
    StatusToken, TagNode, build_tag_graph,
};
use tracing::info;

use crate::clock::Clock;
use crate::error::{JournalError, JournalResult};
use crate::settings::{SettingsLookup, journals_folder};
use crate::store::JournalStore;
use crate::sync::{SyncReport, read_day};
use crate::writer::JournalWriter;

/// Process-wide critical section shared by every journal mutation.
pub type JournalLock = Arc<Mutex<()>>;

/// Create a fresh [`JournalLock`].
#[must_use]
pub fn journal_lock() -> JournalLock {
    Arc::new(Mutex::new(()))
}

/// Service façade that encapsulates all journal side effects.
///
/// Read-modify-write sequences run under the injected lock; plain reads go
/// straight to the store.
pub struct JournalService<S, L> {
    writer: JournalWriter<S>,
    settings: L,
    lock: JournalLock,
}

impl<S, L> JournalService<S, L> {
    /// Build a service over `store` and `settings`, serialized by `lock`.
    pub fn new(store: S, settings: L, lock: JournalLock) -> Self {
        Self {
            writer: JournalWriter::new(store),
            settings,
            lock,
        }
    }

    /// Replace the clock used for "today" and timestamps.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.writer = self.writer.with_clock(clock);
        self
    }

    const fn store(&self) -> &S {
        self.writer.store()
    }

    fn exclusive<R>(&self, op: impl FnOnce() -> R) -> R {
        // The lock guards no data, so a panic elsewhere cannot leave it inconsistent.
        let guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let result = op();
        drop(guard);
        result
    }
}

impl<S: JournalStore, L: SettingsLookup> JournalService<S, L> {
    fn folder(&self) -> JournalResult<PathBuf> {
        journals_folder(&self.settings)
    }

    /// Sync every journal file into the index.
    ///
    /// # Errors
    /// Returns [`JournalError::FolderNotConfigured`] without a folder, or the
    /// first I/O or store error.
    pub fn sync_all(&self) -> JournalResult<SyncReport> {
        let folder = self.folder()?;
        self.exclusive(|| self.writer.sync_folder(&folder))
    }

    /// Entries matching `filter`, after a folder sync.
    ///
    /// # Errors
    /// Returns a folder, I/O or store error.
    pub fn list_entries(&self, filter: &EntryFilter) -> JournalResult<Vec<JournalEntry>> {
        self.sync_all()?;
        self.store().query_entries(filter).map_err(JournalError::store)
    }

    /// Entries of one day, after a folder sync.
    ///
    /// # Errors
    /// Returns a folder, I/O or store error.
    pub fn day_view(&self, date: DayKey) -> JournalResult<Vec<JournalEntry>> {
        self.sync_all()?;
        self.store().entries_for_day(date).map_err(JournalError::store)
    }

    /// Raw text of one day file.
    ///
    /// # Errors
    /// Returns [`JournalError::DayNotFound`] when the file does not exist.
    pub fn get_day(&self, date: DayKey) -> JournalResult<String> {
        read_day(&self.folder()?, date)
    }

    /// Indexed day rows matching `filter`, newest first.
    ///
    /// # Errors
    /// Returns a store error.
    pub fn list_days(&self, filter: &DayFilter) -> JournalResult<Vec<JournalDay>> {
        let filter = DayFilter {
            tag: filter
                .tag
                .as_deref()
                .map(|tag| tag.trim().to_lowercase())
                .filter(|tag| !tag.is_empty()),
            ..filter.clone()
        };
        self.store().list_days(&filter).map_err(JournalError::store)
    }

    /// Day rows of one month, optionally rebuilt from disk first.
    ///
    /// # Errors
    /// Returns [`JournalError::MalformedRequest`] for an invalid month, or a
    /// folder, I/O or store error.
    pub fn list_month(&self, year: u16, month: u8, refresh: bool) -> JournalResult<Vec<JournalDay>> {
        DayKey::new(year.into(), month.into(), 1)?;
        if refresh {
            let folder = self.folder()?;
            self.exclusive(|| self.writer.refresh_month(&folder, year, month))?;
        } else {
            self.sync_all()?;
        }
        let filter = DayFilter {
            year: Some(year),
            month: Some(month),
            ..DayFilter::default()
        };
        self.store().list_days(&filter).map_err(JournalError::store)
    }

    /// Every indexed tag, optionally restricted to a case-insensitive prefix.
    ///
    /// # Errors
    /// Returns a store error.
    pub fn list_tags(&self, prefix: Option<&str>) -> JournalResult<Vec<String>> {
        let prefix = prefix.map(|p| p.trim().to_lowercase()).unwrap_or_default();
        let mut tags: Vec<String> = self
            .store()
            .list_day_tags()
            .map_err(JournalError::store)?
            .into_iter()
            .flatten()
            .filter(|tag| tag.to_lowercase().starts_with(&prefix))
            .collect();
        tags.sort();
        tags.dedup();
        Ok(tags)
    }

    /// Co-occurrence graph over indexed day tags.
    ///
    /// # Errors
    /// Returns a store error.
    pub fn tag_graph(&self) -> JournalResult<Vec<TagNode>> {
        let started = Instant::now();
        let days = self.store().list_day_tags().map_err(JournalError::store)?;
        let day_count = days.len();
        let graph = build_tag_graph(days);
        info!(
            days = day_count,
            nodes = graph.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "Built tag graph"
        );
        Ok(graph)
    }

    /// Graph node of a single tag.
    ///
    /// # Errors
    /// Returns [`JournalError::TagNotFound`] when the tag has no edges, or a
    /// store error.
    pub fn tag_graph_for(&self, tag: &str) -> JournalResult<TagNode> {
        find_node(self.tag_graph()?, tag).ok_or_else(|| JournalError::TagNotFound(tag.trim().to_owned()))
    }

    /// Append a new block to today's file.
    ///
    /// # Errors
    /// Returns [`JournalError::MalformedRequest`] for an invalid draft, or a
    /// folder, I/O or store error.
    pub fn create_entry(&self, draft: &DraftEntry) -> JournalResult<DayKey> {
        let folder = self.folder()?;
        self.exclusive(|| self.writer.create(&folder, draft))
    }

    /// Replace the block at `position` with `raw`.
    ///
    /// # Errors
    /// Returns a bad-request, not-found, I/O or store error.
    pub fn update_entry_by_position(&self, date: DayKey, position: u32, raw: &str) -> JournalResult<JournalEntry> {
        let folder = self.folder()?;
        self.exclusive(|| self.writer.update(&folder, date, Address::Position(position), raw))
    }

    /// Replace the block with content hash `hash` with `raw`.
    ///
    /// # Errors
    /// Returns a bad-request, not-found, I/O or store error.
    pub fn update_entry_by_hash(&self, date: DayKey, hash: BlockHash, raw: &str) -> JournalResult<JournalEntry> {
        let folder = self.folder()?;
        self.exclusive(|| self.writer.update(&folder, date, Address::Hash(hash), raw))
    }

    /// Change the status token of the task at `position`.
    ///
    /// # Errors
    /// Returns [`JournalError::MalformedRequest`] for a blank or unknown
    /// status or a non-task entry, or a not-found, I/O or store error.
    pub fn update_entry_status(&self, date: DayKey, position: u32, status: &str) -> JournalResult<JournalEntry> {
        if status.trim().is_empty() {
            return Err(JournalError::MalformedRequest("status is required".into()));
        }
        let status: StatusToken = status.parse()?;
        let folder = self.folder()?;
        self.exclusive(|| self.writer.set_status(&folder, date, position, status))
    }

    /// Remove the block with content hash `hash`.
    ///
    /// # Errors
    /// Returns a not-found, I/O or store error.
    pub fn delete_entry_by_hash(&self, date: DayKey, hash: BlockHash) -> JournalResult<()> {
        let folder = self.folder()?;
        self.exclusive(|| self.writer.delete(&folder, date, Address::Hash(hash)))
    }

    /// Remove the block at `position`.
    ///
    /// # Errors
    /// Returns a not-found, I/O or store error.
    pub fn delete_entry_by_position(&self, date: DayKey, position: u32) -> JournalResult<()> {
        let folder = self.folder()?;
        self.exclusive(|| self.writer.delete(&folder, date, Address::Position(position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorKind;
    use crate::settings::StaticSettings;
    use crate::test_support::MockStore;
    use std::fs;
    use tempfile::TempDir;
    use time::macros::datetime;

    fn service(dir: &TempDir) -> (JournalService<MockStore, StaticSettings>, MockStore) {
        let store = MockStore::default();
        let service = JournalService::new(store.clone(), StaticSettings::journals_folder(dir.path()), journal_lock())
            .with_clock(FixedClock::new(datetime!(2025-03-01 08:00 UTC)));
        (service, store)
    }

    fn key(raw: &str) -> DayKey {
        raw.parse().unwrap_or_else(|err| panic!("bad key {raw}: {err}"))
    }

    #[test]
    fn unconfigured_folder_is_not_found() {
        let service = JournalService::new(MockStore::default(), StaticSettings::new(), journal_lock());
        let err = service.list_entries(&EntryFilter::default()).err();
        assert!(matches!(err, Some(JournalError::FolderNotConfigured)));
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::NotFound));
    }

    #[test]
    fn listing_syncs_first_and_second_listing_is_a_no_op() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2025_01_01.md"), "- TODO [[work]] Ship release\n")?;
        let (service, store) = service(&dir);

        let entries = service.list_entries(&EntryFilter::default())?;
        assert_eq!(entries.len(), 1);
        let report = service.sync_all()?;
        assert_eq!(report.unchanged, 1);
        assert_eq!(report.reindexed, 0);
        assert_eq!(store.commits(), 2);
        Ok(())
    }

    #[test]
    fn status_update_validates_input() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2025_01_01.md"), "- TODO a\n")?;
        let (service, _) = service(&dir);
        let date = key("2025-01-01");

        let blank = service.update_entry_status(date, 0, " ").err();
        assert_eq!(blank.map(|e| e.kind()), Some(ErrorKind::BadRequest));
        let unknown = service.update_entry_status(date, 0, "BLOCKED").err();
        assert_eq!(unknown.map(|e| e.kind()), Some(ErrorKind::BadRequest));

        let done = service.update_entry_status(date, 0, "done")?;
        assert_eq!(done.entry.status(), Some(StatusToken::Done));
        Ok(())
    }

    #[test]
    fn tags_are_unique_sorted_and_prefix_filtered() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2025_01_01.md"), "- [[work]] a [[Home]]\n")?;
        fs::write(dir.path().join("2025_01_02.md"), "- [[workout]] b [[home]]\n")?;
        let (service, _) = service(&dir);
        assert!(service.list_tags(None)?.is_empty());

        service.sync_all()?;
        assert_eq!(service.list_tags(None)?, vec!["home", "work", "workout"]);
        assert_eq!(service.list_tags(Some("WORK"))?, vec!["work", "workout"]);
        Ok(())
    }

    #[test]
    fn tag_graph_for_unknown_tag_is_not_found() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2025_01_01.md"), "- [[work]] a\n- [[home]] b\n")?;
        let (service, _) = service(&dir);
        service.sync_all()?;

        let node = service.tag_graph_for("Work")?;
        assert_eq!(node.related.len(), 1);
        assert_eq!(node.related[0].tag, "home");
        let missing = service.tag_graph_for("garden").err();
        assert!(matches!(missing, Some(JournalError::TagNotFound(tag)) if tag == "garden"));
        Ok(())
    }

    #[test]
    fn index_reads_do_not_need_the_folder() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2025_01_01.md"), "- [[a]] x [[b]]\n")?;
        let (service, store) = service(&dir);
        service.sync_all()?;

        let detached = JournalService::new(store, StaticSettings::new(), journal_lock());
        assert_eq!(detached.list_tags(None)?, vec!["a", "b"]);
        assert_eq!(detached.tag_graph()?.len(), 2);
        assert_eq!(detached.list_days(&DayFilter::default())?.len(), 1);
        assert!(matches!(detached.sync_all(), Err(JournalError::FolderNotConfigured)));
        Ok(())
    }

    #[test]
    fn list_month_validates_month_and_refreshes() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2025_02_01.md"), "- a\n")?;
        fs::write(dir.path().join("2025_02_03.md"), "- b\n")?;
        fs::write(dir.path().join("2025_03_01.md"), "- c\n")?;
        let (service, store) = service(&dir);

        let bad = service.list_month(2025, 13, false).err();
        assert_eq!(bad.map(|e| e.kind()), Some(ErrorKind::BadRequest));

        let days: Vec<String> = service
            .list_month(2025, 2, true)?
            .into_iter()
            .map(|day| day.date.to_string())
            .collect();
        assert_eq!(days, vec!["2025-02-03", "2025-02-01"]);
        assert!(store.day(key("2025-03-01")).is_none());
        Ok(())
    }

    #[test]
    fn get_day_returns_raw_text_or_not_found() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("2025_01_01.md"), "# preamble\n- a\n")?;
        let (service, _) = service(&dir);

        assert_eq!(service.get_day(key("2025-01-01"))?, "# preamble\n- a\n");
        let missing = service.get_day(key("2025-01-02")).err();
        assert!(matches!(missing, Some(JournalError::DayNotFound(_))));
        Ok(())
    }

    #[test]
    fn create_uses_the_clock_for_today() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let (service, _) = service(&dir);
        let draft = DraftEntry {
            description: "Plan week".into(),
            status: Some(StatusToken::Now),
            ..DraftEntry::default()
        };
        let date = service.create_entry(&draft)?;
        assert_eq!(date, key("2025-03-01"));
        let today = service.day_view(date)?;
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].entry.status(), Some(StatusToken::Now));
        Ok(())
    }
}
