//! Async façade for hosts running on tokio.

use std::sync::Arc;

use anyhow::anyhow;
use daybook_core::{BlockHash, DayFilter, DayKey, DraftEntry, EntryFilter, JournalDay, JournalEntry, TagNode};

use crate::error::{JournalError, JournalResult};
use crate::service::JournalService;
use crate::settings::SettingsLookup;
use crate::store::JournalStore;
use crate::sync::SyncReport;

/// Runs every [`JournalService`] call on the blocking pool.
///
/// Dropping the returned future does not stop work already handed to the
/// pool; the file write and its resync always run to completion.
pub struct AsyncJournalService<S, L> {
    inner: Arc<JournalService<S, L>>,
}

impl<S, L> Clone for AsyncJournalService<S, L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, L> AsyncJournalService<S, L>
where
    S: JournalStore + Send + Sync + 'static,
    L: SettingsLookup + Send + Sync + 'static,
{
    /// Wrap a synchronous service.
    pub fn new(service: JournalService<S, L>) -> Self {
        Self {
            inner: Arc::new(service),
        }
    }

    async fn run<R, F>(&self, op: F) -> JournalResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&JournalService<S, L>) -> JournalResult<R> + Send + 'static,
    {
        let service = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || op(&service))
            .await
            .map_err(|err| JournalError::Store(anyhow!("journal task join error: {err}")))?
    }

    /// See [`JournalService::sync_all`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn sync_all(&self) -> JournalResult<SyncReport> {
        self.run(JournalService::sync_all).await
    }

    /// See [`JournalService::list_entries`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn list_entries(&self, filter: EntryFilter) -> JournalResult<Vec<JournalEntry>> {
        self.run(move |service| service.list_entries(&filter)).await
    }

    /// See [`JournalService::day_view`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn day_view(&self, date: DayKey) -> JournalResult<Vec<JournalEntry>> {
        self.run(move |service| service.day_view(date)).await
    }

    /// See [`JournalService::get_day`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn get_day(&self, date: DayKey) -> JournalResult<String> {
        self.run(move |service| service.get_day(date)).await
    }

    /// See [`JournalService::list_days`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn list_days(&self, filter: DayFilter) -> JournalResult<Vec<JournalDay>> {
        self.run(move |service| service.list_days(&filter)).await
    }

    /// See [`JournalService::list_month`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn list_month(&self, year: u16, month: u8, refresh: bool) -> JournalResult<Vec<JournalDay>> {
        self.run(move |service| service.list_month(year, month, refresh)).await
    }

    /// See [`JournalService::list_tags`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn list_tags(&self, prefix: Option<String>) -> JournalResult<Vec<String>> {
        self.run(move |service| service.list_tags(prefix.as_deref())).await
    }

    /// See [`JournalService::tag_graph`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn tag_graph(&self) -> JournalResult<Vec<TagNode>> {
        self.run(JournalService::tag_graph).await
    }

    /// See [`JournalService::tag_graph_for`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn tag_graph_for(&self, tag: String) -> JournalResult<TagNode> {
        self.run(move |service| service.tag_graph_for(&tag)).await
    }

    /// See [`JournalService::create_entry`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn create_entry(&self, draft: DraftEntry) -> JournalResult<DayKey> {
        self.run(move |service| service.create_entry(&draft)).await
    }

    /// See [`JournalService::update_entry_by_position`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn update_entry_by_position(
        &self,
        date: DayKey,
        position: u32,
        raw: String,
    ) -> JournalResult<JournalEntry> {
        self.run(move |service| service.update_entry_by_position(date, position, &raw))
            .await
    }

    /// See [`JournalService::update_entry_by_hash`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn update_entry_by_hash(
        &self,
        date: DayKey,
        hash: BlockHash,
        raw: String,
    ) -> JournalResult<JournalEntry> {
        self.run(move |service| service.update_entry_by_hash(date, hash, &raw))
            .await
    }

    /// See [`JournalService::update_entry_status`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn update_entry_status(
        &self,
        date: DayKey,
        position: u32,
        status: String,
    ) -> JournalResult<JournalEntry> {
        self.run(move |service| service.update_entry_status(date, position, &status))
            .await
    }

    /// See [`JournalService::delete_entry_by_hash`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn delete_entry_by_hash(&self, date: DayKey, hash: BlockHash) -> JournalResult<()> {
        self.run(move |service| service.delete_entry_by_hash(date, hash)).await
    }

    /// See [`JournalService::delete_entry_by_position`].
    ///
    /// # Errors
    /// Propagates the service error.
    pub async fn delete_entry_by_position(&self, date: DayKey, position: u32) -> JournalResult<()> {
        self.run(move |service| service.delete_entry_by_position(date, position))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::service::journal_lock;
    use crate::settings::StaticSettings;
    use crate::test_support::MockStore;
    use daybook_core::StatusToken;
    use tempfile::TempDir;
    use time::macros::datetime;

    #[tokio::test]
    async fn mutations_round_trip_through_the_blocking_pool() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let service = JournalService::new(
            MockStore::default(),
            StaticSettings::journals_folder(dir.path()),
            journal_lock(),
        )
        .with_clock(FixedClock::new(datetime!(2025-04-01 09:00 UTC)));
        let service = AsyncJournalService::new(service);

        let date = service
            .create_entry(DraftEntry {
                description: "Water plants".into(),
                status: Some(StatusToken::Todo),
                tags: vec!["home".into()],
                ..DraftEntry::default()
            })
            .await?;
        let done = service.update_entry_status(date, 0, "DONE".into()).await?;
        assert_eq!(done.entry.status(), Some(StatusToken::Done));

        service.clone().delete_entry_by_position(date, 0).await?;
        assert!(service.day_view(date).await?.is_empty());
        assert_eq!(service.get_day(date).await?, "");
        Ok(())
    }
}
