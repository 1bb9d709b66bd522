//! Storage seams consumed by the sync engine and the service.

use std::sync::Arc;

use anyhow::Error;
use daybook_core::{BlockHash, DayFilter, DayKey, Entry, EntryFilter, FileIdentity, JournalDay, JournalEntry};
use daybook_store_sqlite::{SqliteStore, SqliteStoreError, SqliteTx};
use time::OffsetDateTime;

/// Write side of the index, scoped to one transaction.
///
/// Dropping a transaction without [`commit`](Self::commit) must discard
/// every change made through it.
pub trait JournalTx {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Day row for `date` as seen inside the transaction.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn get_day(&self, date: DayKey) -> Result<Option<JournalDay>, Self::Error>;

    /// Refresh only `last_checked_at`. Returns whether a row existed.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn touch_day_last_checked(&self, date: DayKey, at: OffsetDateTime) -> Result<bool, Self::Error>;

    /// Insert or update the day row.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn upsert_day(
        &self,
        date: DayKey,
        identity: &FileIdentity,
        tags: &[String],
        at: OffsetDateTime,
    ) -> Result<(), Self::Error>;

    /// Remove every entry of `date`.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn delete_entries_for_day(&self, date: DayKey) -> Result<usize, Self::Error>;

    /// Remove every day and entry row of a month.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn delete_month(&self, year: u16, month: u8) -> Result<usize, Self::Error>;

    /// Insert one entry at `position`.
    ///
    /// # Errors
    /// Returns a store-specific error when the write fails.
    fn insert_entry(
        &self,
        date: DayKey,
        position: u32,
        entry: &Entry,
        at: OffsetDateTime,
    ) -> Result<i64, Self::Error>;

    /// Publish the transaction.
    ///
    /// # Errors
    /// Returns a store-specific error when the commit fails.
    fn commit(self) -> Result<(), Self::Error>;

    /// Discard the transaction.
    ///
    /// # Errors
    /// Returns a store-specific error when the rollback fails.
    fn rollback(self) -> Result<(), Self::Error>;
}

/// Read side of the index plus the transaction entry point.
pub trait JournalStore {
    /// Error type bubbled up from the backing store.
    type Error: Into<Error>;

    /// Transaction handle borrowed from the store.
    type Tx<'a>: JournalTx<Error = Self::Error>
    where
        Self: 'a;

    /// Open a write transaction.
    ///
    /// # Errors
    /// Returns a store-specific error when the transaction cannot start.
    fn begin(&self) -> Result<Self::Tx<'_>, Self::Error>;

    /// Day row for `date`.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn get_day(&self, date: DayKey) -> Result<Option<JournalDay>, Self::Error>;

    /// Day rows matching `filter`, newest first.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn list_days(&self, filter: &DayFilter) -> Result<Vec<JournalDay>, Self::Error>;

    /// Tag set of every day.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn list_day_tags(&self) -> Result<Vec<Vec<String>>, Self::Error>;

    /// Entries matching `filter`, by date descending then position.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<JournalEntry>, Self::Error>;

    /// Entries of one day in position order.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn entries_for_day(&self, date: DayKey) -> Result<Vec<JournalEntry>, Self::Error>;

    /// Entry at `position` of `date`.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn entry_by_position(&self, date: DayKey, position: u32) -> Result<Option<JournalEntry>, Self::Error>;

    /// First entry of `date` carrying `hash`.
    ///
    /// # Errors
    /// Returns a store-specific error when the read fails.
    fn entry_by_hash(&self, date: DayKey, hash: BlockHash) -> Result<Option<JournalEntry>, Self::Error>;
}

impl<S: JournalStore + ?Sized> JournalStore for Arc<S> {
    type Error = S::Error;
    type Tx<'a>
        = S::Tx<'a>
    where
        Self: 'a;

    fn begin(&self) -> Result<Self::Tx<'_>, Self::Error> {
        (**self).begin()
    }

    fn get_day(&self, date: DayKey) -> Result<Option<JournalDay>, Self::Error> {
        (**self).get_day(date)
    }

    fn list_days(&self, filter: &DayFilter) -> Result<Vec<JournalDay>, Self::Error> {
        (**self).list_days(filter)
    }

    fn list_day_tags(&self) -> Result<Vec<Vec<String>>, Self::Error> {
        (**self).list_day_tags()
    }

    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<JournalEntry>, Self::Error> {
        (**self).query_entries(filter)
    }

    fn entries_for_day(&self, date: DayKey) -> Result<Vec<JournalEntry>, Self::Error> {
        (**self).entries_for_day(date)
    }

    fn entry_by_position(&self, date: DayKey, position: u32) -> Result<Option<JournalEntry>, Self::Error> {
        (**self).entry_by_position(date, position)
    }

    fn entry_by_hash(&self, date: DayKey, hash: BlockHash) -> Result<Option<JournalEntry>, Self::Error> {
        (**self).entry_by_hash(date, hash)
    }
}

impl JournalTx for SqliteTx<'_> {
    type Error = SqliteStoreError;

    fn get_day(&self, date: DayKey) -> Result<Option<JournalDay>, Self::Error> {
        Self::get_day(self, date)
    }

    fn touch_day_last_checked(&self, date: DayKey, at: OffsetDateTime) -> Result<bool, Self::Error> {
        Self::touch_day_last_checked(self, date, at)
    }

    fn upsert_day(
        &self,
        date: DayKey,
        identity: &FileIdentity,
        tags: &[String],
        at: OffsetDateTime,
    ) -> Result<(), Self::Error> {
        Self::upsert_day(self, date, identity, tags, at)
    }

    fn delete_entries_for_day(&self, date: DayKey) -> Result<usize, Self::Error> {
        Self::delete_entries_for_day(self, date)
    }

    fn delete_month(&self, year: u16, month: u8) -> Result<usize, Self::Error> {
        Self::delete_month(self, year, month)
    }

    fn insert_entry(
        &self,
        date: DayKey,
        position: u32,
        entry: &Entry,
        at: OffsetDateTime,
    ) -> Result<i64, Self::Error> {
        Self::insert_entry(self, date, position, entry, at)
    }

    fn commit(self) -> Result<(), Self::Error> {
        Self::commit(self)
    }

    fn rollback(self) -> Result<(), Self::Error> {
        Self::rollback(self)
    }
}

impl JournalStore for SqliteStore {
    type Error = SqliteStoreError;
    type Tx<'a> = SqliteTx<'a>;

    fn begin(&self) -> Result<Self::Tx<'_>, Self::Error> {
        Self::begin(self)
    }

    fn get_day(&self, date: DayKey) -> Result<Option<JournalDay>, Self::Error> {
        Self::get_day(self, date)
    }

    fn list_days(&self, filter: &DayFilter) -> Result<Vec<JournalDay>, Self::Error> {
        Self::list_days(self, filter)
    }

    fn list_day_tags(&self) -> Result<Vec<Vec<String>>, Self::Error> {
        Self::list_day_tags(self)
    }

    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<JournalEntry>, Self::Error> {
        Self::query_entries(self, filter)
    }

    fn entries_for_day(&self, date: DayKey) -> Result<Vec<JournalEntry>, Self::Error> {
        Self::entries_for_day(self, date)
    }

    fn entry_by_position(&self, date: DayKey, position: u32) -> Result<Option<JournalEntry>, Self::Error> {
        Self::entry_by_position(self, date, position)
    }

    fn entry_by_hash(&self, date: DayKey, hash: BlockHash) -> Result<Option<JournalEntry>, Self::Error> {
        Self::entry_by_hash(self, date, hash)
    }
}
