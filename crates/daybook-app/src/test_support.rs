//! In-memory store used by unit tests.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use daybook_core::{
    BlockHash, DayFilter, DayKey, Entry, EntryFilter, FileIdentity, JournalDay, JournalEntry,
};
use time::OffsetDateTime;

use crate::store::{JournalStore, JournalTx};

#[derive(Clone, Default)]
pub struct MockStore {
    inner: Arc<MockStoreInner>,
}

#[derive(Default)]
struct MockStoreInner {
    state: Mutex<MockState>,
    fail_insert_on: Mutex<Option<String>>,
    commits: Mutex<u32>,
}

#[derive(Clone, Default)]
struct MockState {
    days: BTreeMap<DayKey, JournalDay>,
    entries: Vec<JournalEntry>,
    next_id: i64,
}

pub struct MockTx<'a> {
    store: &'a MockStore,
    staged: Mutex<MockState>,
}

impl MockStore {
    pub fn fail_insert_on(&self, title: &str) {
        *guard(&self.inner.fail_insert_on) = Some(title.to_owned());
    }

    pub fn day(&self, date: DayKey) -> Option<JournalDay> {
        guard(&self.inner.state).days.get(&date).cloned()
    }

    pub fn entries(&self, date: DayKey) -> Vec<JournalEntry> {
        let mut rows: Vec<_> = guard(&self.inner.state)
            .entries
            .iter()
            .filter(|row| row.date == date)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.position);
        rows
    }

    pub fn commits(&self) -> u32 {
        *guard(&self.inner.commits)
    }
}

impl JournalTx for MockTx<'_> {
    type Error = anyhow::Error;

    fn get_day(&self, date: DayKey) -> Result<Option<JournalDay>, Self::Error> {
        Ok(guard(&self.staged).days.get(&date).cloned())
    }

    fn touch_day_last_checked(&self, date: DayKey, at: OffsetDateTime) -> Result<bool, Self::Error> {
        let mut state = guard(&self.staged);
        Ok(state.days.get_mut(&date).map(|day| day.last_checked_at = at).is_some())
    }

    fn upsert_day(
        &self,
        date: DayKey,
        identity: &FileIdentity,
        tags: &[String],
        at: OffsetDateTime,
    ) -> Result<(), Self::Error> {
        let mut state = guard(&self.staged);
        let created_at = state.days.get(&date).map_or(at, |day| day.created_at);
        state.days.insert(
            date,
            JournalDay {
                date,
                size_bytes: identity.size_bytes,
                hash: identity.sha256.clone(),
                tags: tags.to_vec(),
                last_checked_at: at,
                created_at,
                updated_at: at,
            },
        );
        Ok(())
    }

    fn delete_entries_for_day(&self, date: DayKey) -> Result<usize, Self::Error> {
        let mut state = guard(&self.staged);
        let before = state.entries.len();
        state.entries.retain(|row| row.date != date);
        Ok(before - state.entries.len())
    }

    fn delete_month(&self, year: u16, month: u8) -> Result<usize, Self::Error> {
        let mut state = guard(&self.staged);
        let in_month = |date: &DayKey| date.year() == year && date.month() == month;
        state.entries.retain(|row| !in_month(&row.date));
        let before = state.days.len();
        state.days.retain(|date, _| !in_month(date));
        Ok(before - state.days.len())
    }

    fn insert_entry(
        &self,
        date: DayKey,
        position: u32,
        entry: &Entry,
        at: OffsetDateTime,
    ) -> Result<i64, Self::Error> {
        if guard(&self.store.inner.fail_insert_on).as_deref() == Some(entry.title.as_str()) {
            return Err(anyhow!("injected insert failure for {:?}", entry.title));
        }
        let mut state = guard(&self.staged);
        if !state.days.contains_key(&date) {
            return Err(anyhow!("no day row for {date}"));
        }
        state.next_id += 1;
        let id = state.next_id;
        state.entries.push(JournalEntry {
            id,
            date,
            position,
            entry: entry.clone(),
            created_at: at,
            updated_at: at,
        });
        Ok(id)
    }

    fn commit(self) -> Result<(), Self::Error> {
        let staged = self.staged.into_inner().unwrap_or_else(PoisonError::into_inner);
        *guard(&self.store.inner.state) = staged;
        *guard(&self.store.inner.commits) += 1;
        Ok(())
    }

    fn rollback(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl JournalStore for MockStore {
    type Error = anyhow::Error;
    type Tx<'a> = MockTx<'a>;

    fn begin(&self) -> Result<Self::Tx<'_>, Self::Error> {
        let staged = guard(&self.inner.state).clone();
        Ok(MockTx {
            store: self,
            staged: Mutex::new(staged),
        })
    }

    fn get_day(&self, date: DayKey) -> Result<Option<JournalDay>, Self::Error> {
        Ok(self.day(date))
    }

    fn list_days(&self, filter: &DayFilter) -> Result<Vec<JournalDay>, Self::Error> {
        Ok(guard(&self.inner.state)
            .days
            .values()
            .rev()
            .filter(|day| filter.matches(day))
            .cloned()
            .collect())
    }

    fn list_day_tags(&self) -> Result<Vec<Vec<String>>, Self::Error> {
        Ok(guard(&self.inner.state).days.values().map(|day| day.tags.clone()).collect())
    }

    fn query_entries(&self, filter: &EntryFilter) -> Result<Vec<JournalEntry>, Self::Error> {
        let mut rows: Vec<_> = guard(&self.inner.state)
            .entries
            .iter()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.position.cmp(&b.position)));
        Ok(rows)
    }

    fn entries_for_day(&self, date: DayKey) -> Result<Vec<JournalEntry>, Self::Error> {
        Ok(self.entries(date))
    }

    fn entry_by_position(&self, date: DayKey, position: u32) -> Result<Option<JournalEntry>, Self::Error> {
        Ok(self.entries(date).into_iter().find(|row| row.position == position))
    }

    fn entry_by_hash(&self, date: DayKey, hash: BlockHash) -> Result<Option<JournalEntry>, Self::Error> {
        Ok(self.entries(date).into_iter().find(|row| row.entry.hash == hash))
    }
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
