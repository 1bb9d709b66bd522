//! SQLite-backed index of journal days and entries.

/// Error types for store operations.
pub mod error;
mod schema;

pub use error::{SqliteStoreError, StoreResult};

use daybook_core::{
    BlockHash, DayFilter, DayKey, Entry, EntryFilter, EntryKind, EntryType, FileIdentity,
    JournalDay, JournalEntry, StatusToken, TaskFields,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info, warn};

const DAY_COLUMNS: &str =
    "year, month, day, size_bytes, hash, tags, last_checked_at, created_at, updated_at";
const ENTRY_COLUMNS: &str = "id, year, month, day, position, title, raw_line, hash, body, status, \
     entry_type, tags, scheduled_at, deadline_at, created_at, updated_at";

/// Journal index stored in a single SQLite database.
///
/// The connection sits behind a mutex; a [`SqliteTx`] holds it for its whole
/// lifetime, so readers never observe a half-applied transaction. Store reads
/// block while a transaction on the same thread is open; use the
/// transaction's own accessors instead.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    /// Returns an error when the parent directory cannot be created or SQLite
    /// refuses the file.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000;")?;
        let store = Self::with_connection(conn)?;
        info!(path = %path.display(), "Opened journal index");
        Ok(store)
    }

    /// Private in-memory database, mainly for tests.
    ///
    /// # Errors
    /// Returns an error when SQLite cannot allocate the database.
    pub fn open_in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        schema::migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| SqliteStoreError::LockError)
    }

    /// Start a write transaction. Dropping it without [`SqliteTx::commit`]
    /// rolls back.
    ///
    /// # Errors
    /// Returns an error when the lock is poisoned or `BEGIN` fails.
    pub fn begin(&self) -> StoreResult<SqliteTx<'_>> {
        let conn = self.lock()?;
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(SqliteTx { conn, open: true })
    }

    /// Day row for `date`, if one has been synced.
    ///
    /// # Errors
    /// Returns an error when the query fails or the row is malformed.
    pub fn get_day(&self, date: DayKey) -> StoreResult<Option<JournalDay>> {
        get_day(&*self.lock()?, date)
    }

    /// Day rows matching `filter`, newest first.
    ///
    /// # Errors
    /// Returns an error when the query fails or a row is malformed.
    pub fn list_days(&self, filter: &DayFilter) -> StoreResult<Vec<JournalDay>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {DAY_COLUMNS} FROM journal_days d
             WHERE (?1 IS NULL OR d.year = ?1)
               AND (?2 IS NULL OR d.month = ?2)
               AND (?3 IS NULL OR d.day = ?3)
               AND (?4 IS NULL OR EXISTS (SELECT 1 FROM json_each(d.tags) t WHERE t.value = ?4))
             ORDER BY d.year DESC, d.month DESC, d.day DESC"
        );
        let tag = filter.tag.as_deref().map(|tag| tag.trim().to_lowercase());
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![filter.year, filter.month, filter.day, tag], DayRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(DayRow::into_day).collect()
    }

    /// Tag set of every synced day.
    ///
    /// # Errors
    /// Returns an error when the query fails or a tags column is not JSON.
    pub fn list_day_tags(&self) -> StoreResult<Vec<Vec<String>>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT tags FROM journal_days")?;
        let raw = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        raw.iter()
            .map(|tags| serde_json::from_str(tags).map_err(SqliteStoreError::from))
            .collect()
    }

    /// Entries matching `filter`, ordered by date descending then position.
    ///
    /// # Errors
    /// Returns an error when the query fails or a row is malformed.
    pub fn query_entries(&self, filter: &EntryFilter) -> StoreResult<Vec<JournalEntry>> {
        let date = filter.date.map(|pattern| pattern.like_pattern());
        let kind = filter.entry_type.map(EntryType::as_str);
        let statuses = if filter.statuses.is_empty() {
            None
        } else {
            let names: Vec<&str> = filter.statuses.iter().map(|s| s.as_str()).collect();
            Some(serde_json::to_string(&names)?)
        };
        let tags = if filter.tags.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&filter.tags)?)
        };

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries e
             WHERE (?1 IS NULL OR printf('%04d-%02d-%02d', e.year, e.month, e.day) LIKE ?1)
               AND (?2 IS NULL OR e.entry_type = ?2)
               AND (?3 IS NULL OR e.status IN (SELECT value FROM json_each(?3)))
               AND (?4 IS NULL OR EXISTS (
                    SELECT 1 FROM json_each(e.tags) t
                    WHERE t.value IN (SELECT value FROM json_each(?4))))
             ORDER BY e.year DESC, e.month DESC, e.day DESC, e.position ASC"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![date, kind, statuses, tags], EntryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = rows.len(), "Queried journal entries");
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    /// Entries of one day in position order.
    ///
    /// # Errors
    /// Returns an error when the query fails or a row is malformed.
    pub fn entries_for_day(&self, date: DayKey) -> StoreResult<Vec<JournalEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries
             WHERE year = ?1 AND month = ?2 AND day = ?3 ORDER BY position"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![date.year(), date.month(), date.day()], EntryRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(EntryRow::into_entry).collect()
    }

    /// Entry at `position` of `date`.
    ///
    /// # Errors
    /// Returns an error when the query fails or the row is malformed.
    pub fn entry_by_position(&self, date: DayKey, position: u32) -> StoreResult<Option<JournalEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries
             WHERE year = ?1 AND month = ?2 AND day = ?3 AND position = ?4"
        );
        conn.query_row(
            &sql,
            params![date.year(), date.month(), date.day(), position],
            EntryRow::from_row,
        )
        .optional()?
        .map(EntryRow::into_entry)
        .transpose()
    }

    /// First entry of `date` (by position) carrying `hash`.
    ///
    /// # Errors
    /// Returns an error when the query fails or the row is malformed.
    pub fn entry_by_hash(&self, date: DayKey, hash: BlockHash) -> StoreResult<Option<JournalEntry>> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM journal_entries
             WHERE year = ?1 AND month = ?2 AND day = ?3 AND hash = ?4
             ORDER BY position LIMIT 1"
        );
        conn.query_row(
            &sql,
            params![date.year(), date.month(), date.day(), hash.to_string()],
            EntryRow::from_row,
        )
        .optional()?
        .map(EntryRow::into_entry)
        .transpose()
    }

    /// Read a setting.
    ///
    /// # Errors
    /// Returns an error when the query fails.
    pub fn setting(&self, key: &str) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        Ok(conn
            .query_row("SELECT value FROM settings WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Insert or replace a setting.
    ///
    /// # Errors
    /// Returns an error when the write fails.
    pub fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        info!(key, "Stored setting");
        Ok(())
    }
}

/// Open write transaction holding the connection lock.
pub struct SqliteTx<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl SqliteTx<'_> {
    /// Day row for `date` as seen inside the transaction.
    ///
    /// # Errors
    /// Returns an error when the query fails or the row is malformed.
    pub fn get_day(&self, date: DayKey) -> StoreResult<Option<JournalDay>> {
        get_day(&self.conn, date)
    }

    /// Refresh `last_checked_at` only. Returns whether a row was touched.
    ///
    /// # Errors
    /// Returns an error when the update fails.
    pub fn touch_day_last_checked(&self, date: DayKey, at: OffsetDateTime) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "UPDATE journal_days SET last_checked_at = ?4
             WHERE year = ?1 AND month = ?2 AND day = ?3",
            params![date.year(), date.month(), date.day(), stamp(at)?],
        )?;
        Ok(changed > 0)
    }

    /// Insert or update the day row with a new identity and tag union.
    ///
    /// # Errors
    /// Returns an error when the write fails.
    pub fn upsert_day(
        &self,
        date: DayKey,
        identity: &FileIdentity,
        tags: &[String],
        at: OffsetDateTime,
    ) -> StoreResult<()> {
        let size = i64::try_from(identity.size_bytes)
            .map_err(|_| SqliteStoreError::Corrupt(format!("file too large: {}", identity.size_bytes)))?;
        self.conn.execute(
            "INSERT INTO journal_days
                (year, month, day, size_bytes, hash, tags, last_checked_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?7)
             ON CONFLICT (year, month, day) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                hash = excluded.hash,
                tags = excluded.tags,
                last_checked_at = excluded.last_checked_at,
                updated_at = excluded.updated_at",
            params![
                date.year(),
                date.month(),
                date.day(),
                size,
                identity.sha256,
                serde_json::to_string(tags)?,
                stamp(at)?,
            ],
        )?;
        debug!(%date, size, "Upserted journal day");
        Ok(())
    }

    /// Delete every entry of `date`. Returns the number removed.
    ///
    /// # Errors
    /// Returns an error when the delete fails.
    pub fn delete_entries_for_day(&self, date: DayKey) -> StoreResult<usize> {
        Ok(self.conn.execute(
            "DELETE FROM journal_entries WHERE year = ?1 AND month = ?2 AND day = ?3",
            params![date.year(), date.month(), date.day()],
        )?)
    }

    /// Delete all day and entry rows of a month. Returns the number of days removed.
    ///
    /// # Errors
    /// Returns an error when a delete fails.
    pub fn delete_month(&self, year: u16, month: u8) -> StoreResult<usize> {
        let entries = self.conn.execute(
            "DELETE FROM journal_entries WHERE year = ?1 AND month = ?2",
            params![year, month],
        )?;
        let days = self.conn.execute(
            "DELETE FROM journal_days WHERE year = ?1 AND month = ?2",
            params![year, month],
        )?;
        debug!(year, month, days, entries, "Cleared journal month");
        Ok(days)
    }

    /// Insert one parsed entry. Returns the new row id.
    ///
    /// # Errors
    /// Returns an error when the insert fails (including a missing day row).
    pub fn insert_entry(
        &self,
        date: DayKey,
        position: u32,
        entry: &Entry,
        at: OffsetDateTime,
    ) -> StoreResult<i64> {
        let (status, scheduled, deadline) = match &entry.kind {
            EntryKind::Task(task) => (
                Some(task.status.as_str()),
                non_empty(task.scheduled_at.as_deref()),
                non_empty(task.deadline_at.as_deref()),
            ),
            EntryKind::Note => (None, None, None),
        };
        let now = stamp(at)?;
        self.conn.execute(
            "INSERT INTO journal_entries
                (year, month, day, position, title, raw_line, hash, body, status, entry_type,
                 tags, scheduled_at, deadline_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)",
            params![
                date.year(),
                date.month(),
                date.day(),
                position,
                entry.title,
                entry.raw_line,
                entry.hash.to_string(),
                non_empty(Some(&entry.body)),
                status,
                entry.entry_type().as_str(),
                serde_json::to_string(&entry.tags)?,
                scheduled,
                deadline,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Make every change of this transaction visible.
    ///
    /// # Errors
    /// Returns an error when `COMMIT` fails; the transaction is then rolled back.
    pub fn commit(mut self) -> StoreResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }

    /// Discard every change of this transaction.
    ///
    /// # Errors
    /// Returns an error when `ROLLBACK` fails.
    pub fn rollback(mut self) -> StoreResult<()> {
        self.open = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        match self.conn.execute_batch("ROLLBACK") {
            Ok(()) => debug!("Rolled back unfinished journal transaction"),
            Err(err) => warn!(%err, "Failed to roll back journal transaction"),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn stamp(at: OffsetDateTime) -> StoreResult<String> {
    Ok(at.format(&Rfc3339)?)
}

fn parse_stamp(raw: &str) -> StoreResult<OffsetDateTime> {
    Ok(OffsetDateTime::parse(raw, &Rfc3339)?)
}

fn day_key(year: i64, month: i64, day: i64) -> StoreResult<DayKey> {
    DayKey::new(year, month, day).map_err(|err| SqliteStoreError::Corrupt(err.to_string()))
}

fn get_day(conn: &Connection, date: DayKey) -> StoreResult<Option<JournalDay>> {
    let sql = format!(
        "SELECT {DAY_COLUMNS} FROM journal_days WHERE year = ?1 AND month = ?2 AND day = ?3"
    );
    conn.query_row(&sql, params![date.year(), date.month(), date.day()], DayRow::from_row)
        .optional()?
        .map(DayRow::into_day)
        .transpose()
}

struct DayRow {
    year: i64,
    month: i64,
    day: i64,
    size_bytes: i64,
    hash: String,
    tags: String,
    last_checked_at: String,
    created_at: String,
    updated_at: String,
}

impl DayRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            year: row.get("year")?,
            month: row.get("month")?,
            day: row.get("day")?,
            size_bytes: row.get("size_bytes")?,
            hash: row.get("hash")?,
            tags: row.get("tags")?,
            last_checked_at: row.get("last_checked_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_day(self) -> StoreResult<JournalDay> {
        Ok(JournalDay {
            date: day_key(self.year, self.month, self.day)?,
            size_bytes: u64::try_from(self.size_bytes)
                .map_err(|_| SqliteStoreError::Corrupt(format!("negative size {}", self.size_bytes)))?,
            hash: self.hash,
            tags: serde_json::from_str(&self.tags)?,
            last_checked_at: parse_stamp(&self.last_checked_at)?,
            created_at: parse_stamp(&self.created_at)?,
            updated_at: parse_stamp(&self.updated_at)?,
        })
    }
}

struct EntryRow {
    id: i64,
    year: i64,
    month: i64,
    day: i64,
    position: i64,
    title: String,
    raw_line: String,
    hash: String,
    body: Option<String>,
    status: Option<String>,
    entry_type: String,
    tags: String,
    scheduled_at: Option<String>,
    deadline_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl EntryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            year: row.get("year")?,
            month: row.get("month")?,
            day: row.get("day")?,
            position: row.get("position")?,
            title: row.get("title")?,
            raw_line: row.get("raw_line")?,
            hash: row.get("hash")?,
            body: row.get("body")?,
            status: row.get("status")?,
            entry_type: row.get("entry_type")?,
            tags: row.get("tags")?,
            scheduled_at: row.get("scheduled_at")?,
            deadline_at: row.get("deadline_at")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    fn into_entry(self) -> StoreResult<JournalEntry> {
        let kind = match self.entry_type.parse::<EntryType>() {
            Ok(EntryType::Task) => {
                let raw = self.status.unwrap_or_default();
                let status = StatusToken::from_keyword(&raw)
                    .ok_or_else(|| SqliteStoreError::Corrupt(format!("unknown status {raw:?}")))?;
                EntryKind::Task(TaskFields {
                    status,
                    scheduled_at: self.scheduled_at,
                    deadline_at: self.deadline_at,
                })
            }
            Ok(EntryType::Misc) => EntryKind::Note,
            Err(err) => return Err(SqliteStoreError::Corrupt(err.to_string())),
        };
        let hash = self
            .hash
            .parse::<BlockHash>()
            .map_err(|_| SqliteStoreError::Corrupt(format!("entry hash {:?}", self.hash)))?;
        Ok(JournalEntry {
            id: self.id,
            date: day_key(self.year, self.month, self.day)?,
            position: u32::try_from(self.position)
                .map_err(|_| SqliteStoreError::Corrupt(format!("position {}", self.position)))?,
            entry: Entry {
                title: self.title,
                raw_line: self.raw_line,
                hash,
                body: self.body.unwrap_or_default(),
                tags: serde_json::from_str(&self.tags)?,
                kind,
            },
            created_at: parse_stamp(&self.created_at)?,
            updated_at: parse_stamp(&self.updated_at)?,
        })
    }
}
