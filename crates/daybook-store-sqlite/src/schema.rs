//! Table definitions applied when a store is opened.

use rusqlite::Connection;

use crate::error::StoreResult;

const SCHEMA_VERSION: i64 = 1;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS journal_days (
    year            INTEGER NOT NULL,
    month           INTEGER NOT NULL,
    day             INTEGER NOT NULL,
    size_bytes      INTEGER NOT NULL,
    hash            TEXT    NOT NULL,
    tags            TEXT    NOT NULL DEFAULT '[]',
    last_checked_at TEXT    NOT NULL,
    created_at      TEXT    NOT NULL,
    updated_at      TEXT    NOT NULL,
    PRIMARY KEY (year, month, day)
);

CREATE TABLE IF NOT EXISTS journal_entries (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    year         INTEGER NOT NULL,
    month        INTEGER NOT NULL,
    day          INTEGER NOT NULL,
    position     INTEGER NOT NULL,
    title        TEXT    NOT NULL,
    raw_line     TEXT    NOT NULL,
    hash         TEXT    NOT NULL,
    body         TEXT,
    status       TEXT,
    entry_type   TEXT    NOT NULL,
    tags         TEXT    NOT NULL DEFAULT '[]',
    scheduled_at TEXT,
    deadline_at  TEXT,
    created_at   TEXT    NOT NULL,
    updated_at   TEXT    NOT NULL,
    FOREIGN KEY (year, month, day)
        REFERENCES journal_days (year, month, day) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_journal_entries_day
    ON journal_entries (year, month, day, position);
CREATE INDEX IF NOT EXISTS idx_journal_entries_hash
    ON journal_entries (year, month, day, hash);

CREATE TABLE IF NOT EXISTS settings (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Create tables on a fresh database; no-op once `user_version` is current.
pub(crate) fn migrate(conn: &Connection) -> StoreResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }
    conn.execute_batch(SCHEMA)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
