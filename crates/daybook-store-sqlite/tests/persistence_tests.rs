#![allow(clippy::expect_used, clippy::unwrap_used)]

use anyhow::Result;
use daybook_core::{DayKey, EntryFilter, FileIdentity, parse_entries};
use daybook_store_sqlite::SqliteStore;
use tempfile::TempDir;
use time::OffsetDateTime;

#[test]
fn index_survives_reopen() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("nested").join("daybook.db");
    let date: DayKey = "2025-01-01".parse()?;
    let text = "- TODO [[work]] Ship release\n- [[home]] Buy milk\n";

    {
        let store = SqliteStore::open(&path)?;
        let tx = store.begin()?;
        tx.upsert_day(
            date,
            &FileIdentity::of(text.as_bytes()),
            &["home".to_owned(), "work".to_owned()],
            OffsetDateTime::now_utc(),
        )?;
        for (position, entry) in (0u32..).zip(parse_entries(text)) {
            tx.insert_entry(date, position, &entry, OffsetDateTime::now_utc())?;
        }
        tx.commit()?;
        store.set_setting("journals_folder", "/srv/journals")?;
    }

    let reopened = SqliteStore::open(&path)?;
    let day = reopened.get_day(date)?.expect("day row persisted");
    assert_eq!(day.hash, FileIdentity::of(text.as_bytes()).sha256);
    assert_eq!(reopened.query_entries(&EntryFilter::default())?.len(), 2);
    assert_eq!(
        reopened.setting("journals_folder")?.as_deref(),
        Some("/srv/journals")
    );
    Ok(())
}

#[test]
fn uncommitted_changes_are_not_persisted() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("daybook.db");
    let date: DayKey = "2025-02-02".parse()?;

    {
        let store = SqliteStore::open(&path)?;
        let tx = store.begin()?;
        tx.upsert_day(date, &FileIdentity::of(b"- x\n"), &[], OffsetDateTime::now_utc())?;
    }

    let reopened = SqliteStore::open(&path)?;
    assert!(reopened.get_day(date)?.is_none());
    Ok(())
}
