//! Command dispatch and output rendering.

use anyhow::{Context, Result, bail};
use daybook_app::{EntryFilterBuilder, JournalError, JournalService, JournalStore, SettingsLookup};
use daybook_core::{
    Address, BlockHash, DayKey, DraftEntry, JournalDay, JournalEntry, StatusCategory, StatusToken,
};
use serde::Serialize;

use crate::{Command, OutputFormat};

#[allow(clippy::too_many_lines)]
pub fn run<S: JournalStore, L: SettingsLookup>(command: Command, service: &JournalService<S, L>) -> Result<()> {
    match command {
        Command::Sync => {
            let report = service.sync_all()?;
            println!(
                "synced {} day(s): {} reindexed, {} unchanged",
                report.scanned, report.reindexed, report.unchanged
            );
            Ok(())
        }
        Command::Ls {
            year,
            month,
            day,
            entry_type,
            statuses,
            tags,
            format,
        } => {
            let filter = EntryFilterBuilder::new()
                .with_date(year.as_deref(), month.as_deref(), day.as_deref())?
                .with_type(entry_type.as_deref())?
                .with_statuses(&statuses)?
                .with_tags(&tags)
                .build();
            print_entries(&service.list_entries(&filter)?, format)
        }
        Command::New {
            description,
            tags,
            body,
            status,
            deadline,
            scheduled,
        } => {
            let draft = DraftEntry {
                description,
                tags: daybook_app::split_list(&tags),
                body,
                status: parse_status(status.as_deref())?,
                deadline,
                scheduled,
            };
            println!("appended to {}", service.create_entry(&draft)?);
            Ok(())
        }
        Command::Edit {
            date,
            position,
            hash,
            text,
        } => {
            let date = parse_date(&date)?;
            let entry = match parse_address(position, hash.as_deref())? {
                Address::Position(position) => service.update_entry_by_position(date, position, &text)?,
                Address::Hash(hash) => service.update_entry_by_hash(date, hash, &text)?,
            };
            print_json(&EntryRow::from(&entry))
        }
        Command::Status {
            date,
            position,
            status,
        } => {
            let entry = service.update_entry_status(parse_date(&date)?, position, &status)?;
            print_json(&EntryRow::from(&entry))
        }
        Command::Rm { date, position, hash } => {
            let date = parse_date(&date)?;
            let address = parse_address(position, hash.as_deref())?;
            match address {
                Address::Position(position) => service.delete_entry_by_position(date, position)?,
                Address::Hash(hash) => service.delete_entry_by_hash(date, hash)?,
            }
            println!("deleted {address} from {date}");
            Ok(())
        }
        Command::Day { date, entries } => {
            let date = parse_date(&date)?;
            if entries {
                return print_entries(&service.day_view(date)?, OutputFormat::Table);
            }
            print!("{}", service.get_day(date)?);
            Ok(())
        }
        Command::Days {
            year,
            month,
            day,
            tag,
            format,
        } => {
            let filter = EntryFilterBuilder::new()
                .with_date(year.as_deref(), month.as_deref(), day.as_deref())?
                .day_filter(tag.as_deref());
            print_days(&service.list_days(&filter)?, format)
        }
        Command::Month { year, month, refresh } => {
            print_days(&service.list_month(year, month, refresh)?, OutputFormat::Table)
        }
        Command::Tags { prefix } => {
            for tag in service.list_tags(prefix.as_deref())? {
                println!("{tag}");
            }
            Ok(())
        }
        Command::Graph { tag: Some(tag) } => print_json(&service.tag_graph_for(&tag)?),
        Command::Graph { tag: None } => print_json(&service.tag_graph()?),
        Command::SetFolder { .. } => bail!("set-folder runs before the journal service starts"),
    }
}

fn parse_date(raw: &str) -> Result<DayKey> {
    raw.parse()
        .with_context(|| format!("invalid date {raw:?}; expected YYYY-MM-DD"))
}

/// `None` means a note; a flag that is present must name a status.
fn parse_status(raw: Option<&str>) -> Result<Option<StatusToken>> {
    let Some(raw) = raw.map(str::trim) else {
        return Ok(None);
    };
    if raw.is_empty() {
        return Err(JournalError::MalformedRequest("status required".to_owned()).into());
    }
    Ok(Some(raw.parse()?))
}

fn parse_address(position: Option<u32>, hash: Option<&str>) -> Result<Address> {
    match (position, hash) {
        (Some(position), None) => Ok(Address::Position(position)),
        (None, Some(hash)) => {
            let hash: BlockHash = hash
                .parse()
                .with_context(|| format!("invalid entry hash {hash:?}"))?;
            Ok(Address::Hash(hash))
        }
        _ => bail!("pass exactly one of --position or --hash"),
    }
}

/// Entry as printed: the stored row plus its status bucket.
#[derive(Serialize)]
struct EntryRow<'a> {
    #[serde(flatten)]
    entry: &'a JournalEntry,
    status_category: Option<StatusCategory>,
}

impl<'a> From<&'a JournalEntry> for EntryRow<'a> {
    fn from(entry: &'a JournalEntry) -> Self {
        Self {
            entry,
            status_category: entry.entry.status_category(),
        }
    }
}

impl EntryRow<'_> {
    fn table_line(&self) -> String {
        let row = self.entry;
        format!(
            "{} | {} | {} | {} | {} | {} | {}",
            row.date,
            row.position,
            row.entry.status().map_or("-", StatusToken::as_str),
            self.status_category.map_or("-", StatusCategory::as_str),
            row.entry.title,
            row.entry.tags.join(","),
            row.entry.hash
        )
    }
}

fn render_entry_table(entries: &[JournalEntry]) {
    if entries.is_empty() {
        println!("No entries found");
        return;
    }
    println!("Date | Pos | Status | Category | Title | Tags | Hash");
    println!("---- | --- | ------ | -------- | ----- | ---- | ----");
    for row in entries {
        println!("{}", EntryRow::from(row).table_line());
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_entries(entries: &[JournalEntry], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&entries.iter().map(EntryRow::from).collect::<Vec<_>>()),
        OutputFormat::Table => {
            render_entry_table(entries);
            Ok(())
        }
    }
}

fn print_days(days: &[JournalDay], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(&days),
        OutputFormat::Table => {
            render_day_table(days);
            Ok(())
        }
    }
}

fn render_day_table(days: &[JournalDay]) {
    if days.is_empty() {
        println!("No days found");
        return;
    }
    println!("Date | Size | Tags | Last checked");
    println!("---- | ---- | ---- | ------------");
    for day in days {
        println!(
            "{} | {} | {} | {}",
            day.date,
            day.size_bytes,
            day.tags.join(","),
            day.last_checked_at
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_requires_exactly_one_key() -> Result<()> {
        assert_eq!(parse_address(Some(3), None)?, Address::Position(3));
        assert_eq!(parse_address(None, Some("ff"))?, Address::Hash(BlockHash(0xff)));
        assert!(parse_address(None, None).is_err());
        assert!(parse_address(Some(1), Some("ff")).is_err());
        assert!(parse_address(None, Some("not-hex")).is_err());
        Ok(())
    }

    #[test]
    fn status_is_optional_and_case_insensitive() -> Result<()> {
        assert_eq!(parse_status(None)?, None);
        assert_eq!(parse_status(Some("done"))?, Some(StatusToken::Done));
        assert!(parse_status(Some("someday")).is_err());
        Ok(())
    }

    #[test]
    fn present_but_blank_status_is_rejected() {
        let err = parse_status(Some("  ")).err().map(|e| e.to_string());
        assert_eq!(err.as_deref(), Some("status required"));
    }

    fn indexed(text: &str) -> JournalEntry {
        let entry = daybook_core::parse_entries(text)
            .into_iter()
            .next()
            .unwrap_or_else(|| panic!("no entry in {text:?}"));
        JournalEntry {
            id: 1,
            date: DayKey::new(2025, 1, 3).unwrap_or_else(|e| panic!("{e}")),
            position: 0,
            entry,
            created_at: time::OffsetDateTime::UNIX_EPOCH,
            updated_at: time::OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn rows_carry_the_status_category() -> Result<()> {
        let waiting = indexed("- WAITING [[ops]] review\n");
        let row = EntryRow::from(&waiting);
        assert_eq!(
            row.table_line(),
            format!("2025-01-03 | 0 | WAITING | IN-PROGRESS | review | ops | {}", waiting.entry.hash)
        );
        let json = serde_json::to_value(&row)?;
        assert_eq!(json["status"], "WAITING");
        assert_eq!(json["status_category"], "IN-PROGRESS");

        let note = indexed("- plain\n");
        let json = serde_json::to_value(EntryRow::from(&note))?;
        assert!(json["status_category"].is_null());
        assert!(EntryRow::from(&note).table_line().contains("| - | - |"));
        Ok(())
    }

    #[test]
    fn dates_use_dashes() {
        assert!(parse_date("2025-01-09").is_ok());
        assert!(parse_date("2025_01_09").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }
}
