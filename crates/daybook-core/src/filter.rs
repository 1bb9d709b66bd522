//! Typed listing filters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::date::DayKey;
use crate::entry::{EntryType, JournalDay, JournalEntry};
use crate::status::StatusToken;

/// Date with optional components; absent components match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePattern {
    /// Calendar year.
    pub year: Option<u16>,
    /// Calendar month (1-based).
    pub month: Option<u8>,
    /// Day of month (1-based).
    pub day: Option<u8>,
}

impl DatePattern {
    /// `None` when every component is absent.
    #[must_use]
    pub const fn new(year: Option<u16>, month: Option<u8>, day: Option<u8>) -> Option<Self> {
        if year.is_none() && month.is_none() && day.is_none() {
            None
        } else {
            Some(Self { year, month, day })
        }
    }

    /// SQL `LIKE` pattern over `YYYY-MM-DD`, e.g. `2025-%-09%`.
    #[must_use]
    pub fn like_pattern(&self) -> String {
        let year = self.year.map_or_else(|| "%".to_owned(), |y| format!("{y:04}"));
        let month = self.month.map_or_else(|| "%".to_owned(), |m| format!("{m:02}"));
        let day = self.day.map_or_else(|| "%".to_owned(), |d| format!("{d:02}"));
        let mut pattern = format!("{year}-{month}-{day}");
        if !pattern.ends_with('%') {
            pattern.push('%');
        }
        pattern
    }

    /// Whether `date` agrees with every present component.
    #[must_use]
    pub fn matches(&self, date: DayKey) -> bool {
        self.year.is_none_or(|y| y == date.year())
            && self.month.is_none_or(|m| m == date.month())
            && self.day.is_none_or(|d| d == date.day())
    }
}

/// Entry listing filter: OR within a field, AND across fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryFilter {
    /// Date components.
    pub date: Option<DatePattern>,
    /// Task or misc.
    pub entry_type: Option<EntryType>,
    /// Raw status tokens (already expanded from categories).
    pub statuses: BTreeSet<StatusToken>,
    /// Tags compared verbatim against the lower-cased stored tags.
    pub tags: BTreeSet<String>,
}

impl EntryFilter {
    /// Evaluate the filter against a stored entry.
    #[must_use]
    pub fn matches(&self, row: &JournalEntry) -> bool {
        if let Some(date) = &self.date
            && !date.matches(row.date)
        {
            return false;
        }
        if let Some(kind) = self.entry_type
            && row.entry.entry_type() != kind
        {
            return false;
        }
        if !self.statuses.is_empty()
            && !row.entry.status().is_some_and(|status| self.statuses.contains(&status))
        {
            return false;
        }
        if !self.tags.is_empty() && !row.entry.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        true
    }
}

/// Day listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayFilter {
    /// Calendar year.
    pub year: Option<u16>,
    /// Calendar month (1-based).
    pub month: Option<u8>,
    /// Day of month (1-based).
    pub day: Option<u8>,
    /// Lower-cased tag the day must carry.
    pub tag: Option<String>,
}

impl DayFilter {
    /// Evaluate the filter against a stored day.
    #[must_use]
    pub fn matches(&self, row: &JournalDay) -> bool {
        let pattern = DatePattern {
            year: self.year,
            month: self.month,
            day: self.day,
        };
        pattern.matches(row.date) && self.tag.as_ref().is_none_or(|tag| row.tags.contains(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Entry, EntryKind, TaskFields};
    use crate::identity::BlockHash;
    use time::OffsetDateTime;

    fn row(date: &str, status: Option<StatusToken>, tags: &[&str]) -> JournalEntry {
        let kind = status.map_or(EntryKind::Note, |status| {
            EntryKind::Task(TaskFields {
                status,
                scheduled_at: None,
                deadline_at: None,
            })
        });
        JournalEntry {
            id: 1,
            date: date.parse().unwrap_or_else(|err| panic!("date: {err}")),
            position: 0,
            entry: Entry {
                title: "t".into(),
                raw_line: "- t".into(),
                hash: BlockHash::of("- t"),
                body: "t".into(),
                tags: tags.iter().map(|t| (*t).to_owned()).collect(),
                kind,
            },
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn like_pattern_wildcards_missing_components() {
        let full = DatePattern::new(Some(2025), Some(1), Some(9)).unwrap_or_default();
        assert_eq!(full.like_pattern(), "2025-01-09%");
        let no_month = DatePattern::new(Some(2025), None, Some(9)).unwrap_or_default();
        assert_eq!(no_month.like_pattern(), "2025-%-09%");
        let year_only = DatePattern::new(Some(2025), None, None).unwrap_or_default();
        assert_eq!(year_only.like_pattern(), "2025-%-%");
        assert_eq!(DatePattern::new(None, None, None), None);
    }

    #[test]
    fn status_filter_excludes_notes() {
        let filter = EntryFilter {
            statuses: BTreeSet::from([StatusToken::Todo, StatusToken::Now, StatusToken::Later]),
            ..EntryFilter::default()
        };
        assert!(filter.matches(&row("2025-01-01", Some(StatusToken::Now), &[])));
        assert!(!filter.matches(&row("2025-01-01", Some(StatusToken::Doing), &[])));
        assert!(!filter.matches(&row("2025-01-01", None, &[])));
    }

    #[test]
    fn fields_combine_with_and_values_with_or() {
        let filter = EntryFilter {
            date: DatePattern::new(None, Some(1), None),
            entry_type: Some(EntryType::Misc),
            tags: BTreeSet::from(["home".to_owned(), "gym".to_owned()]),
            ..EntryFilter::default()
        };
        assert!(filter.matches(&row("2025-01-03", None, &["gym"])));
        assert!(!filter.matches(&row("2025-02-03", None, &["gym"])));
        assert!(!filter.matches(&row("2025-01-03", None, &["work"])));
        assert!(!filter.matches(&row("2025-01-03", Some(StatusToken::Done), &["gym"])));
    }

    #[test]
    fn tag_filter_is_case_sensitive() {
        let filter = EntryFilter {
            tags: BTreeSet::from(["Home".to_owned()]),
            ..EntryFilter::default()
        };
        assert!(!filter.matches(&row("2025-01-03", None, &["home"])));
    }
}
