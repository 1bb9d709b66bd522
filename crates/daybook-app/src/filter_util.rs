//! Build typed filters from user-facing strings.

use std::collections::BTreeSet;

use daybook_core::{
    DatePattern, DayFilter, EntryFilter, EntryType, StatusToken, UnknownEntryType, UnknownStatus,
    expand_status_filter,
};
use thiserror::Error;

/// Error type returned while constructing filters from user-facing inputs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilterBuildError {
    /// A date component is not a number in range.
    #[error("invalid {field}: {value}")]
    InvalidDatePart {
        /// `year`, `month` or `day`.
        field: &'static str,
        /// Offending input.
        value: String,
    },
    /// Status outside the vocabulary.
    #[error(transparent)]
    Status(#[from] UnknownStatus),
    /// Type other than task, note or misc.
    #[error(transparent)]
    EntryType(#[from] UnknownEntryType),
}

/// Result alias for filter construction helpers.
pub type FilterBuildResult<T> = Result<T, FilterBuildError>;

/// Builder that accepts user-facing strings and normalizes them into an [`EntryFilter`].
#[derive(Debug, Clone, Default)]
pub struct EntryFilterBuilder {
    year: Option<u16>,
    month: Option<u8>,
    day: Option<u8>,
    entry_type: Option<EntryType>,
    statuses: BTreeSet<StatusToken>,
    tags: BTreeSet<String>,
}

impl EntryFilterBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the date components; blank inputs are ignored.
    ///
    /// # Errors
    /// Returns an error when a component is not a number in its calendar range.
    pub fn with_date(
        mut self,
        year: Option<&str>,
        month: Option<&str>,
        day: Option<&str>,
    ) -> FilterBuildResult<Self> {
        self.year = parse_part("year", year, 1, 9999)?;
        self.month = parse_part("month", month, 1, 12)?;
        self.day = parse_part("day", day, 1, 31)?;
        Ok(self)
    }

    /// Restrict to one entry type (`task`, `note` or `misc`).
    ///
    /// # Errors
    /// Returns an error for any other value.
    pub fn with_type(mut self, raw: Option<&str>) -> FilterBuildResult<Self> {
        self.entry_type = match raw.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => Some(value.parse()?),
            None => None,
        };
        Ok(self)
    }

    /// Extend the status filter; categories expand to their raw tokens.
    ///
    /// # Errors
    /// Returns an error for a status outside the vocabulary.
    pub fn with_statuses(mut self, values: &[String]) -> FilterBuildResult<Self> {
        for raw in split_list(values) {
            self.statuses.extend(expand_status_filter(&raw)?);
        }
        Ok(self)
    }

    /// Extend the tag filter (logical OR, compared verbatim).
    #[must_use]
    pub fn with_tags(mut self, values: &[String]) -> Self {
        self.tags.extend(split_list(values));
        self
    }

    /// Build the final [`EntryFilter`].
    #[must_use]
    pub fn build(self) -> EntryFilter {
        EntryFilter {
            date: DatePattern::new(self.year, self.month, self.day),
            entry_type: self.entry_type,
            statuses: self.statuses,
            tags: self.tags,
        }
    }

    /// Day filter sharing this builder's date components.
    #[must_use]
    pub fn day_filter(&self, tag: Option<&str>) -> DayFilter {
        DayFilter {
            year: self.year,
            month: self.month,
            day: self.day,
            tag: tag
                .map(|tag| tag.trim().to_lowercase())
                .filter(|tag| !tag.is_empty()),
        }
    }
}

/// Flatten repeated and comma-separated values, dropping blanks.
#[must_use]
pub fn split_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect()
}

fn parse_part<T>(field: &'static str, raw: Option<&str>, min: T, max: T) -> FilterBuildResult<Option<T>>
where
    T: std::str::FromStr + PartialOrd,
{
    let Some(trimmed) = raw.map(str::trim).filter(|value| !value.is_empty()) else {
        return Ok(None);
    };
    match trimmed.parse::<T>() {
        Ok(value) if value >= min && value <= max => Ok(Some(value)),
        _ => Err(FilterBuildError::InvalidDatePart {
            field,
            value: trimmed.to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn statuses_accept_lists_and_expand_categories() -> FilterBuildResult<()> {
        let filter = EntryFilterBuilder::new()
            .with_statuses(&strings(&["todo, done", " ", "waiting"]))?
            .build();
        let expected: BTreeSet<_> = [
            StatusToken::Later,
            StatusToken::Now,
            StatusToken::Todo,
            StatusToken::Done,
            StatusToken::Waiting,
        ]
        .into_iter()
        .collect();
        assert_eq!(filter.statuses, expected);
        Ok(())
    }

    #[test]
    fn unknown_status_or_type_is_rejected() {
        let status = EntryFilterBuilder::new().with_statuses(&strings(&["BLOCKED"]));
        assert!(matches!(status, Err(FilterBuildError::Status(_))));
        let kind = EntryFilterBuilder::new().with_type(Some("event"));
        assert!(matches!(kind, Err(FilterBuildError::EntryType(_))));
    }

    #[test]
    fn note_is_an_alias_for_misc() -> FilterBuildResult<()> {
        let filter = EntryFilterBuilder::new().with_type(Some(" note "))?.build();
        assert_eq!(filter.entry_type, Some(EntryType::Misc));
        Ok(())
    }

    #[test]
    fn date_parts_are_validated() -> FilterBuildResult<()> {
        let filter = EntryFilterBuilder::new()
            .with_date(Some("2025"), None, Some("9"))?
            .build();
        assert_eq!(filter.date.map(|d| d.like_pattern()).as_deref(), Some("2025-%-09%"));
        assert!(EntryFilterBuilder::new().build().date.is_none());

        let bad = EntryFilterBuilder::new().with_date(None, Some("13"), None);
        assert_eq!(
            bad.err(),
            Some(FilterBuildError::InvalidDatePart {
                field: "month",
                value: "13".into()
            })
        );
        Ok(())
    }

    #[test]
    fn tags_keep_their_case() {
        let filter = EntryFilterBuilder::new()
            .with_tags(&strings(&["Work,home", "home"]))
            .build();
        assert_eq!(filter.tags, ["Work".to_owned(), "home".to_owned()].into_iter().collect());
        let days = EntryFilterBuilder::new().day_filter(Some(" Work "));
        assert_eq!(days.tag.as_deref(), Some("work"));
    }
}
