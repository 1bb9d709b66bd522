//! Calendar keys that name journal files.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr, sync::LazyLock};
use thiserror::Error;

#[allow(clippy::expect_used)]
static FILE_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})_(\d{2})_(\d{2})\.md$").expect("valid file name pattern"));

/// Calendar date that names one journal file (`YYYY_MM_DD.md`).
///
/// Components are range-checked (year `0..=9999`, month `1..=12`, day `1..=31`)
/// but not validated against the calendar, matching how journal folders are
/// addressed by name.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct DayKey {
    year: u16,
    month: u8,
    day: u8,
}

/// Rejected date components.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DayKeyError {
    /// Year outside `0..=9999`.
    #[error("invalid year: {0}")]
    Year(i64),
    /// Month outside `1..=12`.
    #[error("invalid month: {0}")]
    Month(i64),
    /// Day outside `1..=31`.
    #[error("invalid day: {0}")]
    Day(i64),
    /// Text did not look like `YYYY-MM-DD`.
    #[error("invalid date: {0}")]
    Format(String),
}

impl DayKey {
    /// Build a key from raw components.
    ///
    /// # Errors
    /// Returns [`DayKeyError`] naming the first out-of-range component.
    pub fn new(year: i64, month: i64, day: i64) -> Result<Self, DayKeyError> {
        let year = u16::try_from(year)
            .ok()
            .filter(|y| *y <= 9999)
            .ok_or(DayKeyError::Year(year))?;
        let month = u8::try_from(month)
            .ok()
            .filter(|m| (1..=12).contains(m))
            .ok_or(DayKeyError::Month(month))?;
        let day = u8::try_from(day)
            .ok()
            .filter(|d| (1..=31).contains(d))
            .ok_or(DayKeyError::Day(day))?;
        Ok(Self { year, month, day })
    }

    /// Key for a [`time::Date`].
    #[must_use]
    pub fn from_date(date: time::Date) -> Self {
        Self {
            year: u16::try_from(date.year().clamp(0, 9999)).unwrap_or_default(),
            month: u8::from(date.month()),
            day: date.day(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(self) -> u16 {
        self.year
    }

    /// Calendar month (1-based).
    #[must_use]
    pub const fn month(self) -> u8 {
        self.month
    }

    /// Day of month (1-based).
    #[must_use]
    pub const fn day(self) -> u8 {
        self.day
    }

    /// Canonical journal file name, e.g. `2025_01_09.md`.
    #[must_use]
    pub fn file_name(self) -> String {
        format!("{:04}_{:02}_{:02}.md", self.year, self.month, self.day)
    }

    /// Parse a canonical journal file name. Anything else yields `None`.
    #[must_use]
    pub fn from_file_name(name: &str) -> Option<Self> {
        let caps = FILE_NAME_PATTERN.captures(name)?;
        let part = |index: usize| caps.get(index)?.as_str().parse::<i64>().ok();
        Self::new(part(1)?, part(2)?, part(3)?).ok()
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for DayKey {
    type Err = DayKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let mut parts = trimmed.splitn(3, '-');
        let mut next = || -> Result<i64, DayKeyError> {
            parts
                .next()
                .and_then(|part| part.parse().ok())
                .ok_or_else(|| DayKeyError::Format(trimmed.to_owned()))
        };
        let (year, month, day) = (next()?, next()?, next()?);
        Self::new(year, month, day)
    }
}

impl Serialize for DayKey {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DayKey {
    fn deserialize<D>(d: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_roundtrip() {
        let key = DayKey::new(2025, 1, 9).unwrap_or_else(|err| panic!("valid key: {err}"));
        assert_eq!(key.file_name(), "2025_01_09.md");
        assert_eq!(DayKey::from_file_name("2025_01_09.md"), Some(key));
    }

    #[test]
    fn foreign_file_names_are_ignored() {
        assert_eq!(DayKey::from_file_name("notes.md"), None);
        assert_eq!(DayKey::from_file_name("2025-01-09.md"), None);
        assert_eq!(DayKey::from_file_name("2025_13_09.md"), None);
        assert_eq!(DayKey::from_file_name("2025_01_09.md.bak"), None);
        assert_eq!(DayKey::from_file_name("2025_1_09.md"), None);
        assert_eq!(DayKey::from_file_name("x2025_01_09.md"), None);
    }

    #[test]
    fn components_are_range_checked() {
        assert_eq!(DayKey::new(-1, 1, 1), Err(DayKeyError::Year(-1)));
        assert_eq!(DayKey::new(2025, 0, 1), Err(DayKeyError::Month(0)));
        assert_eq!(DayKey::new(2025, 2, 32), Err(DayKeyError::Day(32)));
    }

    #[test]
    fn display_and_parse_use_iso_dates() -> Result<(), DayKeyError> {
        let key: DayKey = "2024-12-31".parse()?;
        assert_eq!(key.to_string(), "2024-12-31");
        assert!("2024/12/31".parse::<DayKey>().is_err());
        Ok(())
    }
}
