//! Settings lookup and journal folder resolution.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Error;
use daybook_store_sqlite::{SqliteStore, SqliteStoreError};

use crate::error::{JournalError, JournalResult};

/// Settings key holding the journal folder path.
pub const JOURNALS_FOLDER_KEY: &str = "journals_folder";

/// Key/value settings source.
pub trait SettingsLookup {
    /// Error type bubbled up from the backing source.
    type Error: Into<Error>;

    /// Value stored under `key`, if any.
    ///
    /// # Errors
    /// Returns a source-specific error when the lookup fails.
    fn lookup(&self, key: &str) -> Result<Option<String>, Self::Error>;
}

impl<L: SettingsLookup + ?Sized> SettingsLookup for Arc<L> {
    type Error = L::Error;

    fn lookup(&self, key: &str) -> Result<Option<String>, Self::Error> {
        (**self).lookup(key)
    }
}

impl SettingsLookup for SqliteStore {
    type Error = SqliteStoreError;

    fn lookup(&self, key: &str) -> Result<Option<String>, Self::Error> {
        self.setting(key)
    }
}

/// Fixed in-memory settings.
#[derive(Debug, Clone, Default)]
pub struct StaticSettings {
    values: BTreeMap<String, String>,
}

impl StaticSettings {
    /// Empty settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace one value.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Settings that only name a journal folder.
    #[must_use]
    pub fn journals_folder(folder: impl AsRef<Path>) -> Self {
        Self::new().with(JOURNALS_FOLDER_KEY, folder.as_ref().display().to_string())
    }
}

impl SettingsLookup for StaticSettings {
    type Error = Infallible;

    fn lookup(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.values.get(key).cloned())
    }
}

/// Overrides consulted before falling back to another source.
#[derive(Debug, Clone)]
pub struct SettingsOverlay<L> {
    overrides: StaticSettings,
    fallback: L,
}

impl<L> SettingsOverlay<L> {
    /// Layer `overrides` on top of `fallback`.
    pub const fn new(overrides: StaticSettings, fallback: L) -> Self {
        Self { overrides, fallback }
    }
}

impl<L: SettingsLookup> SettingsLookup for SettingsOverlay<L> {
    type Error = L::Error;

    fn lookup(&self, key: &str) -> Result<Option<String>, Self::Error> {
        if let Some(value) = self.overrides.values.get(key) {
            return Ok(Some(value.clone()));
        }
        self.fallback.lookup(key)
    }
}

/// Resolve the configured journal folder.
///
/// A missing or blank setting, a path that does not exist, and a path that is
/// not a directory are all reported as [`JournalError::FolderNotConfigured`].
///
/// # Errors
/// Also fails when the lookup itself fails or the path cannot be inspected.
pub fn journals_folder<L: SettingsLookup>(settings: &L) -> JournalResult<PathBuf> {
    let raw = settings
        .lookup(JOURNALS_FOLDER_KEY)
        .map_err(JournalError::store)?
        .unwrap_or_default();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(JournalError::FolderNotConfigured);
    }
    let path = expand_home(trimmed);
    match std::fs::metadata(&path) {
        Ok(meta) if meta.is_dir() => Ok(path),
        Ok(_) => Err(JournalError::FolderNotConfigured),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(JournalError::FolderNotConfigured),
        Err(err) => Err(err.into()),
    }
}

/// Expand a leading `~` to the home directory.
#[must_use]
pub fn expand_home(raw: &str) -> PathBuf {
    let rest = match raw.strip_prefix('~') {
        Some("") => "",
        Some(rest) if rest.starts_with('/') || rest.starts_with(std::path::MAIN_SEPARATOR) => &rest[1..],
        _ => return PathBuf::from(raw),
    };
    dirs::home_dir().map_or_else(|| PathBuf::from(raw), |home| home.join(rest))
}
