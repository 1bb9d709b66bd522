//! `daybook.toml` loading and validation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use serde::Deserialize;

use crate::settings::{JOURNALS_FOLDER_KEY, StaticSettings};

const CONFIG_DIR: &str = "daybook";
const CONFIG_FILE: &str = "daybook.toml";
const DATABASE_FILE: &str = "daybook.db";

/// Top-level configuration loaded from `daybook.toml`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DaybookConfig {
    /// Index settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Journal folder settings.
    #[serde(default)]
    pub journal: JournalConfig,
}

/// `[storage]` block.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite index location.
    #[serde(default)]
    pub database: Option<PathBuf>,
}

/// `[journal]` block.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct JournalConfig {
    /// Journal folder; overrides the value stored in the index.
    #[serde(default)]
    pub folder: Option<String>,
}

impl DaybookConfig {
    /// Default location, e.g. `~/.config/daybook/daybook.toml`.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load the file at `path`; a missing file yields the defaults.
    ///
    /// # Errors
    /// Returns an error when the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.journal.folder.as_deref().is_some_and(|folder| folder.trim().is_empty()) {
            bail!("journal.folder must not be blank");
        }
        if self
            .storage
            .database
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            bail!("storage.database must not be empty");
        }
        Ok(())
    }

    /// Database path from the file, else the platform data directory.
    ///
    /// # Errors
    /// Returns an error when neither is available.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.storage.database {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(CONFIG_DIR).join(DATABASE_FILE))
            .context("no data directory available; set storage.database")
    }

    /// Settings overrides carried by the file.
    #[must_use]
    pub fn overrides(&self) -> StaticSettings {
        self.journal
            .folder
            .iter()
            .fold(StaticSettings::new(), |settings, folder| {
                settings.with(JOURNALS_FOLDER_KEY, folder.clone())
            })
    }
}
