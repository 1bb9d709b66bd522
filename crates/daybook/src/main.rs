//! CLI entry point for daybook.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use daybook_app::{
    DaybookConfig, JOURNALS_FOLDER_KEY, JournalService, SettingsOverlay, journal_lock,
};
use daybook_store_sqlite::SqliteStore;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod commands;

/// Outline-style daily journals with a queryable index.
#[derive(Parser, Debug)]
#[command(
    name = "daybook",
    version,
    about = "daybook: YYYY_MM_DD.md journal files mirrored into a SQLite index"
)]
struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite index path; overrides the configuration file.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Journal folder; overrides the configuration file and the index.
    #[arg(long)]
    journals: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

/// Listing output format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync every journal file into the index.
    Sync,

    /// List entries.
    Ls {
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        day: Option<String>,
        /// task, note or misc.
        #[arg(long = "type")]
        entry_type: Option<String>,
        /// Status or category; repeat or comma-separate.
        #[arg(short = 's', long = "status")]
        statuses: Vec<String>,
        /// Tag; repeat or comma-separate.
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// Append an entry to today's journal.
    New {
        #[arg(long)]
        description: String,
        #[arg(short = 't', long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        body: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        deadline: Option<String>,
        #[arg(long)]
        scheduled: Option<String>,
    },

    /// Replace an entry's raw text.
    Edit {
        /// Day as YYYY-MM-DD.
        date: String,
        #[arg(long, conflicts_with = "hash", required_unless_present = "hash")]
        position: Option<u32>,
        #[arg(long)]
        hash: Option<String>,
        /// Replacement block text.
        #[arg(long)]
        text: String,
    },

    /// Change the status of a task.
    Status {
        /// Day as YYYY-MM-DD.
        date: String,
        #[arg(long)]
        position: u32,
        status: String,
    },

    /// Delete an entry.
    Rm {
        /// Day as YYYY-MM-DD.
        date: String,
        #[arg(long, conflicts_with = "hash", required_unless_present = "hash")]
        position: Option<u32>,
        #[arg(long)]
        hash: Option<String>,
    },

    /// Print a day's raw text.
    Day {
        /// Day as YYYY-MM-DD.
        date: String,
        /// Show the indexed entries instead of the raw file.
        #[arg(long)]
        entries: bool,
    },

    /// List synced days.
    Days {
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        month: Option<String>,
        #[arg(long)]
        day: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        #[arg(long, value_enum, default_value_t)]
        format: OutputFormat,
    },

    /// List the days of one month.
    Month {
        year: u16,
        month: u8,
        /// Rebuild the month from disk first.
        #[arg(long)]
        refresh: bool,
    },

    /// List known tags.
    Tags {
        /// Case-insensitive prefix.
        prefix: Option<String>,
    },

    /// Print the tag co-occurrence graph (or one node).
    Graph { tag: Option<String> },

    /// Store the journal folder in the index.
    SetFolder { path: String },
}

fn main() -> Result<()> {
    let Cli {
        config,
        db,
        journals,
        cmd,
    } = Cli::parse();

    install_tracing();

    let config_path = config.or_else(DaybookConfig::default_path);
    let config = match config_path {
        Some(path) => DaybookConfig::load(path)?,
        None => DaybookConfig::default(),
    };
    let db_path = match db {
        Some(path) => path,
        None => config.database_path()?,
    };
    let store = Arc::new(
        SqliteStore::open(&db_path)
            .with_context(|| format!("failed to open index at {}", db_path.display()))?,
    );

    if let Command::SetFolder { path } = &cmd {
        store.set_setting(JOURNALS_FOLDER_KEY, path.trim())?;
        println!("journals folder set to {}", path.trim());
        return Ok(());
    }

    let overrides = journals.iter().fold(config.overrides(), |settings, folder| {
        settings.with(JOURNALS_FOLDER_KEY, folder.clone())
    });
    let settings = SettingsOverlay::new(overrides, Arc::clone(&store));
    let service = JournalService::new(store, settings, journal_lock());
    commands::run(cmd, &service)
}

fn install_tracing() {
    // RUST_LOG is honoured; INFO by default.
    let filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_span_events(FmtSpan::NONE)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
