//! Domain types, tokenizer and text operations for daybook journals.

/// Line addressing and splicing.
pub mod address;
/// Calendar keys for day files.
pub mod date;
/// Entry and day records.
pub mod entry;
/// Listing filters.
pub mod filter;
/// Whole-file and per-block identity.
pub mod identity;
/// Block tokenizer.
pub mod parser;
/// Canonical rendering of new blocks.
pub mod render;
/// Task status vocabulary.
pub mod status;
/// Tag co-occurrence graph.
pub mod tag_graph;
/// `[[tag]]` markup helpers.
pub mod tags;

pub use address::{Address, LineRange};
pub use date::{DayKey, DayKeyError};
pub use entry::{Entry, EntryKind, EntryType, JournalDay, JournalEntry, TaskFields, UnknownEntryType};
pub use filter::{DatePattern, DayFilter, EntryFilter};
pub use identity::{BlockHash, FileIdentity};
pub use parser::{Block, parse_block, parse_entries, tokenize};
pub use render::{DraftEntry, DraftError};
pub use status::{StatusCategory, StatusToken, UnknownStatus, expand_status_filter};
pub use tag_graph::{TagEdge, TagNode, build_tag_graph};
