//! Map positions and hashes back to line ranges, and splice text.

use std::fmt;

use crate::identity::BlockHash;
use crate::parser::{Block, split_lines};

/// How a caller names one block of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Address {
    /// Ordinal as of the last sync.
    Position(u32),
    /// Content hash of the block.
    Hash(BlockHash),
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Position(position) => write!(f, "position {position}"),
            Self::Hash(hash) => write!(f, "hash {hash}"),
        }
    }
}

/// Inclusive range of line indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    /// First line.
    pub start: usize,
    /// Last line (inclusive).
    pub end: usize,
}

impl From<&Block> for LineRange {
    fn from(block: &Block) -> Self {
        Self {
            start: block.start_line,
            end: block.end_line(),
        }
    }
}

/// Find the block an address points at.
#[must_use]
pub fn resolve(blocks: &[Block], address: Address) -> Option<&Block> {
    match address {
        Address::Position(position) => blocks.get(usize::try_from(position).ok()?),
        Address::Hash(hash) => blocks.iter().find(|block| block.entry.hash == hash),
    }
}

fn join_lines(lines: &[&str]) -> String {
    if lines.is_empty() {
        return String::new();
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn clamp(range: LineRange, len: usize) -> (usize, usize) {
    let start = range.start.min(len);
    let end = range.end.saturating_add(1).clamp(start, len);
    (start, end)
}

/// Replace `range` with `replacement` (its trailing newlines dropped).
#[must_use]
pub fn splice_replace(text: &str, range: LineRange, replacement: &str) -> String {
    let lines = split_lines(text);
    let (start, end) = clamp(range, lines.len());
    let mut out = Vec::with_capacity(lines.len() + 1);
    out.extend_from_slice(&lines[..start]);
    out.extend(replacement.trim_end_matches('\n').split('\n'));
    out.extend_from_slice(&lines[end..]);
    join_lines(&out)
}

/// Remove `range`; an emptied file stays empty.
#[must_use]
pub fn splice_remove(text: &str, range: LineRange) -> String {
    let mut lines = split_lines(text);
    let (start, end) = clamp(range, lines.len());
    lines.drain(start..end);
    join_lines(&lines)
}

/// Replace a single line, leaving every other line untouched.
#[must_use]
pub fn replace_line(text: &str, index: usize, line: &str) -> String {
    splice_replace(text, LineRange { start: index, end: index }, line)
}
