//! Block tokenizer and entry builder.
//!
//! A block starts at a line whose trimmed form begins with `- ` and runs up to
//! (not including) the next such line. Lines before the first block belong to
//! no block.

use std::collections::BTreeSet;

use crate::entry::{Entry, EntryKind, TaskFields};
use crate::identity::BlockHash;
use crate::status::StatusToken;
use crate::tags::{collect_tags, strip_tags, tag_names};

const SCHEDULED_PREFIX: &str = "SCHEDULED:";
const DEADLINE_PREFIX: &str = "DEADLINE:";

/// One block of a day file together with where it lives in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Parsed entry.
    pub entry: Entry,
    /// 0-based index of the head line.
    pub start_line: usize,
    /// Head line plus every continuation line, trailing blanks included.
    pub line_count: usize,
    /// Head line and continuation lines joined by `\n`.
    pub raw_block: String,
    /// Tag names on the head line as written.
    pub head_tags: Vec<String>,
}

impl Block {
    /// Inclusive index of the last line of the block.
    #[must_use]
    pub const fn end_line(&self) -> usize {
        self.start_line + self.line_count.saturating_sub(1)
    }
}

/// Split a day file into lines.
///
/// A final `\n` terminates the last line instead of opening an empty one, so
/// the last block of a file hashes the same as it would anywhere else.
#[must_use]
pub fn split_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    text.strip_suffix('\n').unwrap_or(text).split('\n').collect()
}

struct PendingBlock<'a> {
    start_line: usize,
    head: &'a str,
    status: Option<StatusToken>,
    title: String,
    head_tags: Vec<String>,
    body: Vec<&'a str>,
    tags: BTreeSet<String>,
    scheduled_at: Option<String>,
    deadline_at: Option<String>,
}

impl<'a> PendingBlock<'a> {
    fn open(start_line: usize, head: &'a str, rest: &str) -> Self {
        let first = rest.split_whitespace().next().unwrap_or_default();
        let status = StatusToken::from_keyword(first);
        let raw_title = match status {
            Some(token) => rest.strip_prefix(token.as_str()).unwrap_or(rest).trim(),
            None => rest,
        };
        let mut tags = BTreeSet::new();
        collect_tags(&mut tags, raw_title);
        Self {
            start_line,
            head,
            status,
            title: strip_tags(raw_title).trim().to_owned(),
            head_tags: tag_names(raw_title).into_iter().map(str::to_owned).collect(),
            body: Vec::new(),
            tags,
            scheduled_at: None,
            deadline_at: None,
        }
    }

    fn push(&mut self, line: &'a str) {
        let trimmed = line.trim();
        collect_tags(&mut self.tags, line);
        if self.scheduled_at.is_none() && trimmed.starts_with(SCHEDULED_PREFIX) {
            self.scheduled_at = metadata_value(trimmed, SCHEDULED_PREFIX);
        }
        if self.deadline_at.is_none() && trimmed.starts_with(DEADLINE_PREFIX) {
            self.deadline_at = metadata_value(trimmed, DEADLINE_PREFIX);
        }
        self.body.push(line);
    }

    fn finish(self) -> Block {
        let mut raw_block = self.head.to_owned();
        for line in &self.body {
            raw_block.push('\n');
            raw_block.push_str(line);
        }

        let head_text = self.head.trim();
        let head_text = head_text.strip_prefix("- ").unwrap_or(head_text);
        let kept = self
            .body
            .iter()
            .rposition(|line| !line.trim().is_empty())
            .map_or(0, |last| last + 1);
        let mut body = head_text.to_owned();
        for line in &self.body[..kept] {
            body.push('\n');
            body.push_str(line);
        }
        let body = body.trim_end().to_owned();

        let kind = match self.status {
            Some(status) => EntryKind::Task(TaskFields {
                status,
                scheduled_at: self.scheduled_at,
                deadline_at: self.deadline_at,
            }),
            None => EntryKind::Note,
        };

        Block {
            entry: Entry {
                title: self.title,
                raw_line: self.head.to_owned(),
                hash: BlockHash::of(&raw_block),
                body,
                tags: self.tags.into_iter().collect(),
                kind,
            },
            start_line: self.start_line,
            line_count: 1 + self.body.len(),
            raw_block,
            head_tags: self.head_tags,
        }
    }
}

/// `SCHEDULED: <2025-01-10>` -> `2025-01-10`. Blank values count as absent.
fn metadata_value(trimmed: &str, prefix: &str) -> Option<String> {
    let value = trimmed.strip_prefix(prefix).unwrap_or(trimmed).trim();
    let value = value
        .strip_prefix('<')
        .and_then(|inner| inner.strip_suffix('>'))
        .unwrap_or(value)
        .trim();
    (!value.is_empty()).then(|| value.to_owned())
}

/// Split a day's text into ordered blocks.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut pending: Option<PendingBlock<'_>> = None;

    for (index, line) in split_lines(text).into_iter().enumerate() {
        if let Some(rest) = line.trim().strip_prefix("- ") {
            if let Some(done) = pending.take() {
                blocks.push(done.finish());
            }
            let rest = rest.trim();
            if !rest.is_empty() {
                pending = Some(PendingBlock::open(index, line, rest));
            }
            continue;
        }
        if let Some(current) = pending.as_mut() {
            current.push(line);
        }
    }

    if let Some(done) = pending {
        blocks.push(done.finish());
    }
    blocks
}

/// Parsed entries of a day, in file order.
#[must_use]
pub fn parse_entries(text: &str) -> Vec<Entry> {
    tokenize(text).into_iter().map(|block| block.entry).collect()
}

/// Parse text that must hold exactly one block.
#[must_use]
pub fn parse_block(raw: &str) -> Option<Block> {
    let trimmed = raw.trim_end_matches('\n');
    if trimmed.trim().is_empty() {
        return None;
    }
    let mut blocks = tokenize(trimmed);
    if blocks.len() == 1 { blocks.pop() } else { None }
}
