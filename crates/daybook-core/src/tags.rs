//! `[[name]]` tag references.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// A name is one or more characters other than `[` and `]`.
#[allow(clippy::expect_used)]
static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\[([^\[\]]+)\]\]").expect("valid tag pattern"));

/// Byte spans of every `[[name]]` match, leftmost first, with the raw name.
fn tag_spans(text: &str) -> Vec<(usize, usize, &str)> {
    TAG_PATTERN
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let name = caps.get(1)?;
            Some((whole.start(), whole.end(), name.as_str()))
        })
        .collect()
}

/// Add every tag referenced in `text` to `target`, lower-cased.
pub fn collect_tags(target: &mut BTreeSet<String>, text: &str) {
    for (_, _, name) in tag_spans(text) {
        let trimmed = name.trim();
        if !trimmed.is_empty() {
            target.insert(trimmed.to_lowercase());
        }
    }
}

/// Trimmed tag names in `text` as written, in order of appearance.
#[must_use]
pub fn tag_names(text: &str) -> Vec<&str> {
    tag_spans(text)
        .into_iter()
        .map(|(_, _, name)| name.trim())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Sorted, lower-cased, deduplicated tags referenced anywhere in `text`.
#[must_use]
pub fn extract_tags(text: &str) -> Vec<String> {
    let mut set = BTreeSet::new();
    collect_tags(&mut set, text);
    set.into_iter().collect()
}

/// Remove all `[[name]]` markup from `text`.
#[must_use]
pub fn strip_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, _) in tag_spans(text) {
        out.push_str(&text[cursor..start]);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Trim, lower-case and deduplicate tag names (sorted).
#[must_use]
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|tag| tag.as_ref().trim().to_lowercase())
        .filter(|tag| !tag.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Render tag names as adjacent `[[name]]` markup, keeping first-seen order.
#[must_use]
pub fn format_tags<I, S>(tags: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut out = String::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if tag.is_empty() || !seen.insert(tag.to_owned()) {
            continue;
        }
        out.push_str("[[");
        out.push_str(tag);
        out.push_str("]]");
    }
    out
}
