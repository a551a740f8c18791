//! History provenance: the record appended after annotation, and the
//! subset index-range token that earlier processing leaves behind.
//!
//! The token grammar is deliberately narrow. A subsetter records the
//! request URL in `history`; its `dap4.ce` query parameter holds a
//! `;`-separated list of `<variable path>[<range>]...` entries, each range
//! being empty (whole dimension), `start:end`, `start:stride:end`, or a single
//! index. Anything else is a parse error: a wrong start index would silently
//! shift every synthesized coordinate.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use thiserror::Error;
use url::Url;

use annotator_model::{AttributeValue, MetadataTree, path};

pub const PROGRAM: &str = "Metadata Annotator";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Value of `_*corner_point_offsets` selecting history-derived offsets.
pub const HISTORY_SUBSET_INDEX_RANGES: &str = "history_subset_index_ranges";

const CONSTRAINT_PARAMETER: &str = "dap4.ce";

/// `<absolute path>` followed by one or more bracketed ranges.
static ENTRY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(/[^\[\]]+?)((?:\[[^\[\]]*\])+)$").expect("Invalid subset entry regex")
});

static RANGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]").expect("Invalid index range regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryError {
    #[error("no history attribute found")]
    MissingHistory,
    #[error("history has no {CONSTRAINT_PARAMETER} subset constraint")]
    MissingConstraint,
    #[error("malformed subset entry {entry:?}: {message}")]
    MalformedEntry { entry: String, message: String },
    #[error("no subset index range covers dimension {dimension:?}")]
    UncoveredDimension { dimension: String },
}

/// One bracketed index range. An empty range selects the whole dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub start: usize,
    pub end: Option<usize>,
}

impl IndexRange {
    pub const WHOLE: Self = Self {
        start: 0,
        end: None,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetEntry {
    pub variable: String,
    pub ranges: Vec<IndexRange>,
}

/// Name of the history attribute to write: an existing `History` wins.
pub fn history_attribute_name(tree: &MetadataTree) -> &'static str {
    match tree.root() {
        Some(root) if root.attributes.contains("History") => "History",
        _ => "history",
    }
}

/// Appends `<timestamp> <program> <version>` as a new line of the root history.
pub fn append_history_record(tree: &mut MetadataTree, timestamp: DateTime<Utc>) {
    let name = history_attribute_name(tree);
    let record = format!(
        "{} {PROGRAM} {VERSION}",
        timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    );
    let Some(root) = tree.root_mut() else {
        return;
    };
    let value = match root.attributes.get_str(name) {
        Some(existing) if !existing.is_empty() => format!("{existing}\n{record}"),
        _ => record,
    };
    root.attributes.insert(name, AttributeValue::Text(value));
}

/// History text nearest to `node_path`: the node itself, then enclosing groups.
///
/// `History` wins over `history`, matching the attribute records are appended to.
pub fn find_history<'t>(tree: &'t MetadataTree, node_path: &str) -> Option<&'t str> {
    std::iter::once(node_path)
        .chain(path::ancestors(node_path))
        .filter_map(|candidate| tree.node(candidate))
        .find_map(|node| {
            node.attributes
                .get_str("History")
                .or_else(|| node.attributes.get_str("history"))
        })
}

/// Extracts every subset entry from the `dap4.ce` constraint recorded in history.
pub fn parse_subset_index_ranges(history: &str) -> Result<Vec<SubsetEntry>, HistoryError> {
    let constraint = history
        .split_whitespace()
        .filter_map(|word| Url::parse(word).ok())
        .find_map(|url| {
            url.query_pairs()
                .find(|(key, _)| key == CONSTRAINT_PARAMETER)
                .map(|(_, value)| value.into_owned())
        })
        .ok_or(HistoryError::MissingConstraint)?;

    let entries = constraint
        .split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(parse_subset_entry)
        .collect::<Result<Vec<_>, _>>()?;
    if entries.is_empty() {
        return Err(HistoryError::MissingConstraint);
    }
    Ok(entries)
}

/// Parses `<variable path>[<range>]...`.
pub fn parse_subset_entry(entry: &str) -> Result<SubsetEntry, HistoryError> {
    let malformed = |message: &str| HistoryError::MalformedEntry {
        entry: entry.to_string(),
        message: message.to_string(),
    };
    let captures = ENTRY_PATTERN
        .captures(entry)
        .ok_or_else(|| malformed("expected <path>[range]..."))?;
    let variable = captures[1].to_string();
    let ranges = RANGE_PATTERN
        .captures_iter(&captures[2])
        .map(|range| parse_range(&range[1]).map_err(|message| malformed(&message)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SubsetEntry { variable, ranges })
}

fn parse_range(raw: &str) -> Result<IndexRange, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(IndexRange::WHOLE);
    }
    let parts = raw
        .split(':')
        .map(|part| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid index {part:?} in range {raw:?}"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let (start, end) = match parts.as_slice() {
        [index] => (*index, *index),
        [start, end] | [start, _, end] => (*start, *end),
        _ => return Err(format!("too many components in range {raw:?}")),
    };
    if end < start {
        return Err(format!("range {raw:?} ends before it starts"));
    }
    Ok(IndexRange {
        start,
        end: Some(end),
    })
}

/// Start index for the dimension variable at `dimension_path`.
///
/// Uses the first entry for a variable in the same group whose dimension
/// list has as many names as the entry has ranges and includes the dimension.
pub fn start_index_for_dimension(
    tree: &MetadataTree,
    entries: &[SubsetEntry],
    dimension_path: &str,
) -> Option<usize> {
    let group = path::parent(dimension_path)?;
    let dimension = path::name(dimension_path);
    entries
        .iter()
        .filter(|entry| path::parent(&entry.variable) == Some(group))
        .find_map(|entry| {
            let names = tree.node(&entry.variable)?.dimension_names();
            if names.len() != entry.ranges.len() {
                return None;
            }
            let position = names.iter().position(|name| name == dimension)?;
            Some(entry.ranges[position].start)
        })
}
