//! Extraction of the JSON payload embedded in a generated `searchindex.js`.
//!
//! Documentation generators ship their search index as a script of the form
//! `Search.setIndex({...})`. [`parse_search_index`] pulls the object literal
//! out of that call and parses it; [`parse_search_index_file`] does the same
//! for a file on disk and keeps a pretty-printed copy for later stages.

use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::error::{RagError, Result};

/// The call whose first argument carries the index.
pub const SET_INDEX_MARKER: &str = "Search.setIndex(";

/// A parsed search index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIndex {
    raw: Value,
}

impl SearchIndex {
    /// Wrap an already-parsed index object.
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// The full parsed structure.
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    /// The ordered document paths (without extension) listed in the index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::FormatError`] if the `filenames` field is missing
    /// or is not an array of strings.
    pub fn filenames(&self) -> Result<Vec<String>> {
        let entries = self
            .raw
            .get("filenames")
            .and_then(Value::as_array)
            .ok_or_else(|| RagError::FormatError("index has no `filenames` array".to_string()))?;

        entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                entry.as_str().map(str::to_owned).ok_or_else(|| {
                    RagError::FormatError(format!("`filenames[{i}]` is not a string"))
                })
            })
            .collect()
    }
}

/// Locate the balanced `{...}` block following `Search.setIndex(` and parse it.
///
/// Brace depth is tracked while scanning forward from the first `{` after the
/// marker. Braces inside JSON string literals do not count.
///
/// # Errors
///
/// Returns [`RagError::FormatError`] if the marker is absent, no `{` follows
/// it, the braces never balance, or the block is not valid JSON.
pub fn parse_search_index(script: &str) -> Result<SearchIndex> {
    let marker = script
        .find(SET_INDEX_MARKER)
        .ok_or_else(|| RagError::FormatError(format!("`{SET_INDEX_MARKER}` not found")))?;

    let start = script[marker..].find('{').map(|offset| marker + offset).ok_or_else(|| {
        RagError::FormatError(format!("no `{{` follows `{SET_INDEX_MARKER}`"))
    })?;

    let end = matching_brace(&script[start..])
        .map(|offset| start + offset)
        .ok_or_else(|| RagError::FormatError("unbalanced braces in search index".to_string()))?;

    let raw: Value = serde_json::from_str(&script[start..=end])
        .map_err(|e| RagError::FormatError(format!("search index is not valid JSON: {e}")))?;

    Ok(SearchIndex::from_value(raw))
}

/// Byte offset of the `}` that closes the `{` at the start of `text`.
fn matching_brace(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Read `script_path`, parse its index, and write it to `output_path` as JSON.
///
/// # Errors
///
/// Returns [`RagError::Io`] on filesystem failures and
/// [`RagError::FormatError`] from [`parse_search_index`].
pub fn parse_search_index_file(
    script_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<SearchIndex> {
    let script_path = script_path.as_ref();
    let output_path = output_path.as_ref();

    let script = std::fs::read_to_string(script_path)?;
    let index = parse_search_index(&script)?;

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, serde_json::to_string_pretty(index.as_value())?)?;
    info!(
        input = %script_path.display(),
        output = %output_path.display(),
        "parsed search index"
    );

    Ok(index)
}
