//! Adapters from the files clustering engines write to the in-memory inputs
//! of the canonicalizer and the partition comparison.

mod labels;
mod merges;
mod vocab;

use std::path::Path;

use crate::error::CoreError;

pub use labels::{load_labels, parse_label_array, parse_label_table};
pub use merges::{load_merges, parse_merges_json, parse_merges_text};
pub use vocab::{load_vocabulary, read_vocabulary};

fn read_file(path: &Path) -> Result<String, CoreError> {
    std::fs::read_to_string(path).map_err(|source| CoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Trimmed non-blank lines, numbered from 1.
///
/// No comment syntax: vocabulary tokens such as `#` or `c#` are data.
fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines().enumerate().filter_map(|(idx, raw)| {
        let line = raw.trim();
        (!line.is_empty()).then_some((idx + 1, line))
    })
}

/// Like [`data_lines`] with `#` comments stripped first.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    data_lines(text).filter_map(|(line, raw)| {
        let content = raw.split_once('#').map_or(raw, |(head, _)| head).trim();
        (!content.is_empty()).then_some((line, content))
    })
}
