use std::path::Path;

use serde::Deserialize;

use super::{content_lines, read_file};
use crate::dendrogram::{MergeRecord, NodeId};
use crate::error::CoreError;

/// Parse whitespace- or comma-separated merge records, one per line.
///
/// Two fields per line is the `children_` layout; four fields is a linkage
/// matrix row (`left right distance size`) and keeps the first two. Ids
/// written as floats (`3.0`, `3.000000000000000000e+00`) are accepted when
/// they are exact non-negative integers.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] with the 1-based line on malformed input.
pub fn parse_merges_text(text: &str) -> Result<Vec<MergeRecord>, CoreError> {
    let mut records = Vec::new();
    for (line, content) in content_lines(text) {
        let fields: Vec<&str> = content
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|field| !field.is_empty())
            .collect();
        if fields.len() != 2 && fields.len() != 4 {
            return Err(CoreError::parse(
                line,
                format!("expected 2 fields (or 4 for a linkage row), got {}", fields.len()),
            ));
        }
        records.push(MergeRecord::new(
            parse_id(fields[0], line)?,
            parse_id(fields[1], line)?,
        ));
    }
    Ok(records)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn parse_id(field: &str, line: usize) -> Result<NodeId, CoreError> {
    // Largest integer an f64 holds exactly.
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0;
    if let Ok(id) = field.parse::<NodeId>() {
        return Ok(id);
    }
    match field.parse::<f64>() {
        Ok(value) if value.fract() == 0.0 && (0.0..EXACT_LIMIT).contains(&value) => {
            Ok(value as NodeId)
        }
        _ => Err(CoreError::parse(line, format!("invalid node id {field:?}"))),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonRecord {
    Pair((NodeId, NodeId)),
    Named(MergeRecord),
}

/// Parse a JSON array of `[left, right]` pairs or `{"left", "right"}` objects.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] carrying the line reported by `serde_json`.
pub fn parse_merges_json(text: &str) -> Result<Vec<MergeRecord>, CoreError> {
    let raw: Vec<JsonRecord> =
        serde_json::from_str(text).map_err(|err| CoreError::parse(err.line(), err.to_string()))?;
    Ok(raw
        .into_iter()
        .map(|record| match record {
            JsonRecord::Pair(pair) => MergeRecord::from(pair),
            JsonRecord::Named(record) => record,
        })
        .collect())
}

/// Load merge records, choosing JSON for `.json` files or content starting with `[`.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn load_merges(path: &Path) -> Result<Vec<MergeRecord>, CoreError> {
    let text = read_file(path)?;
    let is_json = path.extension().is_some_and(|ext| ext == "json")
        || text.trim_start().starts_with('[');
    if is_json {
        parse_merges_json(&text)
    } else {
        parse_merges_text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_children_dump_with_comments() {
        let text = "# children_ for 4 leaves\n0 1\n\n2 3  # second\n4 5\n";
        let records = parse_merges_text(text).expect("valid");
        assert_eq!(
            records,
            vec![
                MergeRecord::new(0, 1),
                MergeRecord::new(2, 3),
                MergeRecord::new(4, 5)
            ]
        );
    }

    #[test]
    fn parses_linkage_rows_written_as_floats() {
        let text = "0.000000000000000000e+00 1.000000000000000000e+00 2.5e-01 2.0e+00\n\
                    2.0,3.0,0.5,2\n";
        let records = parse_merges_text(text).expect("valid");
        assert_eq!(records, vec![MergeRecord::new(0, 1), MergeRecord::new(2, 3)]);
    }

    #[test]
    fn rejects_fractional_and_negative_ids() {
        let err = parse_merges_text("0 1\n1.5 2\n").expect_err("fractional id");
        assert!(matches!(err, CoreError::Parse { line: 2, .. }));
        assert!(parse_merges_text("-1 2\n").is_err());
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = parse_merges_text("0 1 2\n").expect_err("three fields");
        assert!(matches!(err, CoreError::Parse { line: 1, .. }));
    }

    #[test]
    fn parses_json_pairs_and_objects() {
        let pairs = parse_merges_json("[[0, 1], [2, 3]]").expect("pairs");
        let objects =
            parse_merges_json(r#"[{"left": 0, "right": 1}, {"left": 2, "right": 3}]"#)
                .expect("objects");
        assert_eq!(pairs, objects);
    }

    #[test]
    fn load_detects_json_by_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("merges.txt");
        std::fs::write(&path, "[[1, 0], [2, 3]]").expect("write");
        let records = load_merges(&path).expect("load");
        assert_eq!(records[0], MergeRecord::new(1, 0));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_merges(Path::new("/nonexistent/merges.txt")).expect_err("missing");
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
