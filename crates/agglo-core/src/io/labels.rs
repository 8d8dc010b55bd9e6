use std::path::Path;

use fixedbitset::FixedBitSet;

use super::{data_lines, read_file};
use crate::error::{AlignmentError, CoreError};
use crate::partition::{Label, Vocabulary};

fn parse_label(field: &str, line: usize) -> Result<Label, CoreError> {
    field
        .parse()
        .map_err(|_| CoreError::parse(line, format!("invalid cluster id {field:?}")))
}

/// Convert a `token cluster_id` table into labels aligned with `vocab`.
///
/// The table may list tokens in any order but must cover every vocabulary
/// token exactly once and nothing else. `#` is an ordinary token character.
///
/// # Errors
///
/// Fails on malformed lines, tokens outside the vocabulary, repeated tokens,
/// and vocabulary tokens the table never mentions.
pub fn parse_label_table(text: &str, vocab: &Vocabulary) -> Result<Vec<Label>, CoreError> {
    let mut labels: Vec<Label> = vec![-1; vocab.len()];
    let mut seen = FixedBitSet::with_capacity(vocab.len());

    for (line, content) in data_lines(text) {
        let mut fields = content.split_whitespace();
        let (Some(token), Some(raw_label), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(CoreError::parse(line, "expected `token cluster_id`"));
        };
        let item = vocab
            .position(token)
            .ok_or_else(|| AlignmentError::UnknownToken {
                token: token.to_owned(),
                line,
            })?;
        if seen.put(item) {
            return Err(AlignmentError::DuplicateToken {
                token: token.to_owned(),
                line,
            }
            .into());
        }
        labels[item] = parse_label(raw_label, line)?;
    }

    if let Some(item) = (0..vocab.len()).find(|&item| !seen.contains(item)) {
        return Err(AlignmentError::MissingToken {
            token: vocab.token(item).unwrap_or_default().to_owned(),
        }
        .into());
    }
    Ok(labels)
}

/// Parse one integer label per line, already in vocabulary order.
///
/// # Errors
///
/// Returns [`CoreError::Parse`] on a non-integer line.
pub fn parse_label_array(text: &str) -> Result<Vec<Label>, CoreError> {
    data_lines(text)
        .map(|(line, content)| parse_label(content, line))
        .collect()
}

/// Load labels aligned with `vocab`, detecting the layout from the first line:
/// two fields mean a `token cluster_id` table, one field a plain label array.
///
/// # Errors
///
/// Fails when the file cannot be read, does not parse, or does not align
/// with `vocab`.
pub fn load_labels(path: &Path, vocab: &Vocabulary) -> Result<Vec<Label>, CoreError> {
    let text = read_file(path)?;
    let is_table = data_lines(&text)
        .next()
        .is_some_and(|(_, first)| first.split_whitespace().count() == 2);
    if is_table {
        return parse_label_table(&text, vocab);
    }
    let labels = parse_label_array(&text)?;
    if labels.len() != vocab.len() {
        return Err(AlignmentError::LengthMismatch {
            what: "labels vs vocabulary",
            left: labels.len(),
            right: vocab.len(),
        }
        .into());
    }
    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    fn vocab() -> Vocabulary {
        Vocabulary::new(["the", "of", "and"]).expect("unique")
    }

    #[test]
    fn table_in_any_order_aligns_to_vocabulary() {
        let labels = parse_label_table("and 2\nthe 0\nof 0\n", &vocab()).expect("valid");
        assert_eq!(labels, vec![0, 0, 2]);
    }

    #[test]
    fn table_rejects_unknown_token() {
        let err = parse_label_table("the 0\nof 0\nand 1\nor 1\n", &vocab()).expect_err("unknown");
        assert!(matches!(
            err,
            CoreError::Alignment(AlignmentError::UnknownToken { line: 4, .. })
        ));
    }

    #[test]
    fn table_rejects_missing_token() {
        let err = parse_label_table("the 0\nand 1\n", &vocab()).expect_err("missing");
        assert_eq!(err.code(), ErrorCode::MissingToken);
        assert!(err.to_string().contains("\"of\""));
    }

    #[test]
    fn table_rejects_repeated_token() {
        let err = parse_label_table("the 0\nthe 1\nof 0\nand 1\n", &vocab()).expect_err("repeat");
        assert_eq!(err.code(), ErrorCode::DuplicateToken);
    }

    #[test]
    fn table_rejects_malformed_line() {
        let err = parse_label_table("the 0 extra\n", &vocab()).expect_err("three fields");
        assert!(matches!(err, CoreError::Parse { line: 1, .. }));
        assert!(parse_label_table("the zero\n", &vocab()).is_err());
    }

    #[test]
    fn table_keeps_unassigned_marker() {
        let labels = parse_label_table("the 0\nof -1\nand 0\n", &vocab()).expect("valid");
        assert_eq!(labels[1], -1);
    }

    #[test]
    fn table_treats_hash_tokens_as_data() {
        let vocab = Vocabulary::new(["the", "#", "c#", "#1"]).expect("unique");
        let labels = parse_label_table("the 0\n# 1\nc# 1\n#1 2\n", &vocab).expect("valid");
        assert_eq!(labels, vec![0, 1, 1, 2]);
    }

    #[test]
    fn load_table_with_hash_tokens_matches_vocabulary_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let glove = dir.path().join("glove.txt");
        let table = dir.path().join("clusters.txt");
        std::fs::write(&glove, "the 0.1 0.2\n# 0.3 0.4\nc 0.5 0.6\nc# 0.7 0.8\n")
            .expect("write");
        std::fs::write(&table, "# 1\nthe 0\nc# 1\nc 0\n").expect("write");
        let vocab = crate::io::load_vocabulary(&glove, None).expect("vocab");
        assert_eq!(
            load_labels(&table, &vocab).expect("table"),
            vec![0, 1, 0, 1]
        );
    }

    #[test]
    fn array_rejects_trailing_text() {
        let err = parse_label_array("1\n2 # note\n").expect_err("not a label");
        assert!(matches!(err, CoreError::Parse { line: 2, .. }));
    }

    #[test]
    fn array_parses_one_label_per_line() {
        assert_eq!(parse_label_array("3\n1\n\n4\n").expect("valid"), vec![3, 1, 4]);
    }

    #[test]
    fn load_detects_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let table = dir.path().join("table.txt");
        let array = dir.path().join("array.txt");
        std::fs::write(&table, "the 1\nof 1\nand 0").expect("write");
        std::fs::write(&array, "1\n1\n0\n").expect("write");
        assert_eq!(
            load_labels(&table, &vocab()).expect("table"),
            load_labels(&array, &vocab()).expect("array")
        );
    }

    #[test]
    fn load_rejects_short_array() {
        let dir = tempfile::tempdir().expect("tempdir");
        let array = dir.path().join("array.txt");
        std::fs::write(&array, "1\n1\n").expect("write");
        let err = load_labels(&array, &vocab()).expect_err("short");
        assert_eq!(err.code(), ErrorCode::LengthMismatch);
    }
}
