//! Fixed scenarios shared with the clustering engines' golden files.

use agglo_core::io::{parse_label_table, parse_merges_text, read_vocabulary};
use agglo_core::{CanonicalTree, canonicalize, compare_partitions};

const MERGES: &str = "\
# children_ from average-linkage over six tokens
0 1
2 3
6 4
7 5
8 9
";

#[test]
fn canonical_fixture_matches_checked_in_rendering() {
    let records = parse_merges_text(MERGES).expect("valid merges");
    let tree = canonicalize(records.len() + 1, &records).expect("valid tree");
    assert_eq!(tree.to_string(), "(((0, 1), 4), ((2, 3), 5))");

    let fixture: CanonicalTree = "(((0, 1), 4), ((2, 3), 5))".parse().expect("canonical");
    assert_eq!(tree, fixture);
    assert_eq!(tree.fingerprint(), fixture.fingerprint());
}

#[test]
fn tokens_render_in_fixture_order() {
    let vocab = read_vocabulary(
        "the 0.1\n, 0.2\n. 0.3\nof 0.4\nto 0.5\nand 0.6\n".as_bytes(),
        None,
    )
    .expect("vocabulary");
    let records = parse_merges_text(MERGES).expect("valid merges");
    let tree = canonicalize(vocab.len(), &records).expect("valid tree");
    assert_eq!(tree.render_with(&vocab), "(((the, ,), to), ((., of), and))");
}

#[test]
fn label_tables_from_two_engines_agree_after_renaming() {
    let vocab = read_vocabulary("the\n,\n.\nof\nto\nand\n".as_bytes(), None).expect("vocabulary");
    let reference = parse_label_table("the 0\n, 0\n. 1\nof 1\nto 2\nand 2\n", &vocab)
        .expect("reference table");
    let candidate = parse_label_table("and 0\nto 0\nof 2\n. 2\n, 1\nthe 1\n", &vocab)
        .expect("candidate table");

    let result = compare_partitions(&vocab, &reference, &candidate).expect("aligned");
    assert!(result.is_equivalent());
}

#[test]
fn label_tables_with_one_moved_token_disagree() {
    let vocab = read_vocabulary("the\n,\n.\nof\nto\nand\n".as_bytes(), None).expect("vocabulary");
    let reference = parse_label_table("the 0\n, 0\n. 1\nof 1\nto 2\nand 2\n", &vocab)
        .expect("reference table");
    let candidate = parse_label_table("the 0\n, 0\n. 1\nof 2\nto 2\nand 2\n", &vocab)
        .expect("candidate table");

    let result = compare_partitions(&vocab, &reference, &candidate).expect("aligned");
    assert_eq!(result.mismatch_count, 4);
    assert_eq!(result.disagreements.len(), 3);
}
