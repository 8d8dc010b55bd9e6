//! E2E tests for dendrogram commands: canon, golden write/check.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn agglo_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("agglo"));
    cmd.current_dir(dir);
    cmd.env("AGGLO_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd.env_remove("FORMAT");
    cmd
}

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).expect("write input");
}

#[test]
fn canon_prints_canonical_form() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 1\n2 3\n4 5\n");

    agglo_cmd(dir.path())
        .args(["canon", "--merges", "merges.txt", "--format", "text"])
        .assert()
        .success()
        .stdout("((0, 1), (2, 3))\n");
}

#[test]
fn canon_ignores_record_sides_and_step_order() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "a.txt", "0 1\n2 3\n4 5\n");
    // Steps swapped (so internal ids are renumbered) and sides reversed.
    write(dir.path(), "b.txt", "# reordered\n3 2\n1 0\n\n5 4\n");

    let run = |file: &str| {
        let output = agglo_cmd(dir.path())
            .args(["canon", "--merges", file, "--format", "text"])
            .output()
            .expect("canon should not crash");
        assert!(output.status.success());
        output.stdout
    };
    assert_eq!(run("a.txt"), run("b.txt"));
}

#[test]
fn canon_accepts_linkage_rows_and_json() {
    let dir = TempDir::new().expect("tempdir");
    write(
        dir.path(),
        "linkage.txt",
        "0.0 1.0 0.5 2\n2.0 3.0 0.7 2\n4.0 5.0 1.2 4\n",
    );
    write(dir.path(), "merges.json", r#"[{"left": 0, "right": 1}, [2, 3], [4, 5]]"#);

    for file in ["linkage.txt", "merges.json"] {
        agglo_cmd(dir.path())
            .args(["canon", "--merges", file, "--format", "text"])
            .assert()
            .success()
            .stdout("((0, 1), (2, 3))\n");
    }
}

#[test]
fn canon_renders_tokens_from_vocabulary() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 2\n1 3\n4 5\n");
    write(dir.path(), "vocab.txt", "the 0.1 0.2\nof 0.3 0.4\nand 0.5 0.6\nto 0.7 0.8\n");

    agglo_cmd(dir.path())
        .args([
            "canon", "--merges", "merges.txt", "--vocab", "vocab.txt", "--tokens", "--format",
            "text",
        ])
        .assert()
        .success()
        .stdout("((the, and), (of, to))\n");
}

#[test]
fn canon_json_reports_fingerprint() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 1\n3 2\n");

    let output = agglo_cmd(dir.path())
        .args(["canon", "--merges", "merges.txt", "--json"])
        .output()
        .expect("canon should not crash");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["leaves"], 3);
    assert_eq!(json["merges"], 2);
    assert_eq!(json["canonical"], "((0, 1), 2)");
    assert!(
        json["fingerprint"]
            .as_str()
            .is_some_and(|f| f.starts_with("blake3:"))
    );
}

#[test]
fn canon_reports_structural_error_code() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "bad.txt", "0 1\n0 2\n");

    let output = agglo_cmd(dir.path())
        .args(["canon", "--merges", "bad.txt", "--format", "json"])
        .output()
        .expect("canon should not crash");
    assert_eq!(output.status.code(), Some(2));
    let json: Value = serde_json::from_slice(&output.stderr).expect("error JSON on stderr");
    assert_eq!(json["error"]["error_code"], "E1003");
    assert!(
        json["error"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("already merged"))
    );
}

#[test]
fn canon_rejects_wrong_leaf_count() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 1\n2 3\n4 5\n");

    agglo_cmd(dir.path())
        .args(["canon", "--merges", "merges.txt", "--leaves", "5", "--format", "text"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("E1001"));
}

#[test]
fn golden_write_then_check_matches() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 1\n2 3\n4 5\n");

    agglo_cmd(dir.path())
        .args(["golden", "write", "--merges", "merges.txt", "--name", "ward", "--format", "text"])
        .assert()
        .success();
    let fixture =
        fs::read_to_string(dir.path().join("fixtures/ward.golden")).expect("fixture written");
    assert_eq!(fixture, "((0, 1), (2, 3))\n");

    agglo_cmd(dir.path())
        .args(["golden", "check", "--merges", "merges.txt", "--name", "ward", "--format", "text"])
        .assert()
        .success()
        .stdout("ok ward\n");
}

#[test]
fn golden_check_reports_first_difference() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "ours.txt", "0 1\n2 3\n4 5\n");
    write(dir.path(), "theirs.txt", "0 2\n1 3\n4 5\n");

    agglo_cmd(dir.path())
        .args(["golden", "write", "--merges", "ours.txt", "--name", "ward"])
        .assert()
        .success();

    let output = agglo_cmd(dir.path())
        .args(["golden", "check", "--merges", "theirs.txt", "--name", "ward", "--json"])
        .output()
        .expect("check should not crash");
    assert_eq!(output.status.code(), Some(1));
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["matched"], false);
    assert_eq!(json["first_difference"], 5);
}

#[test]
fn golden_uses_project_config_directory() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 1\n");
    write(
        dir.path(),
        "agglo.toml",
        "[fixtures]\ndir = \"testdata/golden\"\nextension = \"txt\"\n",
    );

    agglo_cmd(dir.path())
        .args(["golden", "write", "--merges", "merges.txt", "--name", "pair"])
        .assert()
        .success();
    assert!(dir.path().join("testdata/golden/pair.txt").exists());
}

#[test]
fn golden_check_rejects_non_canonical_fixture() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 1\n2 3\n4 5\n");
    fs::create_dir_all(dir.path().join("fixtures")).expect("mkdir");
    write(dir.path(), "fixtures/ward.golden", "((1, 0), (2, 3))\n");

    agglo_cmd(dir.path())
        .args(["golden", "check", "--merges", "merges.txt", "--name", "ward", "--format", "text"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("E1007"));
}

#[test]
fn golden_check_missing_fixture_is_an_error() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 1\n");

    agglo_cmd(dir.path())
        .args(["golden", "check", "--merges", "merges.txt", "--name", "absent"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("reading fixture"));
}

#[test]
fn completions_mention_binary_name() {
    let dir = TempDir::new().expect("tempdir");
    agglo_cmd(dir.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("agglo"));
}

#[test]
fn broken_project_config_only_fails_commands_that_read_it() {
    let dir = TempDir::new().expect("tempdir");
    write(dir.path(), "merges.txt", "0 1\n");
    write(dir.path(), "agglo.toml", "[fixtures\ndir = 3\n");

    agglo_cmd(dir.path())
        .args(["canon", "--merges", "merges.txt", "--format", "text"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("E4002"));

    agglo_cmd(dir.path())
        .args(["completions", "zsh"])
        .assert()
        .success();
}
