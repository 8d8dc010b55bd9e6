//! E2E tests for `agglo sim`.

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;

fn agglo_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("agglo"));
    cmd.current_dir(dir);
    cmd.env("AGGLO_LOG", "error");
    cmd.env("XDG_CONFIG_HOME", dir.join(".config"));
    cmd
}

#[test]
fn sim_run_small_campaign_passes() {
    let dir = TempDir::new().expect("tempdir");
    let output = agglo_cmd(dir.path())
        .args([
            "sim", "run", "--seeds", "8", "--leaves", "24", "--items", "16", "--json",
        ])
        .output()
        .expect("sim should not crash");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));
    let json: Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(json["seeds_run"], 8);
    assert_eq!(json["all_passed"], true);
}

#[test]
fn sim_replay_is_deterministic() {
    let dir = TempDir::new().expect("tempdir");
    let replay = || {
        let output = agglo_cmd(dir.path())
            .args(["sim", "replay", "--seed", "3", "--leaves", "12", "--json"])
            .output()
            .expect("replay should not crash");
        assert!(output.status.success());
        serde_json::from_slice::<Value>(&output.stdout).expect("valid JSON")
    };
    let first = replay();
    assert_eq!(first, replay());
    assert_eq!(first["oracle_passed"], true);
    assert_eq!(first["merges"].as_array().map(Vec::len), Some(11));
}

#[test]
fn sim_rejects_invalid_parameters() {
    let dir = TempDir::new().expect("tempdir");
    agglo_cmd(dir.path())
        .args(["sim", "run", "--seeds", "0", "--format", "text"])
        .assert()
        .code(2);
}

#[test]
fn sim_ignores_broken_project_config() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("agglo.toml"), "not = [valid").expect("write config");
    let output = agglo_cmd(dir.path())
        .args(["sim", "replay", "--seed", "1", "--leaves", "8", "--json"])
        .output()
        .expect("replay should not crash");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
}
