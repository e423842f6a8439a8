//! CLI-level integration tests exercising the documented scenarios
//! through the `coe` binary rather than library calls directly.

use assert_cmd::Command;
use predicates::prelude::*;

fn coe() -> Command {
    Command::cargo_bin("coe").unwrap()
}

#[test]
fn no_subcommand_exits_nonzero() {
    coe().assert().failure();
}

#[test]
fn doctor_reports_environment() {
    coe()
        .arg("doctor")
        .assert()
        .success()
        .stdout(predicate::str::contains("GITHUB_TOKEN present"));
}

#[test]
fn manifest_generate_then_verify_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.json"), "hello").unwrap();
    std::fs::write(dir.path().join("b.json"), "world").unwrap();

    coe()
        .args(["manifest", "generate"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("wrote"));

    let manifest_path = dir.path().join("manifest.json");
    assert!(manifest_path.is_file());

    coe()
        .args(["manifest", "verify"])
        .arg(&manifest_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"verified\": true"));
}

#[test]
fn manifest_verify_flips_to_fail_on_mutation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.json"), "hello").unwrap();
    std::fs::write(dir.path().join("b.json"), "world").unwrap();

    coe()
        .args(["manifest", "generate"])
        .arg(dir.path())
        .assert()
        .success();

    std::fs::write(dir.path().join("a.json"), "tampered").unwrap();

    coe()
        .args(["manifest", "verify"])
        .arg(dir.path().join("manifest.json"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"verified\": false"));
}

#[test]
fn manifest_verify_reports_missing_file_without_panicking() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("a.json"), "hello").unwrap();
    std::fs::write(dir.path().join("b.json"), "world").unwrap();

    coe()
        .args(["manifest", "generate"])
        .arg(dir.path())
        .assert()
        .success();

    std::fs::remove_file(dir.path().join("b.json")).unwrap();

    coe()
        .args(["manifest", "verify"])
        .arg(dir.path().join("manifest.json"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("\"verified\": false"));
}

#[test]
fn cache_stats_and_clear_on_fresh_dir() {
    let dir = tempfile::tempdir().unwrap();

    coe()
        .args(["cache", "stats"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"entries\": 0"));

    coe()
        .args(["cache", "clear"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"cleared\": 0"));
}
