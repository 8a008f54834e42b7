//! CLI end-to-end tests
//!
//! Tests for the daopub command-line interface.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

/// Get a command for the daopub binary
#[allow(deprecated)]
fn daopub_cmd() -> Command {
    Command::cargo_bin("daopub").unwrap()
}

/// Config whose stores live under `root`.
fn write_config(root: &Path) -> std::path::PathBuf {
    let config_file = root.join("daopub.toml");
    fs::write(
        &config_file,
        format!(
            r#"
[stores]
image_store = "{root}/jp2s"
archival_store = "{root}/tiffs"
mets_root = "{root}/mets"
ead_root = "{root}/eads"

[finding_aids]
collections_url = "http://127.0.0.1:9/collections"

[pipeline]
workers = 2
"#,
            root = root.display()
        ),
    )
    .unwrap();
    config_file
}

#[test]
fn test_cli_no_args_shows_help() {
    let mut cmd = daopub_cmd();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_help_flag() {
    let mut cmd = daopub_cmd();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("daopub"))
        .stdout(predicate::str::contains("Usage"));
}

#[test]
fn test_cli_version_flag() {
    let mut cmd = daopub_cmd();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("daopub"));
}

#[test]
fn test_cli_publish_help() {
    let mut cmd = daopub_cmd();
    cmd.args(["publish", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--mets-only"))
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_cli_force_conflicts_with_mets_only() {
    let mut cmd = daopub_cmd();
    cmd.args(["publish", "C0022", "--force", "--mets-only"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}

#[test]
fn test_cli_publish_missing_call_number() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());

    let mut cmd = daopub_cmd();
    cmd.args(["publish", "C9999", "--config"])
        .arg(&config_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_cli_publish_dry_run_lists_pending() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());
    let collection = temp.path().join("jp2s/C0022");
    fs::create_dir_all(collection.join("c0031")).unwrap();
    fs::create_dir_all(collection.join("c0032")).unwrap();
    fs::write(collection.join("c0032.pdf"), b"%PDF").unwrap();

    let mut cmd = daopub_cmd();
    cmd.args(["publish", "C0022", "--dry-run", "--config"])
        .arg(&config_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("C0022/c0031"))
        .stdout(predicate::str::contains("would-run"))
        .stdout(predicate::str::contains("skipped-already-published"));
}

#[test]
fn test_cli_publish_dry_run_json() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());
    fs::create_dir_all(temp.path().join("jp2s/C0022/c0031")).unwrap();

    let output = daopub_cmd()
        .args(["publish", "C0022", "--dry-run", "--json", "--config"])
        .arg(&config_file)
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["call_number"], "C0022");
    assert_eq!(report["outcomes"][0]["component"], "C0022/c0031");
    assert_eq!(report["outcomes"][0]["status"], "would_run");
}

#[test]
fn test_cli_sequence_command() {
    let temp = tempdir().unwrap();
    let batch = temp.path().join("batch");
    let dest = temp.path().join("C0022/c0031");
    fs::create_dir_all(&batch).unwrap();
    fs::create_dir_all(&dest).unwrap();
    fs::write(dest.join("00000001.jp2"), b"old").unwrap();
    fs::write(batch.join("page1.jp2"), b"new").unwrap();

    let mut cmd = daopub_cmd();
    cmd.args(["sequence", "--ext", "jp2", "--source"])
        .arg(&batch)
        .arg("--dest")
        .arg(&dest)
        .assert()
        .success()
        .stdout(predicate::str::contains("00000002.jp2"))
        .stdout(predicate::str::contains("1 existing, 1 appended, last index 2"));

    assert!(dest.join("00000002.jp2").is_file());
}

#[test]
fn test_cli_ingest_rejects_bad_component() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());

    let mut cmd = daopub_cmd();
    cmd.args(["ingest", "--batch", "delivery", "--component", "c0031", "--config"])
        .arg(&config_file)
        .assert()
        .failure();
}

#[test]
fn test_cli_validate_config() {
    let temp = tempdir().unwrap();
    let config_file = write_config(temp.path());

    let mut cmd = daopub_cmd();
    cmd.arg("validate")
        .arg(&config_file)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid"))
        .stdout(predicate::str::contains("Workers: 2"));
}

#[test]
fn test_cli_validate_rejects_zero_workers() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("bad.toml");
    fs::write(&config_file, "[pipeline]\nworkers = 0\n").unwrap();

    let mut cmd = daopub_cmd();
    cmd.arg("validate")
        .arg(&config_file)
        .assert()
        .failure()
        .stderr(predicate::str::contains("workers"));
}

#[test]
fn test_cli_check_tools_reports_missing() {
    let temp = tempdir().unwrap();
    let config_file = temp.path().join("tools.toml");
    fs::write(
        &config_file,
        r#"
[tools]
converter = { program = "/nonexistent/dao.py" }
"#,
    )
    .unwrap();

    let mut cmd = daopub_cmd();
    cmd.args(["check-tools", "--config"])
        .arg(&config_file)
        .assert()
        .failure()
        .stdout(predicate::str::contains("converter"));
}
