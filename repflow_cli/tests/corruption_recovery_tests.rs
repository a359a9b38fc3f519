//! Corruption recovery tests for the repflow binary.
//!
//! These tests verify the system's failure surface:
//! - A corrupted snapshot is a reported, recoverable error - never a panic
//! - Corrupted history log lines are skipped during rollup
//! - Missing files start the system empty

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("repflow"))
}

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

#[test]
fn test_corrupted_snapshot_is_reported_not_a_panic() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("workout.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted snapshot");

    cli()
        .arg("list")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Snapshot"));
}

#[test]
fn test_wrong_snapshot_version_is_reported() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    fs::create_dir_all(&data_dir).unwrap();
    fs::write(
        data_dir.join("workout.json"),
        r#"{"version": 99, "savedAt": "2024-05-01T10:00:00Z", "exercises": [], "blocks": [], "layoutOrder": []}"#,
    )
    .unwrap();

    cli()
        .arg("list")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .failure()
        .stderr(predicate::str::contains("version"));
}

#[test]
fn test_missing_snapshot_starts_empty() {
    let temp_dir = setup_test_dir();

    cli()
        .arg("list")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing recorded yet"));
}

#[test]
fn test_corrupted_history_lines_skipped_during_rollup() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path().to_path_buf();

    // One good record surrounded by garbage lines
    let history_dir = data_dir.join("history");
    fs::create_dir_all(&history_dir).unwrap();
    let good = format!(
        "{{ invalid json }}\n{}\n{{ more invalid }}\n",
        serde_json::json!({
            "id": "7f5e1b42-9d05-4ff0-9c86-2f1a4f6c0001",
            "started_at": "2024-05-01T10:00:00Z",
            "completed_at": "2024-05-01T10:20:00Z",
            "steps_total": 6,
            "steps_completed": 6
        })
    );
    fs::write(history_dir.join("sessions.jsonl"), good).unwrap();

    cli()
        .arg("rollup")
        .arg("--data-dir")
        .arg(&data_dir)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled up 1 sessions"));

    let csv = fs::read_to_string(history_dir.join("sessions.csv")).unwrap();
    assert!(csv.contains("7f5e1b42-9d05-4ff0-9c86-2f1a4f6c0001"));
}
