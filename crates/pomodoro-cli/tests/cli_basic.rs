//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary HOME so that
//! config and the session database never touch the real user directory.

use std::path::Path;
use std::process::Command;

use serde_json::Value;

/// Run a CLI command and return (exit code, stdout, stderr).
fn run_cli(home: &Path, args: &[&str]) -> (i32, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_pomodoro-cli"))
        .args(args)
        .env("HOME", home)
        .env_remove("POMODORO_ENV")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (code, stdout, stderr)
}

/// Parse a stream of pretty-printed JSON documents.
fn documents(stdout: &str) -> Vec<Value> {
    serde_json::Deserializer::from_str(stdout)
        .into_iter::<Value>()
        .collect::<Result<_, _>>()
        .expect("stdout is not JSON")
}

fn last_snapshot(stdout: &str) -> Value {
    let docs = documents(stdout);
    let last = docs.last().cloned().expect("no output");
    assert_eq!(last["type"], "state_snapshot");
    last
}

#[test]
fn test_status_starts_fresh() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["timer", "status"]);
    assert_eq!(code, 0);

    let snapshot = last_snapshot(&stdout);
    assert_eq!(snapshot["phase"], "work");
    assert_eq!(snapshot["seconds_left"], 1500);
    assert_eq!(snapshot["completed_work_cycles"], 0);
    assert_eq!(snapshot["running"], false);
}

#[test]
fn test_skip_emits_phase_change() {
    let home = tempfile::tempdir().unwrap();
    let (code, stdout, _) = run_cli(home.path(), &["timer", "skip"]);
    assert_eq!(code, 0);

    let docs = documents(&stdout);
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["type"], "phase_changed");
    assert_eq!(docs[0]["from"], "work");
    assert_eq!(docs[0]["to"], "short_break");
    assert_eq!(docs[0]["cause"], "skipped");
    assert_eq!(docs[1]["completed_work_cycles"], 1);
}

#[test]
fn test_pause_resume_persists() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["timer", "pause"]);
    assert_eq!(code, 0);

    let (_, stdout, _) = run_cli(home.path(), &["timer", "status"]);
    let snapshot = last_snapshot(&stdout);
    assert_eq!(snapshot["phase"], "paused");
    assert_eq!(snapshot["suspended_phase"], "work");

    let (code, stdout, _) = run_cli(home.path(), &["timer", "resume"]);
    assert_eq!(code, 0);
    assert_eq!(last_snapshot(&stdout)["phase"], "work");
}

#[test]
fn test_reset_discards_session() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["timer", "skip"]);
    run_cli(home.path(), &["timer", "skip"]);

    let (code, stdout, _) = run_cli(home.path(), &["timer", "reset"]);
    assert_eq!(code, 0);
    let snapshot = last_snapshot(&stdout);
    assert_eq!(snapshot["phase"], "work");
    assert_eq!(snapshot["completed_work_cycles"], 0);
}

#[test]
fn test_config_changes_durations() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, _) = run_cli(home.path(), &["config", "set", "schedule.focus_duration", "50"]);
    assert_eq!(code, 0);

    let (code, stdout, _) = run_cli(home.path(), &["config", "get", "schedule.focus_duration"]);
    assert_eq!(code, 0);
    assert_eq!(stdout.trim(), "50");

    let (_, stdout, _) = run_cli(home.path(), &["timer", "status"]);
    assert_eq!(last_snapshot(&stdout)["seconds_left"], 3000);
}

#[test]
fn test_config_rejects_zero_duration() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "set", "schedule.short_break", "0"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("error"));
}

#[test]
fn test_unknown_config_key() {
    let home = tempfile::tempdir().unwrap();
    let (code, _, stderr) = run_cli(home.path(), &["config", "get", "nope"]);
    assert_ne!(code, 0);
    assert!(stderr.contains("unknown key"));
}

#[test]
fn test_stats_records_skipped_work() {
    let home = tempfile::tempdir().unwrap();
    run_cli(home.path(), &["timer", "skip"]);

    let (code, stdout, _) = run_cli(home.path(), &["stats", "summary"]);
    assert_eq!(code, 0);
    let stats: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(stats["total_pomodoros"], 0);
    assert_eq!(stats["skipped_work"], 1);

    let (code, stdout, _) = run_cli(home.path(), &["stats", "recent"]);
    assert_eq!(code, 0);
    let recent: Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(recent.as_array().map(Vec::len), Some(1));
}
