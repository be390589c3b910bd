//! Integration tests for apirel CLI
//!
//! Tests end-to-end command behavior using the CLI binary.
//! Uses tempfile for isolated test directories.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::{json, Value};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// Get the path to the apirel binary (built by cargo)
fn apirel_binary() -> Command {
    Command::new(env!("CARGO_BIN_EXE_apirel"))
}

/// Run apirel with the given args in the specified directory
fn run_apirel(dir: &Path, args: &[&str]) -> Output {
    apirel_binary()
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("Failed to execute apirel command")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

/// Snapshot of `example.com/m` with one `func Name(string) error` per name.
fn make_snapshot(funcs: &[&str]) -> Value {
    let declarations: Vec<Value> = funcs
        .iter()
        .map(|name| json!({ "name": name, "kind": "func", "type": 2 }))
        .collect();
    json!({
        "module_path": "example.com/m",
        "types": [
            { "kind": "basic", "name": "string" },
            { "kind": "basic", "name": "error" },
            { "kind": "signature", "params": [0], "results": [1] }
        ],
        "packages": [
            { "path": "example.com/m", "declarations": declarations }
        ]
    })
}

fn write_snapshot(dir: &Path, name: &str, snapshot: &Value) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(snapshot).unwrap())
        .expect("Failed to write snapshot");
    path
}

/// Write old.json and new.json into a fresh temp directory.
fn setup_pair(old: &[&str], new: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_snapshot(temp_dir.path(), "old.json", &make_snapshot(old));
    write_snapshot(temp_dir.path(), "new.json", &make_snapshot(new));
    temp_dir
}

// ============================================================================
// Diff Command Tests
// ============================================================================

#[test]
fn test_diff_compatible_addition() {
    let temp_dir = setup_pair(&["Open"], &["Close", "Open"]);
    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v1.2.0"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("example.com/m\n-------------\n"), "got: {}", text);
    assert!(text.contains("Compatible changes:\n- Close: added\n"));
    assert!(text.ends_with("Suggested version: v1.3.0\n"));
}

#[test]
fn test_diff_incompatible_removal_fails() {
    let temp_dir = setup_pair(&["Close", "Open"], &["Open"]);
    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v1.2.0"],
    );

    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Incompatible changes:\n- Close: removed\n"));
    assert!(text.contains("Use --version=v2.0.0 to verify a new major version."));
}

#[test]
fn test_diff_validates_proposed_version() {
    let temp_dir = setup_pair(&["Open"], &["Close", "Open"]);

    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v1.2.0", "--version", "v1.3.0"],
    );
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("v1.3.0 is a valid semantic version for this release."));

    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v1.2.0", "--version", "v1.2.1"],
    );
    assert!(!output.status.success());
    assert!(stdout(&output).contains("are the same as the base version v1.2.0."));
}

#[test]
fn test_diff_json_format() {
    let temp_dir = setup_pair(&["Close", "Open"], &["Open"]);
    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v0.4.0", "--format", "json"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let json: Value = serde_json::from_str(&stdout(&output))
        .unwrap_or_else(|_| panic!("Output should be valid JSON: {}", stdout(&output)));

    assert_eq!(json["module_path"], "example.com/m");
    assert_eq!(json["base_version"], "v0.4.0");
    assert_eq!(json["has_incompatible_changes"], true);
    assert_eq!(json["suggested_version"], "v0.5.0");
    assert_eq!(json["success"], true);
    assert_eq!(json["packages"][0]["changes"][0]["path"], "Close");
    assert_eq!(json["packages"][0]["changes"][0]["compatible"], false);
}

#[test]
fn test_diff_compact_json_is_one_line() {
    let temp_dir = setup_pair(&["Open"], &["Close", "Open"]);
    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v1.0.0", "--format", "json", "--compact"],
    );

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert_eq!(text.trim_end().lines().count(), 1, "got: {}", text);
    let json: Value = serde_json::from_str(&text).expect("compact output should be valid JSON");
    assert_eq!(json["suggested_version"], "v1.1.0");
}

#[test]
fn test_diff_without_base_reports_no_suggestion() {
    let temp_dir = setup_pair(&["Open"], &["Open"]);
    let output = run_apirel(temp_dir.path(), &["diff", "old.json", "new.json"]);

    assert!(output.status.success());
    assert_eq!(
        stdout(&output),
        "No base version was given, so no version will be suggested.\n"
    );
}

#[test]
fn test_diff_version_requires_base() {
    let temp_dir = setup_pair(&["Open"], &["Open"]);
    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--version", "v1.0.1"],
    );
    assert!(!output.status.success());
}

#[test]
fn test_diff_rejects_non_canonical_base() {
    let temp_dir = setup_pair(&["Open"], &["Open"]);
    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v1.2"],
    );

    assert!(!output.status.success());
    let err = stderr(&output);
    assert!(err.contains("apirel:"), "got: {}", err);
    assert!(err.contains("not a canonical semantic version"), "got: {}", err);
}

#[test]
fn test_diff_missing_file() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let output = run_apirel(temp_dir.path(), &["diff", "nope.json", "nope2.json"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("could not read snapshot"));
}

#[test]
fn test_diff_reports_load_errors() {
    let temp_dir = setup_pair(&["Open"], &["Open"]);
    let mut broken = make_snapshot(&["Open"]);
    broken["packages"][0]["errors"] = json!(["a.go:3:1: undefined: x"]);
    write_snapshot(temp_dir.path(), "new.json", &broken);

    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v1.0.0"],
    );
    assert!(!output.status.success());
    let text = stdout(&output);
    assert!(text.contains("errors in new version:\n\ta.go:3:1: undefined: x\n"));
    assert!(text.ends_with("Errors were detected, so no version will be suggested.\n"));
}

#[test]
fn test_config_sets_default_format() {
    let temp_dir = setup_pair(&["Open"], &["Open"]);
    fs::write(
        temp_dir.path().join(".apirel.toml"),
        "[output]\nformat = \"json\"\n",
    )
    .unwrap();

    let output = run_apirel(
        temp_dir.path(),
        &["diff", "old.json", "new.json", "--base", "v1.0.0"],
    );
    assert!(output.status.success());
    let json: Value = serde_json::from_str(&stdout(&output)).expect("config should select JSON");
    assert_eq!(json["summary"], "Suggested version: v1.0.1");
}

// ============================================================================
// Extract Command Tests
// ============================================================================

#[test]
fn test_extract_lists_symbols() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    write_snapshot(temp_dir.path(), "api.json", &make_snapshot(&["Open", "close"]));

    let output = run_apirel(temp_dir.path(), &["extract", "api.json"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("module example.com/m"));
    assert!(text.contains("\tfunc Open func(string) error\n"), "got: {}", text);
    assert!(!text.contains("close"));
}

#[test]
fn test_extract_dangling_reference_is_fatal() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut snapshot = make_snapshot(&["Open"]);
    snapshot["packages"][0]["declarations"][0]["type"] = json!(99);
    write_snapshot(temp_dir.path(), "api.json", &snapshot);

    let output = run_apirel(temp_dir.path(), &["extract", "api.json"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("out of range"));
}

// ============================================================================
// Check Command Tests (git)
// ============================================================================

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["-c", "user.name=apirel", "-c", "user.email=apirel@example.com"])
        .args(args)
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

/// A repository with `api.json` released as v1.0.0 and a later commit.
fn setup_repo(released: &[&str], head: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let dir = temp_dir.path();
    git(dir, &["init", "-q"]);
    write_snapshot(dir, "api.json", &make_snapshot(released));
    git(dir, &["add", "api.json"]);
    git(dir, &["commit", "-q", "-m", "release"]);
    git(dir, &["tag", "v1.0.0"]);
    write_snapshot(dir, "api.json", &make_snapshot(head));
    git(dir, &["commit", "-q", "-a", "--allow-empty", "-m", "change"]);
    temp_dir
}

#[test]
fn test_check_detects_base_tag() {
    if !git_available() {
        return;
    }
    let temp_dir = setup_repo(&["Open"], &["Close", "Open"]);

    let output = run_apirel(temp_dir.path(), &["check"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("- Close: added"));
    assert!(text.ends_with("Suggested version: v1.1.0\n"), "got: {}", text);
}

#[test]
fn test_check_rejects_patch_for_compatible_change() {
    if !git_available() {
        return;
    }
    let temp_dir = setup_repo(&["Open"], &["Close", "Open"]);

    let output = run_apirel(temp_dir.path(), &["check", "--version=v1.0.1"]);
    assert!(!output.status.success());
    assert!(stdout(&output).contains("v1.0.1 is not a valid semantic version for this release."));
}

#[test]
fn test_check_first_release() {
    if !git_available() {
        return;
    }
    let temp_dir = setup_repo(&["Open"], &["Open"]);

    let output = run_apirel(temp_dir.path(), &["check", "--base=none", "--version=v1.0.0"]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("v1.0.0 is a valid semantic version for this release."));
}

#[test]
fn test_check_refuses_dirty_tree() {
    if !git_available() {
        return;
    }
    let temp_dir = setup_repo(&["Open"], &["Open"]);
    fs::write(temp_dir.path().join("notes.txt"), "wip").unwrap();

    let output = run_apirel(temp_dir.path(), &["check"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("uncommitted changes"));
}

#[test]
fn test_check_outside_repository() {
    if !git_available() {
        return;
    }
    let temp_dir = TempDir::new().expect("Failed to create temp dir");

    let output = run_apirel(temp_dir.path(), &["check"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("git repository"));
}
