//! Smoke tests for the afirmador CLI

#![allow(deprecated)] // Allow deprecated Command::cargo_bin until assert_cmd is updated
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the afirmador binary
fn afirmador() -> Command {
    Command::cargo_bin("afirmador").expect("afirmador binary should exist")
}

fn workspace(docs: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, text) in docs {
        fs::write(dir.path().join(name), text).unwrap();
    }
    dir
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    afirmador()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("0.1.0"));
}

#[test]
fn test_help_flag() {
    afirmador()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_no_args_shows_help() {
    afirmador().assert().failure(); // Requires a subcommand
}

// ============================================================================
// Run Command Tests
// ============================================================================

#[test]
fn test_run_passing_workspace_succeeds() {
    let dir = workspace(&[("sums.md", "# A\n2+2=4\n3*3=9\n")]);
    afirmador()
        .args(["run", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 passed"));
}

#[test]
fn test_run_failing_workspace_exits_nonzero() {
    let dir = workspace(&[("sums.md", "2+2=5\n")]);
    afirmador()
        .args(["run", dir.path().to_str().unwrap()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 failed"));
}

#[test]
fn test_run_json_emits_event_lines() {
    let dir = workspace(&[("sums.md", "2+2=4\n")]);
    afirmador()
        .args(["run", "--json", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"passed\""))
        .stdout(predicate::str::contains("\"ended\""));
}

#[test]
fn test_run_exclude_skips_assertion() {
    // Excluding the failing assertion by its workspace-relative id
    // leaves only the passing one.
    let dir = workspace(&[("sums.md", "2+2=5\n3+3=6\n")]);
    afirmador()
        .args(["run", "-x", "sums.md#L0", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 passed"))
        .stdout(predicate::str::contains("0 failed"));
}

#[test]
fn test_run_coverage_prints_table() {
    let dir = workspace(&[("sums.md", "2+2=4\n\nprose only\n")]);
    afirmador()
        .args(["run", "--coverage", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("coverage:"))
        .stdout(predicate::str::contains("1/2 lines"));
}

// ============================================================================
// List Command Tests
// ============================================================================

#[test]
fn test_list_shows_tree() {
    let dir = workspace(&[("sums.md", "# Sums\n2+2=4\n")]);
    afirmador()
        .args(["list", dir.path().to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("# Sums"))
        .stdout(predicate::str::contains("2 + 2 = 4"));
}
