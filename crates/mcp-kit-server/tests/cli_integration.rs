//! CLI-surface integration tests for the `mcp-kit` binary: flag parsing,
//! config resolution, and exit codes, driven end-to-end through the compiled
//! binary rather than its library internals.

use assert_cmd::Command;
use predicates::prelude::*;

fn mcp_kit() -> Command {
    Command::cargo_bin("mcp-kit").unwrap()
}

#[test]
fn config_json_reports_compiled_defaults() {
    mcp_kit()
        .arg("config")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"port\": 8989"))
        .stdout(predicate::str::contains("\"mode\": \"http\""))
        .stdout(predicate::str::contains("\"local\": false"));
}

#[test]
fn config_human_readable_lists_every_field() {
    mcp_kit()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("port                     = 8989"))
        .stdout(predicate::str::contains("mode                     = http"));
}

#[test]
fn config_respects_explicit_config_file_override() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "port = 9999\nlocal = true\n").unwrap();

    mcp_kit()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"port\": 9999"))
        .stdout(predicate::str::contains("\"local\": true"));
}

#[test]
fn malformed_config_file_fails_with_nonzero_exit() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "not valid toml = = =").unwrap();

    mcp_kit()
        .arg("--config")
        .arg(&path)
        .arg("config")
        .assert()
        .failure();
}

#[test]
fn help_mentions_serve_and_config_subcommands() {
    mcp_kit()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("serve"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn stdio_and_http_flags_are_mutually_exclusive() {
    mcp_kit()
        .arg("serve")
        .arg("--stdio")
        .arg("--http")
        .assert()
        .failure();
}

#[test]
fn unknown_flag_is_rejected() {
    mcp_kit()
        .arg("serve")
        .arg("--not-a-real-flag")
        .assert()
        .failure();
}
