//! CLI structure, argument parsing and error reporting.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;

fn fleet() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("aurelia-fleet"));
    cmd.env("NO_COLOR", "1")
        .env_remove("AURELIA_FLEET_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

// --- Help and version tests ---

#[test]
fn test_cli_no_args_shows_help() {
    // clap with arg_required_else_help shows help on stderr and exits 2
    fleet().assert().code(2).stderr(predicate::str::contains(
        "Deploy the Aurelia agent to a fleet of Linux servers over SSH",
    ));
}

#[test]
fn test_cli_no_args_without_env_flags_shows_help() {
    fleet()
        .env_remove("NO_COLOR")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_cli_help_lists_commands() {
    fleet()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("servers"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("detect"))
        .stdout(predicate::str::contains("status"));
}

#[test]
fn test_version_command_shows_version() {
    fleet()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(concat!(
            "aurelia-fleet ",
            env!("CARGO_PKG_VERSION")
        )));
}

#[test]
fn test_no_color_accepts_conventional_values() {
    for value in ["1", "true", "yes"] {
        fleet()
            .env("NO_COLOR", value)
            .arg("version")
            .assert()
            .success()
            .stdout(predicate::str::contains("aurelia-fleet"));
    }
    fleet()
        .env("NO_COLOR", "0")
        .arg("version")
        .assert()
        .success();
}

#[test]
fn test_version_command_json_outputs_valid_json() {
    let out = fleet()
        .args(["version", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["version"], env!("CARGO_PKG_VERSION"));
}

// --- Argument validation ---

#[test]
fn test_deploy_requires_id_or_all() {
    fleet()
        .arg("deploy")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("<ID>"));
}

#[test]
fn test_deploy_rejects_id_with_all() {
    fleet()
        .args(["deploy", "web-1", "--all"])
        .assert()
        .code(2);
}

#[test]
fn test_parallel_requires_all() {
    fleet()
        .args(["deploy", "web-1", "--parallel", "3"])
        .assert()
        .code(2);
}

#[test]
fn test_tag_filter_rejected_for_single_server() {
    fleet()
        .args(["deploy", "web-1", "--tag-filter", "prod"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--tag-filter"));
}

#[test]
fn test_fleet_flags_accepted_with_all() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fleet.json");
    std::fs::write(&path, r#"{"target_servers": []}"#).expect("write");
    fleet()
        .arg("--config")
        .arg(&path)
        .args(["deploy", "--all", "--parallel", "3", "--tag-filter", "prod"])
        .assert()
        .success();
}

#[test]
fn test_unknown_auth_method_rejected() {
    fleet()
        .args([
            "servers", "add", "--id", "a", "--name", "A", "--ip", "10.0.0.1", "--auth", "token",
        ])
        .assert()
        .code(2);
}

// --- Error reporting ---

#[test]
fn test_missing_config_reports_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    fleet()
        .arg("--config")
        .arg(&path)
        .args(["servers", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error: Configuration file not found"));
}

#[test]
fn test_missing_config_json_error_object() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("absent.json");
    let out = fleet()
        .arg("--config")
        .arg(&path)
        .args(["--json", "servers", "list"])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    let value: serde_json::Value = serde_json::from_slice(&out).expect("valid JSON");
    assert_eq!(value["error"], true);
    assert_eq!(value["kind"], "config");
}

#[test]
fn test_config_path_from_environment() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fleet.json");
    std::fs::write(&path, r#"{"target_servers": []}"#).expect("write");
    fleet()
        .env("AURELIA_FLEET_CONFIG", &path)
        .args(["servers", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No servers configured"));
}

#[test]
fn test_malformed_config_reports_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("fleet.json");
    std::fs::write(&path, "{ nope").expect("write");
    fleet()
        .arg("--config")
        .arg(&path)
        .args(["servers", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot parse"));
}
