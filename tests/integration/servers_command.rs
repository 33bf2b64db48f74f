//! `aurelia-fleet servers` end-to-end against a temporary fleet file.

#![allow(clippy::expect_used)]

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn fleet(config: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("aurelia-fleet"));
    cmd.env("NO_COLOR", "1")
        .env("AURELIA_YES", "1")
        .env_remove("RUST_LOG")
        .env_remove("AURELIA_SERVER_PASSWORD")
        .arg("--config")
        .arg(config);
    cmd
}

fn fleet_file() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("temp dir");
    let path = dir.path().join("config").join("target_servers.json");
    (dir, path)
}

fn add(config: &Path, id: &str, extra: &[&str]) {
    fleet(config)
        .args(["servers", "add", "--id", id, "--name", id, "--ip", "10.0.0.5"])
        .args(extra)
        .assert()
        .success();
}

fn json_of(cmd: &mut Command) -> serde_json::Value {
    let out = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&out).expect("valid JSON")
}

fn stored(config: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(config).expect("fleet file");
    serde_json::from_str(&text).expect("fleet JSON")
}

#[test]
fn test_add_creates_file_with_defaults() {
    let (_dir, config) = fleet_file();
    add(&config, "web-1", &["--tag", "prod", "--tag", "prod"]);

    let doc = stored(&config);
    let server = &doc["target_servers"][0];
    assert_eq!(server["id"], "web-1");
    assert_eq!(server["port"], 22);
    assert_eq!(server["username"], "ubuntu");
    assert_eq!(server["auth_method"], "key");
    assert_eq!(server["ssh_key_path"], "~/.ssh/id_rsa");
    assert_eq!(server["remote_path"], "/opt/aurelia");
    assert_eq!(server["enabled"], true);
    assert_eq!(server["tags"], serde_json::json!(["prod"]));
    assert_eq!(doc["deployment_strategy"]["parallel_deployments"], 2);
}

#[test]
fn test_add_duplicate_fails_and_keeps_file() {
    let (_dir, config) = fleet_file();
    add(&config, "web-1", &[]);
    let before = std::fs::read_to_string(&config).expect("read");

    fleet(&config)
        .args(["servers", "add", "--id", "web-1", "--name", "x", "--ip", "10.0.0.9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(std::fs::read_to_string(&config).expect("read"), before);
}

#[test]
fn test_add_password_auth_requires_password() {
    let (_dir, config) = fleet_file();
    fleet(&config)
        .args([
            "servers", "add", "--id", "db-1", "--name", "db", "--ip", "10.0.0.6", "--auth",
            "password",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("password_base64"));
}

#[test]
fn test_password_is_stored_encoded_and_never_shown() {
    let (_dir, config) = fleet_file();
    add(&config, "db-1", &["--auth", "password", "--password", "s3cret!"]);

    let doc = stored(&config);
    let encoded = doc["target_servers"][0]["password_base64"]
        .as_str()
        .expect("stored secret")
        .to_string();
    assert_eq!(encoded, "czNjcmV0IQ==");

    let shown = json_of(fleet(&config).args(["--json", "servers", "show", "db-1"]));
    assert_eq!(shown["has_secret"], true);
    assert!(shown.get("password_base64").is_none());

    fleet(&config)
        .args(["servers", "show", "db-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains(encoded.as_str()).not())
        .stdout(predicate::str::contains("s3cret!").not());
}

#[test]
fn test_list_filters_and_orders() {
    let (_dir, config) = fleet_file();
    add(&config, "c", &["--priority", "3", "--tag", "edge"]);
    add(&config, "a", &["--priority", "1"]);
    add(&config, "b", &["--priority", "2", "--tag", "edge", "--disabled"]);

    let all = json_of(fleet(&config).args(["--json", "servers", "list", "--by-priority"]));
    let ids: Vec<&str> = all["servers"]
        .as_array()
        .expect("array")
        .iter()
        .map(|s| s["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, ["a", "b", "c"]);

    let edge = json_of(fleet(&config).args(["--json", "servers", "list", "--enabled", "--tag", "edge"]));
    let ids: Vec<&str> = edge["servers"]
        .as_array()
        .expect("array")
        .iter()
        .map(|s| s["id"].as_str().expect("id"))
        .collect();
    assert_eq!(ids, ["c"]);
}

#[test]
fn test_update_changes_only_given_fields() {
    let (_dir, config) = fleet_file();
    add(&config, "web-1", &["--priority", "4"]);

    fleet(&config)
        .args(["servers", "update", "web-1", "--ip", "10.1.1.1", "--port", "2222"])
        .assert()
        .success();

    let server = &stored(&config)["target_servers"][0];
    assert_eq!(server["ip"], "10.1.1.1");
    assert_eq!(server["port"], 2222);
    assert_eq!(server["priority"], 4);
}

#[test]
fn test_update_password_from_environment() {
    let (_dir, config) = fleet_file();
    add(&config, "db-1", &["--auth", "password", "--password", "old"]);

    fleet(&config)
        .env("AURELIA_SERVER_PASSWORD", "s3cret!")
        .args(["servers", "update", "db-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s3cret!").not());

    assert_eq!(stored(&config)["target_servers"][0]["password_base64"], "czNjcmV0IQ==");
}

#[test]
fn test_update_without_fields_fails() {
    let (_dir, config) = fleet_file();
    add(&config, "web-1", &[]);
    fleet(&config)
        .args(["servers", "update", "web-1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Nothing to update"));
}

#[test]
fn test_disable_then_enable() {
    let (_dir, config) = fleet_file();
    add(&config, "web-1", &[]);

    fleet(&config)
        .args(["servers", "disable", "web-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("disabled"));
    fleet(&config)
        .args(["servers", "disable", "web-1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already disabled"));
    assert_eq!(stored(&config)["target_servers"][0]["enabled"], false);

    fleet(&config)
        .args(["servers", "enable", "web-1"])
        .assert()
        .success();
    assert_eq!(stored(&config)["target_servers"][0]["enabled"], true);
}

#[test]
fn test_remove_deletes_record() {
    let (_dir, config) = fleet_file();
    add(&config, "web-1", &[]);
    add(&config, "web-2", &[]);

    fleet(&config)
        .args(["--yes", "servers", "remove", "web-1"])
        .assert()
        .success();

    let doc = stored(&config);
    let servers = doc["target_servers"].as_array().expect("array");
    assert_eq!(servers.len(), 1);
    assert_eq!(servers[0]["id"], "web-2");
}

#[test]
fn test_unknown_server_is_reported() {
    let (_dir, config) = fleet_file();
    add(&config, "web-1", &[]);
    fleet(&config)
        .args(["servers", "show", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Server 'nope' not found"));
}

#[test]
fn test_deploy_all_with_no_matching_servers_succeeds() {
    let (_dir, config) = fleet_file();
    add(&config, "web-1", &["--disabled"]);
    fleet(&config)
        .args(["deploy", "--all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No enabled servers match"));
}

#[cfg(unix)]
#[test]
fn test_fleet_file_is_private() {
    use std::os::unix::fs::PermissionsExt;

    let (_dir, config) = fleet_file();
    add(&config, "web-1", &[]);
    let mode = std::fs::metadata(&config).expect("metadata").permissions().mode();
    assert_eq!(mode & 0o777, 0o600);
}
