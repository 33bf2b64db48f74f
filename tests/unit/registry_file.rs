//! Registry behaviour against a real JSON file.

#![allow(clippy::expect_used)]

use aurelia_fleet::application::ports::RegistryStore;
use aurelia_fleet::application::services::registry::ServerRegistry;
use aurelia_fleet::domain::{
    AuthMethod, ConfigError, FleetConfig, RegistryError, ServerPatch, TargetServer,
};
use aurelia_fleet::infra::config::JsonRegistryStore;

fn server(id: &str, priority: u32) -> TargetServer {
    TargetServer {
        id: id.to_string(),
        name: format!("Server {id}"),
        ip: "192.168.1.100".to_string(),
        port: 22,
        username: "ubuntu".to_string(),
        ssh_key_path: Some("~/.ssh/id_rsa".to_string()),
        password_base64: None,
        auth_method: AuthMethod::Key,
        remote_path: "/opt/aurelia".to_string(),
        enabled: true,
        priority,
        tags: vec![],
        max_retries: 3,
        retry_delay_seconds: 60,
    }
}

fn seeded(dir: &tempfile::TempDir, servers: Vec<TargetServer>) -> JsonRegistryStore {
    let store = JsonRegistryStore::new(dir.path().join("target_servers.json"));
    store
        .save(&FleetConfig {
            target_servers: servers,
            ..FleetConfig::default()
        })
        .expect("seed fleet file");
    store
}

#[test]
fn test_missing_file_is_config_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = JsonRegistryStore::new(dir.path().join("absent.json"));
    let err = ServerRegistry::load(store)
        .err()
        .expect("missing file must fail");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::NotFound(_))
    ));
}

#[test]
fn test_create_missing_starts_empty_and_writes_on_add() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("target_servers.json");
    let mut registry =
        ServerRegistry::load(JsonRegistryStore::new(&path).create_missing()).expect("load");
    assert!(registry.list().is_empty());

    registry.add(server("web-1", 1)).expect("add");
    let reloaded = ServerRegistry::load(JsonRegistryStore::new(&path)).expect("reload");
    assert_eq!(reloaded.get("web-1").expect("present").priority, 1);
}

#[test]
fn test_duplicate_add_leaves_file_unchanged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded(&dir, vec![server("a", 1)]);
    let path = store.path();
    let before = std::fs::read_to_string(&path).expect("read");

    let mut registry = ServerRegistry::load(store).expect("load");
    let err = registry.add(server("a", 9)).expect_err("duplicate");
    assert!(matches!(
        err.downcast_ref::<RegistryError>(),
        Some(RegistryError::DuplicateId(id)) if id == "a"
    ));
    assert_eq!(std::fs::read_to_string(&path).expect("read"), before);
}

#[test]
fn test_disable_twice_equals_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded(&dir, vec![server("a", 1), server("b", 2)]);
    let path = store.path();

    let mut registry = ServerRegistry::load(store).expect("load");
    assert!(registry.set_enabled("a", false).expect("first"));
    let once = std::fs::read_to_string(&path).expect("read");
    assert!(!registry.set_enabled("a", false).expect("second"));
    assert_eq!(std::fs::read_to_string(&path).expect("read"), once);
    assert!(!registry.get("a").expect("present").enabled);
}

#[test]
fn test_update_persists_and_rejects_incomplete_credentials() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = seeded(&dir, vec![server("a", 1)]);
    let path = store.path();
    let mut registry = ServerRegistry::load(store).expect("load");

    registry
        .update(
            "a",
            ServerPatch {
                ip: Some("10.0.0.7".to_string()),
                ..ServerPatch::default()
            },
        )
        .expect("update ip");
    let reloaded = ServerRegistry::load(JsonRegistryStore::new(&path)).expect("reload");
    assert_eq!(reloaded.get("a").expect("present").ip, "10.0.0.7");

    let err = registry
        .update(
            "a",
            ServerPatch {
                auth_method: Some(AuthMethod::Password),
                ..ServerPatch::default()
            },
        )
        .expect_err("password auth without a password");
    assert!(matches!(
        err.downcast_ref::<RegistryError>(),
        Some(RegistryError::InvalidRecord { .. })
    ));
    assert_eq!(registry.get("a").expect("present").auth_method, AuthMethod::Key);
}

#[test]
fn test_malformed_file_is_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("target_servers.json");
    std::fs::write(&path, "{ not json").expect("write");
    let err = ServerRegistry::load(JsonRegistryStore::new(&path))
        .err()
        .expect("parse failure");
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::Parse { .. })
    ));
}
