//! Property-based tests for registry persistence, ordering and asset naming.
//!
//! Uses `proptest` to verify invariants across many random inputs.

#![allow(clippy::expect_used)]

use proptest::prelude::*;

use aurelia_fleet::application::ports::RegistryStore;
use aurelia_fleet::application::services::registry::sort_by_priority;
use aurelia_fleet::domain::{AuthMethod, FleetConfig, TargetServer, resolve_asset};
use aurelia_fleet::infra::config::JsonRegistryStore;

fn arb_server(index: usize) -> impl Strategy<Value = TargetServer> {
    (
        "[a-z][a-z0-9-]{0,12}",
        "[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}\\.[0-9]{1,3}",
        1u16..=u16::MAX,
        "[a-z_][a-z0-9_]{0,10}",
        any::<bool>(),
        0u32..20,
        prop::collection::vec("[a-z]{1,8}", 0..4),
        0u32..10,
        0u64..600,
    )
        .prop_map(
            move |(id, ip, port, username, enabled, priority, tags, max_retries, delay)| {
                TargetServer {
                    id: format!("{id}-{index}"),
                    name: format!("Server {index}"),
                    ip,
                    port,
                    username,
                    ssh_key_path: Some("~/.ssh/id_ed25519".to_string()),
                    password_base64: None,
                    auth_method: AuthMethod::Key,
                    remote_path: "/opt/aurelia".to_string(),
                    enabled,
                    priority,
                    tags,
                    max_retries,
                    retry_delay_seconds: delay,
                }
            },
        )
}

fn arb_fleet() -> impl Strategy<Value = FleetConfig> {
    (0usize..6)
        .prop_flat_map(|n| (0..n).map(arb_server).collect::<Vec<_>>())
        .prop_map(|target_servers| FleetConfig {
            target_servers,
            ..FleetConfig::default()
        })
}

proptest! {
    /// Writing a valid fleet and reading it back yields the same document.
    #[test]
    fn prop_saved_fleet_loads_unchanged(fleet in arb_fleet()) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonRegistryStore::new(dir.path().join("target_servers.json"));
        store.save(&fleet).expect("save");
        let loaded = store.load().expect("load");
        prop_assert_eq!(loaded, fleet);
    }

    /// Priority order is non-decreasing and keeps file order among equals.
    #[test]
    fn prop_sort_by_priority_is_stable(priorities in prop::collection::vec(0u32..5, 0..30)) {
        let mut servers: Vec<TargetServer> = priorities
            .iter()
            .enumerate()
            .map(|(i, &p)| TargetServer {
                id: format!("s{i}"),
                name: format!("s{i}"),
                ip: "10.0.0.1".to_string(),
                port: 22,
                username: "ubuntu".to_string(),
                ssh_key_path: Some("~/.ssh/id_rsa".to_string()),
                password_base64: None,
                auth_method: AuthMethod::Key,
                remote_path: "/opt/aurelia".to_string(),
                enabled: true,
                priority: p,
                tags: vec![],
                max_retries: 3,
                retry_delay_seconds: 60,
            })
            .collect();
        sort_by_priority(&mut servers);

        for pair in servers.windows(2) {
            prop_assert!(pair[0].priority <= pair[1].priority);
            if pair[0].priority == pair[1].priority {
                let a: usize = pair[0].id[1..].parse().expect("numeric suffix");
                let b: usize = pair[1].id[1..].parse().expect("numeric suffix");
                prop_assert!(a < b, "equal priorities reordered: {} before {}", pair[0].id, pair[1].id);
            }
        }
    }

    /// Architectures outside the supported families never resolve.
    #[test]
    fn prop_unknown_arch_never_resolves(arch in "[a-z]{3,10}", os in "[a-z]{0,8}") {
        let supported = ["x86_64", "amd64", "aarch64", "arm64"];
        prop_assume!(!supported.contains(&arch.as_str()));
        prop_assert!(resolve_asset(&arch, &os).is_err());
    }
}

#[test]
fn test_asset_names_follow_release_convention() {
    assert_eq!(
        resolve_asset("aarch64", "ubuntu").expect("arm64 is supported"),
        "aurelia-linux-aarch64.tar.gz"
    );
    assert_eq!(
        resolve_asset("x86_64", "debian").expect("x86_64 is supported"),
        "aurelia-linux-x86_64.tar.gz"
    );
}
