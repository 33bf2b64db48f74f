//! Application service — the target server registry.
//!
//! Holds the loaded fleet document and persists the whole document after
//! every successful mutation. A mutation whose save fails is rolled back in
//! memory so the registry never claims a state the file does not have.

use anyhow::{Context, Result};

use crate::application::ports::RegistryStore;
use crate::domain::{FleetConfig, RegistryError, ServerPatch, TargetServer};

/// Durable store of target-server records.
pub struct ServerRegistry<S: RegistryStore> {
    store: S,
    config: FleetConfig,
}

impl<S: RegistryStore> ServerRegistry<S> {
    /// Load the registry from `store`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound`, `Parse` or `Invalid` from the store.
    pub fn load(store: S) -> Result<Self> {
        let config = store.load()?;
        let incomplete = config.incomplete_credentials();
        if !incomplete.is_empty() {
            tracing::warn!(
                servers = %incomplete.join(","),
                "servers with incomplete credentials will fail at deploy time"
            );
        }
        tracing::debug!(
            path = %store.path().display(),
            servers = config.target_servers.len(),
            "registry loaded"
        );
        Ok(Self { store, config })
    }

    #[must_use]
    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// All servers in insertion order.
    #[must_use]
    pub fn list(&self) -> &[TargetServer] {
        &self.config.target_servers
    }

    /// Look up one server.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no server has this id.
    pub fn get(&self, id: &str) -> Result<&TargetServer, RegistryError> {
        self.config
            .target_servers
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Enabled servers in insertion order.
    #[must_use]
    pub fn enabled(&self) -> Vec<&TargetServer> {
        self.config.target_servers.iter().filter(|s| s.enabled).collect()
    }

    /// Enabled servers carrying `tag`.
    #[must_use]
    pub fn by_tag(&self, tag: &str) -> Vec<&TargetServer> {
        self.config
            .target_servers
            .iter()
            .filter(|s| s.enabled && s.has_tag(tag))
            .collect()
    }

    /// All servers by ascending priority; ties keep insertion order.
    #[must_use]
    pub fn sort_by_priority(&self) -> Vec<&TargetServer> {
        let mut servers: Vec<&TargetServer> = self.config.target_servers.iter().collect();
        sort_by_priority(&mut servers);
        servers
    }

    /// Add a new server and persist.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateId` if the id exists, or
    /// `InvalidRecord` if the record fails validation. The registry is
    /// unchanged in both cases.
    pub fn add(&mut self, mut server: TargetServer) -> Result<()> {
        if self.get(&server.id).is_ok() {
            return Err(RegistryError::DuplicateId(server.id).into());
        }
        let tags = std::mem::take(&mut server.tags);
        for tag in &tags {
            server.add_tag(tag);
        }
        server.validate()?;
        let id = server.id.clone();
        self.mutate(|config| {
            config.target_servers.push(server);
            Ok(())
        })?;
        tracing::info!(server = %id, "server added");
        Ok(())
    }

    /// Remove a server and persist. Returns the removed record.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no server has this id.
    pub fn remove(&mut self, id: &str) -> Result<TargetServer> {
        let index = self.index_of(id)?;
        let mut removed = None;
        self.mutate(|config| {
            removed = Some(config.target_servers.remove(index));
            Ok(())
        })?;
        tracing::info!(server = %id, "server removed");
        removed.ok_or_else(|| RegistryError::NotFound(id.to_string()).into())
    }

    /// Apply `patch` to a server and persist; unspecified fields are kept.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound`, or `InvalidRecord` if the patched
    /// record would be invalid (nothing is changed then).
    pub fn update(&mut self, id: &str, patch: ServerPatch) -> Result<&TargetServer> {
        let index = self.index_of(id)?;
        let mut patched = self.config.target_servers[index].clone();
        patch.apply_to(&mut patched);
        patched.validate()?;
        self.mutate(|config| {
            config.target_servers[index] = patched;
            Ok(())
        })?;
        tracing::info!(server = %id, "server updated");
        Ok(&self.config.target_servers[index])
    }

    /// Enable or disable a server and persist. Idempotent.
    ///
    /// Returns `true` if the flag changed.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::NotFound` if no server has this id.
    pub fn set_enabled(&mut self, id: &str, enabled: bool) -> Result<bool> {
        let index = self.index_of(id)?;
        let changed = self.config.target_servers[index].enabled != enabled;
        self.mutate(|config| {
            config.target_servers[index].enabled = enabled;
            Ok(())
        })?;
        tracing::info!(server = %id, enabled, "server enabled flag set");
        Ok(changed)
    }

    /// Write the whole document through the store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot write.
    pub fn persist(&self) -> Result<()> {
        self.store
            .save(&self.config)
            .with_context(|| format!("saving {}", self.store.path().display()))
    }

    fn index_of(&self, id: &str) -> Result<usize, RegistryError> {
        self.config
            .target_servers
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    fn mutate(&mut self, f: impl FnOnce(&mut FleetConfig) -> Result<()>) -> Result<()> {
        let before = self.config.clone();
        f(&mut self.config)?;
        if let Err(e) = self.persist() {
            self.config = before;
            return Err(e);
        }
        Ok(())
    }
}

/// Stable ascending sort on `priority`.
pub fn sort_by_priority<T: std::borrow::Borrow<TargetServer>>(servers: &mut [T]) {
    servers.sort_by_key(|s| s.borrow().priority);
}
