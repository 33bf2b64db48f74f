//! Target server records and the fleet configuration document.
//!
//! Pure types and validation only; reading and writing the file lives in
//! `crate::infra::config`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{ConfigError, RegistryError};

/// Server ids are used in file names, log lines and CLI arguments.
pub static SERVER_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    // Safety: this is a compile-time constant pattern — cannot fail.
    #[allow(clippy::expect_used)]
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,63}$").expect("valid regex")
});

/// Unix account names accepted for `username`.
pub static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z_][a-z0-9_.-]{0,31}$").expect("valid regex")
});

// ── Records ──────────────────────────────────────────────────────────────────

/// How the fleet manager authenticates against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    #[default]
    Key,
    Password,
    #[serde(alias = "keyWithPassphrase", alias = "keywithpassphrase")]
    KeyWithPassphrase,
}

impl AuthMethod {
    /// Whether this method needs `ssh_key_path`.
    #[must_use]
    pub fn needs_key(self) -> bool {
        matches!(self, Self::Key | Self::KeyWithPassphrase)
    }

    /// Whether this method needs the encoded secret.
    #[must_use]
    pub fn needs_secret(self) -> bool {
        matches!(self, Self::Password | Self::KeyWithPassphrase)
    }

    /// Name of the secret for this method, used in prompts and errors.
    #[must_use]
    pub fn secret_label(self) -> &'static str {
        match self {
            Self::KeyWithPassphrase => "key passphrase",
            Self::Key | Self::Password => "password",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Key => "key",
            Self::Password => "password",
            Self::KeyWithPassphrase => "key_with_passphrase",
        })
    }
}

/// One remote machine eligible for deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetServer {
    pub id: String,
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<String>,
    /// Password (or key passphrase) in reversible base64 text form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_base64: Option<String>,
    #[serde(default)]
    pub auth_method: AuthMethod,
    pub remote_path: String,
    pub enabled: bool,
    pub priority: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl TargetServer {
    /// Check structural fields (everything except credentials).
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidRecord` naming the first bad field.
    pub fn validate_structure(&self) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidRecord {
            id: self.id.clone(),
            reason,
        };
        if !SERVER_ID_RE.is_match(&self.id) {
            return Err(invalid(
                "id must be 1-64 characters of letters, digits, '.', '_' or '-'".to_string(),
            ));
        }
        if self.ip.trim().is_empty() || self.ip.chars().any(char::is_whitespace) {
            return Err(invalid("ip must be a non-empty host name or address".to_string()));
        }
        if self.port == 0 {
            return Err(invalid("port must be between 1 and 65535".to_string()));
        }
        if !USERNAME_RE.is_match(&self.username) {
            return Err(invalid(format!("invalid username '{}'", self.username)));
        }
        if !self.remote_path.starts_with('/') {
            return Err(invalid(format!(
                "remote_path must be absolute (got '{}')",
                self.remote_path
            )));
        }
        Ok(())
    }

    /// Check that the credential fields required by `auth_method` are present.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidRecord` naming the missing field.
    pub fn validate_credentials(&self) -> Result<(), RegistryError> {
        if let Some(field) = self.missing_credential_field() {
            return Err(RegistryError::InvalidRecord {
                id: self.id.clone(),
                reason: format!("{} auth requires {field}", self.auth_method),
            });
        }
        Ok(())
    }

    /// Full record validation, applied on `add` and `update`.
    ///
    /// # Errors
    ///
    /// Returns the first structural or credential problem found.
    pub fn validate(&self) -> Result<(), RegistryError> {
        self.validate_structure()?;
        self.validate_credentials()
    }

    /// First credential field required by `auth_method` that is absent.
    #[must_use]
    pub fn missing_credential_field(&self) -> Option<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        if self.auth_method.needs_key() && blank(&self.ssh_key_path) {
            return Some("ssh_key_path");
        }
        if self.auth_method.needs_secret() && blank(&self.password_base64) {
            return Some("password_base64");
        }
        None
    }

    /// Add a tag unless already present.
    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Partial update for a `TargetServer`; `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ServerPatch {
    pub name: Option<String>,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub auth_method: Option<AuthMethod>,
    pub ssh_key_path: Option<String>,
    /// Already encoded secret.
    pub password_base64: Option<String>,
    pub remote_path: Option<String>,
    pub enabled: Option<bool>,
    pub priority: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub max_retries: Option<u32>,
    pub retry_delay_seconds: Option<u64>,
}

impl ServerPatch {
    /// Apply the supplied fields to `server`.
    pub fn apply_to(self, server: &mut TargetServer) {
        if let Some(v) = self.name {
            server.name = v;
        }
        if let Some(v) = self.ip {
            server.ip = v;
        }
        if let Some(v) = self.port {
            server.port = v;
        }
        if let Some(v) = self.username {
            server.username = v;
        }
        if let Some(v) = self.auth_method {
            server.auth_method = v;
        }
        if let Some(v) = self.ssh_key_path {
            server.ssh_key_path = Some(v);
        }
        if let Some(v) = self.password_base64 {
            server.password_base64 = Some(v);
        }
        if let Some(v) = self.remote_path {
            server.remote_path = v;
        }
        if let Some(v) = self.enabled {
            server.enabled = v;
        }
        if let Some(v) = self.priority {
            server.priority = v;
        }
        if let Some(tags) = self.tags {
            server.tags.clear();
            for tag in &tags {
                server.add_tag(tag);
            }
        }
        if let Some(v) = self.max_retries {
            server.max_retries = v;
        }
        if let Some(v) = self.retry_delay_seconds {
            server.retry_delay_seconds = v;
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.ip.is_none()
            && self.port.is_none()
            && self.username.is_none()
            && self.auth_method.is_none()
            && self.ssh_key_path.is_none()
            && self.password_base64.is_none()
            && self.remote_path.is_none()
            && self.enabled.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
            && self.max_retries.is_none()
            && self.retry_delay_seconds.is_none()
    }
}

// ── Fleet document ───────────────────────────────────────────────────────────

/// Defaults applied to new servers and to remote call timeouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSettings {
    pub port: u16,
    pub username: String,
    pub ssh_key_path: String,
    pub remote_path: String,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub connection_timeout_seconds: u64,
    pub deployment_timeout_seconds: u64,
}

impl Default for DefaultSettings {
    fn default() -> Self {
        Self {
            port: 22,
            username: "ubuntu".to_string(),
            ssh_key_path: "~/.ssh/id_rsa".to_string(),
            remote_path: "/opt/aurelia".to_string(),
            max_retries: 3,
            retry_delay_seconds: 60,
            connection_timeout_seconds: 30,
            deployment_timeout_seconds: 300,
        }
    }
}

/// Fleet-wide rollout settings. Only `parallel_deployments` drives behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentStrategy {
    #[serde(rename = "type")]
    pub strategy_type: String,
    pub parallel_deployments: usize,
    pub delay_between_deployments_seconds: u64,
    pub health_check_after_deployment: bool,
    pub rollback_on_failure: bool,
}

impl Default for DeploymentStrategy {
    fn default() -> Self {
        Self {
            strategy_type: "progressive".to_string(),
            parallel_deployments: 2,
            delay_between_deployments_seconds: 30,
            health_check_after_deployment: true,
            rollback_on_failure: false,
        }
    }
}

/// Options forwarded to the ssh client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshConfig {
    pub strict_host_key_checking: bool,
    pub compression: bool,
    pub keepalive_interval_seconds: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            strict_host_key_checking: false,
            compression: true,
            keepalive_interval_seconds: 60,
        }
    }
}

/// The whole fleet configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    pub target_servers: Vec<TargetServer>,
    #[serde(default)]
    pub default_settings: DefaultSettings,
    #[serde(default)]
    pub deployment_strategy: DeploymentStrategy,
    #[serde(default)]
    pub ssh_config: SshConfig,
}

impl FleetConfig {
    /// Validate the document as a whole, as done at load time.
    ///
    /// Credential completeness is not checked here: an incomplete record is
    /// still listed and editable, and fails at credential resolution.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, server) in self.target_servers.iter().enumerate() {
            if !seen.insert(server.id.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "target_servers[{index}]: duplicate id '{}'",
                    server.id
                )));
            }
            server
                .validate_structure()
                .map_err(|e| ConfigError::Invalid(format!("target_servers[{index}]: {e}")))?;
        }
        if self.deployment_strategy.parallel_deployments == 0 {
            return Err(ConfigError::Invalid(
                "deployment_strategy.parallel_deployments must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Ids of servers whose credential fields are incomplete.
    #[must_use]
    pub fn incomplete_credentials(&self) -> Vec<&str> {
        self.target_servers
            .iter()
            .filter(|s| s.missing_credential_field().is_some())
            .map(|s| s.id.as_str())
            .collect()
    }
}
