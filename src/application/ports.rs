//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::{Credential, FleetConfig, Release};

// ── Value Types ───────────────────────────────────────────────────────────────

/// Where a remote call goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub user: String,
}

impl Endpoint {
    #[must_use]
    pub fn of(server: &crate::domain::TargetServer) -> Self {
        Self {
            host: server.ip.clone(),
            port: server.port,
            user: server.username.clone(),
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// Captured result of a remote command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with extra environment variables and a timeout.
    ///
    /// Used to hand secrets to helpers without putting them on argv.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<Output>;
}

// ── Remote Execution Port ─────────────────────────────────────────────────────

/// One command or one file copy against a host, bounded by a timeout.
///
/// Failures never touch local or registry state.
#[allow(async_fn_in_trait)]
pub trait RemoteExecutor {
    /// Run `command` through the remote shell.
    ///
    /// A non-zero exit code of the command itself is returned as output, not
    /// as an error.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` (timeout, auth failure, unreachable host) when
    /// the command could not be run to completion.
    async fn execute(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput>;

    /// Copy one local file to `remote_path`.
    ///
    /// # Errors
    ///
    /// Returns a `NetworkError` if the copy did not complete.
    async fn transfer_file(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()>;
}

// ── Release Ports ─────────────────────────────────────────────────────────────

/// Resolves version tags against the artifact host.
#[allow(async_fn_in_trait)]
pub trait ReleaseSource {
    /// Fetch release metadata; `latest` selects the newest release.
    ///
    /// # Errors
    ///
    /// Returns `ReleaseError::TagNotFound` for unknown tags, or a network error.
    async fn get_release(&self, tag: &str) -> Result<Release>;
}

/// Downloads and unpacks release archives.
#[allow(async_fn_in_trait)]
pub trait ArtifactStager {
    /// Download `url` into `dest_dir` and return the archive path.
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf>;
    /// Extract the agent binary next to the archive and return its path.
    async fn extract(&self, archive: &Path) -> Result<PathBuf>;
}

// ── Registry Store Port ───────────────────────────────────────────────────────

/// Persists the whole fleet document.
pub trait RegistryStore {
    /// Load and validate the fleet document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound`, `Parse` or `Invalid`.
    fn load(&self) -> Result<FleetConfig>;
    /// Replace the stored document atomically.
    fn save(&self, config: &FleetConfig) -> Result<()>;
    /// Location of the stored document, for messages.
    fn path(&self) -> PathBuf;
}

// ── Local Environment Ports ───────────────────────────────────────────────────

/// Local filesystem queries needed by credential resolution.
pub trait LocalFs {
    fn exists(&self, path: &Path) -> bool;
    fn home_dir(&self) -> Option<PathBuf>;
}

/// Interactive source of secrets that are not stored.
pub trait SecretPrompt {
    /// Ask for a secret. `Ok(None)` means the operator declined.
    fn prompt_secret(&self, label: &str) -> Result<Option<String>>;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}

/// Reporter that drops every event, for callers without a terminal.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {
    fn step(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warn(&self, _: &str) {}
}
