//! Shared port stubs for service tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;

use crate::application::ports::{
    ArtifactStager, CommandOutput, Endpoint, LocalFs, ProgressReporter, RegistryStore,
    ReleaseSource, RemoteExecutor, SecretPrompt,
};
use crate::domain::{Credential, FleetConfig, NetworkError, Release, ReleaseError};

// ── Registry store ───────────────────────────────────────────────────────────

/// In-memory `RegistryStore` that records what was saved.
pub struct MemoryStore {
    initial: FleetConfig,
    saved: Mutex<Option<FleetConfig>>,
    saves: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn with(config: FleetConfig) -> Self {
        Self {
            initial: config,
            saved: Mutex::new(None),
            saves: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn saved(&self) -> Option<FleetConfig> {
        self.saved.lock().ok().and_then(|s| s.clone())
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<FleetConfig> {
        Ok(self.saved().unwrap_or_else(|| self.initial.clone()))
    }

    fn save(&self, config: &FleetConfig) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut saved) = self.saved.lock() {
            *saved = Some(config.clone());
        }
        Ok(())
    }

    fn path(&self) -> PathBuf {
        PathBuf::from("memory://target_servers.json")
    }
}

// ── Local environment ────────────────────────────────────────────────────────

/// `LocalFs` where every path exists unless listed as missing.
pub struct StubFs {
    pub home: Option<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl Default for StubFs {
    fn default() -> Self {
        Self {
            home: Some(PathBuf::from("/home/operator")),
            missing: Vec::new(),
        }
    }
}

impl LocalFs for StubFs {
    fn exists(&self, path: &Path) -> bool {
        !self.missing.iter().any(|m| m == path)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home.clone()
    }
}

/// `SecretPrompt` with a fixed answer that counts how often it was asked.
pub struct StubPrompt {
    pub answer: Option<String>,
    pub asked: AtomicUsize,
}

impl StubPrompt {
    pub fn answering(answer: Option<&str>) -> Self {
        Self {
            answer: answer.map(str::to_string),
            asked: AtomicUsize::new(0),
        }
    }
}

impl SecretPrompt for StubPrompt {
    fn prompt_secret(&self, _label: &str) -> Result<Option<String>> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        Ok(self.answer.clone())
    }
}

// ── Remote executor ──────────────────────────────────────────────────────────

/// Scripted answer for a remote command.
#[derive(Clone)]
pub enum Reply {
    Stdout(String),
    Exit(i32, String),
    Unreachable,
}

/// `RemoteExecutor` answering probes from fixed values.
///
/// Replies are matched by substring in order; unmatched commands succeed
/// with empty output. Every call is recorded, and the number of calls in
/// flight at once is tracked.
pub struct StubExecutor {
    pub arch: String,
    pub os: String,
    pub service_state: String,
    pub replies: Vec<(&'static str, Reply)>,
    pub transfer_fails: bool,
    pub latency: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubExecutor {
    pub fn new(arch: &str, os: &str) -> Self {
        Self {
            arch: arch.to_string(),
            os: os.to_string(),
            service_state: "active".to_string(),
            replies: Vec::new(),
            transfer_fails: false,
            latency: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn reply(mut self, pattern: &'static str, reply: Reply) -> Self {
        self.replies.push((pattern, reply));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    async fn hold(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn answer(&self, endpoint: &Endpoint, command: &str) -> Result<CommandOutput> {
        let reply = self
            .replies
            .iter()
            .find(|(pattern, _)| command.contains(pattern))
            .map(|(_, r)| r.clone())
            .unwrap_or_else(|| {
                if command == crate::domain::service::ARCH_PROBE {
                    Reply::Stdout(format!("{}\n", self.arch))
                } else if command.contains("os-release") {
                    Reply::Stdout(format!("{}\n", self.os))
                } else if command.contains("is-active") {
                    Reply::Stdout(format!("{}\n", self.service_state))
                } else {
                    Reply::Stdout(String::new())
                }
            });
        match reply {
            Reply::Stdout(stdout) => Ok(CommandOutput {
                exit_code: 0,
                stdout,
                stderr: String::new(),
            }),
            Reply::Exit(code, stderr) => Ok(CommandOutput {
                exit_code: code,
                stdout: String::new(),
                stderr,
            }),
            Reply::Unreachable => Err(NetworkError::Unreachable {
                host: endpoint.host.clone(),
                detail: "No route to host".into(),
            }
            .into()),
        }
    }
}

impl RemoteExecutor for StubExecutor {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        _credential: &Credential,
        command: &str,
        _timeout: Duration,
    ) -> Result<CommandOutput> {
        self.record(command.to_string());
        self.hold().await;
        self.answer(endpoint, command)
    }

    async fn transfer_file(
        &self,
        endpoint: &Endpoint,
        _credential: &Credential,
        _local_path: &Path,
        remote_path: &str,
    ) -> Result<()> {
        self.record(format!("scp {remote_path}"));
        self.hold().await;
        if self.transfer_fails {
            return Err(NetworkError::TransferFailed {
                host: endpoint.host.clone(),
                detail: "lost connection".into(),
            }
            .into());
        }
        Ok(())
    }
}

// ── Release and artifact ─────────────────────────────────────────────────────

/// `ReleaseSource` that knows a single tag carrying every standard asset.
pub struct StubReleases {
    pub tag: String,
    pub assets: Vec<String>,
}

impl StubReleases {
    pub fn with_tag(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            assets: vec![
                "aurelia-linux-x86_64.tar.gz".into(),
                "aurelia-linux-x86_64-musl.tar.gz".into(),
                "aurelia-linux-aarch64.tar.gz".into(),
            ],
        }
    }
}

impl ReleaseSource for StubReleases {
    async fn get_release(&self, tag: &str) -> Result<Release> {
        if tag != self.tag && tag != crate::domain::release::LATEST {
            return Err(ReleaseError::TagNotFound(tag.to_string()).into());
        }
        Ok(Release {
            tag: self.tag.clone(),
            assets: self
                .assets
                .iter()
                .map(|a| (a.clone(), format!("https://releases.invalid/{}/{a}", self.tag)))
                .collect(),
        })
    }
}

/// `ArtifactStager` that writes placeholder files into the attempt directory.
#[derive(Default)]
pub struct StubStager {
    pub downloads: Mutex<Vec<String>>,
}

impl ArtifactStager for StubStager {
    async fn download(&self, url: &str, dest_dir: &Path) -> Result<PathBuf> {
        if let Ok(mut d) = self.downloads.lock() {
            d.push(url.to_string());
        }
        let name = url.rsplit('/').next().unwrap_or("archive.tar.gz");
        let path = dest_dir.join(name);
        std::fs::write(&path, b"archive")?;
        Ok(path)
    }

    async fn extract(&self, archive: &Path) -> Result<PathBuf> {
        let dir = archive.parent().unwrap_or(archive);
        let path = dir.join(crate::domain::service::AGENT_BINARY);
        std::fs::write(&path, b"\x7fELF")?;
        Ok(path)
    }
}

// ── Reporter ─────────────────────────────────────────────────────────────────

/// `ProgressReporter` that keeps every message.
#[derive(Default)]
pub struct RecordingReporter {
    pub messages: Mutex<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(format!("step: {message}"));
        }
    }

    fn success(&self, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(format!("ok: {message}"));
        }
    }

    fn warn(&self, message: &str) {
        if let Ok(mut m) = self.messages.lock() {
            m.push(format!("warn: {message}"));
        }
    }
}
