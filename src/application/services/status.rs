//! Application service — reachability check and remote service status.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::ports::{Endpoint, RemoteExecutor};
use crate::domain::Credential;
use crate::domain::service;

/// Result of running `echo ok` on a target.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionCheck {
    pub reachable: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Run a trivial command to prove the login works.
///
/// # Errors
///
/// Returns a `NetworkError` when the host cannot be reached or rejects the
/// credential.
pub async fn check_connection(
    executor: &impl RemoteExecutor,
    endpoint: &Endpoint,
    credential: &Credential,
    timeout: Duration,
) -> Result<ConnectionCheck> {
    let started = Instant::now();
    let output = executor
        .execute(endpoint, credential, "echo ok", timeout)
        .await
        .with_context(|| format!("connecting to {endpoint}"))?;
    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let reachable = output.success() && output.stdout.trim() == "ok";
    Ok(ConnectionCheck {
        reachable,
        latency_ms,
        detail: (!reachable).then(|| {
            format!("exit code {}: {}", output.exit_code, output.stderr.trim())
        }),
    })
}

/// What systemd reports about the agent on one target.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceReport {
    /// Output of `systemctl is-active`, e.g. `active`, `inactive`, `failed`.
    pub state: String,
    pub status_text: String,
    pub log_tail: String,
}

impl ServiceReport {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == "active"
    }
}

/// Collect activity state, status text and the journal tail.
///
/// A unit that does not exist is reported, not treated as an error.
///
/// # Errors
///
/// Returns a `NetworkError` if any of the commands could not be run.
pub async fn service_report(
    executor: &impl RemoteExecutor,
    endpoint: &Endpoint,
    credential: &Credential,
    log_lines: u32,
    timeout: Duration,
) -> Result<ServiceReport> {
    let state = executor
        .execute(endpoint, credential, &service::is_active_command(), timeout)
        .await
        .context("querying service state")?
        .stdout
        .trim()
        .to_string();
    let status_text = executor
        .execute(endpoint, credential, &service::status_command(), timeout)
        .await
        .context("querying service status")?
        .stdout;
    let log_tail = executor
        .execute(endpoint, credential, &service::journal_command(log_lines), timeout)
        .await
        .context("reading service journal")?
        .stdout;
    tracing::info!(host = %endpoint.host, %state, "service status collected");
    Ok(ServiceReport {
        state: if state.is_empty() { "unknown".into() } else { state },
        status_text,
        log_tail,
    })
}
