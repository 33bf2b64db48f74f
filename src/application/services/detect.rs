//! Application service — remote host platform detection.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{Endpoint, RemoteExecutor};
use crate::domain::service::{ARCH_PROBE, OS_PROBE};
use crate::domain::{ArchitectureError, Credential, HostPlatform};

/// Probe the CPU architecture and distribution id of a host.
///
/// An empty OS id is allowed (minimal images without os-release); an empty
/// architecture is not.
///
/// # Errors
///
/// Returns a `NetworkError` if a probe could not run, or
/// `ArchitectureError::DetectionFailed` if one exits non-zero or the
/// architecture comes back empty.
pub async fn detect_platform(
    executor: &impl RemoteExecutor,
    endpoint: &Endpoint,
    credential: &Credential,
    timeout: Duration,
) -> Result<HostPlatform> {
    let arch = probe(executor, endpoint, credential, ARCH_PROBE, "architecture", timeout).await?;
    if arch.is_empty() {
        return Err(ArchitectureError::DetectionFailed {
            host: endpoint.host.clone(),
            probe: "architecture",
            detail: "empty output".to_string(),
        }
        .into());
    }
    let os = probe(executor, endpoint, credential, OS_PROBE, "os", timeout).await?;
    tracing::info!(host = %endpoint.host, %arch, %os, "platform detected");
    Ok(HostPlatform { arch, os })
}

async fn probe(
    executor: &impl RemoteExecutor,
    endpoint: &Endpoint,
    credential: &Credential,
    command: &str,
    what: &'static str,
    timeout: Duration,
) -> Result<String> {
    let output = executor
        .execute(endpoint, credential, command, timeout)
        .await
        .with_context(|| format!("probing {what} on {}", endpoint.host))?;
    if !output.success() {
        return Err(ArchitectureError::DetectionFailed {
            host: endpoint.host.clone(),
            probe: what,
            detail: format!("exit code {}: {}", output.exit_code, output.stderr.trim()),
        }
        .into());
    }
    Ok(output.stdout.trim().to_string())
}
