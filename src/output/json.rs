//! JSON renderer and error formatter for `--json` code paths.
//!
//! Server records are never printed with their stored secret; the view
//! only says whether one is configured.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::services::fleet::FleetReport;
use crate::application::services::status::{ConnectionCheck, ServiceReport};
use crate::domain::{AuthMethod, DeploymentResult, ErrorKind, HostPlatform, TargetServer};

/// Public view of a server record.
#[derive(Debug, Serialize)]
pub struct ServerView<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub ip: &'a str,
    pub port: u16,
    pub username: &'a str,
    pub auth_method: AuthMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssh_key_path: Option<&'a str>,
    pub has_secret: bool,
    pub remote_path: &'a str,
    pub enabled: bool,
    pub priority: u32,
    pub tags: &'a [String],
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
}

impl<'a> From<&'a TargetServer> for ServerView<'a> {
    fn from(s: &'a TargetServer) -> Self {
        Self {
            id: &s.id,
            name: &s.name,
            ip: &s.ip,
            port: s.port,
            username: &s.username,
            auth_method: s.auth_method,
            ssh_key_path: s.ssh_key_path.as_deref(),
            has_secret: s.password_base64.as_deref().is_some_and(|p| !p.is_empty()),
            remote_path: &s.remote_path,
            enabled: s.enabled,
            priority: s.priority,
            tags: &s.tags,
            max_retries: s.max_retries,
            retry_delay_seconds: s.retry_delay_seconds,
        }
    }
}

/// Renders results as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    fn print(value: &impl Serialize) -> Result<()> {
        println!(
            "{}",
            serde_json::to_string_pretty(value).context("JSON serialization failed")?
        );
        Ok(())
    }

    pub fn render_servers(&self, servers: &[&TargetServer]) -> Result<()> {
        let views: Vec<ServerView<'_>> = servers.iter().map(|s| ServerView::from(*s)).collect();
        Self::print(&serde_json::json!({ "servers": views }))
    }

    pub fn render_server(&self, server: &TargetServer) -> Result<()> {
        Self::print(&ServerView::from(server))
    }

    pub fn render_change(&self, id: &str, action: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "id": id, "action": action }))
    }

    pub fn render_connection(&self, id: &str, check: &ConnectionCheck) -> Result<()> {
        Self::print(&serde_json::json!({ "id": id, "connection": check }))
    }

    pub fn render_detection(&self, id: &str, platform: &HostPlatform, asset: Option<&str>) -> Result<()> {
        Self::print(&serde_json::json!({
            "id": id,
            "arch": platform.arch,
            "os": platform.os,
            "asset": asset,
            "supported": asset.is_some(),
        }))
    }

    pub fn render_deployment(&self, result: &DeploymentResult) -> Result<()> {
        Self::print(result)
    }

    pub fn render_fleet(&self, report: &FleetReport) -> Result<()> {
        Self::print(&serde_json::json!({
            "tag": report.tag,
            "succeeded": report.succeeded(),
            "failed": report.failed(),
            "results": report.results,
        }))
    }

    pub fn render_service(&self, id: &str, report: &ServiceReport) -> Result<()> {
        Self::print(&serde_json::json!({ "id": id, "service": report }))
    }

    pub fn render_version(&self, version: &str) -> Result<()> {
        Self::print(&serde_json::json!({ "version": version }))
    }
}

/// Format a JSON error object.
///
/// ```json
/// { "error": true, "message": "...", "kind": "..." }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, kind: ErrorKind) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "kind": kind,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}
