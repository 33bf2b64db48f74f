//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::application::services::fleet::FleetReport;
use crate::application::services::status::{ConnectionCheck, ServiceReport};
use crate::domain::{DeploymentResult, HostPlatform, StageEvent, TargetServer};
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render servers as an aligned table.
    pub fn render_servers(&self, servers: &[&TargetServer]) {
        if servers.is_empty() {
            self.ctx.info("No servers configured.");
            self.ctx.info("Add one with: aurelia-fleet servers add --id <id> --name <name> --ip <ip>");
            return;
        }
        let id_w = servers.iter().map(|s| s.id.len()).max().unwrap_or(2).max(2);
        let host_w = servers
            .iter()
            .map(|s| endpoint(s).len())
            .max()
            .unwrap_or(4)
            .max(4);
        println!(
            "  {}",
            format!(
                "{:<id_w$}  {:<host_w$}  {:<19}  {:>8}  {:<8}  TAGS",
                "ID", "HOST", "AUTH", "PRIORITY", "STATE"
            )
            .style(self.ctx.styles.header)
        );
        for s in servers {
            let state = if s.enabled {
                format!("{:<8}", "enabled").style(self.ctx.styles.success).to_string()
            } else {
                format!("{:<8}", "disabled").style(self.ctx.styles.dim).to_string()
            };
            let host = format!("{:<host_w$}", endpoint(s));
            println!(
                "  {:<id_w$}  {}  {:<19}  {:>8}  {state}  {}",
                s.id,
                host.style(self.ctx.styles.host),
                s.auth_method.to_string(),
                s.priority,
                s.tags.join(",")
            );
        }
    }

    /// Render one server record in full, without its secret.
    pub fn render_server(&self, s: &TargetServer) {
        self.ctx.header(&format!("{} ({})", s.name, s.id));
        self.ctx.kv("Host:       ", &endpoint(s));
        self.ctx.kv("Auth:       ", &s.auth_method.to_string());
        if let Some(key) = &s.ssh_key_path {
            self.ctx.kv("SSH key:    ", key);
        }
        if s.auth_method.needs_secret() {
            let stored = s.password_base64.as_deref().is_some_and(|p| !p.is_empty());
            self.ctx.kv(
                "Secret:     ",
                if stored { "stored (base64)" } else { "not stored" },
            );
        }
        self.ctx.kv("Deploy path:", &s.remote_path);
        self.ctx.kv("Enabled:    ", if s.enabled { "yes" } else { "no" });
        self.ctx.kv("Priority:   ", &s.priority.to_string());
        self.ctx.kv(
            "Tags:       ",
            &if s.tags.is_empty() { "-".to_string() } else { s.tags.join(", ") },
        );
        self.ctx.kv(
            "Retries:    ",
            &format!("{} every {}s (advisory)", s.max_retries, s.retry_delay_seconds),
        );
    }

    pub fn render_change(&self, id: &str, action: &str) {
        self.ctx.success(&format!("Server '{id}' {action}"));
    }

    pub fn render_connection(&self, id: &str, check: &ConnectionCheck) {
        if check.reachable {
            self.ctx
                .success(&format!("{id}: connection ok ({} ms)", check.latency_ms));
        } else {
            self.ctx.warn(&format!(
                "{id}: connected but the test command failed: {}",
                check.detail.as_deref().unwrap_or("unknown")
            ));
        }
    }

    pub fn render_detection(&self, id: &str, platform: &HostPlatform, asset: Option<&str>) {
        self.ctx.header(id);
        self.ctx.kv("Architecture:", &platform.arch);
        self.ctx.kv(
            "OS:          ",
            if platform.os.is_empty() { "unknown" } else { &platform.os },
        );
        match asset {
            Some(name) => self.ctx.kv("Asset:       ", name),
            None => self.ctx.warn("No release build for this platform"),
        }
    }

    /// Render one deployment transcript.
    #[allow(clippy::cast_precision_loss)] // elapsed milliseconds fit easily
    pub fn render_deployment(&self, result: &DeploymentResult) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&format!("Deployment to {}", result.server_id));
        for event in &result.transcript {
            match event {
                StageEvent::Reached(stage) => {
                    println!(
                        "    {} {}",
                        "✓".style(self.ctx.styles.success),
                        stage.style(self.ctx.styles.stage)
                    );
                }
                StageEvent::Failed { stage, error, .. } => {
                    println!(
                        "    {} {}: {error}",
                        "✗".style(self.ctx.styles.error),
                        stage.style(self.ctx.styles.stage)
                    );
                }
            }
        }
        if let Some(asset) = &result.asset {
            self.ctx
                .kv("Release:", &format!("{} ({})", asset.tag, asset.asset_name));
        }
        let elapsed = result.finished_at - result.started_at;
        self.ctx
            .kv("Elapsed:", &format!("{:.1}s", elapsed.num_milliseconds() as f64 / 1000.0));
        if let Some(status) = &result.diagnostics.service_status {
            println!();
            self.ctx.header("Service status:");
            print_block(status);
        }
        if let Some(logs) = &result.diagnostics.log_tail {
            println!();
            self.ctx.header("Recent logs:");
            print_block(logs);
        }
    }

    pub fn render_fleet(&self, report: &FleetReport) {
        for result in &report.results {
            self.render_deployment(result);
        }
        println!();
        self.ctx.header(&format!("Fleet deployment of {}", report.tag));
        for result in &report.results {
            match &result.failure {
                None => self.ctx.success(&result.server_id),
                Some(f) => self.ctx.error(&format!(
                    "{}: failed at {} ({} error)",
                    result.server_id, f.stage, f.kind
                )),
            }
        }
        self.ctx.info(&format!(
            "{} succeeded, {} failed",
            report.succeeded(),
            report.failed()
        ));
    }

    pub fn render_service(&self, id: &str, report: &ServiceReport) {
        if report.is_active() {
            self.ctx.success(&format!("{id}: service active"));
        } else {
            self.ctx.warn(&format!("{id}: service {}", report.state));
        }
        if self.ctx.quiet {
            return;
        }
        if !report.status_text.trim().is_empty() {
            println!();
            self.ctx.header("Status:");
            print_block(&report.status_text);
        }
        if !report.log_tail.trim().is_empty() {
            println!();
            self.ctx.header("Recent logs:");
            print_block(&report.log_tail);
        }
    }

    pub fn render_version(&self, version: &str) {
        println!("aurelia-fleet {version}");
    }
}

fn endpoint(s: &TargetServer) -> String {
    format!("{}@{}:{}", s.username, s.ip, s.port)
}

fn print_block(text: &str) {
    for line in text.lines() {
        println!("    {line}");
    }
}
