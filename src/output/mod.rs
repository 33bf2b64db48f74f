//! Output formatting module

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use anyhow::Result;
use console::Term;
use owo_colors::OwoColorize as _;

pub use human::HumanRenderer;
pub use json::JsonRenderer;
pub use reporter::TerminalReporter;
pub use styles::Styles;

use crate::application::services::fleet::FleetReport;
use crate::application::services::status::{ConnectionCheck, ServiceReport};
use crate::domain::{DeploymentResult, HostPlatform, TargetServer};

/// Output context carrying styling and terminal state.
pub struct OutputContext {
    /// Stylesheet for colored output.
    pub styles: Styles,
    /// Whether stdout is a TTY.
    pub is_tty: bool,
    /// Whether to suppress non-error output.
    pub quiet: bool,
}

impl OutputContext {
    /// Create output context based on CLI flags and environment.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let use_colors = !no_color && is_tty && std::env::var("NO_COLOR").is_err();

        let mut styles = Styles::default();
        if use_colors {
            styles.colorize();
        }

        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Check if progress indicators should be shown.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    /// Print a success message prefixed with `✓`. Suppressed when `quiet`.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "✓".style(self.styles.success));
        }
    }

    /// Print a warning message prefixed with `⚠`. Suppressed when `quiet`.
    pub fn warn(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "⚠".style(self.styles.warning));
        }
    }

    /// Print an error message prefixed with `✗` to stderr. Never suppressed.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// Print an info message prefixed with `ℹ`. Suppressed when `quiet`.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", "ℹ".style(self.styles.info));
        }
    }

    /// Print a section header. Suppressed when `quiet`.
    pub fn header(&self, msg: &str) {
        if !self.quiet {
            println!("  {}", msg.style(self.styles.header));
        }
    }

    /// Print a key-value pair with the key dimmed. Suppressed when `quiet`.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }
}

/// Renderer for the active output mode.
pub enum Renderer<'a> {
    Human(HumanRenderer<'a>),
    Json(JsonRenderer),
}

impl Renderer<'_> {
    pub fn render_servers(&self, servers: &[&TargetServer]) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_servers(servers);
                Ok(())
            }
            Self::Json(r) => r.render_servers(servers),
        }
    }

    pub fn render_server(&self, server: &TargetServer) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_server(server);
                Ok(())
            }
            Self::Json(r) => r.render_server(server),
        }
    }

    pub fn render_change(&self, id: &str, action: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_change(id, action);
                Ok(())
            }
            Self::Json(r) => r.render_change(id, action),
        }
    }

    pub fn render_connection(&self, id: &str, check: &ConnectionCheck) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_connection(id, check);
                Ok(())
            }
            Self::Json(r) => r.render_connection(id, check),
        }
    }

    pub fn render_detection(&self, id: &str, platform: &HostPlatform, asset: Option<&str>) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_detection(id, platform, asset);
                Ok(())
            }
            Self::Json(r) => r.render_detection(id, platform, asset),
        }
    }

    pub fn render_deployment(&self, result: &DeploymentResult) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_deployment(result);
                Ok(())
            }
            Self::Json(r) => r.render_deployment(result),
        }
    }

    pub fn render_fleet(&self, report: &FleetReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_fleet(report);
                Ok(())
            }
            Self::Json(r) => r.render_fleet(report),
        }
    }

    pub fn render_service(&self, id: &str, report: &ServiceReport) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_service(id, report);
                Ok(())
            }
            Self::Json(r) => r.render_service(id, report),
        }
    }

    pub fn render_version(&self, version: &str) -> Result<()> {
        match self {
            Self::Human(r) => {
                r.render_version(version);
                Ok(())
            }
            Self::Json(r) => r.render_version(version),
        }
    }
}
