//! Application context — unified state passed to every command handler.
//!
//! Cross-cutting flags (output mode, prompts, config location) are resolved
//! once here so command signatures stay `fn run(app: &AppContext, ..)`.

use std::path::PathBuf;

use anyhow::Result;

use crate::application::services::registry::ServerRegistry;
use crate::domain::FleetConfig;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::JsonRegistryStore;
use crate::infra::fs::HostFs;
use crate::infra::github::GithubReleases;
use crate::infra::prompt::TerminalPrompt;
use crate::infra::ssh::{SshExecutor, SshOptions};
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    /// Disable ANSI color output.
    pub no_color: bool,
    /// Suppress non-error output.
    pub quiet: bool,
    /// Enable JSON output mode.
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `AURELIA_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
    /// Fleet configuration file.
    pub config_path: PathBuf,
    /// `owner/name` of the repository publishing agent releases.
    pub repo: String,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    /// Output rendering mode (human vs JSON).
    pub mode: OutputMode,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `AURELIA_YES`
    /// environment variables are present.
    pub non_interactive: bool,
    pub config_path: PathBuf,
    pub repo: String,
    fs: HostFs,
    prompt: TerminalPrompt,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    #[must_use]
    pub fn new(flags: AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("AURELIA_YES").is_ok();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        Self {
            output: OutputContext::new(flags.output.no_color, flags.output.quiet),
            mode,
            non_interactive,
            config_path: flags.config_path,
            repo: flags.repo,
            fs: HostFs,
            prompt: TerminalPrompt,
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    /// Spinners only make sense for interactive human output.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        !self.is_json() && self.output.show_progress()
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true`, returns `default` immediately
    /// without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    /// Load the fleet registry. A missing file is an error.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file is missing, malformed or invalid.
    pub fn registry(&self) -> Result<ServerRegistry<JsonRegistryStore>> {
        ServerRegistry::load(JsonRegistryStore::new(&self.config_path))
    }

    /// Load the fleet registry, starting empty when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if an existing file is malformed or invalid.
    pub fn registry_or_empty(&self) -> Result<ServerRegistry<JsonRegistryStore>> {
        ServerRegistry::load(JsonRegistryStore::new(&self.config_path).create_missing())
    }

    /// Remote executor configured from the fleet's ssh settings.
    #[must_use]
    pub fn executor(&self, config: &FleetConfig) -> SshExecutor<TokioCommandRunner> {
        SshExecutor::new(
            TokioCommandRunner::default(),
            SshOptions::from_config(&config.ssh_config, &config.default_settings),
        )
    }

    #[must_use]
    pub fn releases(&self) -> GithubReleases {
        GithubReleases::from_env(&self.repo)
    }

    #[must_use]
    pub fn fs(&self) -> &HostFs {
        &self.fs
    }

    /// Secret prompt, unavailable in non-interactive runs and JSON mode.
    #[must_use]
    pub fn prompt(&self) -> Option<&TerminalPrompt> {
        (!self.non_interactive && !self.is_json()).then_some(&self.prompt)
    }
}
