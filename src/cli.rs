//! CLI argument parsing with clap derive

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;
use crate::infra::config::{CONFIG_ENV, DEFAULT_CONFIG_PATH};
use crate::infra::github::DEFAULT_RELEASE_REPO;

/// Deploy the Aurelia agent to a fleet of Linux servers over SSH
#[derive(Parser)]
#[command(
    name = "aurelia-fleet",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Fleet configuration file
    #[arg(long, global = true, env = CONFIG_ENV, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// GitHub repository publishing agent releases
    #[arg(long, global = true, env = "AURELIA_RELEASE_REPO", default_value = DEFAULT_RELEASE_REPO)]
    pub repo: String,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Skip confirmation and secret prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    // `None` only when a flag arrived through the environment, which keeps
    // clap from printing help on a bare invocation.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage the target server registry
    #[command(subcommand)]
    Servers(commands::servers::ServersCommand),

    /// Detect a server's architecture and matching release asset
    Detect {
        /// Server id
        id: String,
    },

    /// Deploy the agent to one server or the whole fleet
    Deploy(commands::deploy::DeployArgs),

    /// Show the agent service state on a server
    Status(commands::status::StatusArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Log filter directive implied by `-v`, used when `RUST_LOG` is unset.
    #[must_use]
    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            config,
            repo,
            json,
            quiet,
            no_color,
            yes,
            verbose: _,
            command,
        } = self;
        let Some(command) = command else {
            eprint!("{}", Cli::command().render_help());
            return Ok(ExitCode::from(2));
        };
        let app = AppContext::new(AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
            config_path: config,
            repo,
        });

        match command {
            Command::Servers(cmd) => commands::servers::run(&app, cmd).await,
            Command::Detect { id } => commands::detect::run(&app, &id).await,
            Command::Deploy(args) => commands::deploy::run(&app, &args).await,
            Command::Status(args) => commands::status::run(&app, &args).await,
            Command::Version => commands::version::run(&app),
        }
    }
}
