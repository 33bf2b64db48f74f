//! `aurelia-fleet deploy` — install an agent release on one server or the fleet.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{ProgressReporter, SilentReporter};
use crate::application::services::deploy::{DeployOptions, Deployer};
use crate::application::services::fleet::{deploy_fleet, fleet_snapshot};
use crate::commands::credentials;
use crate::domain::release::LATEST;
use crate::infra::artifact::HttpArtifactStager;
use crate::output::TerminalReporter;

/// Arguments for the deploy command.
#[derive(Args)]
pub struct DeployArgs {
    /// Server id
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub id: Option<String>,
    /// Deploy to every enabled server
    #[arg(long)]
    pub all: bool,
    /// Release tag to install
    #[arg(long, default_value = LATEST)]
    pub tag: String,
    /// Override the server's remote path
    #[arg(long, value_name = "PATH")]
    pub deploy_path: Option<String>,
    /// Maximum concurrent deployments (fleet only)
    #[arg(long, value_name = "N", conflicts_with = "id")]
    pub parallel: Option<usize>,
    /// Only servers carrying this tag (fleet only)
    #[arg(long, value_name = "TAG", conflicts_with = "id")]
    pub tag_filter: Option<String>,
}

/// Run `aurelia-fleet deploy`.
///
/// Exits non-zero if any deployment failed.
///
/// # Errors
///
/// Returns an error if the registry cannot be loaded or the server is
/// unknown. Deployment failures are reported, not returned.
pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<ExitCode> {
    if app.is_json() {
        execute(app, args, &SilentReporter).await
    } else {
        execute(app, args, &TerminalReporter::new(&app.output)).await
    }
}

async fn execute(
    app: &AppContext,
    args: &DeployArgs,
    reporter: &impl ProgressReporter,
) -> Result<ExitCode> {
    let registry = app.registry()?;
    let config = registry.config();
    let executor = app.executor(config);
    let releases = app.releases();
    let stager = HttpArtifactStager;
    let resolver = credentials(app);
    let deployer = Deployer::new(
        &executor,
        &releases,
        &stager,
        &resolver,
        DeployOptions::from_settings(&config.default_settings),
    );
    let deploy_path = args.deploy_path.as_deref();

    if !args.all {
        let id = args.id.as_deref().unwrap_or_default();
        let server = registry.get(id)?;
        if !server.enabled {
            app.output
                .warn(&format!("Server '{id}' is disabled; deploying anyway"));
        }
        let result = deployer.deploy(server, &args.tag, deploy_path, reporter).await;
        app.renderer().render_deployment(&result)?;
        return Ok(if result.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        });
    }

    let targets = fleet_snapshot(registry.list(), args.tag_filter.as_deref());
    if targets.is_empty() {
        app.output.info("No enabled servers match.");
        return Ok(ExitCode::SUCCESS);
    }
    let prompt = format!("Deploy {} to {} server(s)?", args.tag, targets.len());
    if !app.confirm(&prompt, true)? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }

    let parallel = args
        .parallel
        .unwrap_or(config.deployment_strategy.parallel_deployments);
    let report = deploy_fleet(&deployer, &targets, &args.tag, deploy_path, parallel, reporter).await;
    app.renderer().render_fleet(&report)?;

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
