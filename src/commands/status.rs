//! `aurelia-fleet status <id>` — report the agent service on one server.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::Endpoint;
use crate::application::services::status::service_report;
use crate::commands::{credentials, load_target};
use crate::output::progress::with_spinner;

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    /// Server id
    pub id: String,
    /// Journal lines to show
    #[arg(short = 'n', long, default_value_t = 20)]
    pub lines: u32,
}

/// Run `aurelia-fleet status <id>`.
///
/// Exits non-zero when the service is not active.
///
/// # Errors
///
/// Returns an error if the server is unknown or cannot be reached.
pub async fn run(app: &AppContext, args: &StatusArgs) -> Result<ExitCode> {
    let (registry, server) = load_target(app, &args.id)?;
    let credential = credentials(app).resolve(&server)?;
    let executor = app.executor(registry.config());
    let timeout = Duration::from_secs(registry.config().default_settings.connection_timeout_seconds);

    let report = with_spinner(
        app.show_progress(),
        &format!("Querying {}...", server.id),
        service_report(&executor, &Endpoint::of(&server), &credential, args.lines, timeout),
    )
    .await?;
    app.renderer().render_service(&server.id, &report)?;

    Ok(if report.is_active() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
