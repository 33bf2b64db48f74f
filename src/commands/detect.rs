//! `aurelia-fleet detect <id>` — probe a server's platform.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::Endpoint;
use crate::application::services::detect::detect_platform;
use crate::commands::{credentials, load_target};
use crate::domain::resolve_asset;
use crate::output::progress::with_spinner;

/// Run `aurelia-fleet detect <id>`.
///
/// An unsupported platform is reported, not treated as an error.
///
/// # Errors
///
/// Returns an error if the server is unknown, its credential cannot be
/// resolved, or a probe fails.
pub async fn run(app: &AppContext, id: &str) -> Result<ExitCode> {
    let (registry, server) = load_target(app, id)?;
    let credential = credentials(app).resolve(&server)?;
    let executor = app.executor(registry.config());
    let timeout = Duration::from_secs(registry.config().default_settings.connection_timeout_seconds);

    let platform = with_spinner(
        app.show_progress(),
        &format!("Detecting platform of {}...", server.id),
        detect_platform(&executor, &Endpoint::of(&server), &credential, timeout),
    )
    .await?;

    let asset = match resolve_asset(&platform.arch, &platform.os) {
        Ok(name) => Some(name),
        Err(e) => {
            tracing::info!(server = %server.id, error = %e, "no matching release asset");
            None
        }
    };
    app.renderer()
        .render_detection(&server.id, &platform, asset.as_deref())?;

    Ok(if asset.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
