//! Command implementations

pub mod deploy;
pub mod detect;
pub mod servers;
pub mod status;
pub mod version;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::services::credentials::CredentialResolver;
use crate::application::services::registry::ServerRegistry;
use crate::domain::TargetServer;
use crate::infra::config::JsonRegistryStore;
use crate::infra::fs::HostFs;

/// Credential resolver that may prompt when the session is interactive.
pub(crate) fn credentials(app: &AppContext) -> CredentialResolver<'_, HostFs> {
    let resolver = CredentialResolver::new(app.fs());
    match app.prompt() {
        Some(prompt) => resolver.with_prompt(prompt),
        None => resolver,
    }
}

/// Load the registry and look up one server by id.
pub(crate) fn load_target(
    app: &AppContext,
    id: &str,
) -> Result<(ServerRegistry<JsonRegistryStore>, TargetServer)> {
    let registry = app.registry()?;
    let server = registry.get(id)?.clone();
    Ok((registry, server))
}
