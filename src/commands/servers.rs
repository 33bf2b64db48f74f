//! `aurelia-fleet servers` — manage the target server registry.

use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};

use crate::app::AppContext;
use crate::application::ports::{Endpoint, SecretPrompt};
use crate::application::services::registry::sort_by_priority;
use crate::application::services::status;
use crate::commands::{credentials, load_target};
use crate::domain::{AuthMethod, ServerPatch, TargetServer, encode_secret};
use crate::output::progress::with_spinner;

/// Server registry subcommands.
#[derive(Subcommand)]
pub enum ServersCommand {
    /// List registered servers
    List {
        /// Only enabled servers
        #[arg(long)]
        enabled: bool,
        /// Sort by deployment priority
        #[arg(long)]
        by_priority: bool,
        /// Only servers carrying this tag
        #[arg(long, value_name = "TAG")]
        tag: Option<String>,
    },
    /// Show one server
    Show {
        /// Server id
        id: String,
    },
    /// Register a new server
    Add(AddArgs),
    /// Change fields of a registered server
    Update(UpdateArgs),
    /// Remove a server from the registry
    Remove {
        /// Server id
        id: String,
    },
    /// Include a server in fleet deployments
    Enable {
        /// Server id
        id: String,
    },
    /// Exclude a server from fleet deployments
    Disable {
        /// Server id
        id: String,
    },
    /// Check that the server accepts a login
    Test {
        /// Server id
        id: String,
    },
}

/// Authentication method accepted on the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AuthArg {
    Key,
    Password,
    KeyWithPassphrase,
}

impl From<AuthArg> for AuthMethod {
    fn from(arg: AuthArg) -> Self {
        match arg {
            AuthArg::Key => Self::Key,
            AuthArg::Password => Self::Password,
            AuthArg::KeyWithPassphrase => Self::KeyWithPassphrase,
        }
    }
}

/// Arguments for `servers add`. Unset fields come from `default_settings`.
#[derive(Args)]
pub struct AddArgs {
    /// Unique server id
    #[arg(long)]
    pub id: String,
    /// Display name
    #[arg(long)]
    pub name: String,
    /// Host name or address
    #[arg(long)]
    pub ip: String,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub username: Option<String>,
    /// Authentication method
    #[arg(long, value_enum, default_value = "key")]
    pub auth: AuthArg,
    /// Private key path (`~` is expanded at connect time)
    #[arg(long, value_name = "PATH")]
    pub ssh_key: Option<String>,
    /// Password or key passphrase, stored base64-encoded
    #[arg(long, env = "AURELIA_SERVER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Directory holding the agent binary on the server
    #[arg(long, value_name = "PATH")]
    pub remote_path: Option<String>,
    /// Deployment priority, lower goes first
    #[arg(long, default_value_t = 1)]
    pub priority: u32,
    /// Tag, repeatable
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,
    #[arg(long)]
    pub max_retries: Option<u32>,
    /// Seconds between retries
    #[arg(long, value_name = "SECS")]
    pub retry_delay: Option<u64>,
    /// Register the server disabled
    #[arg(long)]
    pub disabled: bool,
}

/// Arguments for `servers update`. Only supplied fields change.
#[derive(Args)]
pub struct UpdateArgs {
    /// Server id
    pub id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub ip: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long, value_enum)]
    pub auth: Option<AuthArg>,
    #[arg(long, value_name = "PATH")]
    pub ssh_key: Option<String>,
    /// New password or key passphrase
    #[arg(long, env = "AURELIA_SERVER_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    #[arg(long, value_name = "PATH")]
    pub remote_path: Option<String>,
    #[arg(long)]
    pub priority: Option<u32>,
    /// Replace all tags, repeatable
    #[arg(long = "tag", value_name = "TAG")]
    pub tags: Option<Vec<String>>,
    #[arg(long)]
    pub max_retries: Option<u32>,
    #[arg(long, value_name = "SECS")]
    pub retry_delay: Option<u64>,
}

impl UpdateArgs {
    fn into_patch(self) -> ServerPatch {
        ServerPatch {
            name: self.name,
            ip: self.ip,
            port: self.port,
            username: self.username,
            auth_method: self.auth.map(AuthMethod::from),
            ssh_key_path: self.ssh_key,
            password_base64: self.password.as_deref().map(encode_secret),
            remote_path: self.remote_path,
            enabled: None,
            priority: self.priority,
            tags: self.tags,
            max_retries: self.max_retries,
            retry_delay_seconds: self.retry_delay,
        }
    }
}

/// Run the servers command.
///
/// # Errors
///
/// Returns an error if the registry cannot be loaded or saved, or if a
/// remote check cannot reach the server.
pub async fn run(app: &AppContext, cmd: ServersCommand) -> Result<ExitCode> {
    match cmd {
        ServersCommand::List {
            enabled,
            by_priority,
            tag,
        } => list(app, enabled, by_priority, tag.as_deref()),
        ServersCommand::Show { id } => show(app, &id),
        ServersCommand::Add(args) => add(app, args),
        ServersCommand::Update(args) => update(app, args),
        ServersCommand::Remove { id } => remove(app, &id),
        ServersCommand::Enable { id } => set_enabled(app, &id, true),
        ServersCommand::Disable { id } => set_enabled(app, &id, false),
        ServersCommand::Test { id } => test(app, &id).await,
    }
}

fn list(app: &AppContext, enabled: bool, by_priority: bool, tag: Option<&str>) -> Result<ExitCode> {
    let registry = app.registry()?;
    let mut servers: Vec<&TargetServer> = registry
        .list()
        .iter()
        .filter(|s| !enabled || s.enabled)
        .filter(|s| tag.is_none_or(|t| s.has_tag(t)))
        .collect();
    if by_priority {
        sort_by_priority(&mut servers);
    }
    app.renderer().render_servers(&servers)?;
    Ok(ExitCode::SUCCESS)
}

fn show(app: &AppContext, id: &str) -> Result<ExitCode> {
    let (_, server) = load_target(app, id)?;
    app.renderer().render_server(&server)?;
    Ok(ExitCode::SUCCESS)
}

fn add(app: &AppContext, args: AddArgs) -> Result<ExitCode> {
    let mut registry = app.registry_or_empty()?;
    let defaults = &registry.config().default_settings;
    let auth_method = AuthMethod::from(args.auth);

    let ssh_key_path = match args.ssh_key {
        Some(path) => Some(path),
        None if auth_method.needs_key() => Some(defaults.ssh_key_path.clone()),
        None => None,
    };
    let prompt = app.prompt().map(|p| p as &dyn SecretPrompt);
    let secret = secret_for_new(args.password, auth_method, &args.id, prompt)?;
    let server = TargetServer {
        id: args.id,
        name: args.name,
        ip: args.ip,
        port: args.port.unwrap_or(defaults.port),
        username: args.username.unwrap_or_else(|| defaults.username.clone()),
        ssh_key_path,
        password_base64: secret.as_deref().map(encode_secret),
        auth_method,
        remote_path: args
            .remote_path
            .unwrap_or_else(|| defaults.remote_path.clone()),
        enabled: !args.disabled,
        priority: args.priority,
        tags: args.tags,
        max_retries: args.max_retries.unwrap_or(defaults.max_retries),
        retry_delay_seconds: args.retry_delay.unwrap_or(defaults.retry_delay_seconds),
    };

    let id = server.id.clone();
    registry.add(server)?;
    app.renderer().render_change(&id, "added")?;
    Ok(ExitCode::SUCCESS)
}

/// The secret to store for a new record. Asks `prompt` when the auth method
/// needs one and none was given; a declined prompt leaves it unset.
fn secret_for_new(
    given: Option<String>,
    auth_method: AuthMethod,
    id: &str,
    prompt: Option<&dyn SecretPrompt>,
) -> Result<Option<String>> {
    match (given, prompt) {
        (Some(secret), _) => Ok(Some(secret)),
        (None, Some(prompt)) if auth_method.needs_secret() => {
            let label = format!("{} for {id}", auth_method.secret_label());
            let answer = prompt
                .prompt_secret(&label)
                .with_context(|| format!("reading {label}"))?;
            Ok(answer.filter(|s| !s.is_empty()))
        }
        (None, _) => Ok(None),
    }
}

fn update(app: &AppContext, args: UpdateArgs) -> Result<ExitCode> {
    let mut registry = app.registry()?;
    let id = args.id.clone();
    let patch = args.into_patch();
    if patch.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one field, e.g. --ip <address>");
    }
    let updated = registry.update(&id, patch)?;
    app.renderer().render_server(updated)?;
    Ok(ExitCode::SUCCESS)
}

fn remove(app: &AppContext, id: &str) -> Result<ExitCode> {
    let mut registry = app.registry()?;
    registry.get(id)?;
    if !app.confirm(&format!("Remove server '{id}' from the registry?"), true)? {
        app.output.info("Cancelled.");
        return Ok(ExitCode::SUCCESS);
    }
    registry.remove(id)?;
    app.renderer().render_change(id, "removed")?;
    Ok(ExitCode::SUCCESS)
}

fn set_enabled(app: &AppContext, id: &str, enabled: bool) -> Result<ExitCode> {
    let mut registry = app.registry()?;
    let changed = registry.set_enabled(id, enabled)?;
    let action = match (enabled, changed) {
        (true, true) => "enabled",
        (false, true) => "disabled",
        (true, false) => "already enabled",
        (false, false) => "already disabled",
    };
    app.renderer().render_change(id, action)?;
    Ok(ExitCode::SUCCESS)
}

async fn test(app: &AppContext, id: &str) -> Result<ExitCode> {
    let (registry, server) = load_target(app, id)?;
    let credential = credentials(app).resolve(&server)?;
    let executor = app.executor(registry.config());
    let timeout = Duration::from_secs(registry.config().default_settings.connection_timeout_seconds);

    let check = with_spinner(
        app.show_progress(),
        &format!("Connecting to {}...", server.id),
        status::check_connection(&executor, &Endpoint::of(&server), &credential, timeout),
    )
    .await?;
    app.renderer().render_connection(&server.id, &check)?;

    Ok(if check.reachable {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::application::services::test_support::StubPrompt;

    #[test]
    fn missing_password_is_asked_for() {
        let prompt = StubPrompt::answering(Some("hunter2"));
        let secret = secret_for_new(None, AuthMethod::Password, "db-1", Some(&prompt)).unwrap();
        assert_eq!(secret.as_deref(), Some("hunter2"));
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn given_secret_skips_the_prompt() {
        let prompt = StubPrompt::answering(Some("other"));
        let secret = secret_for_new(
            Some("given".to_string()),
            AuthMethod::KeyWithPassphrase,
            "web-1",
            Some(&prompt),
        )
        .unwrap();
        assert_eq!(secret.as_deref(), Some("given"));
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn key_auth_never_prompts() {
        let prompt = StubPrompt::answering(Some("unused"));
        let secret = secret_for_new(None, AuthMethod::Key, "web-1", Some(&prompt)).unwrap();
        assert!(secret.is_none());
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn declined_or_empty_answer_leaves_secret_unset() {
        for answer in [None, Some("")] {
            let prompt = StubPrompt::answering(answer);
            let secret =
                secret_for_new(None, AuthMethod::KeyWithPassphrase, "web-1", Some(&prompt)).unwrap();
            assert!(secret.is_none());
        }
        let secret = secret_for_new(None, AuthMethod::Password, "db-1", None).unwrap();
        assert!(secret.is_none());
    }
}
