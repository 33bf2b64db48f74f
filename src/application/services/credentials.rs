//! Application service — turning a server record into credential material.
//!
//! Resolution is local only: it reads the record, checks the key file
//! exists and optionally asks the operator. It never opens a connection.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::{LocalFs, SecretPrompt};
use crate::domain::{AuthMethod, Credential, CredentialError, TargetServer, decode_secret};

/// Resolves `Credential`s for target servers.
pub struct CredentialResolver<'a, F: LocalFs> {
    fs: &'a F,
    prompt: Option<&'a dyn SecretPrompt>,
}

impl<'a, F: LocalFs> CredentialResolver<'a, F> {
    /// Resolver that fails immediately on a missing secret.
    pub fn new(fs: &'a F) -> Self {
        Self { fs, prompt: None }
    }

    /// Ask `prompt` for secrets the record does not store.
    #[must_use]
    pub fn with_prompt(mut self, prompt: &'a dyn SecretPrompt) -> Self {
        self.prompt = Some(prompt);
        self
    }

    /// Resolve the credential for `server`.
    ///
    /// # Errors
    ///
    /// Returns `CredentialError::MissingCredential` when a field required by
    /// the auth method is absent (and no prompt supplied it),
    /// `KeyNotFound` when the key file does not exist, and
    /// `InvalidEncoding` when the stored secret cannot be decoded.
    pub fn resolve(&self, server: &TargetServer) -> Result<Credential> {
        let method = server.auth_method;
        let credential = match method {
            AuthMethod::Key => Credential::key(self.key_path(server)?),
            AuthMethod::Password => Credential::password(self.secret(server)?),
            AuthMethod::KeyWithPassphrase => {
                let path = self.key_path(server)?;
                Credential::key_with_passphrase(path, self.secret(server)?)
            }
        };
        tracing::debug!(server = %server.id, method = %method, "credential resolved");
        Ok(credential)
    }

    fn key_path(&self, server: &TargetServer) -> Result<PathBuf> {
        let raw = server
            .ssh_key_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| missing(server, "ssh_key_path"))?;
        let path = expand_home(raw, self.fs.home_dir().as_deref());
        if !self.fs.exists(&path) {
            return Err(CredentialError::KeyNotFound {
                server: server.id.clone(),
                path,
            }
            .into());
        }
        Ok(path)
    }

    fn secret(&self, server: &TargetServer) -> Result<String> {
        match server.password_base64.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => decode_secret(text)
                .ok_or_else(|| CredentialError::InvalidEncoding(server.id.clone()).into()),
            _ => self.ask(server),
        }
    }

    fn ask(&self, server: &TargetServer) -> Result<String> {
        let Some(prompt) = self.prompt else {
            return Err(missing(server, "password_base64").into());
        };
        let label = format!("{} for {}", server.auth_method.secret_label(), server.id);
        prompt
            .prompt_secret(&label)
            .with_context(|| format!("reading {label}"))?
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing(server, "password_base64").into())
    }
}

fn missing(server: &TargetServer, field: &'static str) -> CredentialError {
    CredentialError::MissingCredential {
        server: server.id.clone(),
        method: server.auth_method.to_string(),
        field,
    }
}

/// Expand a leading `~` against `home`. Other paths are returned unchanged.
#[must_use]
pub fn expand_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') => {
            home.join(rest.trim_start_matches('/'))
        }
        _ => PathBuf::from(path),
    }
}
