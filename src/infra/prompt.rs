//! Interactive secret prompt backed by `dialoguer`.

use anyhow::{Context, Result};

use crate::application::ports::SecretPrompt;

/// Reads a secret from the terminal without echo.
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn prompt_secret(&self, label: &str) -> Result<Option<String>> {
        let secret = dialoguer::Password::new()
            .with_prompt(format!("Enter {label}"))
            .allow_empty_password(true)
            .interact()
            .context("cannot read secret from terminal")?;
        Ok((!secret.is_empty()).then_some(secret))
    }
}
