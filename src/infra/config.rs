//! Infrastructure implementation of the `RegistryStore` port.
//!
//! The fleet document is a JSON file. Saves are atomic: the new content is
//! written to a temp file in the same directory, restricted to mode 0600,
//! then renamed over the target.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::RegistryStore;
use crate::domain::{ConfigError, FleetConfig};
use crate::infra::fs::set_mode;

/// Default location of the fleet document, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/target_servers.json";

/// Environment variable naming the fleet document.
pub const CONFIG_ENV: &str = "AURELIA_FLEET_CONFIG";

/// Production `RegistryStore` backed by a JSON file on disk.
pub struct JsonRegistryStore {
    path: PathBuf,
    create_missing: bool,
}

impl JsonRegistryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_missing: false,
        }
    }

    /// Treat a missing file as an empty fleet instead of an error.
    #[must_use]
    pub fn create_missing(mut self) -> Self {
        self.create_missing = true;
        self
    }

    fn read(&self) -> Result<FleetConfig> {
        if !self.path.exists() {
            if self.create_missing {
                tracing::debug!(path = %self.path.display(), "no fleet file yet, starting empty");
                return Ok(FleetConfig::default());
            }
            return Err(ConfigError::NotFound(self.path.clone()).into());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("cannot read {}", self.path.display()))?;
        let config: FleetConfig =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
                path: self.path.clone(),
                detail: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    fn replace_with(&self, temp_path: &Path, content: &str) -> Result<()> {
        std::fs::write(temp_path, content)
            .with_context(|| format!("cannot write {}", temp_path.display()))?;
        set_mode(temp_path, 0o600)?;
        std::fs::rename(temp_path, &self.path)
            .with_context(|| format!("cannot replace {}", self.path.display()))
    }
}

impl RegistryStore for JsonRegistryStore {
    fn load(&self) -> Result<FleetConfig> {
        self.read()
    }

    fn save(&self, config: &FleetConfig) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let mut content =
            serde_json::to_string_pretty(config).context("cannot serialize fleet config")?;
        content.push('\n');

        let temp_path = temp_path_for(&self.path);
        if let Err(e) = self.replace_with(&temp_path, &content) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
        tracing::debug!(path = %self.path.display(), servers = config.target_servers.len(), "fleet config saved");
        Ok(())
    }

    fn path(&self) -> PathBuf {
        self.path.clone()
    }
}

fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map_or_else(|| "fleet.json".into(), |n| n.to_string_lossy().into_owned());
    path.with_file_name(format!(".{name}.tmp"))
}
