//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors raised while loading or validating the fleet configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}\n\nCreate one or pass --config <path>.", .0.display())]
    NotFound(PathBuf),

    #[error("Cannot parse {}: {detail}", path.display())]
    Parse { path: PathBuf, detail: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ── Registry errors ───────────────────────────────────────────────────────────

/// Errors raised by registry mutations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Server '{0}' already exists. Remove it first: aurelia-fleet servers remove {0}")]
    DuplicateId(String),

    #[error("Server '{0}' not found.")]
    NotFound(String),

    #[error("Invalid server record '{id}': {reason}")]
    InvalidRecord { id: String, reason: String },
}

// ── Credential errors ─────────────────────────────────────────────────────────

/// Errors raised while turning a server's auth method into credential material.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Server '{server}' uses {method} auth but has no {field} configured")]
    MissingCredential {
        server: String,
        method: String,
        field: &'static str,
    },

    #[error("SSH key for server '{server}' not found: {}", path.display())]
    KeyNotFound { server: String, path: PathBuf },

    #[error("Stored secret for server '{0}' is not valid base64 text")]
    InvalidEncoding(String),
}

// ── Network errors ────────────────────────────────────────────────────────────

/// Errors raised by the remote shell and copy channels.
#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("{host} is unreachable: {detail}")]
    Unreachable { host: String, detail: String },

    #[error("Connection to {host} timed out")]
    Timeout { host: String },

    #[error("Authentication to {host} failed: {detail}")]
    AuthFailure { host: String, detail: String },

    #[error("Command on {host} did not finish within {secs}s")]
    CommandTimeout { host: String, secs: u64 },

    #[error("Copy to {host} failed: {detail}")]
    TransferFailed { host: String, detail: String },
}

// ── Architecture errors ───────────────────────────────────────────────────────

/// Errors raised by host detection and asset mapping.
#[derive(Debug, Error)]
pub enum ArchitectureError {
    #[error("Could not detect {probe} on {host}: {detail}")]
    DetectionFailed {
        host: String,
        probe: &'static str,
        detail: String,
    },

    #[error("Unsupported architecture: {arch} (os: {os})")]
    UnsupportedArchitecture { arch: String, os: String },
}

// ── Release errors ────────────────────────────────────────────────────────────

/// Errors raised while resolving release metadata.
#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("Release not found: {0}")]
    TagNotFound(String),

    #[error("Asset not found: {asset}\nAvailable: {}", available.join(", "))]
    AssetNotFound {
        asset: String,
        available: Vec<String>,
    },

    #[error("Release lookup rate limited.\n\nTry again in a few minutes, or set GITHUB_TOKEN.")]
    RateLimited,

    #[error("Release lookup failed: {0}")]
    Network(String),

    #[error("Release metadata could not be decoded: {0}")]
    InvalidResponse(String),
}

// ── Artifact errors ───────────────────────────────────────────────────────────

/// Errors raised while downloading or unpacking a release archive.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Download of {url} failed: {detail}")]
    Download { url: String, detail: String },

    #[error("Cannot extract {}: {detail}", archive.display())]
    Extraction { archive: PathBuf, detail: String },

    #[error("Binary '{binary}' not found in {}", archive.display())]
    BinaryMissing { archive: PathBuf, binary: String },
}

// ── Service errors ────────────────────────────────────────────────────────────

/// Errors raised while installing or starting the remote service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("`{command}` exited with code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Service '{service}' is not active (state: {state})")]
    NotActive { service: String, state: String },

    #[error("Stage {attempted} cannot follow {current}")]
    OutOfOrder { current: String, attempted: String },
}

// ── Classification ────────────────────────────────────────────────────────────

/// Coarse error family, used to report failures without the error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Registry,
    Credential,
    Network,
    Architecture,
    Release,
    Artifact,
    Service,
    Other,
}

impl ErrorKind {
    /// Classify an error by walking its cause chain for a typed domain error.
    #[must_use]
    pub fn of(err: &anyhow::Error) -> Self {
        for cause in err.chain() {
            if cause.is::<ConfigError>() {
                return Self::Config;
            }
            if cause.is::<RegistryError>() {
                return Self::Registry;
            }
            if cause.is::<CredentialError>() {
                return Self::Credential;
            }
            if cause.is::<NetworkError>() {
                return Self::Network;
            }
            if cause.is::<ArchitectureError>() {
                return Self::Architecture;
            }
            if cause.is::<ReleaseError>() {
                return Self::Release;
            }
            if cause.is::<ArtifactError>() {
                return Self::Artifact;
            }
            if cause.is::<ServiceError>() {
                return Self::Service;
            }
        }
        Self::Other
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Registry => "registry",
            Self::Credential => "credential",
            Self::Network => "network",
            Self::Architecture => "architecture",
            Self::Release => "release",
            Self::Artifact => "artifact",
            Self::Service => "service",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
