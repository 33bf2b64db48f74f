//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod asset;
pub mod credential;
pub mod deployment;
pub mod error;
pub mod release;
pub mod server;
pub mod service;

pub use asset::resolve_asset;
pub use credential::{Credential, decode_secret, encode_secret};
pub use deployment::{
    DeploymentAttempt, DeploymentResult, Diagnostics, HostPlatform, Stage, StageEvent,
    StageFailure,
};
pub use error::{
    ArchitectureError, ArtifactError, ConfigError, CredentialError, ErrorKind, NetworkError,
    RegistryError, ReleaseError, ServiceError,
};
pub use release::{Release, ReleaseAsset};
pub use server::{
    AuthMethod, DefaultSettings, DeploymentStrategy, FleetConfig, ServerPatch, SshConfig,
    TargetServer,
};
