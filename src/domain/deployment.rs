//! Deployment pipeline states and the per-target attempt record.
//!
//! `DeploymentAttempt` enforces the stage order: every stage must directly
//! follow the last one reached, and nothing can be recorded after a
//! terminal state.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::error::{ErrorKind, ServiceError};
use crate::domain::release::ReleaseAsset;

/// One discrete step of the deployment pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Detecting,
    AssetResolved,
    ReleaseResolved,
    Downloaded,
    Extracted,
    Transferred,
    ServiceInstalled,
    Started,
    Verified,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::Detecting,
        Stage::AssetResolved,
        Stage::ReleaseResolved,
        Stage::Downloaded,
        Stage::Extracted,
        Stage::Transferred,
        Stage::ServiceInstalled,
        Stage::Started,
        Stage::Verified,
    ];

    /// The stage that directly follows this one.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        let idx = Self::ALL.iter().position(|s| *s == self)?;
        Self::ALL.get(idx + 1).copied()
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detecting => "detecting",
            Self::AssetResolved => "asset_resolved",
            Self::ReleaseResolved => "release_resolved",
            Self::Downloaded => "downloaded",
            Self::Extracted => "extracted",
            Self::Transferred => "transferred",
            Self::ServiceInstalled => "service_installed",
            Self::Started => "started",
            Self::Verified => "verified",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An entry of the per-target transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageEvent {
    Reached(Stage),
    Failed {
        stage: Stage,
        kind: ErrorKind,
        error: String,
    },
}

/// Why an attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageFailure {
    pub stage: Stage,
    pub kind: ErrorKind,
    pub error: String,
}

/// Uninterpreted remote output captured for the operator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_tail: Option<String>,
}

impl Diagnostics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.service_status.is_none() && self.log_tail.is_none()
    }
}

/// Detected host identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostPlatform {
    pub arch: String,
    pub os: String,
}

/// Outcome of one deploy invocation against one target.
#[derive(Debug, Clone, Serialize)]
pub struct DeploymentResult {
    pub server_id: String,
    pub success: bool,
    pub transcript: Vec<StageEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<HostPlatform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset: Option<ReleaseAsset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
    #[serde(skip_serializing_if = "Diagnostics::is_empty")]
    pub diagnostics: Diagnostics,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DeploymentResult {
    /// Stages reached in order, without the terminal failure entry.
    #[must_use]
    pub fn reached(&self) -> Vec<Stage> {
        self.transcript
            .iter()
            .filter_map(|e| match e {
                StageEvent::Reached(s) => Some(*s),
                StageEvent::Failed { .. } => None,
            })
            .collect()
    }
}

/// Transient per-target record of the pipeline position.
#[derive(Debug)]
pub struct DeploymentAttempt {
    server_id: String,
    transcript: Vec<StageEvent>,
    started_at: DateTime<Utc>,
    platform: Option<HostPlatform>,
    asset: Option<ReleaseAsset>,
    diagnostics: Diagnostics,
}

impl DeploymentAttempt {
    /// Start an attempt; the pipeline is immediately in `Detecting`.
    #[must_use]
    pub fn begin(server_id: &str) -> Self {
        Self {
            server_id: server_id.to_string(),
            transcript: vec![StageEvent::Reached(Stage::Detecting)],
            started_at: Utc::now(),
            platform: None,
            asset: None,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Last stage reached, or `None` once the attempt has failed.
    #[must_use]
    pub fn current(&self) -> Option<Stage> {
        match self.transcript.last() {
            Some(StageEvent::Reached(s)) => Some(*s),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.transcript.last(),
            Some(StageEvent::Reached(Stage::Verified) | StageEvent::Failed { .. })
        )
    }

    /// Record that `stage` has been reached.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::OutOfOrder` unless `stage` directly follows the
    /// last stage reached.
    pub fn advance(&mut self, stage: Stage) -> Result<(), ServiceError> {
        let current = self.current();
        if current.and_then(Stage::next) != Some(stage) {
            return Err(self.out_of_order(stage));
        }
        self.transcript.push(StageEvent::Reached(stage));
        Ok(())
    }

    /// Record a terminal failure while working towards `stage`.
    ///
    /// Work for `Detecting` happens inside that state, so it may fail while
    /// current; every other stage fails only as the direct successor.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::OutOfOrder` if `stage` is not the pending one.
    pub fn fail(&mut self, stage: Stage, kind: ErrorKind, error: String) -> Result<(), ServiceError> {
        let current = self.current();
        let pending = current.and_then(Stage::next) == Some(stage)
            || (current == Some(Stage::Detecting) && stage == Stage::Detecting);
        if !pending {
            return Err(self.out_of_order(stage));
        }
        self.transcript
            .push(StageEvent::Failed { stage, kind, error });
        Ok(())
    }

    pub fn set_platform(&mut self, platform: HostPlatform) {
        self.platform = Some(platform);
    }

    pub fn set_asset(&mut self, asset: ReleaseAsset) {
        self.asset = Some(asset);
    }

    pub fn set_diagnostics(&mut self, diagnostics: Diagnostics) {
        self.diagnostics = diagnostics;
    }

    #[must_use]
    pub fn transcript(&self) -> &[StageEvent] {
        &self.transcript
    }

    /// Close the attempt and produce its result.
    #[must_use]
    pub fn finish(self) -> DeploymentResult {
        let failure = match self.transcript.last() {
            Some(StageEvent::Failed { stage, kind, error }) => Some(StageFailure {
                stage: *stage,
                kind: *kind,
                error: error.clone(),
            }),
            _ => None,
        };
        let success = matches!(
            self.transcript.last(),
            Some(StageEvent::Reached(Stage::Verified))
        );
        DeploymentResult {
            server_id: self.server_id,
            success,
            transcript: self.transcript,
            platform: self.platform,
            asset: self.asset,
            failure,
            diagnostics: self.diagnostics,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }

    fn out_of_order(&self, attempted: Stage) -> ServiceError {
        ServiceError::OutOfOrder {
            current: self
                .current()
                .map_or_else(|| "failed".to_string(), |s| s.to_string()),
            attempted: attempted.to_string(),
        }
    }
}
