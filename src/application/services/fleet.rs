//! Application service — bounded-concurrency fleet rollout.
//!
//! Works on a snapshot of the registry taken before the run: enabled
//! servers, ordered by priority. One future per target is gated by a
//! semaphore; results come back in snapshot order.

use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::application::ports::{
    ArtifactStager, LocalFs, ProgressReporter, ReleaseSource, RemoteExecutor,
};
use crate::application::services::deploy::Deployer;
use crate::application::services::registry::sort_by_priority;
use crate::domain::{DeploymentResult, TargetServer};

/// Outcome of a fleet run, one result per target.
#[derive(Debug, Serialize)]
pub struct FleetReport {
    pub tag: String,
    pub results: Vec<DeploymentResult>,
}

impl FleetReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.results.len() - self.succeeded()
    }

    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }
}

/// Enabled servers from `servers`, optionally filtered by tag, by priority.
#[must_use]
pub fn fleet_snapshot(servers: &[TargetServer], tag_filter: Option<&str>) -> Vec<TargetServer> {
    let mut snapshot: Vec<TargetServer> = servers
        .iter()
        .filter(|s| s.enabled)
        .filter(|s| tag_filter.is_none_or(|t| s.has_tag(t)))
        .cloned()
        .collect();
    sort_by_priority(&mut snapshot);
    snapshot
}

/// Deploy `tag` to every target with at most `parallel` in flight.
///
/// A failing target never stops the others.
pub async fn deploy_fleet<E, R, A, F>(
    deployer: &Deployer<'_, E, R, A, F>,
    targets: &[TargetServer],
    tag: &str,
    deploy_path: Option<&str>,
    parallel: usize,
    reporter: &impl ProgressReporter,
) -> FleetReport
where
    E: RemoteExecutor,
    R: ReleaseSource,
    A: ArtifactStager,
    F: LocalFs,
{
    let permits = Semaphore::new(parallel.max(1));
    tracing::info!(targets = targets.len(), parallel = parallel.max(1), %tag, "fleet deployment started");
    reporter.step(&format!(
        "deploying {tag} to {} server(s), {} at a time",
        targets.len(),
        parallel.max(1)
    ));

    let runs = targets.iter().map(|target| {
        let permits = &permits;
        async move {
            // The semaphore is never closed, so acquire cannot fail.
            let _permit = permits.acquire().await.ok();
            deployer.deploy(target, tag, deploy_path, reporter).await
        }
    });
    let results = join_all(runs).await;

    let report = FleetReport {
        tag: tag.to_string(),
        results,
    };
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "fleet deployment finished"
    );
    report
}
