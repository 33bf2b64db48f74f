//! Application service — single-target deployment pipeline.
//!
//! Drives one `DeploymentAttempt` through detection, release resolution,
//! staging, transfer and service installation. A failure at any stage
//! ends the attempt; nothing is retried.

use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{
    ArtifactStager, CommandOutput, Endpoint, LocalFs, ProgressReporter, ReleaseSource,
    RemoteExecutor,
};
use crate::application::services::credentials::CredentialResolver;
use crate::application::services::detect::detect_platform;
use crate::domain::service::{self, SERVICE_NAME, ServiceUnit};
use crate::domain::{
    Credential, DefaultSettings, DeploymentAttempt, DeploymentResult, Diagnostics, ErrorKind,
    ServiceError, Stage, TargetServer, resolve_asset,
};

/// Tunables for one deployment.
#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Upper bound for each remote command.
    pub command_timeout: Duration,
    /// Wait between `systemctl start` and the activity check.
    pub settle_delay: Duration,
    /// Journal lines captured after a successful start.
    pub log_lines: u32,
    /// Journal lines captured when the service is not active.
    pub failure_log_lines: u32,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(300),
            settle_delay: Duration::from_secs(3),
            log_lines: 10,
            failure_log_lines: 20,
        }
    }
}

impl DeployOptions {
    #[must_use]
    pub fn from_settings(settings: &DefaultSettings) -> Self {
        Self {
            command_timeout: Duration::from_secs(settings.deployment_timeout_seconds.max(1)),
            ..Self::default()
        }
    }
}

/// A stage that could not be completed, with its cause.
struct Halt {
    stage: Stage,
    error: anyhow::Error,
}

fn at(stage: Stage) -> impl FnOnce(anyhow::Error) -> Halt {
    move |error| Halt { stage, error }
}

/// Deploys the agent to one target at a time.
pub struct Deployer<'a, E, R, A, F: LocalFs> {
    executor: &'a E,
    releases: &'a R,
    stager: &'a A,
    credentials: &'a CredentialResolver<'a, F>,
    options: DeployOptions,
}

impl<'a, E, R, A, F> Deployer<'a, E, R, A, F>
where
    E: RemoteExecutor,
    R: ReleaseSource,
    A: ArtifactStager,
    F: LocalFs,
{
    pub fn new(
        executor: &'a E,
        releases: &'a R,
        stager: &'a A,
        credentials: &'a CredentialResolver<'a, F>,
        options: DeployOptions,
    ) -> Self {
        Self {
            executor,
            releases,
            stager,
            credentials,
            options,
        }
    }

    /// Deploy release `tag` to `server`.
    ///
    /// `deploy_path` overrides the server's `remote_path`. Never returns an
    /// error: failures are recorded in the result's transcript.
    pub async fn deploy(
        &self,
        server: &TargetServer,
        tag: &str,
        deploy_path: Option<&str>,
        reporter: &impl ProgressReporter,
    ) -> DeploymentResult {
        let deploy_path = deploy_path.unwrap_or(&server.remote_path);
        let mut attempt = DeploymentAttempt::begin(&server.id);
        tracing::info!(server = %server.id, %tag, %deploy_path, "deployment started");

        match self.run(&mut attempt, server, tag, deploy_path, reporter).await {
            Ok(()) => {
                tracing::info!(server = %server.id, "deployment verified");
                reporter.success(&format!("{}: deployed and running", server.id));
            }
            Err(Halt { stage, error }) => {
                let kind = ErrorKind::of(&error);
                let message = format!("{error:#}");
                tracing::warn!(server = %server.id, %stage, ?kind, error = %message, "deployment failed");
                reporter.warn(&format!("{}: failed at {stage}: {message}", server.id));
                if let Err(e) = attempt.fail(stage, kind, message) {
                    tracing::error!(server = %server.id, error = %e, "could not record failure");
                }
            }
        }
        attempt.finish()
    }

    async fn run(
        &self,
        attempt: &mut DeploymentAttempt,
        server: &TargetServer,
        tag: &str,
        deploy_path: &str,
        reporter: &impl ProgressReporter,
    ) -> Result<(), Halt> {
        let endpoint = Endpoint::of(server);
        let id = server.id.as_str();

        // Detecting
        reporter.step(&format!("{id}: detecting platform"));
        let credential = self.credentials.resolve(server).map_err(at(Stage::Detecting))?;
        let platform = detect_platform(
            self.executor,
            &endpoint,
            &credential,
            self.options.command_timeout,
        )
        .await
        .map_err(at(Stage::Detecting))?;
        attempt.set_platform(platform.clone());

        // AssetResolved
        let asset_name = resolve_asset(&platform.arch, &platform.os)
            .map_err(|e| Halt {
                stage: Stage::AssetResolved,
                error: e.into(),
            })?;
        self.advance(attempt, Stage::AssetResolved)?;
        tracing::info!(server = %id, asset = %asset_name, "asset resolved");

        // ReleaseResolved
        reporter.step(&format!("{id}: resolving release {tag}"));
        let release = self
            .releases
            .get_release(tag)
            .await
            .map_err(at(Stage::ReleaseResolved))?;
        let asset = release.find_asset_url(&asset_name).map_err(|e| Halt {
            stage: Stage::ReleaseResolved,
            error: e.into(),
        })?;
        attempt.set_asset(asset.clone());
        self.advance(attempt, Stage::ReleaseResolved)?;

        // Downloaded
        reporter.step(&format!("{id}: downloading {}", asset.asset_name));
        let workdir = tempfile::Builder::new()
            .prefix("aurelia-deploy-")
            .tempdir()
            .context("creating staging directory")
            .map_err(at(Stage::Downloaded))?;
        let archive = self
            .stager
            .download(&asset.download_url, workdir.path())
            .await
            .map_err(at(Stage::Downloaded))?;
        self.advance(attempt, Stage::Downloaded)?;

        // Extracted
        let binary = self
            .stager
            .extract(&archive)
            .await
            .map_err(at(Stage::Extracted))?;
        self.advance(attempt, Stage::Extracted)?;

        // Transferred
        reporter.step(&format!("{id}: uploading agent to {deploy_path}"));
        self.transfer(&endpoint, &credential, server, &binary, deploy_path)
            .await
            .map_err(at(Stage::Transferred))?;
        self.advance(attempt, Stage::Transferred)?;

        // ServiceInstalled
        reporter.step(&format!("{id}: installing {SERVICE_NAME} service"));
        let unit = ServiceUnit {
            user: &server.username,
            deploy_path,
        }
        .render();
        for command in [service::write_unit_command(&unit), service::daemon_reload_command()] {
            self.checked(&endpoint, &credential, &command)
                .await
                .map_err(at(Stage::ServiceInstalled))?;
        }
        self.advance(attempt, Stage::ServiceInstalled)?;

        // Started
        reporter.step(&format!("{id}: starting service"));
        for command in [service::start_command(), service::enable_command()] {
            self.checked(&endpoint, &credential, &command)
                .await
                .map_err(at(Stage::Started))?;
        }
        self.advance(attempt, Stage::Started)?;
        drop(workdir);

        // Verified
        tokio::time::sleep(self.options.settle_delay).await;
        let state = self
            .executor
            .execute(
                &endpoint,
                &credential,
                &service::is_active_command(),
                self.options.command_timeout,
            )
            .await
            .map_err(at(Stage::Verified))?
            .stdout
            .trim()
            .to_string();
        if state == "active" {
            let diagnostics = self
                .diagnostics(&endpoint, &credential, self.options.log_lines)
                .await;
            attempt.set_diagnostics(diagnostics);
            self.advance(attempt, Stage::Verified)?;
            Ok(())
        } else {
            let diagnostics = self
                .diagnostics(&endpoint, &credential, self.options.failure_log_lines)
                .await;
            attempt.set_diagnostics(diagnostics);
            Err(Halt {
                stage: Stage::Verified,
                error: ServiceError::NotActive {
                    service: SERVICE_NAME.to_string(),
                    state: if state.is_empty() { "unknown".into() } else { state },
                }
                .into(),
            })
        }
    }

    fn advance(&self, attempt: &mut DeploymentAttempt, stage: Stage) -> Result<(), Halt> {
        attempt.advance(stage).map_err(|e| Halt {
            stage,
            error: e.into(),
        })?;
        tracing::debug!(%stage, "stage reached");
        Ok(())
    }

    async fn transfer(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        server: &TargetServer,
        binary: &std::path::Path,
        deploy_path: &str,
    ) -> Result<()> {
        self.checked(
            endpoint,
            credential,
            &service::prepare_dir_command(deploy_path, &server.username),
        )
        .await?;

        match self
            .executor
            .execute(
                endpoint,
                credential,
                &service::stop_command(),
                self.options.command_timeout,
            )
            .await
        {
            Ok(out) if !out.success() => {
                tracing::warn!(host = %endpoint.host, code = out.exit_code, "service stop failed, continuing");
            }
            Err(e) => {
                tracing::warn!(host = %endpoint.host, error = %format!("{e:#}"), "service stop failed, continuing");
            }
            Ok(_) => {}
        }

        let remote = service::binary_path(deploy_path);
        self.executor
            .transfer_file(endpoint, credential, binary, &remote)
            .await
            .with_context(|| format!("copying agent to {remote}"))?;
        self.checked(endpoint, credential, &service::chmod_command(deploy_path))
            .await?;
        Ok(())
    }

    /// Run `command`, treating a non-zero exit as an error.
    async fn checked(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        command: &str,
    ) -> Result<CommandOutput> {
        tracing::debug!(host = %endpoint.host, %command, "remote command");
        let output = self
            .executor
            .execute(endpoint, credential, command, self.options.command_timeout)
            .await?;
        if !output.success() {
            return Err(ServiceError::CommandFailed {
                command: command.to_string(),
                code: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }
        Ok(output)
    }

    /// Best-effort status text and journal tail; failures are logged only.
    async fn diagnostics(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        lines: u32,
    ) -> Diagnostics {
        let service_status = self
            .capture(endpoint, credential, &service::status_command())
            .await;
        let log_tail = self
            .capture(endpoint, credential, &service::journal_command(lines))
            .await;
        Diagnostics {
            service_status,
            log_tail,
        }
    }

    async fn capture(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        command: &str,
    ) -> Option<String> {
        match self
            .executor
            .execute(endpoint, credential, command, self.options.command_timeout)
            .await
        {
            Ok(out) => Some(out.stdout),
            Err(e) => {
                tracing::warn!(host = %endpoint.host, %command, error = %format!("{e:#}"), "diagnostics unavailable");
                None
            }
        }
    }
}
