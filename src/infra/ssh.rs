//! `RemoteExecutor` over the system `ssh` and `scp` clients.
//!
//! Key auth runs the clients directly in batch mode. Password and
//! passphrase auth run them under `sshpass -e`, which reads the secret from
//! the `SSHPASS` environment variable so it never appears on a command line.

use std::path::Path;
use std::process::Output;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::{CommandOutput, CommandRunner, Endpoint, RemoteExecutor};
use crate::domain::{AuthMethod, Credential, DefaultSettings, NetworkError, SshConfig};
use crate::infra::command_runner::ProcessTimedOut;

/// Exit code ssh uses for its own failures.
const SSH_FAILURE: i32 = 255;

/// sshpass: the password was rejected.
const SSHPASS_BAD_PASSWORD: i32 = 5;

/// sshpass: the host key is not known.
const SSHPASS_HOST_KEY_UNKNOWN: i32 = 6;

/// Options shared by every ssh and scp invocation.
#[derive(Debug, Clone)]
pub struct SshOptions {
    pub connect_timeout: Duration,
    pub strict_host_key_checking: bool,
    pub compression: bool,
    pub keepalive_interval: Duration,
    /// Upper bound for one scp upload.
    pub transfer_timeout: Duration,
}

impl SshOptions {
    #[must_use]
    pub fn from_config(ssh: &SshConfig, defaults: &DefaultSettings) -> Self {
        Self {
            connect_timeout: Duration::from_secs(defaults.connection_timeout_seconds.max(1)),
            strict_host_key_checking: ssh.strict_host_key_checking,
            compression: ssh.compression,
            keepalive_interval: Duration::from_secs(ssh.keepalive_interval_seconds),
            transfer_timeout: Duration::from_secs(defaults.deployment_timeout_seconds.max(1)),
        }
    }

    fn common_args(&self) -> Vec<String> {
        let yes_no = |b: bool| if b { "yes" } else { "no" };
        let strict = if self.strict_host_key_checking { "accept-new" } else { "no" };
        let mut args = Vec::new();
        for opt in [
            format!("ConnectTimeout={}", self.connect_timeout.as_secs()),
            format!("StrictHostKeyChecking={strict}"),
            format!("Compression={}", yes_no(self.compression)),
            format!("ServerAliveInterval={}", self.keepalive_interval.as_secs()),
            "LogLevel=ERROR".to_string(),
        ] {
            args.push("-o".to_string());
            args.push(opt);
        }
        if !self.strict_host_key_checking {
            args.push("-o".to_string());
            args.push("UserKnownHostsFile=/dev/null".to_string());
        }
        args
    }
}

/// One fully assembled client invocation.
#[derive(Debug, PartialEq, Eq)]
struct Invocation {
    program: &'static str,
    args: Vec<String>,
    secret: Option<String>,
}

impl Invocation {
    fn uses_sshpass(&self) -> bool {
        self.program == "sshpass"
    }
}

/// Production `RemoteExecutor` shelling out through a `CommandRunner`.
pub struct SshExecutor<R: CommandRunner> {
    runner: R,
    options: SshOptions,
}

impl<R: CommandRunner> SshExecutor<R> {
    pub fn new(runner: R, options: SshOptions) -> Self {
        Self { runner, options }
    }

    /// Build the invocation of `client` (`ssh` or `scp`) with `tail` args.
    fn invocation(&self, client: &'static str, credential: &Credential, tail: Vec<String>) -> Invocation {
        let mut client_args = self.options.common_args();
        let key = credential
            .key_path
            .as_ref()
            .map(|p| p.display().to_string());
        match credential.kind {
            AuthMethod::Key => {
                if let Some(key) = key {
                    client_args.extend(["-i".to_string(), key]);
                }
                client_args.extend(
                    ["-o", "BatchMode=yes", "-o", "IdentitiesOnly=yes"].map(String::from),
                );
            }
            AuthMethod::Password => {
                client_args.extend(
                    [
                        "-o",
                        "PreferredAuthentications=password,keyboard-interactive",
                        "-o",
                        "PubkeyAuthentication=no",
                    ]
                    .map(String::from),
                );
            }
            AuthMethod::KeyWithPassphrase => {
                if let Some(key) = key {
                    client_args.extend(["-i".to_string(), key]);
                }
                client_args.extend(["-o", "IdentitiesOnly=yes"].map(String::from));
            }
        }
        client_args.extend(tail);

        if credential.kind == AuthMethod::Key {
            return Invocation {
                program: client,
                args: client_args,
                secret: None,
            };
        }
        let mut args = vec!["-e".to_string()];
        if credential.kind == AuthMethod::KeyWithPassphrase {
            args.extend(["-P".to_string(), "passphrase".to_string()]);
        }
        args.push(client.to_string());
        args.extend(client_args);
        Invocation {
            program: "sshpass",
            args,
            secret: credential.secret.clone(),
        }
    }

    fn ssh_invocation(&self, endpoint: &Endpoint, credential: &Credential, command: &str) -> Invocation {
        self.invocation(
            "ssh",
            credential,
            vec![
                "-p".to_string(),
                endpoint.port.to_string(),
                format!("{}@{}", endpoint.user, endpoint.host),
                command.to_string(),
            ],
        )
    }

    fn scp_invocation(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        local: &Path,
        remote: &str,
    ) -> Invocation {
        self.invocation(
            "scp",
            credential,
            vec![
                "-P".to_string(),
                endpoint.port.to_string(),
                local.display().to_string(),
                format!("{}@{}:{remote}", endpoint.user, endpoint.host),
            ],
        )
    }

    async fn spawn(&self, endpoint: &Endpoint, inv: &Invocation, timeout: Duration) -> Result<Output> {
        let args: Vec<&str> = inv.args.iter().map(String::as_str).collect();
        let env: Vec<(&str, &str)> = inv
            .secret
            .as_deref()
            .map(|s| vec![("SSHPASS", s)])
            .unwrap_or_default();
        let budget = timeout + self.options.connect_timeout;
        match self.runner.run_with_env(inv.program, &args, &env, budget).await {
            Ok(out) => Ok(out),
            Err(e) if e.is::<ProcessTimedOut>() => Err(NetworkError::CommandTimeout {
                host: endpoint.host.clone(),
                secs: budget.as_secs(),
            }
            .into()),
            Err(e) => Err(e).with_context(|| format!("running {} (is it installed?)", inv.program)),
        }
    }
}

/// Map a client failure to a network error, or `None` when the exit code
/// belongs to the remote command.
#[must_use]
pub fn classify_failure(host: &str, via_sshpass: bool, code: i32, stderr: &str) -> Option<NetworkError> {
    let detail = stderr.trim().to_string();
    let lower = detail.to_ascii_lowercase();
    let auth = || NetworkError::AuthFailure {
        host: host.to_string(),
        detail: detail.clone(),
    };

    if via_sshpass {
        let quiet_or_auth = lower.is_empty() || lower.contains("password") || lower.contains("permission denied");
        if code == SSHPASS_BAD_PASSWORD && quiet_or_auth {
            return Some(NetworkError::AuthFailure {
                host: host.to_string(),
                detail: if detail.is_empty() { "password rejected".into() } else { detail.clone() },
            });
        }
        if code == SSHPASS_HOST_KEY_UNKNOWN && (lower.is_empty() || lower.contains("host key")) {
            return Some(NetworkError::AuthFailure {
                host: host.to_string(),
                detail: "host public key is unknown".into(),
            });
        }
    }

    if code != SSH_FAILURE {
        return None;
    }
    if lower.contains("permission denied")
        || lower.contains("too many authentication failures")
        || lower.contains("host key verification failed")
    {
        return Some(auth());
    }
    if lower.contains("timed out") {
        return Some(NetworkError::Timeout {
            host: host.to_string(),
        });
    }
    Some(NetworkError::Unreachable {
        host: host.to_string(),
        detail: if detail.is_empty() { "ssh exited with 255".into() } else { detail },
    })
}

fn exit_code(output: &Output) -> i32 {
    // Killed by a signal: report like a shell would.
    output.status.code().unwrap_or(SSH_FAILURE)
}

impl<R: CommandRunner> RemoteExecutor for SshExecutor<R> {
    async fn execute(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let inv = self.ssh_invocation(endpoint, credential, command);
        tracing::debug!(target_host = %endpoint, %command, via = inv.program, "ssh exec");
        let output = self.spawn(endpoint, &inv, timeout).await?;
        let code = exit_code(&output);
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if code != 0
            && let Some(err) = classify_failure(&endpoint.host, inv.uses_sshpass(), code, &stderr)
        {
            return Err(err.into());
        }
        Ok(CommandOutput {
            exit_code: code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }

    async fn transfer_file(
        &self,
        endpoint: &Endpoint,
        credential: &Credential,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<()> {
        let inv = self.scp_invocation(endpoint, credential, local_path, remote_path);
        tracing::debug!(target_host = %endpoint, local = %local_path.display(), remote = %remote_path, "scp");
        let output = self.spawn(endpoint, &inv, self.options.transfer_timeout).await?;
        let code = exit_code(&output);
        if code == 0 {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        let err = classify_failure(&endpoint.host, inv.uses_sshpass(), code, &stderr).unwrap_or_else(|| {
            NetworkError::TransferFailed {
                host: endpoint.host.clone(),
                detail: format!("scp exited with {code}: {}", stderr.trim()),
            }
        });
        Err(err.into())
    }
}
