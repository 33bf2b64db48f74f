//! Remote commands and the systemd unit for the deployed agent.
//!
//! Pure string builders: every value interpolated into a shell command goes
//! through `shell_quote`. The caller runs them via the remote executor.

#![allow(clippy::format_push_string)]

/// Name of the systemd unit on every target.
pub const SERVICE_NAME: &str = "aurelia";

/// Executable expected at the root of every release archive.
pub const AGENT_BINARY: &str = "kernel";

/// Where the unit file is installed.
pub const UNIT_PATH: &str = "/etc/systemd/system/aurelia.service";

/// Log verbosity handed to the agent through its environment.
pub const AGENT_LOG_LEVEL: &str = "info";

/// Seconds systemd waits before restarting a crashed agent.
pub const RESTART_SEC: u32 = 10;

/// Remote probe for the CPU architecture.
pub const ARCH_PROBE: &str = "uname -m";

/// Remote probe for the distribution id (`ID=` of os-release, unquoted).
pub const OS_PROBE: &str = r#"grep '^ID=' /etc/os-release | cut -d= -f2 | tr -d '"'"#;

/// Quote `value` for a POSIX shell.
///
/// Plain words (letters, digits and `/._-:@+=,`) are left as they are;
/// anything else is wrapped in single quotes with embedded quotes escaped.
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-:@+=,".contains(c));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Absolute path of the agent binary under `deploy_path`.
#[must_use]
pub fn binary_path(deploy_path: &str) -> String {
    format!("{}/{AGENT_BINARY}", deploy_path.trim_end_matches('/'))
}

/// Create the deploy directory and hand it to the login user.
#[must_use]
pub fn prepare_dir_command(deploy_path: &str, user: &str) -> String {
    let dir = shell_quote(deploy_path);
    let owner = shell_quote(&format!("{user}:{user}"));
    format!("sudo mkdir -p {dir} && sudo chown {owner} {dir}")
}

/// Stop a running agent; succeeds even when the unit does not exist yet.
#[must_use]
pub fn stop_command() -> String {
    format!("sudo systemctl stop {SERVICE_NAME} 2>/dev/null || true")
}

#[must_use]
pub fn chmod_command(deploy_path: &str) -> String {
    format!("chmod +x {}", shell_quote(&binary_path(deploy_path)))
}

/// Write `unit` to the unit path through `sudo tee`.
#[must_use]
pub fn write_unit_command(unit: &str) -> String {
    format!(
        "printf '%s\\n' {} | sudo tee {UNIT_PATH} > /dev/null",
        shell_quote(unit)
    )
}

#[must_use]
pub fn daemon_reload_command() -> String {
    "sudo systemctl daemon-reload".to_string()
}

#[must_use]
pub fn start_command() -> String {
    format!("sudo systemctl start {SERVICE_NAME}")
}

#[must_use]
pub fn enable_command() -> String {
    format!("sudo systemctl enable {SERVICE_NAME}")
}

#[must_use]
pub fn is_active_command() -> String {
    format!("sudo systemctl is-active {SERVICE_NAME}")
}

#[must_use]
pub fn status_command() -> String {
    format!("sudo systemctl status {SERVICE_NAME} --no-pager | head -15")
}

#[must_use]
pub fn journal_command(lines: u32) -> String {
    format!("sudo journalctl -u {SERVICE_NAME} -n {lines} --no-pager")
}

/// Parameters of the unit file.
#[derive(Debug, Clone)]
pub struct ServiceUnit<'a> {
    pub user: &'a str,
    pub deploy_path: &'a str,
}

impl ServiceUnit<'_> {
    /// Render the unit file.
    #[must_use]
    pub fn render(&self) -> String {
        let dir = self.deploy_path.trim_end_matches('/');
        let mut out = String::new();
        out.push_str("[Unit]\n");
        out.push_str("Description=Aurelia Autonomous System\n");
        out.push_str("After=network.target\n");
        out.push('\n');
        out.push_str("[Service]\n");
        out.push_str("Type=simple\n");
        out.push_str(&format!("User={}\n", self.user));
        out.push_str(&format!("WorkingDirectory={dir}\n"));
        out.push_str(&format!("ExecStart={}\n", binary_path(dir)));
        out.push_str("Restart=always\n");
        out.push_str(&format!("RestartSec={RESTART_SEC}\n"));
        out.push_str("StandardOutput=journal\n");
        out.push_str("StandardError=journal\n");
        out.push_str(&format!("Environment=\"RUST_LOG={AGENT_LOG_LEVEL}\"\n"));
        out.push('\n');
        out.push_str("[Install]\n");
        out.push_str("WantedBy=multi-user.target\n");
        out
    }
}
