//! Output styles using owo-colors stylesheet pattern

use owo_colors::Style;

/// Centralized stylesheet for CLI output colors.
///
/// `Default` is the uncolored sheet used for pipes, `--no-color` and
/// `NO_COLOR`.
#[derive(Default, Clone)]
pub struct Styles {
    pub success: Style,
    pub warning: Style,
    pub error: Style,
    pub info: Style,
    /// Secondary text: table keys, disabled servers.
    pub dim: Style,
    pub header: Style,
    /// `user@host:port` endpoints.
    pub host: Style,
    /// Deployment stage names in transcripts.
    pub stage: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold().cyan();
        self.host = Style::new().magenta();
        self.stage = Style::new().bold();
    }
}
