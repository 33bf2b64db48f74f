//! Terminal implementation of the `ProgressReporter` port.
//!
//! Deployment services report lines shaped `"<server>: <message>"`; the
//! server prefix is highlighted so interleaved fleet output stays readable.

use owo_colors::OwoColorize as _;
use owo_colors::Style;

use crate::application::ports::ProgressReporter;
use crate::output::OutputContext;

/// Prints deployment progress to stdout. Silent when `ctx.quiet`.
pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
}

impl<'a> TerminalReporter<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    fn line(&self, marker: &str, marker_style: Style, message: &str) {
        if self.ctx.quiet {
            return;
        }
        let marker = marker.style(marker_style);
        match message.split_once(": ") {
            Some((server, rest)) if !server.contains(' ') => {
                println!("  {marker} {}: {rest}", server.style(self.ctx.styles.host));
            }
            _ => println!("  {marker} {message}"),
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.line("→", self.ctx.styles.info, message);
    }

    fn success(&self, message: &str) {
        self.line("✓", self.ctx.styles.success, message);
    }

    fn warn(&self, message: &str) {
        self.line("!", self.ctx.styles.warning, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quiet_reporter_prints_nothing_and_does_not_panic() {
        let ctx = OutputContext::new(true, true);
        let reporter = TerminalReporter::new(&ctx);
        reporter.step("web-1: detecting platform");
        reporter.success("web-1: deployed and running");
        reporter.warn("deploying latest to 3 server(s), 2 at a time");
    }
}
