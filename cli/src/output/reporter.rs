//! `TerminalReporter`: presentation-layer implementation of `ProgressReporter`.
//!
//! Application services emit progress events through the port; this type
//! decides how they look. When a batch bar is attached, messages are printed
//! above it so the bar stays on the last line.

use indicatif::ProgressBar;
use owo_colors::OwoColorize as _;

use crate::application::ports::ProgressReporter;
use crate::output::{OutputContext, progress};

pub struct TerminalReporter<'a> {
    ctx: &'a OutputContext,
    bar: Option<ProgressBar>,
}

impl<'a> TerminalReporter<'a> {
    /// Reporter that prints plain lines.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx, bar: None }
    }

    /// Reporter with a batch bar over `total` components, shown only on a
    /// TTY and when not quiet.
    #[must_use]
    pub fn with_batch_bar(ctx: &'a OutputContext, total: usize) -> Self {
        let bar = ctx
            .show_progress()
            .then(|| progress::batch_bar(total as u64));
        Self { ctx, bar }
    }

    /// Remove the bar, if any.
    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    fn print(&self, line: String) {
        if self.ctx.quiet {
            return;
        }
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

impl ProgressReporter for TerminalReporter<'_> {
    fn step(&self, message: &str) {
        self.print(format!("  {} {message}", "→".style(self.ctx.styles.info)));
    }

    fn success(&self, message: &str) {
        self.print(format!("  {} {message}", "✓".style(self.ctx.styles.success)));
    }

    fn warn(&self, message: &str) {
        self.print(format!("  {} {message}", "!".style(self.ctx.styles.warning)));
    }

    fn progress(&self, current: usize, total: usize) {
        match &self.bar {
            Some(bar) => bar.set_position(current as u64),
            None => self.print(format!(
                "  {}",
                format!("[{current}/{total}]").style(self.ctx.styles.dim)
            )),
        }
    }
}
