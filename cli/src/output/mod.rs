//! Terminal output for the CLI layer. Nothing below `commands/` prints.

pub mod human;
pub mod json;
pub mod progress;
pub mod reporter;
pub mod styles;

use console::Term;
use owo_colors::{OwoColorize as _, Style};
use stagehand_common::{OutputLine, OutputStream};
pub use styles::Styles;

/// Styling and verbosity for one invocation.
pub struct OutputContext {
    pub styles: Styles,
    /// Whether stdout is a terminal.
    pub is_tty: bool,
    /// Suppress everything except errors. Implied by `--json`.
    pub quiet: bool,
}

impl OutputContext {
    /// Colours are used only on a terminal, and never with `no_color` or
    /// `NO_COLOR` set.
    #[must_use]
    pub fn new(no_color: bool, quiet: bool) -> Self {
        let is_tty = Term::stdout().is_term();
        let mut styles = Styles::default();
        if is_tty && !no_color && std::env::var_os("NO_COLOR").is_none() {
            styles.colorize();
        }
        Self {
            styles,
            is_tty,
            quiet,
        }
    }

    /// Spinners and bars only make sense on an interactive, non-quiet run.
    #[must_use]
    pub fn show_progress(&self) -> bool {
        self.is_tty && !self.quiet
    }

    fn notice(&self, glyph: &str, style: Style, msg: &str) {
        if !self.quiet {
            println!("  {} {msg}", glyph.style(style));
        }
    }

    pub fn success(&self, msg: &str) {
        self.notice("✓", self.styles.success, msg);
    }

    pub fn warn(&self, msg: &str) {
        self.notice("⚠", self.styles.warning, msg);
    }

    pub fn info(&self, msg: &str) {
        self.notice("ℹ", self.styles.info, msg);
    }

    /// Errors go to stderr and ignore `quiet`.
    pub fn error(&self, msg: &str) {
        eprintln!("  {} {msg}", "✗".style(self.styles.error));
    }

    /// `key  value` with the key dimmed.
    pub fn kv(&self, key: &str, value: &str) {
        if !self.quiet {
            println!("  {}  {value}", key.style(self.styles.dim));
        }
    }

    /// Echo one line of live process output, indented under the current
    /// step. Stderr lines are dimmed.
    pub fn stream_line(&self, line: &OutputLine) {
        if self.quiet {
            return;
        }
        match line.stream {
            OutputStream::Stdout => println!("    {}", line.text),
            OutputStream::Stderr => println!("    {}", line.text.style(self.styles.dim)),
        }
    }
}
