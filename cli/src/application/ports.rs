//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared model crate,
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde_json::Value;
use stagehand_common::{OutputLine, OutputStream};

use crate::domain::action::HttpMethod;
use crate::domain::config::StagehandConfig;
use crate::domain::error::{ActionError, ExecError};

// ── Value Types ───────────────────────────────────────────────────────────────

/// A local process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory; inherits the caller's when `None`.
    pub cwd: Option<PathBuf>,
    /// Variables set on top of the inherited environment.
    pub env: Vec<(String, String)>,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Program and arguments joined for log messages.
    #[must_use]
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Everything a finished process printed. Streaming and buffering happen
/// together: each line goes to the sink as it arrives and is kept here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    /// Both streams in arrival order.
    pub lines: Vec<OutputLine>,
    pub exit_code: i32,
}

impl CapturedOutput {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Both streams interleaved in arrival order.
    #[must_use]
    pub fn combined(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }

    /// Record one line in both the per-stream buffer and the combined log.
    pub fn push(&mut self, line: OutputLine) {
        let buf = match line.stream {
            OutputStream::Stdout => &mut self.stdout,
            OutputStream::Stderr => &mut self.stderr,
        };
        buf.push_str(&line.text);
        buf.push('\n');
        self.lines.push(line);
    }
}

// ── Output Sink Port ──────────────────────────────────────────────────────────

/// Receives output lines as they are produced.
pub trait OutputSink {
    fn line(&self, line: &OutputLine);
}

impl<F: Fn(&OutputLine)> OutputSink for F {
    fn line(&self, line: &OutputLine) {
        self(line);
    }
}

/// Discards every line.
pub struct NullSink;

impl OutputSink for NullSink {
    fn line(&self, _line: &OutputLine) {}
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts local process execution so infrastructure can be swapped or
/// mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a process to completion, streaming each line to `sink`.
    ///
    /// A non-zero exit is not an error here; callers inspect
    /// `CapturedOutput::exit_code`.
    ///
    /// # Errors
    ///
    /// `Spawn` if the process cannot start, `Timeout` (with the output so
    /// far) if it outlives `timeout`. On timeout the child must be killed.
    async fn run_streaming(
        &self,
        spec: &CommandSpec,
        sink: &dyn OutputSink,
        timeout: Duration,
    ) -> Result<CapturedOutput, ExecError>;
}

// ── Remote Execution Port ─────────────────────────────────────────────────────

/// One server, reached over an established connection. Every call either
/// fully succeeds or fails with a typed `ExecError`; no retries here.
#[allow(async_fn_in_trait)]
pub trait RemoteExecutor {
    /// Host name used in messages.
    fn host(&self) -> &str;

    /// Timeout applied by `run_command`.
    fn default_timeout(&self) -> Duration;

    /// Run a shell command remotely. A non-zero exit is `CommandFailed`.
    async fn run_command(
        &self,
        command: &str,
        sink: &dyn OutputSink,
    ) -> Result<CapturedOutput, ExecError> {
        self.run_command_with_timeout(command, sink, self.default_timeout())
            .await
    }

    /// Run a shell command remotely with a caller-supplied timeout.
    async fn run_command_with_timeout(
        &self,
        command: &str,
        sink: &dyn OutputSink,
        timeout: Duration,
    ) -> Result<CapturedOutput, ExecError>;

    /// Copy a local file to `remote` (relative paths resolve against the
    /// remote home).
    async fn upload_file(
        &self,
        local: &Path,
        remote: &str,
        sink: &dyn OutputSink,
    ) -> Result<(), ExecError>;

    /// Round-trip a trivial command and describe the remote system.
    async fn test_connection(&self) -> Result<String, ExecError>;

    /// Release the connection. Later calls may reconnect or fail.
    async fn disconnect(&self) -> Result<(), ExecError> {
        Ok(())
    }
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait, no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
    /// `current` of `total` items are finished.
    fn progress(&self, current: usize, total: usize) {
        let _ = (current, total);
    }
}

// ── HTTP Ports ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub url: String,
    pub bearer_token: Option<String>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Sends API action requests.
#[allow(async_fn_in_trait)]
pub trait ApiTransport {
    /// Any HTTP status is a response; only transport failures are errors.
    ///
    /// # Errors
    ///
    /// `ActionError::Network` when no response was received.
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, ActionError>;
}

/// Supplies the bearer token for authenticated API actions.
pub trait TokenProvider {
    fn bearer_token(&self) -> Option<String>;
}

/// Resolves `{{settings.<key>}}` payload tokens.
pub trait SettingsLookup {
    fn setting(&self, key: &str) -> Option<String>;
}

impl SettingsLookup for BTreeMap<String, String> {
    fn setting(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

// ── Configuration Port ────────────────────────────────────────────────────────

/// Loads and persists the project configuration file.
pub trait ConfigStore {
    /// Load the configuration; a missing file is an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    fn load(&self) -> Result<StagehandConfig>;

    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, config: &StagehandConfig) -> Result<()>;

    /// # Errors
    ///
    /// Returns an error if no location can be determined.
    fn path(&self) -> Result<PathBuf>;
}
