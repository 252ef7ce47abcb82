//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator at the command layer.

use std::path::PathBuf;
use std::time::Duration;

use stagehand_common::PipelineStage;
use thiserror::Error;

/// Last non-empty line of captured output, for one-line error messages.
fn tail(output: &str) -> &str {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("no output")
}

// ── Execution errors ──────────────────────────────────────────────────────────

/// Failure of a single local process or remote command/upload.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("authentication rejected by {host}: {detail}")]
    AuthFailure { host: String, detail: String },

    #[error("cannot reach {host}: {detail}")]
    HostUnreachable { host: String, detail: String },

    #[error("command exited with status {exit_code}: {}", tail(.output))]
    CommandFailed { exit_code: i32, output: String },

    #[error("timed out after {}s", .after.as_secs())]
    Timeout { after: Duration, output: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExecError {
    /// Connection-level failures are fatal for a whole batch.
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::AuthFailure { .. } | Self::HostUnreachable { .. })
    }
}

// ── Deployment errors ─────────────────────────────────────────────────────────

/// Failure of one component's pipeline, or its pre-flight rejection.
#[derive(Debug, Error)]
pub enum DeployError {
    #[error("skipped: no build artifact at {}", .path.display())]
    ArtifactMissing { component: String, path: PathBuf },

    #[error("build exited with status {exit_code}: {}", tail(.output))]
    BuildFailed { exit_code: i32, output: String },

    #[error("build reported success but produced no artifact at {}", .path.display())]
    NoArtifactAfterBuild { path: PathBuf },

    #[error("{stage} failed: {source}")]
    Stage {
        stage: PipelineStage,
        #[source]
        source: ExecError,
    },

    #[error("refusing to modify unsafe remote path '{0}'")]
    UnsafeRemotePath(String),
}

impl DeployError {
    /// The stage this error belongs to; `None` for pre-flight rejection.
    #[must_use]
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Self::ArtifactMissing { .. } => None,
            Self::BuildFailed { .. } | Self::NoArtifactAfterBuild { .. } => {
                Some(PipelineStage::Build)
            }
            Self::Stage { stage, .. } => Some(*stage),
            Self::UnsafeRemotePath(_) => Some(PipelineStage::RemoveOld),
        }
    }

    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Stage { source, .. } if source.is_connection_error())
    }
}

// ── Module errors ─────────────────────────────────────────────────────────────

/// Failure of one module invocation. Every variant raised after launch
/// carries the raw output so it can still be shown.
#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("missing required input '{0}'")]
    MissingInput(String),

    #[error("module does not declare an input '{0}'")]
    UnknownInput(String),

    #[error("failed to launch module: {0}")]
    Spawn(#[source] ExecError),

    #[error("module timed out after {}s", .after.as_secs())]
    Timeout { after: Duration, raw_output: String },

    #[error("module output contained no valid result object")]
    NoStructuredResult { raw_output: String },
}

impl ModuleError {
    /// Raw output captured before the failure, if the process ran at all.
    #[must_use]
    pub fn raw_output(&self) -> Option<&str> {
        match self {
            Self::Timeout { raw_output, .. } | Self::NoStructuredResult { raw_output } => {
                Some(raw_output)
            }
            Self::MissingInput(_) | Self::UnknownInput(_) | Self::Spawn(_) => None,
        }
    }
}

// ── Action errors ─────────────────────────────────────────────────────────────

/// Failure of one post-run action. Never affects the produced results.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("module has no action '{0}'")]
    UnknownAction(String),

    #[error("invalid action configuration: {0}")]
    InvalidConfig(String),

    #[error("action requires authentication but no token is available")]
    NotAuthenticated,

    #[error("setting '{0}' is not available")]
    UnresolvedSetting(String),

    #[error("no rows selected")]
    NothingSelected,

    #[error("request failed: {0}")]
    Network(String),

    #[error("server rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to project configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No active project. Set 'active_project' in {0} or pass --project.")]
    NoActiveProject(String),

    #[error("Unknown project '{name}'. Configured projects: {valid}")]
    UnknownProject { name: String, valid: String },

    #[error("Project '{project}' is invalid:\n{problems}")]
    Invalid { project: String, problems: String },

    #[error("Unknown component '{0}'")]
    UnknownComponent(String),
}

// ── Manifest errors ───────────────────────────────────────────────────────────

/// Errors related to module manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Module '{id}' manifest is invalid:\n{problems}")]
    Invalid { id: String, problems: String },

    #[error("Module id '{0}' is declared more than once")]
    Duplicate(String),

    #[error("Module '{0}' not found")]
    NotFound(String),
}
