use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deployment state of one component.
///
/// Derived from local vs. remote version data (see [`crate::derive_status`])
/// except while a pipeline is running for the component, when the
/// orchestrator publishes `Deploying` and then a terminal `Current`/`Failed`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum DeployStatus {
    /// No build artifact exists locally.
    BuildRequired,
    /// The remote install directory does not exist.
    NotDeployed,
    /// Local and remote versions cannot be compared.
    Unknown,
    /// Local and remote versions are identical.
    Current,
    /// Local and remote versions differ.
    NeedsUpdate,
    /// A pipeline is running; carries the stage in flight.
    Deploying(PipelineStage),
    /// The last pipeline run failed.
    Failed(String),
}

impl DeployStatus {
    /// Short human-readable label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::BuildRequired => "build required".to_string(),
            Self::NotDeployed => "not deployed".to_string(),
            Self::Unknown => "unknown".to_string(),
            Self::Current => "current".to_string(),
            Self::NeedsUpdate => "needs update".to_string(),
            Self::Deploying(stage) => format!("deploying ({})", stage.description()),
            Self::Failed(reason) => format!("failed: {reason}"),
        }
    }

    /// Whether this status makes the component eligible for
    /// "deploy everything outdated".
    #[must_use]
    pub fn wants_deploy(&self) -> bool {
        matches!(self, Self::NeedsUpdate | Self::NotDeployed)
    }

    /// Whether this is a pipeline terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Current | Self::Failed(_))
    }
}

impl fmt::Display for DeployStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// The five fixed deployment stages, in execution order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Build,
    Upload,
    RemoveOld,
    Extract,
    Cleanup,
}

impl PipelineStage {
    /// All stages in execution order.
    pub const ALL: [Self; 5] = [
        Self::Build,
        Self::Upload,
        Self::RemoveOld,
        Self::Extract,
        Self::Cleanup,
    ];

    /// Returns the next stage, or `None` if this is the final stage.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Build => Some(Self::Upload),
            Self::Upload => Some(Self::RemoveOld),
            Self::RemoveOld => Some(Self::Extract),
            Self::Extract => Some(Self::Cleanup),
            Self::Cleanup => None,
        }
    }

    /// Returns a human-readable description of this stage.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Build => "building",
            Self::Upload => "uploading",
            Self::RemoveOld => "removing old files",
            Self::Extract => "extracting",
            Self::Cleanup => "cleaning up",
        }
    }

    /// Whether a failure in this stage fails the component.
    ///
    /// Cleanup runs after the component is installed, so its failure is
    /// logged but never changes the outcome.
    #[must_use]
    pub fn is_fatal(self) -> bool {
        !matches!(self, Self::Cleanup)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// What the remote server reports for one component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RemoteVersionInfo {
    /// A parseable version token was found in the remote main file.
    Version(String),
    /// The install directory exists but carries no parseable version.
    /// Never comparable to a local version.
    Timestamp(DateTime<Utc>),
    /// The install directory does not exist.
    NotDeployed,
}

/// Which process stream a line of output came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of streamed process output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub text: String,
}

impl OutputLine {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            text: text.into(),
        }
    }

    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            text: text.into(),
        }
    }
}

/// Immutable record of one component's pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentReport {
    pub component_id: String,
    pub component_name: String,
    pub success: bool,
    /// Everything the pipeline emitted for this component, in order.
    pub log: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stage that failed, when `success` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<PipelineStage>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DeploymentReport {
    /// Terminal status this report implies for its component.
    #[must_use]
    pub fn status(&self) -> DeployStatus {
        if self.success {
            DeployStatus::Current
        } else {
            DeployStatus::Failed(self.error.clone().unwrap_or_default())
        }
    }
}

/// A component rejected before its pipeline started.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedComponent {
    pub component_id: String,
    pub component_name: String,
    pub reason: String,
}

/// Why a batch stopped before processing every component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum BatchHalt {
    /// Cancellation was requested between components.
    Cancelled,
    /// The server became unreachable or rejected authentication.
    ConnectionLost(String),
}

/// Result of a batch deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchReport {
    /// One report per processed component, in processing order.
    pub reports: Vec<DeploymentReport>,
    /// Components rejected before the batch started.
    #[serde(default)]
    pub skipped: Vec<SkippedComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub halted: Option<BatchHalt>,
}

impl BatchReport {
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.reports.iter().filter(|r| r.success).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| !r.success).count()
    }

    /// True when every submitted component was deployed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.halted.is_none() && self.skipped.is_empty() && self.failed() == 0
    }
}
