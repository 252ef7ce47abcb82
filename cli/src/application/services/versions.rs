//! Application service: remote version resolution and the status board.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::HashMap;

use serde::Serialize;
use stagehand_common::{DeployStatus, RemoteVersionInfo, derive_status};
use tokio::sync::watch;

use crate::application::ports::{NullSink, RemoteExecutor};
use crate::domain::component::{Component, RemoteLayout};
use crate::domain::error::ExecError;
use crate::domain::remote_probe::{ProbeTarget, parse_probe_output, probe_script};
use crate::domain::ssh::shell_quote;
use crate::domain::version::parse_local_version;

/// Remote version info keyed by component id.
pub type RemoteVersions = HashMap<String, RemoteVersionInfo>;

/// Probe every component's remote state in one round trip.
///
/// Components missing from the probe output are left out of the map and
/// resolve to `Unknown`.
///
/// # Errors
///
/// Propagates the remote executor's error.
pub async fn fetch_remote_versions(
    components: &[Component],
    layout: &RemoteLayout,
    remote: &impl RemoteExecutor,
) -> Result<RemoteVersions, ExecError> {
    let targets: Vec<ProbeTarget> = components
        .iter()
        .filter_map(|c| {
            Some(ProbeTarget {
                id: c.id.clone(),
                install_dir: layout.install_dir(c)?,
                main_file: c.main_file_name(),
            })
        })
        .collect();
    if targets.is_empty() {
        return Ok(RemoteVersions::new());
    }

    tracing::debug!(count = targets.len(), host = remote.host(), "probing remote versions");
    let command = format!("sh -c {}", shell_quote(&probe_script(&targets)));
    let output = remote.run_command(&command, &NullSink).await?;
    Ok(parse_probe_output(&output.stdout))
}

// ── Status board ──────────────────────────────────────────────────────────────

/// In-memory status overrides set while pipelines run. Only the orchestrator
/// writes; readers get cloned snapshots.
pub struct StatusBoard {
    tx: watch::Sender<HashMap<String, DeployStatus>>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(HashMap::new());
        Self { tx }
    }

    pub fn set(&self, component_id: &str, status: DeployStatus) {
        self.tx.send_modify(|map| {
            map.insert(component_id.to_string(), status);
        });
    }

    /// Drop every override, e.g. after a version refresh.
    pub fn reset(&self) {
        self.tx.send_modify(HashMap::clear);
    }

    #[must_use]
    pub fn override_for(&self, component_id: &str) -> Option<DeployStatus> {
        self.tx.borrow().get(component_id).cloned()
    }

    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, DeployStatus> {
        self.tx.borrow().clone()
    }

    /// Receiver notified on every change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<HashMap<String, DeployStatus>> {
        self.tx.subscribe()
    }
}

/// One component's resolved state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentStatus {
    pub id: String,
    pub name: String,
    pub category: String,
    pub has_artifact: bool,
    pub local_version: Option<String>,
    pub remote: Option<RemoteVersionInfo>,
    pub status: DeployStatus,
}

/// Resolve the status of one component: a board override wins over the
/// derived value.
#[must_use]
pub fn component_status(
    component: &Component,
    remote: &RemoteVersions,
    board: &StatusBoard,
) -> ComponentStatus {
    let has_artifact = component.has_artifact();
    let local_version = parse_local_version(component);
    let remote_info = remote.get(&component.id).cloned();
    let status = board.override_for(&component.id).unwrap_or_else(|| {
        derive_status(has_artifact, local_version.as_deref(), remote_info.as_ref())
    });
    ComponentStatus {
        id: component.id.clone(),
        name: component.name.clone(),
        category: component.category.label().to_string(),
        has_artifact,
        local_version,
        remote: remote_info,
        status,
    }
}

/// Components whose status calls for a deployment and that have an
/// artifact to deploy.
#[must_use]
pub fn needing_deploy<'a>(
    components: &'a [Component],
    remote: &RemoteVersions,
    board: &StatusBoard,
) -> Vec<&'a Component> {
    components
        .iter()
        .filter(|c| {
            let status = component_status(c, remote, board);
            status.has_artifact && status.status.wants_deploy()
        })
        .collect()
}
