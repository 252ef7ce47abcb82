//! Application service: one project's session.
//!
//! A `ProjectSession` owns everything scoped to the active project: the
//! remote connection, the component registry snapshot, the cached remote
//! versions, and the status board. Switching projects builds a new session
//! rather than mutating this one.

use std::future::Future;

use stagehand_common::BatchReport;
use tokio_util::sync::CancellationToken;

use crate::application::ports::{CommandRunner, OutputSink, ProgressReporter, RemoteExecutor};
use crate::application::services::deploy::{DeployOptions, Pipeline, deploy_batch};
use crate::application::services::versions::{
    ComponentStatus, RemoteVersions, StatusBoard, component_status, fetch_remote_versions,
    needing_deploy,
};
use crate::domain::component::{Component, RemoteLayout, all_components};
use crate::domain::config::{ActiveProject, ServerConfig};
use crate::domain::error::{ConfigError, ExecError};

pub struct ProjectSession<X> {
    project: ActiveProject,
    components: Vec<Component>,
    layout: RemoteLayout,
    remote: X,
    board: StatusBoard,
    versions: Option<RemoteVersions>,
}

impl<X: RemoteExecutor> ProjectSession<X> {
    /// Build a session over an already-connected remote.
    #[must_use]
    pub fn new(project: ActiveProject, remote: X) -> Self {
        let components = all_components(&project.config);
        let layout = RemoteLayout::from_project(&project.config);
        Self {
            project,
            components,
            layout,
            remote,
            board: StatusBoard::new(),
            versions: None,
        }
    }

    #[must_use]
    pub fn project(&self) -> &ActiveProject {
        &self.project
    }

    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    #[must_use]
    pub fn remote(&self) -> &X {
        &self.remote
    }

    #[must_use]
    pub fn board(&self) -> &StatusBoard {
        &self.board
    }

    /// Look up components by id, keeping the requested order.
    ///
    /// # Errors
    ///
    /// Returns `UnknownComponent` for the first id not in the registry.
    pub fn components_by_id(&self, ids: &[String]) -> Result<Vec<&Component>, ConfigError> {
        ids.iter()
            .map(|id| {
                self.components
                    .iter()
                    .find(|c| &c.id == id)
                    .ok_or_else(|| ConfigError::UnknownComponent(id.clone()))
            })
            .collect()
    }

    /// Probe the server again and drop stale status overrides.
    ///
    /// # Errors
    ///
    /// Propagates the probe's `ExecError`; the previous cache is kept.
    pub async fn refresh_versions(&mut self) -> Result<&RemoteVersions, ExecError> {
        let versions = fetch_remote_versions(&self.components, &self.layout, &self.remote).await?;
        self.board.reset();
        Ok(self.versions.insert(versions))
    }

    /// Cached remote versions, probing once if nothing is cached yet.
    ///
    /// # Errors
    ///
    /// Propagates the probe's `ExecError`.
    pub async fn versions(&mut self) -> Result<&RemoteVersions, ExecError> {
        if self.versions.is_none() {
            return self.refresh_versions().await;
        }
        Ok(self.versions.get_or_insert_default())
    }

    /// Status of every component from cached data; components are `Unknown`
    /// remotely until versions have been fetched.
    #[must_use]
    pub fn statuses(&self) -> Vec<ComponentStatus> {
        let empty = RemoteVersions::new();
        let remote = self.versions.as_ref().unwrap_or(&empty);
        self.components
            .iter()
            .map(|c| component_status(c, remote, &self.board))
            .collect()
    }

    /// Components that are outdated or not deployed and have an artifact.
    #[must_use]
    pub fn outdated(&self) -> Vec<&Component> {
        let empty = RemoteVersions::new();
        let remote = self.versions.as_ref().unwrap_or(&empty);
        needing_deploy(&self.components, remote, &self.board)
    }

    /// Deploy `components` with this project's settings.
    pub async fn deploy(
        &self,
        components: &[&Component],
        runner: &impl CommandRunner,
        reporter: &impl ProgressReporter,
        sink: &dyn OutputSink,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let config = &self.project.config;
        let opts = DeployOptions {
            layout: &self.layout,
            toolchain_paths: &config.toolchain_paths,
            build_timeout: config.timeouts.build(),
            upload_attempts: config.upload_attempts,
            cancel,
        };
        let pipeline = Pipeline {
            runner,
            remote: &self.remote,
            board: &self.board,
            reporter,
            sink,
        };
        deploy_batch(components, &pipeline, &opts).await
    }

    /// Close the connection and hand back the executor.
    pub async fn close(self) -> X {
        if let Err(err) = self.remote.disconnect().await {
            tracing::warn!(host = self.remote.host(), error = %err, "disconnect failed");
        }
        self.remote
    }
}

/// Replace `current` with a session for `next`. The old connection is
/// closed first and none of its caches carry over.
///
/// # Errors
///
/// Returns the error from connecting to the new project's server.
pub async fn switch_project<X, F, Fut>(
    current: ProjectSession<X>,
    next: ActiveProject,
    connect: F,
) -> Result<ProjectSession<X>, ExecError>
where
    X: RemoteExecutor,
    F: FnOnce(ServerConfig) -> Fut,
    Fut: Future<Output = Result<X, ExecError>>,
{
    tracing::info!(from = %current.project.name, to = %next.name, "switching project");
    current.close().await;
    let remote = connect(next.config.server.clone()).await?;
    Ok(ProjectSession::new(next, remote))
}
