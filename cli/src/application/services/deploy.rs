//! Application service: the five-stage deployment pipeline and the batch
//! driver around it.
//!
//! Components are processed strictly one after another and stages within a
//! component are awaited in order. Cancellation is observed only between
//! components, so a stage in flight always completes or fails on its own.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use stagehand_common::{
    BatchHalt, BatchReport, DeployStatus, DeploymentReport, OutputLine, PipelineStage,
    SkippedComponent,
};
use tokio_util::sync::CancellationToken;

use crate::application::ports::{
    CommandRunner, CommandSpec, OutputSink, ProgressReporter, RemoteExecutor,
};
use crate::application::services::versions::StatusBoard;
use crate::domain::component::{Component, RemoteLayout};
use crate::domain::error::{DeployError, ExecError};
use crate::domain::ssh::{is_safe_remote_path, shell_quote};

/// Per-batch settings taken from the active project.
pub struct DeployOptions<'a> {
    pub layout: &'a RemoteLayout,
    /// Prepended to `PATH` for build commands.
    pub toolchain_paths: &'a [PathBuf],
    pub build_timeout: Duration,
    /// Upload tries per component; only timeouts are retried.
    pub upload_attempts: u32,
    pub cancel: &'a CancellationToken,
}

/// Collaborators the pipeline drives.
pub struct Pipeline<'a, C, X, P> {
    pub runner: &'a C,
    pub remote: &'a X,
    pub board: &'a StatusBoard,
    pub reporter: &'a P,
    pub sink: &'a dyn OutputSink,
}

/// Split components into those that may enter the pipeline and those
/// rejected because no build artifact exists.
#[must_use]
pub fn preflight<'a>(components: &[&'a Component]) -> (Vec<&'a Component>, Vec<SkippedComponent>) {
    let mut ready = Vec::new();
    let mut skipped = Vec::new();
    for &component in components {
        if component.has_artifact() {
            ready.push(component);
        } else {
            let reason = DeployError::ArtifactMissing {
                component: component.id.clone(),
                path: component.artifact_path.clone(),
            };
            skipped.push(SkippedComponent {
                component_id: component.id.clone(),
                component_name: component.name.clone(),
                reason: reason.to_string(),
            });
        }
    }
    (ready, skipped)
}

/// Deploy `components` in order and return one report per processed
/// component.
///
/// A component's failure never stops the batch, except for connection-level
/// failures (authentication, unreachable host), which halt it after that
/// component's report. Cancellation is checked before each component.
pub async fn deploy_batch<C, X, P>(
    components: &[&Component],
    pipeline: &Pipeline<'_, C, X, P>,
    opts: &DeployOptions<'_>,
) -> BatchReport
where
    C: CommandRunner,
    X: RemoteExecutor,
    P: ProgressReporter,
{
    let (ready, skipped) = preflight(components);
    for s in &skipped {
        pipeline
            .reporter
            .warn(&format!("{}: {}", s.component_name, s.reason));
    }
    let mut batch = BatchReport {
        skipped,
        ..BatchReport::default()
    };

    let total = ready.len();
    for (index, component) in ready.into_iter().enumerate() {
        if opts.cancel.is_cancelled() {
            tracing::info!(completed = index, total, "deployment cancelled");
            batch.halted = Some(BatchHalt::Cancelled);
            break;
        }

        let (report, error) = deploy_component(component, pipeline, opts).await;
        pipeline.board.set(&component.id, report.status());
        pipeline.reporter.progress(index + 1, total);
        batch.reports.push(report);

        if let Some(err) = error.filter(DeployError::is_connection_error) {
            tracing::warn!(component = %component.id, error = %err, "connection lost, halting batch");
            batch.halted = Some(BatchHalt::ConnectionLost(err.to_string()));
            break;
        }
    }
    batch
}

/// Run the full pipeline for one component, capturing its log.
pub async fn deploy_component<C, X, P>(
    component: &Component,
    pipeline: &Pipeline<'_, C, X, P>,
    opts: &DeployOptions<'_>,
) -> (DeploymentReport, Option<DeployError>)
where
    C: CommandRunner,
    X: RemoteExecutor,
    P: ProgressReporter,
{
    let started_at = Utc::now();
    let log = RefCell::new(String::new());
    let tee = |line: &OutputLine| {
        {
            let mut log = log.borrow_mut();
            log.push_str(&line.text);
            log.push('\n');
        }
        pipeline.sink.line(line);
    };

    let result = run_stages(component, pipeline, opts, &tee).await;
    let error = result.err();
    match &error {
        None => pipeline
            .reporter
            .success(&format!("{} deployed", component.name)),
        Some(err) => {
            tee(&OutputLine::stderr(format!("error: {err}")));
            pipeline
                .reporter
                .warn(&format!("{} failed: {err}", component.name));
        }
    }

    let report = DeploymentReport {
        component_id: component.id.clone(),
        component_name: component.name.clone(),
        success: error.is_none(),
        log: log.into_inner(),
        error: error.as_ref().map(ToString::to_string),
        failed_stage: error.as_ref().and_then(DeployError::stage),
        started_at,
        finished_at: Utc::now(),
    };
    (report, error)
}

async fn run_stages<C, X, P>(
    component: &Component,
    pipeline: &Pipeline<'_, C, X, P>,
    opts: &DeployOptions<'_>,
    log: &dyn OutputSink,
) -> Result<(), DeployError>
where
    C: CommandRunner,
    X: RemoteExecutor,
    P: ProgressReporter,
{
    let layout = opts.layout;
    let staging = layout.staging_path(component);
    let install_dir = layout.install_dir(component).unwrap_or_default();
    let enter = |stage: PipelineStage| {
        tracing::info!(component = %component.id, %stage, "stage started");
        pipeline
            .board
            .set(&component.id, DeployStatus::Deploying(stage));
        pipeline
            .reporter
            .step(&format!("{}: {}", component.name, stage.description()));
        log.line(&OutputLine::stdout(format!("==> {}", stage.description())));
    };

    enter(PipelineStage::Build);
    build(component, pipeline.runner, opts, log).await?;

    enter(PipelineStage::Upload);
    upload(component, pipeline.remote, &staging, opts, log).await?;

    enter(PipelineStage::RemoveOld);
    if !is_safe_remote_path(&install_dir) || install_dir == layout.content_root {
        return Err(DeployError::UnsafeRemotePath(install_dir));
    }
    remote_stage(
        pipeline.remote,
        PipelineStage::RemoveOld,
        &format!("rm -rf {}", shell_quote(&install_dir)),
        log,
    )
    .await?;

    enter(PipelineStage::Extract);
    let parent = layout
        .extract_parent(component)
        .ok_or_else(|| DeployError::UnsafeRemotePath(String::new()))?;
    let dir = shell_quote(&install_dir);
    remote_stage(
        pipeline.remote,
        PipelineStage::Extract,
        &format!(
            "unzip -o -q {} -d {} && find {dir} -type d -exec chmod 755 {{}} + && find {dir} -type f -exec chmod 644 {{}} +",
            shell_quote(&staging),
            shell_quote(&parent),
        ),
        log,
    )
    .await?;

    enter(PipelineStage::Cleanup);
    if let Err(err) = remote_stage(
        pipeline.remote,
        PipelineStage::Cleanup,
        &format!("rm -f {}", shell_quote(&staging)),
        log,
    )
    .await
    {
        tracing::warn!(component = %component.id, error = %err, "cleanup failed");
        log.line(&OutputLine::stderr(format!("warning: {err}")));
        pipeline
            .reporter
            .warn(&format!("{}: {err} (installed anyway)", component.name));
    }
    Ok(())
}

async fn build(
    component: &Component,
    runner: &impl CommandRunner,
    opts: &DeployOptions<'_>,
    log: &dyn OutputSink,
) -> Result<(), DeployError> {
    let mut spec = CommandSpec::new("sh")
        .args(["-c", component.build_command.as_str()])
        .current_dir(&component.source_root);
    if let Some(path) = build_path(opts.toolchain_paths) {
        spec = spec.env("PATH", path);
    }

    tracing::debug!(component = %component.id, command = %spec.display(), "running build");
    let output = runner
        .run_streaming(&spec, log, opts.build_timeout)
        .await
        .map_err(|source| DeployError::Stage {
            stage: PipelineStage::Build,
            source,
        })?;
    if !output.success() {
        return Err(DeployError::BuildFailed {
            exit_code: output.exit_code,
            output: output.combined(),
        });
    }
    if !component.artifact_path.is_file() {
        return Err(DeployError::NoArtifactAfterBuild {
            path: component.artifact_path.clone(),
        });
    }
    Ok(())
}

/// `PATH` for builds: toolchain directories first, then the inherited
/// value. `None` when there is nothing to add.
fn build_path(toolchain_paths: &[PathBuf]) -> Option<String> {
    if toolchain_paths.is_empty() {
        return None;
    }
    let inherited = std::env::var_os("PATH").unwrap_or_default();
    let dirs = toolchain_paths
        .iter()
        .cloned()
        .chain(std::env::split_paths(&inherited));
    std::env::join_paths(dirs)
        .ok()
        .map(|p| p.to_string_lossy().into_owned())
}

async fn upload(
    component: &Component,
    remote: &impl RemoteExecutor,
    staging: &str,
    opts: &DeployOptions<'_>,
    log: &dyn OutputSink,
) -> Result<(), DeployError> {
    let stage_err = |source| DeployError::Stage {
        stage: PipelineStage::Upload,
        source,
    };
    remote
        .run_command(&format!("mkdir -p {}", shell_quote(&opts.layout.temp_dir)), log)
        .await
        .map_err(stage_err)?;

    let attempts = opts.upload_attempts.max(1);
    for attempt in 1..=attempts {
        match remote
            .upload_file(&component.artifact_path, staging, log)
            .await
        {
            Ok(()) => return Ok(()),
            Err(err @ ExecError::Timeout { .. }) if attempt < attempts => {
                tracing::warn!(component = %component.id, attempt, error = %err, "upload timed out, retrying");
                log.line(&OutputLine::stderr(format!(
                    "upload attempt {attempt}/{attempts} timed out, retrying"
                )));
            }
            Err(err) => return Err(stage_err(err)),
        }
    }
    Ok(())
}

async fn remote_stage(
    remote: &impl RemoteExecutor,
    stage: PipelineStage,
    command: &str,
    log: &dyn OutputSink,
) -> Result<(), DeployError> {
    tracing::debug!(%stage, command, "remote command");
    remote
        .run_command(command, log)
        .await
        .map(drop)
        .map_err(|source| DeployError::Stage { stage, source })
}
