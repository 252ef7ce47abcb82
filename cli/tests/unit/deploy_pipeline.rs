//! Deployment orchestrator: batch semantics, stage ordering, retries.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;
use std::time::Duration;

use stagehand_cli::application::ports::NullSink;
use stagehand_cli::application::services::deploy::{DeployOptions, Pipeline, deploy_batch, preflight};
use stagehand_cli::application::services::versions::StatusBoard;
use stagehand_cli::domain::component::Component;
use stagehand_common::{BatchHalt, DeployStatus, PipelineStage};
use tokio_util::sync::CancellationToken;

use crate::helpers::{self, Fixture};
use crate::mocks::{
    MockRemote, MockRunner, RecordingReporter, captured, command_failed, timed_out, unreachable,
};

const NO_TOOLCHAIN: &[PathBuf] = &[];

async fn run(
    components: &[&Component],
    runner: &MockRunner,
    remote: &MockRemote,
    reporter: &RecordingReporter,
    board: &StatusBoard,
    layout: &stagehand_cli::domain::component::RemoteLayout,
    cancel: &CancellationToken,
) -> stagehand_common::BatchReport {
    let pipeline = Pipeline {
        runner,
        remote,
        board,
        reporter,
        sink: &NullSink,
    };
    let opts = DeployOptions {
        layout,
        toolchain_paths: NO_TOOLCHAIN,
        build_timeout: Duration::from_secs(60),
        upload_attempts: 2,
        cancel,
    };
    deploy_batch(components, &pipeline, &opts).await
}

#[tokio::test]
async fn test_batch_reports_every_component_and_continues_past_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(
        dir.path(),
        &[
            Fixture::theme("house", "1.0.0"),
            Fixture::plugin("events", "2.0.0"),
            Fixture::plugin("forms", "0.3.0"),
        ],
    );
    let all = helpers::components(&config);
    let targets: Vec<&Component> = all.iter().collect();
    // Second build (events) exits non-zero.
    let runner = MockRunner::with(vec![
        Ok(captured(0, &["built house"])),
        Ok(captured(2, &["npm ERR! missing script"])),
        Ok(captured(0, &[])),
    ]);
    let remote = MockRemote::new();
    let reporter = RecordingReporter::new();
    let board = StatusBoard::new();

    let batch = run(
        &targets,
        &runner,
        &remote,
        &reporter,
        &board,
        &helpers::layout(&config),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(batch.reports.len(), 3);
    assert_eq!(batch.succeeded(), 2);
    assert!(batch.halted.is_none());
    let failed = batch.reports.iter().find(|r| !r.success).unwrap();
    assert_eq!(failed.component_id, "events");
    assert_eq!(failed.failed_stage, Some(PipelineStage::Build));
    assert!(failed.log.contains("npm ERR! missing script"));

    // A failed build never touches the server for that component.
    assert_eq!(remote.uploads.borrow().len(), 2);
    assert!(matches!(board.override_for("events"), Some(DeployStatus::Failed(_))));
    assert_eq!(board.override_for("house"), Some(DeployStatus::Current));
    assert!(reporter.has("progress: 3/3"));
}

#[tokio::test]
async fn test_stages_run_in_order_with_expected_commands() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(dir.path(), &[Fixture::theme("house", "1.0.0")]);
    let all = helpers::components(&config);
    let runner = MockRunner::new();
    let remote = MockRemote::new();
    let reporter = RecordingReporter::new();

    let batch = run(
        &[&all[0]],
        &runner,
        &remote,
        &reporter,
        &StatusBoard::new(),
        &helpers::layout(&config),
        &CancellationToken::new(),
    )
    .await;
    assert!(batch.is_clean());

    let build = &runner.calls.borrow()[0];
    assert_eq!(build.program, "sh");
    assert_eq!(build.args, vec!["-c".to_string(), "./build.sh".to_string()]);
    assert_eq!(build.cwd.as_deref(), Some(all[0].source_root.as_path()));

    let commands = remote.commands.borrow();
    assert_eq!(commands[0], "mkdir -p 'tmp'");
    assert_eq!(
        commands[1],
        format!("rm -rf '{}/themes/house'", helpers::CONTENT_ROOT)
    );
    assert!(commands[2].starts_with(&format!(
        "unzip -o -q 'tmp/house.zip' -d '{}/themes'",
        helpers::CONTENT_ROOT
    )));
    assert!(commands[2].contains("chmod 755"));
    assert!(commands[2].contains("chmod 644"));
    assert_eq!(commands[3], "rm -f 'tmp/house.zip'");
    assert_eq!(remote.uploads.borrow()[0].1, "tmp/house.zip");

    let steps: Vec<String> = reporter
        .events
        .borrow()
        .iter()
        .filter(|e| e.starts_with("step:"))
        .cloned()
        .collect();
    assert_eq!(steps.len(), PipelineStage::ALL.len());

    let log = &batch.reports[0].log;
    let build_at = log.find(PipelineStage::Build.description()).unwrap();
    let cleanup_at = log.find(PipelineStage::Cleanup.description()).unwrap();
    assert!(build_at < cleanup_at);
}

#[tokio::test]
async fn test_cancellation_between_components() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(
        dir.path(),
        &[
            Fixture::theme("a-theme", "1.0.0"),
            Fixture::plugin("b-plugin", "1.0.0"),
            Fixture::plugin("c-plugin", "1.0.0"),
        ],
    );
    let all = helpers::components(&config);
    let targets: Vec<&Component> = all.iter().collect();
    let cancel = CancellationToken::new();
    let reporter = RecordingReporter::cancelling(1, cancel.clone());

    let batch = run(
        &targets,
        &MockRunner::new(),
        &MockRemote::new(),
        &reporter,
        &StatusBoard::new(),
        &helpers::layout(&config),
        &cancel,
    )
    .await;

    assert_eq!(batch.reports.len(), 1);
    assert!(batch.reports[0].success);
    assert_eq!(batch.halted, Some(BatchHalt::Cancelled));
}

#[tokio::test]
async fn test_connection_error_halts_batch_after_reporting() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(
        dir.path(),
        &[Fixture::theme("house", "1.0.0"), Fixture::plugin("events", "1.0.0")],
    );
    let all = helpers::components(&config);
    let targets: Vec<&Component> = all.iter().collect();
    let remote = MockRemote::new().failing("mkdir -p", unreachable);

    let batch = run(
        &targets,
        &MockRunner::new(),
        &remote,
        &RecordingReporter::new(),
        &StatusBoard::new(),
        &helpers::layout(&config),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(batch.reports.len(), 1);
    assert!(!batch.reports[0].success);
    assert_eq!(batch.reports[0].failed_stage, Some(PipelineStage::Upload));
    assert!(matches!(batch.halted, Some(BatchHalt::ConnectionLost(_))));
}

#[tokio::test]
async fn test_cleanup_failure_is_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(dir.path(), &[Fixture::theme("house", "1.0.0")]);
    let all = helpers::components(&config);
    let remote = MockRemote::new().failing("rm -f", command_failed);
    let reporter = RecordingReporter::new();

    let batch = run(
        &[&all[0]],
        &MockRunner::new(),
        &remote,
        &reporter,
        &StatusBoard::new(),
        &helpers::layout(&config),
        &CancellationToken::new(),
    )
    .await;

    assert!(batch.reports[0].success);
    assert!(batch.reports[0].log.contains("warning:"));
    assert!(reporter.has("warn: house:"));
}

#[tokio::test]
async fn test_extract_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(dir.path(), &[Fixture::theme("house", "1.0.0")]);
    let all = helpers::components(&config);
    let remote = MockRemote::new().failing("unzip", command_failed);

    let batch = run(
        &[&all[0]],
        &MockRunner::new(),
        &remote,
        &RecordingReporter::new(),
        &StatusBoard::new(),
        &helpers::layout(&config),
        &CancellationToken::new(),
    )
    .await;

    assert!(!batch.reports[0].success);
    assert_eq!(batch.reports[0].failed_stage, Some(PipelineStage::Extract));
    assert_eq!(remote.commands_containing("rm -f"), 0);
}

#[tokio::test]
async fn test_missing_artifact_is_skipped_before_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(
        dir.path(),
        &[
            Fixture::theme("house", "1.0.0").without_artifact(),
            Fixture::plugin("events", "1.0.0"),
        ],
    );
    let all = helpers::components(&config);
    let targets: Vec<&Component> = all.iter().collect();

    let (ready, skipped) = preflight(&targets);
    assert_eq!(ready.len(), 1);
    assert_eq!(skipped[0].component_id, "house");

    let runner = MockRunner::new();
    let batch = run(
        &targets,
        &runner,
        &MockRemote::new(),
        &RecordingReporter::new(),
        &StatusBoard::new(),
        &helpers::layout(&config),
        &CancellationToken::new(),
    )
    .await;
    assert_eq!(batch.reports.len(), 1);
    assert_eq!(batch.skipped.len(), 1);
    assert_eq!(runner.calls.borrow().len(), 1);
    assert!(!batch.is_clean());
}

#[tokio::test]
async fn test_upload_timeout_is_retried_once() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(dir.path(), &[Fixture::theme("house", "1.0.0")]);
    let all = helpers::components(&config);

    let remote = MockRemote::new().with_uploads(vec![Err(timed_out()), Ok(())]);
    let batch = run(
        &[&all[0]],
        &MockRunner::new(),
        &remote,
        &RecordingReporter::new(),
        &StatusBoard::new(),
        &helpers::layout(&config),
        &CancellationToken::new(),
    )
    .await;
    assert!(batch.reports[0].success);
    assert_eq!(remote.uploads.borrow().len(), 2);

    let remote = MockRemote::new().with_uploads(vec![Err(timed_out()), Err(timed_out())]);
    let batch = run(
        &[&all[0]],
        &MockRunner::new(),
        &remote,
        &RecordingReporter::new(),
        &StatusBoard::new(),
        &helpers::layout(&config),
        &CancellationToken::new(),
    )
    .await;
    assert!(!batch.reports[0].success);
    assert_eq!(batch.reports[0].failed_stage, Some(PipelineStage::Upload));
    assert_eq!(remote.uploads.borrow().len(), 2);
}

#[tokio::test]
async fn test_build_without_artifact_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = helpers::project(dir.path(), &[Fixture::theme("house", "1.0.0")]);
    let all = helpers::components(&config);
    // The artifact existed at preflight but the build removed it.
    std::fs::remove_file(&all[0].artifact_path).unwrap();
    let component = all[0].clone();

    let pipeline_board = StatusBoard::new();
    let remote = MockRemote::new();
    let runner = MockRunner::new();
    let reporter = RecordingReporter::new();
    let pipeline = Pipeline {
        runner: &runner,
        remote: &remote,
        board: &pipeline_board,
        reporter: &reporter,
        sink: &NullSink,
    };
    let cancel = CancellationToken::new();
    let layout = helpers::layout(&config);
    let opts = DeployOptions {
        layout: &layout,
        toolchain_paths: NO_TOOLCHAIN,
        build_timeout: Duration::from_secs(60),
        upload_attempts: 2,
        cancel: &cancel,
    };
    let (report, err) =
        stagehand_cli::application::services::deploy::deploy_component(&component, &pipeline, &opts)
            .await;
    assert!(!report.success);
    assert_eq!(report.failed_stage, Some(PipelineStage::Build));
    assert!(err.unwrap().to_string().contains("artifact"));
    assert!(remote.uploads.borrow().is_empty());
}
