//! `stagehand deploy`: build and deploy components.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use stagehand_common::OutputLine;
use tokio_util::sync::CancellationToken;

use crate::app::AppContext;
use crate::application::ports::{NullSink, OutputSink, RemoteExecutor};
use crate::application::services::session::ProjectSession;
use crate::domain::component::Component;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::ssh::SshClient;
use crate::output::human::HumanRenderer;
use crate::output::json;
use crate::output::reporter::TerminalReporter;

#[derive(Args)]
pub struct DeployArgs {
    /// Component ids, deployed in the order given
    pub ids: Vec<String>,

    /// Deploy every component that is outdated or not deployed
    #[arg(long, conflicts_with = "ids")]
    pub outdated: bool,

    /// Stream build and remote output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Run the deploy command.
///
/// # Errors
///
/// Returns an error if the project cannot be resolved, the server cannot be
/// reached, or a component id is unknown. Pipeline failures are reported in
/// the batch summary and yield a failure exit code instead.
pub async fn run(app: &AppContext, args: &DeployArgs) -> Result<ExitCode> {
    if args.ids.is_empty() && !args.outdated {
        anyhow::bail!("Name the components to deploy, or pass --outdated");
    }
    let (project, remote) = app.connect().await?;
    let mut session = ProjectSession::new(project, remote);
    let code = deploy(app, args, &mut session).await;
    session.close().await;
    code
}

async fn deploy(
    app: &AppContext,
    args: &DeployArgs,
    session: &mut ProjectSession<SshClient>,
) -> Result<ExitCode> {
    if args.outdated {
        session.versions().await?;
    }
    let targets: Vec<&Component> = if args.outdated {
        session.outdated()
    } else {
        session.components_by_id(&args.ids)?
    };
    if targets.is_empty() {
        app.output.info("Nothing to deploy");
        if app.is_json() {
            json::print(&stagehand_common::BatchReport::default())?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let names: Vec<&str> = targets.iter().map(|c| c.name.as_str()).collect();
    let prompt = format!(
        "Deploy {} to {}?",
        names.join(", "),
        session.remote().host()
    );
    if !app.confirm(&prompt, true)? {
        app.output.info("Cancelled");
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, stopping after the current component");
            on_interrupt.cancel();
        }
    });

    let reporter = if args.verbose {
        TerminalReporter::new(&app.output)
    } else {
        TerminalReporter::with_batch_bar(&app.output, targets.len())
    };
    let echo = |line: &OutputLine| app.output.stream_line(line);
    let sink: &dyn OutputSink = if args.verbose { &echo } else { &NullSink };

    let batch = session
        .deploy(&targets, &TokioCommandRunner::new(), &reporter, sink, &cancel)
        .await;
    reporter.finish();
    interrupt.abort();

    if app.is_json() {
        json::print(&batch)?;
    } else {
        HumanRenderer::new(&app.output).render_batch(&batch);
    }
    Ok(if batch.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
