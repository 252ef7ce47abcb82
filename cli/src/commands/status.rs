//! `stagehand status`: local and remote versions of every component.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::session::ProjectSession;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::ssh::SshClient;
use crate::output::human::HumanRenderer;
use crate::output::{json, progress};

#[derive(Args)]
pub struct StatusArgs {
    /// Skip the server; remote versions show as unknown
    #[arg(long)]
    pub local: bool,
}

/// Run the status command.
///
/// # Errors
///
/// Returns an error if the project cannot be resolved or the server probe
/// fails.
pub async fn run(app: &AppContext, args: &StatusArgs) -> Result<ExitCode> {
    let (project, remote) = if args.local {
        let project = app.resolve_project()?;
        let remote = SshClient::new(
            &project.config.server,
            TokioCommandRunner::new(),
            project.config.timeouts.remote(),
        );
        (project, remote)
    } else {
        app.connect().await?
    };

    let mut session = ProjectSession::new(project, remote);
    if !args.local {
        let spinner = app
            .output
            .show_progress()
            .then(|| progress::spinner("Checking remote versions"));
        let probed = session.versions().await.map(|_| ());
        if let Some(pb) = &spinner {
            match &probed {
                Ok(()) => progress::finish_ok(pb, "Remote versions checked"),
                Err(e) => progress::finish_error(pb, &e.to_string()),
            }
        }
        if let Err(err) = probed {
            session.close().await;
            return Err(err.into());
        }
    }

    let statuses = session.statuses();
    if app.is_json() {
        json::print(&serde_json::json!({
            "project": session.project().name,
            "host": session.project().config.server.host,
            "components": statuses,
        }))?;
    } else {
        HumanRenderer::new(&app.output).render_status(
            &session.project().name,
            &session.project().config.server.host,
            &statuses,
        );
    }

    if !args.local {
        session.close().await;
    }
    Ok(ExitCode::SUCCESS)
}
