//! `stagehand test-connection`

use std::process::ExitCode;

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::RemoteExecutor;
use crate::output::json;

/// Run the test-connection command.
///
/// # Errors
///
/// Returns an error if the server cannot be reached.
pub async fn run(app: &AppContext) -> Result<ExitCode> {
    let (project, remote) = app.connect().await?;
    let result = remote.test_connection().await;
    if let Err(err) = remote.disconnect().await {
        tracing::warn!(error = %err, "disconnect failed");
    }
    let uname = result?;

    if app.is_json() {
        json::print(&serde_json::json!({
            "project": project.name,
            "host": remote.host(),
            "system": uname,
        }))?;
    } else {
        app.output
            .success(&format!("Connected to {}", remote.host()));
        app.output.kv("System:", &uname);
    }
    Ok(ExitCode::SUCCESS)
}
