//! `stagehand project`: list projects and switch the active one.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::domain::error::ConfigError;
use crate::output::json;

/// Project subcommands.
#[derive(Subcommand)]
pub enum ProjectCommand {
    /// List configured projects
    List,
    /// Make a project the active one
    Use {
        /// Project name
        name: String,
    },
}

/// Run the project command.
///
/// # Errors
///
/// Returns an error if the config cannot be read or written, or the project
/// does not exist.
pub fn run(app: &AppContext, cmd: ProjectCommand) -> Result<ExitCode> {
    match cmd {
        ProjectCommand::List => list(app),
        ProjectCommand::Use { name } => use_project(app, &name),
    }
}

fn list(app: &AppContext) -> Result<ExitCode> {
    let config = app.load_config()?;
    if app.is_json() {
        let projects: Vec<_> = config
            .projects
            .iter()
            .map(|(name, p)| {
                serde_json::json!({
                    "name": name,
                    "host": p.server.host,
                    "active": config.active_project.as_deref() == Some(name.as_str()),
                    "components": p.components.len(),
                })
            })
            .collect();
        json::print(&projects)?;
        return Ok(ExitCode::SUCCESS);
    }
    if config.projects.is_empty() {
        app.output.info(&format!(
            "No projects configured. Add one to {}",
            app.config_store.path()?.display()
        ));
        return Ok(ExitCode::SUCCESS);
    }
    if !app.output.quiet {
        for (name, project) in &config.projects {
            let marker = if config.active_project.as_deref() == Some(name.as_str()) {
                "*"
            } else {
                " "
            };
            println!("{marker} {name:<20} {}", project.server.host);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn use_project(app: &AppContext, name: &str) -> Result<ExitCode> {
    let mut config = app.load_config()?;
    if !config.projects.contains_key(name) {
        return Err(ConfigError::UnknownProject {
            name: name.to_string(),
            valid: config.projects.keys().cloned().collect::<Vec<_>>().join(", "),
        }
        .into());
    }
    config.active_project = Some(name.to_string());
    app.config_store.save(&config)?;
    app.output.success(&format!("Active project: {name}"));
    Ok(ExitCode::SUCCESS)
}
