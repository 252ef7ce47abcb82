//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags};
use crate::commands;

/// Deploy components over SSH and run external modules
#[derive(Parser)]
#[command(
    name = "stagehand",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Answer yes to confirmation prompts
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Project to operate on instead of the active one
    #[arg(long, global = true, env = "STAGEHAND_PROJECT")]
    pub project: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show local and remote versions of every component
    Status(commands::status::StatusArgs),

    /// Build and deploy components
    Deploy(commands::deploy::DeployArgs),

    /// Check that the project's server is reachable
    TestConnection,

    /// List and run modules
    #[command(subcommand)]
    Modules(commands::modules::ModulesCommand),

    /// List projects or switch the active one
    #[command(subcommand)]
    Project(commands::project::ProjectCommand),
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            project,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            no_color,
            quiet,
            json,
            yes,
            project,
        });
        match command {
            Command::Status(args) => commands::status::run(&app, &args).await,
            Command::Deploy(args) => commands::deploy::run(&app, &args).await,
            Command::TestConnection => commands::connection::run(&app).await,
            Command::Modules(cmd) => commands::modules::run(&app, cmd).await,
            Command::Project(cmd) => commands::project::run(&app, cmd),
        }
    }
}
