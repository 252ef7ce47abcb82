//! Stagehand: deploy components over SSH and run external modules.

use std::process::ExitCode;

use clap::Parser;
use stagehand_cli::cli::Cli;
use stagehand_cli::output::json;
use tracing_subscriber::EnvFilter;

/// Filter variable checked before `RUST_LOG`.
const LOG_ENV: &str = "STAGEHAND_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let json_mode = cli.json;
    match cli.run().await {
        Ok(code) => code,
        Err(e) => {
            let message = format!("{e:#}");
            match json_mode.then(|| json::format_error(&message, json::error_code(&e))) {
                Some(Ok(obj)) => println!("{obj}"),
                _ => eprintln!("Error: {message}"),
            }
            ExitCode::FAILURE
        }
    }
}
