//! `stagehand modules`: list installed modules and run them.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use stagehand_common::OutputLine;

use crate::app::AppContext;
use crate::application::ports::{NullSink, OutputSink};
use crate::application::services::actions::{ActionContext, run_action};
use crate::application::services::modules::{ModuleRun, run_module};
use crate::domain::action::ActionOutcome;
use crate::domain::results::RowSelection;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::http::{DEFAULT_API_TIMEOUT, ReqwestTransport};
use crate::infra::manifest::load_manifests;
use crate::infra::token::EnvTokenProvider;
use crate::output::human::HumanRenderer;
use crate::output::json;

/// Modules subcommands.
#[derive(Subcommand)]
pub enum ModulesCommand {
    /// List installed modules
    List,
    /// Run a module, then optionally one of its actions
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Module id
    pub id: String,

    /// Input value, repeatable
    #[arg(short = 'i', long = "input", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    pub inputs: Vec<(String, String)>,

    /// Action to run on the results
    #[arg(short, long)]
    pub action: Option<String>,

    /// Rows to act on, 1-based; defaults to every row
    #[arg(long, value_delimiter = ',', value_name = "N,..", value_parser = parse_row_number)]
    pub select: Vec<usize>,

    /// Directory for exported files
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Kill the module after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_row_number(s: &str) -> Result<usize, String> {
    match s.trim().parse::<usize>() {
        Ok(0) => Err("row numbers start at 1".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("expected a row number, got '{s}'")),
    }
}

/// Replace the default selection with the listed 1-based rows.
fn select_rows(selection: &mut RowSelection, numbers: &[usize]) {
    selection.clear();
    for n in numbers {
        selection.select(n.saturating_sub(1));
    }
}

/// Run the modules command.
///
/// # Errors
///
/// Returns an error if the modules directory cannot be read, the module is
/// unknown, it fails to produce a result, or the requested action fails.
pub async fn run(app: &AppContext, cmd: ModulesCommand) -> Result<ExitCode> {
    match cmd {
        ModulesCommand::List => list(app),
        ModulesCommand::Run(args) => run_one(app, args).await,
    }
}

fn list(app: &AppContext) -> Result<ExitCode> {
    let env = app.module_env()?;
    let set = load_manifests(&env.modules_dir)?;
    if app.is_json() {
        let problems: Vec<_> = set
            .problems
            .iter()
            .map(|(path, problem)| serde_json::json!({ "path": path, "problem": problem }))
            .collect();
        json::print(&serde_json::json!({
            "modules_dir": env.modules_dir,
            "modules": set.modules,
            "problems": problems,
        }))?;
    } else {
        HumanRenderer::new(&app.output).render_module_list(&set);
    }
    Ok(ExitCode::SUCCESS)
}

async fn run_one(app: &AppContext, args: RunArgs) -> Result<ExitCode> {
    let env = app.module_env()?;
    let set = load_manifests(&env.modules_dir)?;
    let manifest = set.get(&args.id)?;
    let inputs: BTreeMap<String, String> = args.inputs.into_iter().collect();
    let timeout = args.timeout.map_or(env.timeout, Duration::from_secs);

    let echo = |line: &OutputLine| app.output.stream_line(line);
    let sink: &dyn OutputSink = if app.output.quiet { &NullSink } else { &echo };

    let mut run = match run_module(manifest, &inputs, &TokioCommandRunner::new(), sink, timeout).await {
        Ok(run) => run,
        Err(err) => {
            // Live lines were suppressed; show what the module printed.
            if app.output.quiet
                && let Some(raw) = err.raw_output()
            {
                eprintln!("{raw}");
            }
            return Err(err.into());
        }
    };
    if !args.select.is_empty() {
        select_rows(&mut run.selection, &args.select);
    }

    let outcome = match &args.action {
        Some(action_id) => {
            let transport = ReqwestTransport::new(DEFAULT_API_TIMEOUT)?;
            let ctx = ActionContext {
                transport: &transport,
                tokens: &EnvTokenProvider,
                settings: &env.settings,
                api_base_url: env.api_base_url.as_deref(),
            };
            Some(run_action(manifest, action_id, &run, &ctx).await)
        }
        None => None,
    };

    if app.is_json() {
        let action = match &outcome {
            Some(Ok(o)) => serde_json::to_value(o)?,
            Some(Err(e)) => serde_json::json!({ "error": e.to_string() }),
            None => serde_json::Value::Null,
        };
        let mut value = run_json(&run);
        value["action"] = action;
        json::print(&value)?;
    } else {
        HumanRenderer::new(&app.output).render_module_run(manifest, &run);
    }

    match outcome {
        Some(Ok(outcome)) => deliver(app, &outcome, &args.out)?,
        Some(Err(err)) => return Err(err).context("action failed"),
        None => {}
    }
    Ok(if run.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Hand a successful action's product to the user.
fn deliver(app: &AppContext, outcome: &ActionOutcome, out_dir: &std::path::Path) -> Result<()> {
    match outcome {
        ActionOutcome::Clipboard { text } => {
            if !app.is_json() {
                println!("{text}");
            }
        }
        ActionOutcome::Export {
            file_name,
            contents,
        } => {
            std::fs::create_dir_all(out_dir)
                .with_context(|| format!("cannot create {}", out_dir.display()))?;
            let path = out_dir.join(file_name);
            std::fs::write(&path, contents)
                .with_context(|| format!("cannot write {}", path.display()))?;
            app.output.success(&format!("Exported {}", path.display()));
        }
        ActionOutcome::Api { status, body } => {
            app.output.success(&format!("Server accepted ({status})"));
            if !app.output.quiet {
                println!("{body}");
            }
        }
    }
    Ok(())
}

fn run_json(run: &ModuleRun) -> serde_json::Value {
    let selected: Vec<usize> = (0..run.rows.len())
        .filter(|&i| run.selection.is_selected(i))
        .collect();
    serde_json::json!({
        "module": run.module_id,
        "success": run.success(),
        "errors": run.output.errors,
        "results": run.rows,
        "selectable": run.selection.is_selectable(),
        "selected": selected,
        "extra": run.output.extra,
        "exit_code": run.exit_code,
    })
}
