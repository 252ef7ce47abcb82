//! Application context: unified state passed to every command handler.
//!
//! `AppContext` is built once in `Cli::run()` from the global flags. It owns
//! the output context and the config store and knows how to resolve the
//! project an invocation operates on.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::application::ports::ConfigStore;
use crate::domain::config::{ActiveProject, StagehandConfig, Timeouts};
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::config::YamlConfigStore;
use crate::infra::ssh::SshClient;
use crate::output::OutputContext;

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
    /// Skip interactive prompts (also set by `CI` / `STAGEHAND_YES`).
    pub yes: bool,
    /// Overrides `active_project` for this invocation.
    pub project: Option<String>,
}

/// Where module commands look for manifests and what they expose to actions.
#[derive(Debug, Clone)]
pub struct ModuleEnv {
    pub modules_dir: PathBuf,
    pub settings: BTreeMap<String, String>,
    pub api_base_url: Option<String>,
    pub timeout: Duration,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context. Quiet in JSON mode so stdout stays parseable.
    pub output: OutputContext,
    pub mode: OutputMode,
    pub config_store: YamlConfigStore,
    /// When `true`, skip interactive prompts and use defaults.
    pub non_interactive: bool,
    project_override: Option<String>,
}

impl AppContext {
    #[must_use]
    pub fn new(flags: &AppFlags) -> Self {
        let ci_env = std::env::var("CI").is_ok() || std::env::var("STAGEHAND_YES").is_ok();
        let mode = if flags.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };
        Self {
            output: OutputContext::new(flags.no_color, flags.quiet || flags.json),
            mode,
            config_store: YamlConfigStore,
            non_interactive: flags.yes || ci_env,
            project_override: flags.project.clone(),
        }
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Ask the user for confirmation, or return `default` when
    /// non-interactive.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read.
    pub fn load_config(&self) -> Result<StagehandConfig> {
        self.config_store.load()
    }

    /// Resolve the project for this invocation: `--project`, else
    /// `active_project`.
    ///
    /// # Errors
    ///
    /// Returns an error if no project is selected, the name is unknown, or
    /// the project fails validation.
    pub fn resolve_project(&self) -> Result<ActiveProject> {
        let config = self.load_config()?;
        let source = self.config_store.path()?.display().to_string();
        Ok(config.resolve(self.project_override.as_deref(), &source)?)
    }

    /// Resolve the project and open its SSH connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the project cannot be resolved or the server
    /// cannot be reached.
    pub async fn connect(&self) -> Result<(ActiveProject, SshClient)> {
        let project = self.resolve_project()?;
        let remote = SshClient::connect(
            &project.config.server,
            TokioCommandRunner::new(),
            project.config.timeouts.remote(),
        )
        .await
        .with_context(|| format!("cannot connect to {}", project.config.server.host))?;
        Ok((project, remote))
    }

    /// Module settings from the selected project, or defaults when no
    /// project is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if a named project cannot be resolved.
    pub fn module_env(&self) -> Result<ModuleEnv> {
        let config = self.load_config()?;
        if self.project_override.is_none() && config.active_project.is_none() {
            return Ok(ModuleEnv {
                modules_dir: default_modules_dir()?,
                settings: BTreeMap::new(),
                api_base_url: None,
                timeout: Timeouts::default().module(),
            });
        }
        let project = self.resolve_project()?.config;
        Ok(ModuleEnv {
            modules_dir: match project.modules_dir {
                Some(dir) => dir,
                None => default_modules_dir()?,
            },
            settings: project.settings,
            api_base_url: project.api_base_url,
            timeout: project.timeouts.module(),
        })
    }
}

fn default_modules_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("cannot determine home directory")?;
    Ok(home.join(".stagehand").join("modules"))
}
