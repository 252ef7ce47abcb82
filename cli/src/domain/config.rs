//! Domain types and validators for stagehand configuration.
//!
//! Pure functions only: no I/O, no async, no filesystem access.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::component::ComponentCategory;
use crate::domain::error::ConfigError;
use crate::domain::manifest::IDENT_RE;
use crate::domain::ssh::is_safe_remote_path;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_SSH_PORT: u16 = 22;
pub const DEFAULT_TEMP_DIR: &str = "tmp";
pub const DEFAULT_BUILD_COMMAND: &str = "./build.sh";
pub const DEFAULT_UPLOAD_ATTEMPTS: u32 = 2;

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_temp_dir() -> String {
    DEFAULT_TEMP_DIR.to_string()
}

fn default_upload_attempts() -> u32 {
    DEFAULT_UPLOAD_ATTEMPTS
}

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.stagehand/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StagehandConfig {
    /// Name of the project used when `--project` is not given.
    pub active_project: Option<String>,
    /// All configured projects, by name.
    pub projects: BTreeMap<String, ProjectConfig>,
}

/// One deployment target and its local sources.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub server: ServerConfig,
    /// Remote directory containing `themes/` and `plugins/`.
    pub content_root: String,
    /// Remote parent directory for ecosystem packages.
    #[serde(default)]
    pub ecosystem_root: Option<String>,
    /// Upload staging directory, relative to the remote home.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: String,
    #[serde(default)]
    pub base_paths: BasePaths,
    /// Prepended to `PATH` when running build commands.
    #[serde(default)]
    pub toolchain_paths: Vec<PathBuf>,
    #[serde(default)]
    pub components: Vec<ComponentSpec>,
    #[serde(default)]
    pub modules_dir: Option<PathBuf>,
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Values exposed to `{{settings.<key>}}` payload tokens.
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default = "default_upload_attempts")]
    pub upload_attempts: u32,
}

/// SSH connection descriptor. Credentials arrive already resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
}

/// Local roots under which each category's component sources live.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BasePaths {
    #[serde(default)]
    pub themes: Option<PathBuf>,
    #[serde(default)]
    pub plugins: Option<PathBuf>,
    #[serde(default)]
    pub ecosystem: Option<PathBuf>,
}

/// Static declaration of a deployable component.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub category: ComponentCategory,
    /// Directory name locally and remotely. Defaults to `id`.
    #[serde(default)]
    pub dir: Option<String>,
    /// Version-bearing file, relative to the source root.
    #[serde(default)]
    pub main_file: Option<String>,
    #[serde(default)]
    pub build_command: Option<String>,
    /// Build artifact path, relative to the source root.
    #[serde(default)]
    pub artifact: Option<String>,
}

/// Caller-facing timeouts, in seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Timeouts {
    pub build_secs: u64,
    pub remote_secs: u64,
    pub module_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            build_secs: 600,
            remote_secs: 120,
            module_secs: 900,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub fn build(&self) -> Duration {
        Duration::from_secs(self.build_secs)
    }

    #[must_use]
    pub fn remote(&self) -> Duration {
        Duration::from_secs(self.remote_secs)
    }

    #[must_use]
    pub fn module(&self) -> Duration {
        Duration::from_secs(self.module_secs)
    }
}

/// The resolved project a session operates on.
#[derive(Debug, Clone)]
pub struct ActiveProject {
    pub name: String,
    pub config: ProjectConfig,
}

impl StagehandConfig {
    /// Resolve the project to operate on: the explicit override, else
    /// `active_project`.
    ///
    /// # Errors
    ///
    /// Returns an error if no project is selected or the name is unknown.
    pub fn resolve(&self, requested: Option<&str>, source: &str) -> Result<ActiveProject, ConfigError> {
        let name = requested
            .or(self.active_project.as_deref())
            .ok_or_else(|| ConfigError::NoActiveProject(source.to_string()))?;
        let config = self
            .projects
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProject {
                name: name.to_string(),
                valid: self.projects.keys().cloned().collect::<Vec<_>>().join(", "),
            })?;
        validate_project(name, config)?;
        Ok(ActiveProject {
            name: name.to_string(),
            config: config.clone(),
        })
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validate a project, reporting every problem at once.
///
/// # Errors
///
/// Returns `ConfigError::Invalid` listing all violations.
pub fn validate_project(name: &str, project: &ProjectConfig) -> Result<(), ConfigError> {
    let mut problems: Vec<String> = Vec::new();

    if project.server.host.trim().is_empty() {
        problems.push("server.host must not be empty".to_string());
    }
    if !is_safe_remote_path(&project.content_root) {
        problems.push(format!(
            "content_root '{}' must be a non-root path without '..'",
            project.content_root
        ));
    }
    if let Some(root) = &project.ecosystem_root
        && !is_safe_remote_path(root)
    {
        problems.push(format!(
            "ecosystem_root '{root}' must be a non-root path without '..'"
        ));
    }
    if !is_safe_remote_path(&project.temp_dir) {
        problems.push(format!(
            "temp_dir '{}' must be a non-root path without '..'",
            project.temp_dir
        ));
    }
    if project.upload_attempts == 0 {
        problems.push("upload_attempts must be at least 1".to_string());
    }

    let mut seen = HashSet::new();
    for spec in &project.components {
        if !seen.insert(spec.id.as_str()) {
            problems.push(format!("component id '{}' is declared more than once", spec.id));
        }
        if !IDENT_RE.is_match(&spec.id) {
            problems.push(format!(
                "component id '{}' must be lowercase alphanumeric with '-' or '_'",
                spec.id
            ));
        }
        let dir = spec.dir.as_deref().unwrap_or(&spec.id);
        if dir.is_empty() || dir.contains('/') || dir.contains("..") {
            problems.push(format!(
                "component '{}': dir '{dir}' must be a single path segment",
                spec.id
            ));
        }
        if spec.category == ComponentCategory::EcosystemPackage && project.ecosystem_root.is_none() {
            problems.push(format!(
                "component '{}' is an ecosystem package but ecosystem_root is not set",
                spec.id
            ));
        }
        if spec.category.base_path(&project.base_paths).is_none() {
            problems.push(format!(
                "component '{}': no base path configured for category {}",
                spec.id,
                spec.category.label()
            ));
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            project: name.to_string(),
            problems: problems
                .iter()
                .map(|p| format!("  - {p}"))
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
