//! Deployable components and the registry that enumerates them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::config::{BasePaths, DEFAULT_BUILD_COMMAND, ProjectConfig};

/// The fixed set of component kinds. Determines the local base path and the
/// remote parent directory.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ComponentCategory {
    Theme,
    NetworkPlugin,
    SitePlugin,
    EcosystemPackage,
}

impl ComponentCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Theme => "theme",
            Self::NetworkPlugin => "network plugin",
            Self::SitePlugin => "site plugin",
            Self::EcosystemPackage => "ecosystem package",
        }
    }

    /// Local root holding this category's sources.
    #[must_use]
    pub fn base_path(self, paths: &BasePaths) -> Option<&Path> {
        match self {
            Self::Theme => paths.themes.as_deref(),
            Self::NetworkPlugin | Self::SitePlugin => paths.plugins.as_deref(),
            Self::EcosystemPackage => paths.ecosystem.as_deref(),
        }
    }

    fn default_main_file(self, id: &str) -> String {
        match self {
            Self::Theme => "style.css".to_string(),
            Self::NetworkPlugin | Self::SitePlugin | Self::EcosystemPackage => format!("{id}.php"),
        }
    }
}

/// Where a component lives remotely, relative to its category root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "root", content = "path", rename_all = "snake_case")]
pub enum RemotePath {
    /// Relative to the content root, e.g. `themes/house-theme`.
    Content(String),
    /// Relative to the ecosystem root.
    Ecosystem(String),
}

/// One deployable unit, fully resolved against the project's base paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub category: ComponentCategory,
    pub source_root: PathBuf,
    pub main_file: PathBuf,
    pub build_command: String,
    pub artifact_path: PathBuf,
    pub remote_path: RemotePath,
}

impl Component {
    /// Whether a build artifact exists on disk.
    #[must_use]
    pub fn has_artifact(&self) -> bool {
        self.artifact_path.is_file()
    }

    /// File name of the artifact, used for the remote staging copy.
    #[must_use]
    pub fn artifact_file_name(&self) -> String {
        self.artifact_path
            .file_name()
            .map_or_else(|| format!("{}.zip", self.id), |n| n.to_string_lossy().into_owned())
    }

    /// Name of the version-bearing file.
    #[must_use]
    pub fn main_file_name(&self) -> String {
        self.main_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Enumerate the project's deployable components.
///
/// Components whose category has no configured base path, or whose base path
/// does not exist, are left out. The result is grouped by category and
/// otherwise keeps configuration order.
#[must_use]
pub fn all_components(project: &ProjectConfig) -> Vec<Component> {
    let mut components: Vec<Component> = project
        .components
        .iter()
        .filter_map(|spec| {
            let base = spec.category.base_path(&project.base_paths)?;
            if !base.is_dir() {
                return None;
            }
            let dir = spec.dir.clone().unwrap_or_else(|| spec.id.clone());
            let source_root = base.join(&dir);
            let main_file = source_root.join(
                spec.main_file
                    .clone()
                    .unwrap_or_else(|| spec.category.default_main_file(&spec.id)),
            );
            let artifact_path = source_root.join(
                spec.artifact
                    .clone()
                    .unwrap_or_else(|| format!("build/{}.zip", spec.id)),
            );
            let remote_path = match spec.category {
                ComponentCategory::Theme => RemotePath::Content(format!("themes/{dir}")),
                ComponentCategory::NetworkPlugin | ComponentCategory::SitePlugin => {
                    RemotePath::Content(format!("plugins/{dir}"))
                }
                ComponentCategory::EcosystemPackage => RemotePath::Ecosystem(dir),
            };
            Some(Component {
                id: spec.id.clone(),
                name: spec.name.clone().unwrap_or_else(|| spec.id.clone()),
                category: spec.category,
                source_root,
                main_file,
                build_command: spec
                    .build_command
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BUILD_COMMAND.to_string()),
                artifact_path,
                remote_path,
            })
        })
        .collect();
    components.sort_by_key(|c| c.category);
    components
}

/// Remote directory layout of the active project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteLayout {
    pub content_root: String,
    pub ecosystem_root: Option<String>,
    pub temp_dir: String,
}

impl RemoteLayout {
    #[must_use]
    pub fn from_project(project: &ProjectConfig) -> Self {
        Self {
            content_root: project.content_root.trim_end_matches('/').to_string(),
            ecosystem_root: project
                .ecosystem_root
                .as_ref()
                .map(|r| r.trim_end_matches('/').to_string()),
            temp_dir: project.temp_dir.trim_end_matches('/').to_string(),
        }
    }

    /// Absolute install directory of a component, if its root is configured.
    #[must_use]
    pub fn install_dir(&self, component: &Component) -> Option<String> {
        match &component.remote_path {
            RemotePath::Content(rel) => Some(format!("{}/{rel}", self.content_root)),
            RemotePath::Ecosystem(rel) => self.ecosystem_root.as_ref().map(|r| format!("{r}/{rel}")),
        }
    }

    /// Directory the artifact is extracted into.
    #[must_use]
    pub fn extract_parent(&self, component: &Component) -> Option<String> {
        match component.category {
            ComponentCategory::Theme => Some(format!("{}/themes", self.content_root)),
            ComponentCategory::NetworkPlugin | ComponentCategory::SitePlugin => {
                Some(format!("{}/plugins", self.content_root))
            }
            ComponentCategory::EcosystemPackage => self.ecosystem_root.clone(),
        }
    }

    /// Staging path for the uploaded artifact.
    #[must_use]
    pub fn staging_path(&self, component: &Component) -> String {
        format!("{}/{}", self.temp_dir, component.artifact_file_name())
    }
}
