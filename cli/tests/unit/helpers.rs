//! Project and module fixtures on a temporary directory.

#![allow(dead_code, clippy::expect_used, clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use stagehand_cli::domain::component::{Component, ComponentCategory, RemoteLayout, all_components};
use stagehand_cli::domain::config::{ActiveProject, BasePaths, ProjectConfig, ServerConfig};
use stagehand_cli::domain::manifest::{MANIFEST_FILE, ModuleManifest};

pub const CONTENT_ROOT: &str = "/var/www/site/wp-content";

/// One component to lay out on disk.
pub struct Fixture {
    pub id: &'static str,
    pub category: ComponentCategory,
    /// Version written into the main file header; `None` writes no header.
    pub version: Option<&'static str>,
    pub artifact: bool,
}

impl Fixture {
    pub fn theme(id: &'static str, version: &'static str) -> Self {
        Self {
            id,
            category: ComponentCategory::Theme,
            version: Some(version),
            artifact: true,
        }
    }

    pub fn plugin(id: &'static str, version: &'static str) -> Self {
        Self {
            id,
            category: ComponentCategory::NetworkPlugin,
            version: Some(version),
            artifact: true,
        }
    }

    #[must_use]
    pub fn without_artifact(mut self) -> Self {
        self.artifact = false;
        self
    }
}

/// Write sources for `fixtures` under `root` and return the project config
/// pointing at them.
pub fn project(root: &Path, fixtures: &[Fixture]) -> ProjectConfig {
    let themes = root.join("themes");
    let plugins = root.join("plugins");
    std::fs::create_dir_all(&themes).unwrap();
    std::fs::create_dir_all(&plugins).unwrap();

    let mut components = String::new();
    for f in fixtures {
        let (base, main, category) = match f.category {
            ComponentCategory::Theme => (&themes, "style.css".to_string(), "theme"),
            _ => (&plugins, format!("{}.php", f.id), "network_plugin"),
        };
        let src = base.join(f.id);
        std::fs::create_dir_all(src.join("build")).unwrap();
        let header = f
            .version
            .map(|v| format!("/*\nName: {}\nVersion: {v}\n*/\n", f.id))
            .unwrap_or_default();
        std::fs::write(src.join(main), header).unwrap();
        if f.artifact {
            std::fs::write(src.join("build").join(format!("{}.zip", f.id)), b"PK").unwrap();
        }
        components.push_str(&format!("  - {{ id: {}, category: {category} }}\n", f.id));
    }

    let yaml = format!(
        "server: {{ host: web1.example.org, user: deploy }}\n\
         content_root: {CONTENT_ROOT}\n\
         base_paths: {{ themes: {}, plugins: {} }}\n\
         components:\n{components}",
        themes.display(),
        plugins.display(),
    );
    serde_yaml::from_str(&yaml).unwrap()
}

pub fn active(name: &str, config: ProjectConfig) -> ActiveProject {
    ActiveProject {
        name: name.to_string(),
        config,
    }
}

pub fn components(config: &ProjectConfig) -> Vec<Component> {
    all_components(config)
}

pub fn layout(config: &ProjectConfig) -> RemoteLayout {
    RemoteLayout::from_project(config)
}

pub fn server(host: &str) -> ServerConfig {
    serde_yaml::from_str(&format!("host: {host}\n")).unwrap()
}

pub fn empty_base_paths() -> BasePaths {
    BasePaths::default()
}

/// Probe output describing each `(id, Some(version))` as present and each
/// `(id, None)` as absent.
pub fn probe_output(entries: &[(&str, Option<&str>)]) -> String {
    entries
        .iter()
        .map(|(id, version)| match version {
            Some(v) => format!("@@stagehand {id} present 1700000000\n/*\nVersion: {v}\n*/\n"),
            None => format!("@@stagehand {id} absent\n"),
        })
        .collect()
}

// ── Modules ───────────────────────────────────────────────────────────────────

/// Write `manifest_json` as `<root>/<id>/module.json` and load it.
pub fn module(root: &Path, id: &str, manifest_json: &str) -> ModuleManifest {
    let dir = root.join(id);
    std::fs::create_dir_all(&dir).unwrap();
    let path: PathBuf = dir.join(MANIFEST_FILE);
    std::fs::write(&path, manifest_json).unwrap();
    stagehand_cli::infra::manifest::load_manifest(&path).unwrap()
}
