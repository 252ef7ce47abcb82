//! Infrastructure implementation of the `ConfigStore` port.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::application::ports::ConfigStore;
use crate::domain::config::{ProjectConfig, StagehandConfig};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "STAGEHAND_CONFIG";

/// Production implementation of `ConfigStore` that uses a YAML file on disk.
pub struct YamlConfigStore;

impl ConfigStore for YamlConfigStore {
    fn load(&self) -> Result<StagehandConfig> {
        let path = self.path()?;
        if !path.exists() {
            return Ok(StagehandConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        let mut config: StagehandConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("cannot parse {}", path.display()))?;
        if let Some(home) = dirs::home_dir() {
            for project in config.projects.values_mut() {
                expand_project_paths(project, &home);
            }
        }
        Ok(config)
    }

    fn save(&self, config: &StagehandConfig) -> Result<()> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let content = serde_yaml::to_string(config).context("cannot serialize config")?;
        std::fs::write(&path, content)
            .with_context(|| format!("cannot write {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("cannot set permissions on {}", path.display()))?;
        }
        Ok(())
    }

    fn path(&self) -> Result<PathBuf> {
        if let Ok(val) = std::env::var(CONFIG_ENV) {
            return Ok(PathBuf::from(val));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(home.join(".stagehand").join("config.yaml"))
    }
}

/// Replace a leading `~` with `home`.
#[must_use]
pub fn expand_tilde(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}

fn expand_project_paths(project: &mut ProjectConfig, home: &Path) {
    let expand = |p: &mut PathBuf| *p = expand_tilde(p, home);
    let paths = &mut project.base_paths;
    paths
        .themes
        .iter_mut()
        .chain(paths.plugins.iter_mut())
        .chain(paths.ecosystem.iter_mut())
        .chain(project.modules_dir.iter_mut())
        .chain(project.server.identity_file.iter_mut())
        .chain(project.toolchain_paths.iter_mut())
        .for_each(expand);
}
