//! Module manifest discovery: one `<modules_dir>/<id>/module.json` per
//! module.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::domain::error::ManifestError;
use crate::domain::manifest::{MANIFEST_FILE, ModuleManifest, validate_manifest};

/// Everything found under a modules directory.
#[derive(Debug, Default)]
pub struct ManifestSet {
    /// Valid manifests, sorted by id.
    pub modules: Vec<ModuleManifest>,
    /// Manifests that failed to parse or validate.
    pub problems: Vec<(PathBuf, String)>,
}

impl ManifestSet {
    /// # Errors
    ///
    /// Returns `NotFound` when no valid manifest has this id.
    pub fn get(&self, id: &str) -> Result<&ModuleManifest, ManifestError> {
        self.modules
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ManifestError::NotFound(id.to_string()))
    }
}

/// Read one manifest and record its directory.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or validated.
pub fn load_manifest(path: &Path) -> Result<ModuleManifest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut manifest: ModuleManifest = serde_json::from_str(&content)
        .with_context(|| format!("cannot parse {}", path.display()))?;
    validate_manifest(&manifest)?;
    manifest.dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok(manifest)
}

/// Scan `dir` for module manifests. A missing directory yields an empty set;
/// a bad manifest is reported and skipped.
///
/// # Errors
///
/// Returns an error only if an existing directory cannot be listed.
pub fn load_manifests(dir: &Path) -> Result<ManifestSet> {
    let mut set = ManifestSet::default();
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "modules directory does not exist");
        return Ok(set);
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("cannot list {}", dir.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path().join(MANIFEST_FILE))
        .filter(|p| p.is_file())
        .collect();
    paths.sort();

    let mut seen = HashSet::new();
    for path in paths {
        match load_manifest(&path) {
            Ok(manifest) if !seen.insert(manifest.id.clone()) => {
                let err = ManifestError::Duplicate(manifest.id);
                set.problems.push((path, err.to_string()));
            }
            Ok(manifest) => set.modules.push(manifest),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %format!("{err:#}"), "skipping module");
                set.problems.push((path, format!("{err:#}")));
            }
        }
    }
    set.modules.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(set)
}
