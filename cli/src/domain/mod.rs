//! Domain layer: pure types, parsing, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::process`, or `std::net`. The only
//! filesystem access is reading local component files (existence checks and
//! the version header).

pub mod action;
pub mod component;
pub mod config;
pub mod error;
pub mod manifest;
pub mod remote_probe;
pub mod results;
pub mod script_output;
pub mod ssh;
pub mod version;

pub use component::{Component, ComponentCategory, RemoteLayout, RemotePath, all_components};
pub use config::{ActiveProject, ProjectConfig, StagehandConfig, validate_project};
pub use error::{ActionError, ConfigError, DeployError, ExecError, ManifestError, ModuleError};
pub use manifest::{ModuleManifest, build_args, validate_manifest};
pub use results::{ResultRow, RowSelection};
pub use script_output::{ScriptOutput, extract_script_output};
pub use version::{parse_local_version, parse_version};
