//! JSON output helpers for `--json` code paths.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::error::{ActionError, ConfigError, ExecError, ManifestError, ModuleError};

/// Format a JSON error object:
///
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Pretty-print `value` to stdout.
///
/// # Errors
///
/// Returns an error if `value` cannot be serialized.
pub fn print<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
    println!("{text}");
    Ok(())
}

/// Stable machine-readable code for a command failure.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    if err.downcast_ref::<ConfigError>().is_some() {
        "config"
    } else if err.downcast_ref::<ExecError>().is_some() {
        "remote"
    } else if err.downcast_ref::<ManifestError>().is_some() {
        "manifest"
    } else if err.downcast_ref::<ModuleError>().is_some() {
        "module"
    } else if err.downcast_ref::<ActionError>().is_some() {
        "action"
    } else {
        "error"
    }
}
