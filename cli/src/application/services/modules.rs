//! Application service: module execution engine.
//!
//! A module run is one external process, launched with the manifest's
//! argument contract. Its exit code is not authoritative; the structured
//! result it prints at the end of stdout is. Raw output is kept on every
//! path so callers can always show it.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::application::ports::{CommandRunner, CommandSpec, OutputSink};
use crate::domain::error::{ExecError, ModuleError};
use crate::domain::manifest::{ModuleManifest, RuntimeDescriptor, build_args};
use crate::domain::results::{ResultRow, RowSelection, coerce_row};
use crate::domain::script_output::{ScriptOutput, extract_script_output};

/// A finished module run with a structured result.
#[derive(Debug, Clone)]
pub struct ModuleRun {
    pub module_id: String,
    pub output: ScriptOutput,
    /// `output.results` with every value coerced to a string.
    pub rows: Vec<ResultRow>,
    pub selection: RowSelection,
    /// Both streams, interleaved in arrival order.
    pub raw_output: String,
    pub exit_code: i32,
}

impl ModuleRun {
    #[must_use]
    pub fn success(&self) -> bool {
        self.output.success
    }

    /// Combined error text when the module reported problems.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.output.error_message()
    }

    /// Rows an action should act on.
    #[must_use]
    pub fn selected_rows(&self) -> Vec<&ResultRow> {
        self.selection.apply(&self.rows)
    }
}

/// Launch a module and interpret its output.
///
/// # Errors
///
/// `MissingInput`/`UnknownInput` before launch, `Spawn` if the process
/// cannot start, `Timeout` if it outlives `timeout` (the process is killed),
/// and `NoStructuredResult` when stdout holds no valid result object.
pub async fn run_module(
    manifest: &ModuleManifest,
    inputs: &BTreeMap<String, String>,
    runner: &impl CommandRunner,
    sink: &dyn OutputSink,
    timeout: Duration,
) -> Result<ModuleRun, ModuleError> {
    let args = build_args(manifest, inputs)?;
    let RuntimeDescriptor::Cli { command, .. } = &manifest.runtime;
    let spec = CommandSpec::new(resolve_program(command, &manifest.dir))
        .args(args)
        .current_dir(&manifest.dir);

    tracing::info!(module = %manifest.id, command = %spec.display(), "running module");
    let captured = runner
        .run_streaming(&spec, sink, timeout)
        .await
        .map_err(|err| match err {
            ExecError::Timeout { after, output } => ModuleError::Timeout {
                after,
                raw_output: output,
            },
            other => ModuleError::Spawn(other),
        })?;

    let raw_output = captured.combined();
    let Some(output) = extract_script_output(&captured.stdout) else {
        tracing::warn!(module = %manifest.id, exit_code = captured.exit_code, "no structured result");
        return Err(ModuleError::NoStructuredResult { raw_output });
    };

    let rows: Vec<ResultRow> = output.rows().iter().map(coerce_row).collect();
    let selection = RowSelection::new(manifest.output.selectable, rows.len());
    tracing::info!(
        module = %manifest.id,
        success = output.success,
        rows = rows.len(),
        exit_code = captured.exit_code,
        "module finished"
    );
    Ok(ModuleRun {
        module_id: manifest.id.clone(),
        output,
        rows,
        selection,
        raw_output,
        exit_code: captured.exit_code,
    })
}

/// Relative commands with a path separator resolve against the module
/// directory; bare names are looked up on `PATH`.
fn resolve_program(command: &str, module_dir: &Path) -> String {
    let path = Path::new(command);
    if path.is_relative() && command.contains('/') {
        module_dir.join(path).to_string_lossy().into_owned()
    } else {
        command.to_string()
    }
}
