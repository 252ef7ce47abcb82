//! Module manifests (`module.json`): shape, validation, and the argument
//! vector a module is launched with.
//!
//! No I/O here; the directory loader lives in `crate::infra::manifest`.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::action::{ActionConfig, ActionKind, BuiltinAction, template_problems};
use crate::domain::error::{ManifestError, ModuleError};
use crate::domain::results::value_to_string;

/// File name of a manifest inside its module directory.
pub const MANIFEST_FILE: &str = "module.json";

/// Input name carrying the remote target; overrides `default_target`.
pub const TARGET_INPUT: &str = "url";

/// Module and input identifiers: lowercase alphanumeric with interior `-`/`_`.
pub static IDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-z0-9]([a-z0-9_-]{0,62}[a-z0-9])?$").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub runtime: RuntimeDescriptor,
    #[serde(default)]
    pub inputs: Vec<InputSpec>,
    #[serde(default)]
    pub output: OutputSchema,
    #[serde(default)]
    pub actions: Vec<ActionConfig>,
    /// Directory the manifest was loaded from; the module runs here.
    #[serde(skip)]
    pub dir: PathBuf,
}

impl ModuleManifest {
    #[must_use]
    pub fn action(&self, id: &str) -> Option<&ActionConfig> {
        self.actions.iter().find(|a| a.id == id)
    }

    #[must_use]
    pub fn input(&self, id: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.id == id)
    }
}

/// How a module is launched. Only external CLI processes exist today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeDescriptor {
    Cli {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        /// Remote target passed as `--url` unless an input named `url`
        /// exists.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_target: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSpec {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

impl InputSpec {
    /// The default rendered as an argument value.
    #[must_use]
    pub fn default_value(&self) -> Option<String> {
        self.default
            .as_ref()
            .filter(|v| !v.is_null())
            .map(value_to_string)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    #[default]
    Text,
    Number,
    Boolean,
    Select,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSchema {
    #[serde(default)]
    pub selectable: bool,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ColumnSpec {
    /// Header text: the label, else the key.
    #[must_use]
    pub fn title(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.key)
    }
}

// ── Validation ────────────────────────────────────────────────────────────────

/// Validate a parsed manifest. Every violation is reported in one error.
///
/// # Errors
///
/// Returns `ManifestError::Invalid` listing all problems.
pub fn validate_manifest(manifest: &ModuleManifest) -> Result<(), ManifestError> {
    let mut errors: Vec<String> = Vec::new();

    if !IDENT_RE.is_match(&manifest.id) {
        errors.push(format!(
            "id '{}' must be lowercase alphanumeric with '-' or '_'",
            manifest.id
        ));
    }
    if manifest.name.trim().is_empty() {
        errors.push("name must not be empty".to_string());
    }

    let RuntimeDescriptor::Cli { command, .. } = &manifest.runtime;
    if command.trim().is_empty() {
        errors.push("runtime.command must not be empty".to_string());
    }

    let mut seen = HashSet::new();
    for input in &manifest.inputs {
        if !seen.insert(input.id.as_str()) {
            errors.push(format!("input '{}' is declared more than once", input.id));
        }
        if !IDENT_RE.is_match(&input.id) {
            errors.push(format!("input id '{}' is not a valid flag name", input.id));
        }
        errors.extend(input_default_problems(input));
    }

    let column_keys: HashSet<&str> = manifest
        .output
        .columns
        .iter()
        .map(|c| c.key.as_str())
        .collect();
    let mut seen = HashSet::new();
    for action in &manifest.actions {
        if !seen.insert(action.id.as_str()) {
            errors.push(format!("action '{}' is declared more than once", action.id));
        }
        match &action.kind {
            ActionKind::Builtin {
                action: BuiltinAction::CopyColumn,
                column,
            } => match column {
                None => errors.push(format!("action '{}': copy_column needs a column", action.id)),
                Some(col) if !column_keys.is_empty() && !column_keys.contains(col.as_str()) => {
                    errors.push(format!(
                        "action '{}': column '{col}' is not in output.columns",
                        action.id
                    ));
                }
                Some(_) => {}
            },
            ActionKind::Builtin { .. } => {}
            ActionKind::Api {
                endpoint, payload, ..
            } => {
                if endpoint.trim().is_empty() {
                    errors.push(format!("action '{}': endpoint must not be empty", action.id));
                }
                errors.extend(
                    template_problems(payload)
                        .into_iter()
                        .map(|p| format!("action '{}': {p}", action.id)),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ManifestError::Invalid {
            id: manifest.id.clone(),
            problems: errors.join("\n"),
        })
    }
}

fn input_default_problems(input: &InputSpec) -> Vec<String> {
    let mut errors = Vec::new();
    let Some(default) = input.default.as_ref().filter(|v| !v.is_null()) else {
        if input.kind == InputKind::Select && input.options.is_empty() {
            errors.push(format!("input '{}': select needs options", input.id));
        }
        return errors;
    };
    match input.kind {
        InputKind::Text => {}
        InputKind::Number => {
            let numeric = default.is_number()
                || default.as_str().is_some_and(|s| s.trim().parse::<f64>().is_ok());
            if !numeric {
                errors.push(format!("input '{}': default must be a number", input.id));
            }
        }
        InputKind::Boolean => {
            let boolean = default.is_boolean()
                || default.as_str().is_some_and(|s| matches!(s, "true" | "false"));
            if !boolean {
                errors.push(format!("input '{}': default must be true or false", input.id));
            }
        }
        InputKind::Select => {
            if input.options.is_empty() {
                errors.push(format!("input '{}': select needs options", input.id));
            } else if !input.options.contains(&value_to_string(default)) {
                errors.push(format!(
                    "input '{}': default is not one of {}",
                    input.id,
                    input.options.join(", ")
                ));
            }
        }
    }
    errors
}

// ── Argument contract ─────────────────────────────────────────────────────────

/// Build the argument vector for one run: the runtime's fixed args, then
/// `--<id> <value>` per declared input in order, then `--url <target>` when
/// a default target applies.
///
/// Empty provided values count as unset.
///
/// # Errors
///
/// Returns `UnknownInput` for a provided value no input declares, and
/// `MissingInput` for a required input with neither a value nor a default.
pub fn build_args(
    manifest: &ModuleManifest,
    provided: &BTreeMap<String, String>,
) -> Result<Vec<String>, ModuleError> {
    if let Some(unknown) = provided.keys().find(|k| manifest.input(k).is_none()) {
        return Err(ModuleError::UnknownInput(unknown.clone()));
    }

    let RuntimeDescriptor::Cli {
        args: fixed,
        default_target,
        ..
    } = &manifest.runtime;
    let mut args = fixed.clone();

    for input in &manifest.inputs {
        let value = provided
            .get(&input.id)
            .filter(|v| !v.is_empty())
            .cloned()
            .or_else(|| input.default_value());
        match value {
            Some(value) => {
                args.push(format!("--{}", input.id));
                args.push(value);
            }
            None if input.required => return Err(ModuleError::MissingInput(input.id.clone())),
            None => {}
        }
    }

    if let Some(target) = default_target
        && manifest.input(TARGET_INPUT).is_none()
    {
        args.push(format!("--{TARGET_INPUT}"));
        args.push(target.clone());
    }
    Ok(args)
}
