//! Post-run actions: configuration, payload templates, and the builtin
//! transforms over result rows.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::error::ActionError;
use crate::domain::manifest::ColumnSpec;
use crate::domain::results::ResultRow;

/// Whole-string payload value replaced by the selected rows.
pub const SELECTED_ROWS_TOKEN: &str = "{{selected_rows}}";

const SETTINGS_PREFIX: &str = "settings.";

// ── Configuration ─────────────────────────────────────────────────────────────

/// One action declared by a module manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionConfig {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: ActionKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    Builtin {
        action: BuiltinAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column: Option<String>,
    },
    Api {
        endpoint: String,
        #[serde(default)]
        method: HttpMethod,
        #[serde(default)]
        payload: Value,
        #[serde(default)]
        requires_auth: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinAction {
    CopyColumn,
    ExportArtifact,
    CopyAllAsStructured,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// Response body of an API action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ApiBody {
    Json(Value),
    Text(String),
}

impl ApiBody {
    /// JSON when the body parses as JSON, the verbatim text otherwise.
    #[must_use]
    pub fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(text),
        }
    }
}

impl fmt::Display for ApiBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

/// What a successful action produced. Clipboard and file writes are left to
/// the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ActionOutcome {
    Clipboard { text: String },
    Export { file_name: String, contents: String },
    Api { status: u16, body: ApiBody },
}

// ── Payload templates ─────────────────────────────────────────────────────────

/// A recognized template token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateToken<'a> {
    SelectedRows,
    Setting(&'a str),
}

/// Classify a string payload value. `Ok(None)` is a literal; `Err` is a
/// `{{...}}` value that is not a known token.
///
/// # Errors
///
/// Returns a description of the malformed token.
pub fn parse_token(value: &str) -> Result<Option<TemplateToken<'_>>, String> {
    let Some(inner) = value
        .strip_prefix("{{")
        .and_then(|rest| rest.strip_suffix("}}"))
    else {
        return Ok(None);
    };
    let inner = inner.trim();
    if inner == "selected_rows" {
        return Ok(Some(TemplateToken::SelectedRows));
    }
    match inner.strip_prefix(SETTINGS_PREFIX) {
        Some(key) if !key.is_empty() && !key.contains(char::is_whitespace) => {
            Ok(Some(TemplateToken::Setting(key)))
        }
        _ => Err(format!("unrecognized template token '{value}'")),
    }
}

/// Every malformed token in a payload template, for manifest validation.
#[must_use]
pub fn template_problems(template: &Value) -> Vec<String> {
    let mut problems = Vec::new();
    walk_strings(template, &mut |s| {
        if let Err(problem) = parse_token(s) {
            problems.push(problem);
        }
    });
    problems
}

fn walk_strings(value: &Value, f: &mut impl FnMut(&str)) {
    match value {
        Value::String(s) => f(s),
        Value::Array(items) => items.iter().for_each(|v| walk_strings(v, f)),
        Value::Object(map) => map.values().for_each(|v| walk_strings(v, f)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Expand a payload template. Token values are replaced at any depth; all
/// other values pass through unchanged.
///
/// # Errors
///
/// Returns `InvalidConfig` for a malformed token and `UnresolvedSetting` when
/// `setting` has no value for a referenced key.
pub fn expand_payload(
    template: &Value,
    selected: &[&ResultRow],
    setting: &impl Fn(&str) -> Option<String>,
) -> Result<Value, ActionError> {
    match template {
        Value::String(s) => match parse_token(s).map_err(ActionError::InvalidConfig)? {
            None => Ok(template.clone()),
            Some(TemplateToken::SelectedRows) => Ok(Value::Array(
                selected
                    .iter()
                    .map(|row| {
                        Value::Object(
                            row.iter()
                                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                                .collect(),
                        )
                    })
                    .collect(),
            )),
            Some(TemplateToken::Setting(key)) => setting(key)
                .map(Value::String)
                .ok_or_else(|| ActionError::UnresolvedSetting(key.to_string())),
        },
        Value::Array(items) => items
            .iter()
            .map(|v| expand_payload(v, selected, setting))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| -> Result<(String, Value), ActionError> {
                Ok((k.clone(), expand_payload(v, selected, setting)?))
            })
            .collect::<Result<serde_json::Map<_, _>, _>>()
            .map(Value::Object),
        Value::Null | Value::Bool(_) | Value::Number(_) => Ok(template.clone()),
    }
}

/// Absolute endpoints pass through; relative ones join `base`.
///
/// # Errors
///
/// Returns `InvalidConfig` for a relative endpoint without a base URL.
pub fn resolve_endpoint(endpoint: &str, base: Option<&str>) -> Result<String, ActionError> {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(endpoint.to_string());
    }
    let base = base.ok_or_else(|| {
        ActionError::InvalidConfig(format!(
            "endpoint '{endpoint}' is relative and the project has no api_base_url"
        ))
    })?;
    Ok(format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    ))
}

// ── Builtins ──────────────────────────────────────────────────────────────────

/// Newline-joined values of one column; missing cells are empty lines.
#[must_use]
pub fn copy_column(column: &str, rows: &[&ResultRow]) -> String {
    rows.iter()
        .map(|row| row.get(column).map_or("", String::as_str))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pretty-printed JSON array of the rows.
///
/// # Errors
///
/// Returns `InvalidConfig` if serialization fails.
pub fn copy_all_as_structured(rows: &[&ResultRow]) -> Result<String, ActionError> {
    serde_json::to_string_pretty(rows).map_err(|e| ActionError::InvalidConfig(e.to_string()))
}

/// CSV export. The header comes from the declared columns, or from the union
/// of row keys when none are declared.
#[must_use]
pub fn export_csv(columns: &[ColumnSpec], rows: &[&ResultRow]) -> String {
    let (keys, header): (Vec<&str>, Vec<&str>) = if columns.is_empty() {
        let mut keys: Vec<&str> = rows
            .iter()
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        (keys.clone(), keys)
    } else {
        columns.iter().map(|c| (c.key.as_str(), c.title())).unzip()
    };

    let mut out = String::new();
    push_record(&mut out, header.iter().copied());
    for row in rows {
        push_record(
            &mut out,
            keys.iter().map(|k| row.get(*k).map_or("", String::as_str)),
        );
    }
    out
}

fn push_record<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    let record: Vec<String> = fields.map(csv_field).collect();
    out.push_str(&record.join(","));
    out.push_str("\r\n");
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Suggested export file name, e.g. `bandcamp-scraper-20261018-143000.csv`.
#[must_use]
pub fn export_file_name(module_id: &str, at: DateTime<Utc>) -> String {
    format!("{module_id}-{}.csv", at.format("%Y%m%d-%H%M%S"))
}

/// Run a builtin action over the rows it should act on.
///
/// # Errors
///
/// Returns `InvalidConfig` when `copy_column` has no column.
pub fn run_builtin(
    action: BuiltinAction,
    column: Option<&str>,
    module_id: &str,
    columns: &[ColumnSpec],
    rows: &[&ResultRow],
    now: DateTime<Utc>,
) -> Result<ActionOutcome, ActionError> {
    match action {
        BuiltinAction::CopyColumn => {
            let column = column.ok_or_else(|| {
                ActionError::InvalidConfig("copy_column requires a column".to_string())
            })?;
            Ok(ActionOutcome::Clipboard {
                text: copy_column(column, rows),
            })
        }
        BuiltinAction::CopyAllAsStructured => Ok(ActionOutcome::Clipboard {
            text: copy_all_as_structured(rows)?,
        }),
        BuiltinAction::ExportArtifact => Ok(ActionOutcome::Export {
            file_name: export_file_name(module_id, now),
            contents: export_csv(columns, rows),
        }),
    }
}
