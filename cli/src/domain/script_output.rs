//! The structured result a module prints at the end of its stdout, and the
//! two-phase scan that finds it in free-form output.
//!
//! Phase one finds every top-level balanced `{...}` span (string-aware, so
//! braces inside JSON strings do not count). Phase two tries a strict parse
//! of each span as [`ScriptOutput`], starting from the last one. Anything that
//! fails to parse is rejected, never repaired.

use std::ops::Range;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Result object contract: `{ success, results?, errors? }`. Unknown keys
/// are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptOutput {
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<Map<String, Value>>>,
    #[serde(default)]
    pub errors: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScriptOutput {
    /// Result rows; empty when the module reported none.
    #[must_use]
    pub fn rows(&self) -> &[Map<String, Value>] {
        self.results.as_deref().unwrap_or_default()
    }

    /// All reported errors joined into one message, if there are any.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        let errors: Vec<&str> = self
            .errors
            .iter()
            .flatten()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .collect();
        if errors.is_empty() {
            (!self.success).then(|| "module reported failure".to_string())
        } else {
            Some(errors.join("; "))
        }
    }
}

/// Byte ranges of every top-level balanced `{...}` span, in order.
#[must_use]
pub fn candidate_spans(text: &str) -> Vec<Range<usize>> {
    let bytes = text.as_bytes();
    let mut spans = Vec::new();
    let mut start = 0;
    while let Some(offset) = bytes[start..].iter().position(|&b| b == b'{') {
        let open = start + offset;
        match balanced_end(bytes, open) {
            Some(close) => {
                spans.push(open..close + 1);
                start = close + 1;
            }
            None => start = open + 1,
        }
    }
    spans
}

/// Index of the `}` closing the `{` at `open`, honouring JSON strings.
fn balanced_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Find the last span in `text` that parses strictly as a [`ScriptOutput`].
#[must_use]
pub fn extract_script_output(text: &str) -> Option<ScriptOutput> {
    candidate_spans(text)
        .into_iter()
        .rev()
        .find_map(|span| serde_json::from_str::<ScriptOutput>(&text[span]).ok())
}
