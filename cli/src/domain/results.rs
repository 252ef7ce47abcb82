//! Result rows and row selection.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

/// One result row with every value coerced to a string.
pub type ResultRow = BTreeMap<String, String>;

/// Coerce a JSON value for display and payloads: strings verbatim, `null`
/// empty, everything else as compact JSON.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[must_use]
pub fn coerce_row(row: &Map<String, Value>) -> ResultRow {
    row.iter()
        .map(|(k, v)| (k.clone(), value_to_string(v)))
        .collect()
}

/// Which result rows are selected. Opt-out: a selectable result starts with
/// every row selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowSelection {
    selectable: bool,
    total: usize,
    selected: BTreeSet<usize>,
}

impl RowSelection {
    /// Initial selection for `total` rows.
    #[must_use]
    pub fn new(selectable: bool, total: usize) -> Self {
        let selected = if selectable {
            (0..total).collect()
        } else {
            BTreeSet::new()
        };
        Self {
            selectable,
            total,
            selected,
        }
    }

    #[must_use]
    pub fn is_selectable(&self) -> bool {
        self.selectable
    }

    #[must_use]
    pub fn is_selected(&self, index: usize) -> bool {
        self.selected.contains(&index)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.selected.len()
    }

    /// Flip one row. Out-of-range indices and non-selectable results are
    /// ignored.
    pub fn toggle(&mut self, index: usize) {
        if !self.selectable || index >= self.total {
            return;
        }
        if !self.selected.remove(&index) {
            self.selected.insert(index);
        }
    }

    /// Select one row. Idempotent; out-of-range indices and non-selectable
    /// results are ignored.
    pub fn select(&mut self, index: usize) {
        if self.selectable && index < self.total {
            self.selected.insert(index);
        }
    }

    pub fn select_all(&mut self) {
        if self.selectable {
            self.selected = (0..self.total).collect();
        }
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Rows an action should act on: the selection when rows are
    /// selectable, otherwise every row.
    #[must_use]
    pub fn apply<'a>(&self, rows: &'a [ResultRow]) -> Vec<&'a ResultRow> {
        if self.selectable {
            self.selected.iter().filter_map(|&i| rows.get(i)).collect()
        } else {
            rows.iter().collect()
        }
    }
}
