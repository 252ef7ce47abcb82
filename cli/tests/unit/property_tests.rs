//! Property-based tests for result extraction, row selection, and version
//! parsing.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;
use serde_json::json;

use stagehand_cli::domain::remote_probe::parse_probe_output;
use stagehand_cli::domain::results::{ResultRow, RowSelection};
use stagehand_cli::domain::script_output::extract_script_output;
use stagehand_cli::domain::version::parse_version;
use stagehand_common::{DeployStatus, RemoteVersionInfo, derive_status};

// ── extract_script_output ────────────────────────────────────────────────────

proptest! {
    /// A result object survives any brace-free noise around it.
    #[test]
    fn prop_result_found_inside_noise(
        before in "[^{}]{0,80}",
        after in "[^{}]{0,80}",
        success in any::<bool>(),
        value in "[a-zA-Z0-9 ,:\"{}]{0,20}",
    ) {
        let object = json!({"success": success, "results": [{"v": value}]});
        let text = format!("{before}\n{object}\n{after}");
        let out = extract_script_output(&text).expect("result object");
        prop_assert_eq!(out.success, success);
        prop_assert_eq!(out.rows()[0]["v"].as_str(), Some(value.as_str()));
    }

    /// Output with no `{` never yields a result.
    #[test]
    fn prop_no_braces_no_result(text in "[^{]{0,200}") {
        prop_assert!(extract_script_output(&text).is_none());
    }

    /// Of two result objects, the later one wins.
    #[test]
    fn prop_later_object_wins(first in any::<bool>(), second in any::<bool>()) {
        let text = format!(
            "{}\nprogress line\n{}",
            json!({"success": first, "errors": ["first"]}),
            json!({"success": second, "errors": ["second"]}),
        );
        let out = extract_script_output(&text).unwrap();
        prop_assert_eq!(out.success, second);
        prop_assert_eq!(out.errors.unwrap(), vec!["second".to_string()]);
    }
}

// ── RowSelection ─────────────────────────────────────────────────────────────

fn rows(n: usize) -> Vec<ResultRow> {
    (0..n)
        .map(|i| ResultRow::from([("n".to_string(), i.to_string())]))
        .collect()
}

proptest! {
    /// Toggling the same indices twice restores the initial selection.
    #[test]
    fn prop_double_toggle_is_identity(
        total in 0usize..20,
        indices in prop::collection::vec(0usize..25, 0..15),
    ) {
        let initial = RowSelection::new(true, total);
        let mut selection = initial.clone();
        for &i in indices.iter().chain(indices.iter()) {
            selection.toggle(i);
        }
        prop_assert_eq!(selection, initial);
    }

    /// `apply` returns exactly the selected rows, in row order.
    #[test]
    fn prop_apply_matches_selection(
        total in 0usize..20,
        indices in prop::collection::vec(0usize..20, 0..10),
    ) {
        let rows = rows(total);
        let mut selection = RowSelection::new(true, total);
        for &i in &indices {
            selection.toggle(i);
        }
        let applied = selection.apply(&rows);
        prop_assert_eq!(applied.len(), selection.count());
        let positions: Vec<usize> = applied.iter().map(|r| r["n"].parse().unwrap()).collect();
        prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(positions.iter().all(|&i| selection.is_selected(i)));
    }

    /// Non-selectable results act on every row whatever is toggled.
    #[test]
    fn prop_non_selectable_applies_to_all(
        total in 0usize..20,
        indices in prop::collection::vec(0usize..20, 0..10),
    ) {
        let rows = rows(total);
        let mut selection = RowSelection::new(false, total);
        for &i in &indices {
            selection.toggle(i);
        }
        prop_assert_eq!(selection.apply(&rows).len(), total);
    }
}

// ── Versions and status ──────────────────────────────────────────────────────

proptest! {
    #[test]
    fn prop_version_header_is_parsed(
        major in 0u32..100,
        minor in 0u32..100,
        patch in 0u32..100,
        noise in "[a-zA-Z \n*/]{0,40}",
    ) {
        let version = format!("{major}.{minor}.{patch}");
        let text = format!("/*{noise}\n version: {version}\n*/");
        prop_assert_eq!(parse_version(&text), Some(version));
    }

    /// A probe frame for a present component with a version header reports
    /// that version; an identical local version is `Current`.
    #[test]
    fn prop_probe_version_drives_status(
        id in "[a-z][a-z0-9-]{0,12}",
        major in 0u32..20,
        minor in 0u32..20,
    ) {
        let version = format!("{major}.{minor}");
        let output = format!("@@stagehand {id} present 1700000000\nVersion: {version}\n");
        let parsed = parse_probe_output(&output);
        let remote = parsed.get(&id).cloned();
        prop_assert_eq!(remote.clone(), Some(RemoteVersionInfo::Version(version.clone())));
        prop_assert_eq!(
            derive_status(true, Some(version.as_str()), remote.as_ref()),
            DeployStatus::Current
        );
        prop_assert_eq!(
            derive_status(false, Some(version.as_str()), remote.as_ref()),
            DeployStatus::BuildRequired
        );
    }
}
