//! Batched remote version probe: one shell script for all components, and
//! the parser for its framed output.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use stagehand_common::RemoteVersionInfo;

use crate::domain::ssh::shell_quote;
use crate::domain::version::parse_version;

/// Prefix of the frame line emitted once per component.
pub const FRAME_MARKER: &str = "@@stagehand";

/// Extended regex selecting the remote main file's version line; the same
/// token `parse_version` extracts, searched through the whole file.
const VERSION_LINE_ERE: &str = "Version:[[:space:]]*[0-9]+\\.[0-9]+";

/// One component to probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTarget {
    pub id: String,
    pub install_dir: String,
    pub main_file: String,
}

/// Build a POSIX shell script that reports, for every target, whether its
/// install directory exists, its modification time, and the first version
/// line of its main file.
///
/// Output format, per target:
/// ```text
/// @@stagehand <id> absent
/// @@stagehand <id> present <mtime-epoch-secs>
/// <first line of the main file matching `Version: X.Y`, if any>
/// ```
#[must_use]
pub fn probe_script(targets: &[ProbeTarget]) -> String {
    targets
        .iter()
        .map(|t| {
            let dir = shell_quote(&t.install_dir);
            let main = shell_quote(&format!("{}/{}", t.install_dir, t.main_file));
            let id = shell_quote(&t.id);
            format!(
                "if [ -d {dir} ]; then \
                 printf '{FRAME_MARKER} %s present %s\\n' {id} \"$(stat -c %Y {dir} 2>/dev/null || stat -f %m {dir})\"; \
                 grep -i -m 1 -E '{VERSION_LINE_ERE}' {main} 2>/dev/null; echo; \
                 else printf '{FRAME_MARKER} %s absent\\n' {id}; fi"
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse probe output into per-component version info.
///
/// Components that do not appear in the output are left out of the map.
#[must_use]
pub fn parse_probe_output(output: &str) -> HashMap<String, RemoteVersionInfo> {
    let mut result = HashMap::new();
    let mut current: Option<(String, Option<DateTime<Utc>>)> = None;
    let mut body = String::new();

    let mut flush = |current: &mut Option<(String, Option<DateTime<Utc>>)>, body: &mut String| {
        if let Some((id, present_at)) = current.take() {
            let info = match present_at {
                None => RemoteVersionInfo::NotDeployed,
                Some(mtime) => parse_version(body)
                    .map_or(RemoteVersionInfo::Timestamp(mtime), RemoteVersionInfo::Version),
            };
            result.insert(id, info);
        }
        body.clear();
    };

    for line in output.lines() {
        let Some(frame) = line.strip_prefix(FRAME_MARKER) else {
            if current.is_some() {
                body.push_str(line);
                body.push('\n');
            }
            continue;
        };
        flush(&mut current, &mut body);

        let mut parts = frame.split_whitespace();
        let (Some(id), Some(state)) = (parts.next(), parts.next()) else {
            continue;
        };
        current = match state {
            "absent" => Some((id.to_string(), None)),
            "present" => {
                let mtime = parts
                    .next()
                    .and_then(|s| s.parse::<i64>().ok())
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
                    .unwrap_or(DateTime::UNIX_EPOCH);
                Some((id.to_string(), Some(mtime)))
            }
            _ => None,
        };
    }
    flush(&mut current, &mut body);
    result
}
