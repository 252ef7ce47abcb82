//! Structural tests for layer boundaries.
//!
//! These scan source files so a stray import fails the build's tests rather
//! than surfacing in review.

use std::path::{Path, PathBuf};

fn src_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("src")
}

/// Collect all `.rs` files under a directory recursively.
fn collect_rs_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                files.extend(collect_rs_files(&path));
            } else if path.extension().and_then(|e| e.to_str()) == Some("rs") {
                files.push(path);
            }
        }
    }
    files
}

fn relative(file: &Path) -> String {
    file.strip_prefix(env!("CARGO_MANIFEST_DIR"))
        .unwrap_or(file)
        .display()
        .to_string()
}

/// Track brace depth and report whether a line is inside a `#[cfg(test)]`
/// block.
struct CfgTestTracker {
    in_test_block: bool,
    brace_depth: i32,
    test_block_start_depth: i32,
}

impl CfgTestTracker {
    fn new() -> Self {
        Self {
            in_test_block: false,
            brace_depth: 0,
            test_block_start_depth: 0,
        }
    }

    fn process_line(&mut self, line: &str) -> bool {
        if line.trim().starts_with("#[cfg(") && line.contains("test") {
            self.in_test_block = true;
            self.test_block_start_depth = self.brace_depth;
        } else if self.in_test_block
            && self.brace_depth == self.test_block_start_depth
            && line.trim().ends_with(';')
        {
            // `#[cfg(test)] mod tests;` has no body to skip.
            self.in_test_block = false;
            return true;
        }
        for ch in line.chars() {
            match ch {
                '{' => self.brace_depth += 1,
                '}' => {
                    self.brace_depth -= 1;
                    if self.in_test_block && self.brace_depth <= self.test_block_start_depth {
                        self.in_test_block = false;
                    }
                }
                _ => {}
            }
        }
        self.in_test_block
    }
}

/// Every non-comment line outside `#[cfg(test)]` blocks under `dir` that
/// matches `forbidden`, formatted as `path:line: text`.
fn violations(dir: &Path, forbidden: impl Fn(&str) -> bool) -> Vec<String> {
    let mut found = Vec::new();
    for file in collect_rs_files(dir) {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        let mut tracker = CfgTestTracker::new();
        for (i, line) in content.lines().enumerate() {
            let in_test = tracker.process_line(line);
            let trimmed = line.trim();
            if in_test || trimmed.starts_with("//") || trimmed.starts_with('*') {
                continue;
            }
            if forbidden(line) {
                found.push(format!("{}:{}: {trimmed}", relative(&file), i + 1));
            }
        }
    }
    found
}

// ── Layering ──────────────────────────────────────────────────────────────────

#[test]
fn test_domain_is_free_of_io_layers() {
    let found = violations(&src_dir().join("domain"), |line| {
        line.contains("crate::application")
            || line.contains("crate::infra")
            || line.contains("crate::output")
            || line.contains("tokio::")
            || line.contains("reqwest")
    });
    assert!(
        found.is_empty(),
        "domain/ must stay pure:\n{}",
        found.join("\n")
    );
}

#[test]
fn test_application_has_no_infra_or_output_imports() {
    let found = violations(&src_dir().join("application"), |line| {
        line.contains("crate::infra")
            || line.contains("crate::commands")
            || line.contains("crate::output")
    });
    assert!(
        found.is_empty(),
        "application/ must depend on ports only:\n{}",
        found.join("\n")
    );
}

#[test]
fn test_infra_has_no_imports_from_commands_or_output() {
    let found = violations(&src_dir().join("infra"), |line| {
        line.contains("crate::commands") || line.contains("crate::output")
    });
    assert!(
        found.is_empty(),
        "infra/ must not import from commands/ or output/:\n{}",
        found.join("\n")
    );
}

// ── Side effects ──────────────────────────────────────────────────────────────

#[test]
fn test_infra_and_application_do_not_print() {
    let mut found = violations(&src_dir().join("infra"), |line| {
        line.contains("println!") || line.contains("eprintln!")
    });
    found.extend(violations(&src_dir().join("application"), |line| {
        line.contains("println!") || line.contains("eprintln!")
    }));
    assert!(
        found.is_empty(),
        "only output/ and commands/ may print:\n{}",
        found.join("\n")
    );
}

#[test]
fn test_services_take_trait_bounds_not_adapters() {
    let adapters = ["TokioCommandRunner", "SshClient", "ReqwestTransport", "YamlConfigStore"];
    let found = violations(&src_dir().join("application"), |line| {
        adapters.iter().any(|a| line.contains(a))
    });
    assert!(
        found.is_empty(),
        "application/ must name ports, not concrete adapters:\n{}",
        found.join("\n")
    );
}

#[test]
fn test_commands_confirm_through_app_context() {
    let found = violations(&src_dir().join("commands"), |line| line.contains("dialoguer"));
    assert!(
        found.is_empty(),
        "commands/ must prompt via AppContext::confirm so --yes and CI are honoured:\n{}",
        found.join("\n")
    );
}

#[test]
fn test_no_module_level_dead_code_allows() {
    let found = violations(&src_dir(), |line| line.contains("allow(dead_code)"));
    assert!(
        found.is_empty(),
        "unused code should be removed, not silenced:\n{}",
        found.join("\n")
    );
}
