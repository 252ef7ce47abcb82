//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;
use stagehand_common::{BatchHalt, BatchReport, RemoteVersionInfo};

use crate::application::services::modules::ModuleRun;
use crate::application::services::versions::ComponentStatus;
use crate::domain::manifest::{ColumnSpec, ModuleManifest};
use crate::infra::manifest::ManifestSet;
use crate::output::OutputContext;

/// Renders service results as human-readable terminal output.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the component status table.
    pub fn render_status(&self, project: &str, host: &str, statuses: &[ComponentStatus]) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.kv("Project:", project);
        self.ctx.kv("Server: ", host);
        println!();
        if statuses.is_empty() {
            println!("  No components configured.");
            return;
        }
        println!(
            "  {}",
            format!(
                "{:<24} {:<16} {:<12} {:<14} {}",
                "COMPONENT", "CATEGORY", "LOCAL", "REMOTE", "STATUS"
            )
            .style(self.ctx.styles.dim)
        );
        for s in statuses {
            let local = s.local_version.as_deref().unwrap_or("-");
            let remote = remote_display(s.remote.as_ref());
            let label = s.status.label();
            println!(
                "  {:<24} {:<16} {:<12} {:<14} {}",
                s.id,
                s.category,
                local,
                remote,
                label.style(self.ctx.styles.for_status(&s.status))
            );
        }
    }

    /// Render the end-of-batch summary.
    pub fn render_batch(&self, batch: &BatchReport) {
        for skipped in &batch.skipped {
            self.ctx
                .warn(&format!("{} skipped: {}", skipped.component_name, skipped.reason));
        }
        for report in &batch.reports {
            if report.success {
                self.ctx.success(&format!("{} deployed", report.component_name));
            } else {
                let stage = report
                    .failed_stage
                    .map(|s| format!(" during {s}"))
                    .unwrap_or_default();
                self.ctx.error(&format!(
                    "{} failed{stage}: {}",
                    report.component_name,
                    report.error.as_deref().unwrap_or("unknown error")
                ));
            }
        }
        match &batch.halted {
            Some(BatchHalt::Cancelled) => self.ctx.warn("Batch cancelled"),
            Some(BatchHalt::ConnectionLost(detail)) => {
                self.ctx.error(&format!("Batch halted, connection lost: {detail}"));
            }
            None => {}
        }
        if !self.ctx.quiet {
            println!();
        }
        self.ctx.info(&summary_line(batch));
    }

    /// Render the installed modules.
    pub fn render_module_list(&self, set: &ManifestSet) {
        if set.modules.is_empty() && !self.ctx.quiet {
            println!("  No modules installed.");
        }
        for module in &set.modules {
            if self.ctx.quiet {
                break;
            }
            let desc = module.description.as_deref().unwrap_or("");
            println!("  {:<20} {:<24} {desc}", module.id, module.name);
        }
        for (path, problem) in &set.problems {
            self.ctx
                .warn(&format!("{}: {problem}", path.display()));
        }
    }

    /// Render a finished module run's result table.
    pub fn render_module_run(&self, manifest: &ModuleManifest, run: &ModuleRun) {
        if let Some(message) = run.error_message() {
            if run.success() {
                self.ctx.warn(&message);
            } else {
                self.ctx.error(&message);
            }
        }
        if self.ctx.quiet {
            return;
        }
        let columns = table_columns(&manifest.output.columns, run);
        if columns.is_empty() {
            self.ctx.info("No results");
            return;
        }
        println!();
        let header: Vec<String> = columns.iter().map(|(_, title)| title.clone()).collect();
        println!("  {}", header.join("\t").style(self.ctx.styles.bold));
        for (i, row) in run.rows.iter().enumerate() {
            let cells: Vec<&str> = columns
                .iter()
                .map(|(key, _)| row.get(key).map_or("", String::as_str))
                .collect();
            let mark = if !run.selection.is_selectable() {
                " "
            } else if run.selection.is_selected(i) {
                "*"
            } else {
                "-"
            };
            println!("{mark} {}", cells.join("\t"));
        }
        println!();
        self.ctx.info(&format!(
            "{} rows, {} selected",
            run.rows.len(),
            run.selected_rows().len()
        ));
    }
}

/// Remote column text.
#[must_use]
pub fn remote_display(remote: Option<&RemoteVersionInfo>) -> String {
    match remote {
        Some(RemoteVersionInfo::Version(v)) => v.clone(),
        Some(RemoteVersionInfo::Timestamp(t)) => t.format("%Y-%m-%d %H:%M").to_string(),
        Some(RemoteVersionInfo::NotDeployed) => "absent".to_string(),
        None => "?".to_string(),
    }
}

/// One-line batch summary, e.g. "2 deployed, 1 failed, 1 skipped".
#[must_use]
pub fn summary_line(batch: &BatchReport) -> String {
    let mut parts = vec![format!("{} deployed", batch.succeeded())];
    if batch.failed() > 0 {
        parts.push(format!("{} failed", batch.failed()));
    }
    if !batch.skipped.is_empty() {
        parts.push(format!("{} skipped", batch.skipped.len()));
    }
    parts.join(", ")
}

/// `(key, title)` pairs to show: declared columns, else the sorted union of
/// row keys.
fn table_columns(declared: &[ColumnSpec], run: &ModuleRun) -> Vec<(String, String)> {
    if !declared.is_empty() {
        return declared
            .iter()
            .map(|c| (c.key.clone(), c.title().to_string()))
            .collect();
    }
    let keys: std::collections::BTreeSet<&String> =
        run.rows.iter().flat_map(|row| row.keys()).collect();
    keys.into_iter().map(|k| (k.clone(), k.clone())).collect()
}
