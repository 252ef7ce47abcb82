//! Spinners and the batch progress bar.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const SPINNER_TEMPLATE: &str = "  {spinner:.cyan} {msg}";
const BATCH_TEMPLATE: &str = "  {bar:30.cyan/dim} {pos}/{len} components  {elapsed}";
const DONE_TEMPLATE: &str = "  {prefix} {msg}";

/// Build a style from one of the constant templates above.
fn style(base: ProgressStyle, template: &str) -> ProgressStyle {
    // Constant templates; cannot fail.
    #[allow(clippy::expect_used)]
    base.template(template).expect("valid progress template")
}

/// Ticking spinner for a single remote round trip.
#[must_use]
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(style(ProgressStyle::default_spinner(), SPINNER_TEMPLATE));
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

/// Bar counting processed components in a batch.
#[must_use]
pub fn batch_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(style(ProgressStyle::default_bar(), BATCH_TEMPLATE).progress_chars("━━─"));
    pb
}

fn finish(pb: &ProgressBar, glyph: &'static str, msg: &str) {
    pb.set_style(style(ProgressStyle::default_spinner(), DONE_TEMPLATE));
    pb.set_prefix(glyph);
    pb.finish_with_message(msg.to_string());
}

pub fn finish_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, "✓", msg);
}

pub fn finish_error(pb: &ProgressBar, msg: &str) {
    finish(pb, "✗", msg);
}
