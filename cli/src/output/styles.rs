//! Colour stylesheet. Every field is a no-op `Style` until `colorize`.

use owo_colors::Style;
use stagehand_common::DeployStatus;

#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Warning messages (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Info messages (blue)
    pub info: Style,
    /// Dimmed/secondary text
    pub dim: Style,
    /// Table headers
    pub bold: Style,
    /// In-flight pipeline stages
    pub active: Style,
}

impl Styles {
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().blue();
        self.dim = Style::new().dimmed();
        self.bold = Style::new().bold();
        self.active = Style::new().magenta();
    }

    /// Style for a component status label.
    #[must_use]
    pub fn for_status(&self, status: &DeployStatus) -> Style {
        match status {
            DeployStatus::Current => self.success,
            DeployStatus::NeedsUpdate | DeployStatus::NotDeployed => self.warning,
            DeployStatus::Failed(_) => self.error,
            DeployStatus::Deploying(_) => self.active,
            DeployStatus::BuildRequired | DeployStatus::Unknown => self.dim,
        }
    }
}
