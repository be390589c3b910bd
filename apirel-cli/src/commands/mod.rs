//! Command implementations for apirel CLI
//!
//! Each command module provides a `run` function that executes the command
//! logic and reports whether it succeeded.

pub mod check;
pub mod diff;
pub mod extract;

use apirel_core::Report;
use colored::Colorize;
use serde::Serialize;

use crate::output::{OutputConfig, Outputter};

/// A release report together with the derived verdict, as rendered by
/// `check` and `diff`. The report's own flags are serialized with it.
#[derive(Debug, Serialize)]
pub struct ReportView {
    #[serde(flatten)]
    pub report: Report,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_version: Option<String>,
    pub summary: String,
    pub success: bool,
}

impl ReportView {
    pub fn new(report: Report) -> Self {
        Self {
            suggested_version: report.suggest_version(),
            summary: report.summary(),
            success: report.is_successful(),
            report,
        }
    }
}

impl Outputter for ReportView {
    fn to_text(&self, config: &OutputConfig) -> String {
        let mut output: String = self
            .report
            .packages
            .iter()
            .map(|p| p.to_string())
            .collect();

        let summary = if !config.use_colors() {
            self.summary.normal()
        } else if self.success {
            self.summary.green()
        } else {
            self.summary.red()
        };
        output.push_str(&format!("{}\n", summary));
        output
    }
}
