//! JSON output formatter

use super::OutputFormatter;
use crate::finding::Finding;
use crate::report::{Report, Summary};
use serde::Serialize;

/// JSON formatter for machine-readable output
#[derive(Default)]
pub struct JsonFormatter {
    /// Pretty print with indentation
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable pretty printing
    pub fn pretty(mut self) -> Self {
        self.pretty = true;
        self
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap_or_default()
        } else {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(flatten)]
    report: &'a Report,
    summary: Summary,
    exit_code: i32,
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &Report) -> String {
        self.render(&JsonOutput {
            report,
            summary: report.summary(),
            exit_code: report.exit_code(),
        })
    }

    fn format_finding(&self, finding: &Finding) -> String {
        self.render(finding)
    }
}
