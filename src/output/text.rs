//! Human-readable text output formatter

use super::OutputFormatter;
use crate::finding::{Finding, Severity};
use crate::report::Report;
use colored::*;

/// Text formatter with optional color support
pub struct TextFormatter {
    /// Enable colored output
    pub colored: bool,

    /// Show the topology/nodes/fencing header
    pub show_header: bool,

    /// Show statistics
    pub show_stats: bool,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            colored: true,
            show_header: true,
            show_stats: true,
        }
    }
}

impl TextFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable colors
    pub fn without_color(mut self) -> Self {
        self.colored = false;
        self
    }

    fn severity_str(&self, severity: Severity) -> ColoredString {
        let s = format!("{}", severity);
        if !self.colored {
            return s.normal();
        }
        match severity {
            Severity::Unsupported => s.red().bold(),
            Severity::Warning => s.yellow().bold(),
            Severity::Info => s.blue(),
        }
    }

    fn paint(&self, s: String, color: Color) -> String {
        if self.colored {
            s.color(color).to_string()
        } else {
            s
        }
    }

    fn format_header(&self, report: &Report) -> String {
        let fencing = if report.fencing_mechanisms.is_empty() {
            "none".to_string()
        } else {
            report
                .fencing_mechanisms
                .iter()
                .map(|m| m.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        let topology = if self.colored {
            report.topology.to_string().bold().to_string()
        } else {
            report.topology.to_string()
        };

        let mut output = format!("Topology: {}", topology);
        if !report.classified_resources.is_empty() {
            output.push_str(&format!(" ({})", report.classified_resources.join(", ")));
        }
        output.push('\n');
        output.push_str(&format!("Nodes:    {}\n", report.nodes.join(", ")));
        output.push_str(&format!("Fencing:  {}\n\n", fencing));
        output
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &Report) -> String {
        let mut output = String::new();

        if self.show_header {
            output.push_str(&self.format_header(report));
        }

        // Group by category, keeping report order
        let mut groups: Vec<(String, Vec<&Finding>)> = Vec::new();
        for finding in &report.findings {
            let category = finding.category.to_string();
            match groups.iter_mut().find(|(c, _)| *c == category) {
                Some((_, findings)) => findings.push(finding),
                None => groups.push((category, vec![finding])),
            }
        }

        for (category, findings) in &groups {
            if self.colored {
                output.push_str(&format!("{}\n", category.underline()));
            } else {
                output.push_str(&format!("{}\n", category));
            }
            for finding in findings {
                output.push_str(&self.format_finding(finding));
                output.push('\n');
            }
            output.push('\n');
        }

        if self.show_stats {
            let summary = report.summary();
            if report.findings.is_empty() {
                output.push_str(&self.paint("No deviations found".to_string(), Color::Green));
            } else {
                let mut counts = Vec::new();
                if summary.unsupported > 0 {
                    counts.push(self.paint(format!("{} unsupported", summary.unsupported), Color::Red));
                }
                if summary.warning > 0 {
                    let s = format!(
                        "{} {}",
                        summary.warning,
                        if summary.warning == 1 { "warning" } else { "warnings" }
                    );
                    counts.push(self.paint(s, Color::Yellow));
                }
                if summary.info > 0 {
                    counts.push(self.paint(format!("{} info", summary.info), Color::Blue));
                }
                output.push_str(&format!("{} finding(s): {}", report.findings.len(), counts.join(", ")));
            }
            output.push('\n');
        }

        output
    }

    fn format_finding(&self, finding: &Finding) -> String {
        let target = if self.colored {
            finding.target().cyan().to_string()
        } else {
            finding.target()
        };
        format!(
            "  {}: {}: expected {}, found {}",
            self.severity_str(finding.severity),
            target,
            finding.expected,
            finding.actual
        )
    }
}
