//! Report renderers

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::finding::Finding;
use crate::report::Report;

/// Output formatter trait
pub trait OutputFormatter {
    /// Format the entire report
    fn format(&self, report: &Report) -> String;

    /// Format a single finding
    fn format_finding(&self, finding: &Finding) -> String;
}
