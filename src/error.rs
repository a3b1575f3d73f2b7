//! Error taxonomy for a checking run
//!
//! Only [`CheckError`] escapes [`crate::Checker::check`]. The other errors are
//! recovered where they occur and turned into findings.

use crate::finding::{Category, Finding};
use thiserror::Error;

/// A corosync section could not be read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedBlockError {
    #[error("section '{marker}' not present")]
    MarkerNotFound { marker: String },

    #[error("section '{marker}', line {line}: no ':' separator in '{content}'")]
    MissingSeparator {
        marker: String,
        line: usize,
        content: String,
    },
}

/// The CIB could not be read even in recovery mode
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("CIB is not parseable as XML: {reason}")]
pub struct MalformedConfigError {
    pub reason: String,
}

impl MalformedConfigError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// An expected nvpair or operation is absent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{field}' missing from '{subject}'")]
pub struct MissingFieldError {
    pub subject: String,
    pub field: String,
}

impl MissingFieldError {
    pub fn new(subject: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            field: field.into(),
        }
    }

    /// Recover into the single Unsupported finding for this field
    pub fn into_finding(self, category: Category) -> Finding {
        Finding::missing(category, self.subject, Some(self.field))
    }
}

/// A cluster property puts the whole cluster outside the supported baseline
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported configuration: cluster property '{property}' is '{value}'")]
pub struct UnsupportedConfigurationError {
    pub property: String,
    pub value: String,
}

/// Fatal outcome of a checking run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error(transparent)]
    MalformedConfig(#[from] MalformedConfigError),

    #[error(transparent)]
    UnsupportedConfiguration(#[from] UnsupportedConfigurationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use crate::model::ResourceKind;

    #[test]
    fn test_missing_field_recovers_to_unsupported() {
        let finding = MissingFieldError::new("rsc_SAPHana_HN1_HDB03", "AUTOMATED_REGISTER")
            .into_finding(Category::Resource(ResourceKind::SapHana));

        assert_eq!(finding.severity, Severity::Unsupported);
        assert_eq!(finding.expected, "present");
        assert_eq!(finding.actual, "missing");
        assert_eq!(finding.field.as_deref(), Some("AUTOMATED_REGISTER"));
    }

    #[test]
    fn test_check_error_display() {
        let err: CheckError = UnsupportedConfigurationError {
            property: "stonith-enabled".to_string(),
            value: "false".to_string(),
        }
        .into();
        assert!(err.to_string().contains("stonith-enabled"));

        let err: CheckError = MalformedConfigError::new("empty document").into();
        assert!(err.to_string().contains("empty document"));
    }

    #[test]
    fn test_block_error_display() {
        let err = MalformedBlockError::MarkerNotFound {
            marker: "quorum".to_string(),
        };
        assert_eq!(err.to_string(), "section 'quorum' not present");
    }
}
