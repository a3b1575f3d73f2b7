//! Finding types produced by the evaluators

use crate::model::{ConstraintKind, ResourceKind};
use serde::{Deserialize, Serialize};

/// Severity level for findings
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, not a deviation that needs action
    Info,
    /// Value differs from the documented baseline
    #[default]
    Warning,
    /// Expected configuration is absent or outside what is supported
    Unsupported,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Unsupported => write!(f, "unsupported"),
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "note" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "unsupported" => Ok(Severity::Unsupported),
            _ => Err(()),
        }
    }
}

/// What part of the configuration a finding is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Totem,
    Quorum,
    ClusterProperty,
    Nodes,
    Topology,
    Fencing,
    Resource(ResourceKind),
    Constraint(ConstraintKind),
    Package,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::Totem => write!(f, "totem"),
            Category::Quorum => write!(f, "quorum"),
            Category::ClusterProperty => write!(f, "cluster-property"),
            Category::Nodes => write!(f, "nodes"),
            Category::Topology => write!(f, "topology"),
            Category::Fencing => write!(f, "fencing"),
            Category::Resource(kind) => write!(f, "resource/{}", kind.as_str()),
            Category::Constraint(kind) => write!(f, "constraint/{}", kind.as_str()),
            Category::Package => write!(f, "package"),
        }
    }
}

/// A single deviation from the reference baseline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Resource id, constraint id, parameter or package name
    pub subject: String,
    /// Attribute or operation inside the subject, when the subject is a container
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub category: Category,
    pub expected: String,
    pub actual: String,
    pub severity: Severity,
}

impl Finding {
    /// Create a finding with an explicit severity
    pub fn new(
        category: Category,
        subject: impl Into<String>,
        field: Option<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            subject: subject.into(),
            field,
            category,
            expected: expected.into(),
            actual: actual.into(),
            severity,
        }
    }

    /// A value that differs from the baseline
    pub fn mismatch(
        category: Category,
        subject: impl Into<String>,
        field: Option<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::new(category, subject, field, expected, actual, Severity::Warning)
    }

    /// Something the baseline requires is not there at all
    pub fn missing(category: Category, subject: impl Into<String>, field: Option<String>) -> Self {
        Self::new(
            category,
            subject,
            field,
            "present",
            "missing",
            Severity::Unsupported,
        )
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// `subject` or `subject/field`
    pub fn target(&self) -> String {
        match &self.field {
            Some(field) => format!("{}/{}", self.subject, field),
            None => self.subject.clone(),
        }
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_unsupported(&self) -> bool {
        self.severity == Severity::Unsupported
    }
}
