//! Checker configuration
//!
//! Read from a `.yaml`/`.yml` or `.json` file. Every field is optional; an
//! empty file gives the defaults.

use crate::finding::{Finding, Severity};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// What to do when `stonith-enabled=false`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FencingPolicy {
    /// Refuse to produce a report
    #[default]
    Halt,
    /// Record one Unsupported finding and keep checking
    Report,
}

impl std::str::FromStr for FencingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "halt" => Ok(FencingPolicy::Halt),
            "report" => Ok(FencingPolicy::Report),
            _ => Err(format!("Unknown fencing policy: {}", s)),
        }
    }
}

/// Evaluator toggles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChecksConfig {
    pub totem: bool,
    pub quorum: bool,
    /// crm_config properties and fence agents
    pub fencing: bool,
    pub nodes: bool,
    pub resources: bool,
    pub constraints: bool,
    pub packages: bool,
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            totem: true,
            quorum: true,
            fencing: true,
            nodes: true,
            resources: true,
            constraints: true,
            packages: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    pub fencing_policy: FencingPolicy,

    pub checks: ChecksConfig,

    /// Findings below this severity are dropped from the report
    pub min_severity: Severity,

    /// Finding targets (`subject` or `subject/field`) to leave out
    pub ignore: Vec<String>,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            fencing_policy: FencingPolicy::default(),
            checks: ChecksConfig::default(),
            min_severity: Severity::Info,
            ignore: Vec::new(),
        }
    }
}

impl CheckerConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");

        let config: Self = match ext {
            "yaml" | "yml" => {
                // serde_yaml rejects a document with no content
                if content.trim().is_empty() {
                    Self::default()
                } else {
                    serde_yaml::from_str(&content)?
                }
            }
            "json" => serde_json::from_str(&content)?,
            _ => {
                return Err(ConfigError::Invalid(format!(
                    "Unknown config file format: {}",
                    ext
                )))
            }
        };

        log::debug!("loaded checker config from {}", path.display());
        Ok(config)
    }

    /// Whether a finding survives the severity floor and ignore list
    pub fn keeps(&self, finding: &Finding) -> bool {
        if finding.severity < self.min_severity {
            return false;
        }
        let target = finding.target();
        !self
            .ignore
            .iter()
            .any(|i| *i == target || *i == finding.subject)
    }
}
