//! Report assembly
//!
//! Evaluators hand their findings to a [`ReportBuilder`] tagged with the stage
//! that produced them. The built report lists stages in a fixed order whatever
//! order they were added in, so identical inputs give identical reports.

use crate::finding::{Finding, Severity};
use crate::model::FencingMechanism;
use crate::topology::{Classification, Topology};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Evaluator stage, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Totem,
    Quorum,
    ClusterProperties,
    Fencing,
    SbdDevices,
    Nodes,
    Topology,
    TopologyResources,
    SharedResources,
    Constraints,
    Packages,
}

/// Outcome of one checking run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub nodes: Vec<String>,
    pub topology: Topology,
    pub classified_resources: Vec<String>,
    pub fencing_mechanisms: Vec<FencingMechanism>,
    pub findings: Vec<Finding>,
}

/// Finding counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub info: usize,
    pub warning: usize,
    pub unsupported: usize,
}

impl Report {
    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.findings.iter().filter(|f| f.severity == severity).count()
    }

    /// Counts keyed by the category's display name
    pub fn count_by_category(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for finding in &self.findings {
            *counts.entry(finding.category.to_string()).or_insert(0) += 1;
        }
        counts
    }

    pub fn filter_by_severity(&self, severity: Severity) -> Vec<&Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .collect()
    }

    pub fn summary(&self) -> Summary {
        Summary {
            info: self.count_by_severity(Severity::Info),
            warning: self.count_by_severity(Severity::Warning),
            unsupported: self.count_by_severity(Severity::Unsupported),
        }
    }

    /// No warnings and nothing unsupported; info findings do not count
    pub fn is_clean(&self) -> bool {
        !self.findings.iter().any(|f| f.severity > Severity::Info)
    }

    /// Get exit code (0 = clean, 1 = warnings, 2 = unsupported)
    pub fn exit_code(&self) -> i32 {
        let summary = self.summary();
        if summary.unsupported > 0 {
            2
        } else if summary.warning > 0 {
            1
        } else {
            0
        }
    }
}

#[derive(Debug, Default)]
pub struct ReportBuilder {
    nodes: Vec<String>,
    classification: Classification,
    fencing_mechanisms: Vec<FencingMechanism>,
    stages: BTreeMap<Stage, Vec<Finding>>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(mut self, nodes: Vec<String>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn fencing_mechanisms(mut self, mechanisms: Vec<FencingMechanism>) -> Self {
        self.fencing_mechanisms = mechanisms;
        self
    }

    /// Append findings of a stage; later calls for the same stage go after earlier ones
    pub fn add(&mut self, stage: Stage, findings: Vec<Finding>) {
        if !findings.is_empty() {
            log::debug!("{:?}: {} finding(s)", stage, findings.len());
        }
        self.stages.entry(stage).or_default().extend(findings);
    }

    /// Assemble the report, keeping only findings `keep` accepts
    pub fn build(self, keep: impl Fn(&Finding) -> bool) -> Report {
        let findings = self
            .stages
            .into_values()
            .flatten()
            .filter(|f| keep(f))
            .collect();

        Report {
            nodes: self.nodes,
            topology: self.classification.topology,
            classified_resources: self.classification.resources,
            fencing_mechanisms: self.fencing_mechanisms,
            findings,
        }
    }
}
