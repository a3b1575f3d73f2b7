//! Totem and quorum baselines

use crate::block::{parse_block, BlockMap};
use crate::error::MalformedBlockError;
use crate::finding::{Category, Finding, Severity};

/// Documented totem values
pub const TOTEM: &[(&str, &str)] = &[
    ("token", "30000"),
    ("token_retransmits_before_loss_const", "10"),
    ("join", "60"),
    ("consensus", "36000"),
    ("max_messages", "20"),
    ("transport", "udpu"),
];

/// Documented quorum values for a two-node cluster
pub const QUORUM: &[(&str, &str)] = &[
    ("provider", "corosync_votequorum"),
    ("expected_votes", "2"),
    ("two_node", "1"),
];

pub fn check_totem(corosync: &str) -> Vec<Finding> {
    check_section(corosync, "totem", Category::Totem, TOTEM)
}

pub fn check_quorum(corosync: &str) -> Vec<Finding> {
    check_section(corosync, "quorum", Category::Quorum, QUORUM)
}

fn check_section(
    corosync: &str,
    marker: &str,
    category: Category,
    expected: &[(&str, &str)],
) -> Vec<Finding> {
    match parse_block(corosync, marker) {
        Ok(values) => compare(&values, category, expected),
        Err(MalformedBlockError::MarkerNotFound { .. }) => {
            log::warn!("corosync section '{}' not found", marker);
            vec![Finding::missing(category, marker, None)]
        }
        Err(err) => {
            log::warn!("{}", err);
            vec![Finding::new(
                category,
                marker,
                None,
                "well-formed section",
                err.to_string(),
                Severity::Unsupported,
            )]
        }
    }
}

fn compare(values: &BlockMap, category: Category, expected: &[(&str, &str)]) -> Vec<Finding> {
    let mut findings = Vec::new();
    for (name, want) in expected {
        match values.get(*name) {
            Some(actual) if actual == want => {}
            Some(actual) => {
                log::info!("{} {} is '{}', expected '{}'", category, name, actual, want);
                findings.push(Finding::mismatch(category, *name, None, *want, actual.as_str()));
            }
            None => findings.push(Finding::missing(category, *name, None)),
        }
    }
    findings
}
