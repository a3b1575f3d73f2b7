//! Checking engine

use crate::config::CheckerConfig;
use crate::error::CheckError;
use crate::model::ConfigModel;
use crate::packages::{InstalledPackages, PackageChecker};
use crate::report::{Report, ReportBuilder, Stage};
use crate::model::FencingMechanism;
use crate::rules::{common, corosync, fencing, rules_for};
use crate::sbd::parse_sbd;
use crate::topology::classify;

/// Already located payloads of one diagnostic bundle
#[derive(Debug, Clone, Copy)]
pub struct CheckInput<'a> {
    /// corosync.conf text, or any dump containing its sections
    pub corosync: &'a str,
    /// CIB XML, possibly truncated
    pub cib_xml: &'a str,
    /// OS version id, e.g. `15-SP4`
    pub os_version: &'a str,
    pub packages: &'a InstalledPackages,
    /// `/etc/hosts` content, when the bundle has it
    pub hosts: Option<&'a str>,
    /// `sbd dump` / `sbd list` output, when the bundle has it
    pub sbd: Option<&'a str>,
}

/// Runs every enabled evaluator over one input
#[derive(Debug, Clone, Default)]
pub struct Checker {
    config: CheckerConfig,
}

impl Checker {
    pub fn new(config: CheckerConfig) -> Self {
        Self { config }
    }

    pub fn check(&self, input: &CheckInput<'_>) -> Result<Report, CheckError> {
        let checks = &self.config.checks;

        let model = ConfigModel::from_xml(input.cib_xml)?;
        if !model.recovered.is_empty() {
            log::warn!(
                "CIB needed {} recovery step(s), report is best effort",
                model.recovered.len()
            );
        }

        let classification = classify(&model);
        let fencing_mechanisms = model.fencing_mechanisms();
        let topology = classification.topology;

        let mut builder = ReportBuilder::new()
            .nodes(model.node_names())
            .fencing_mechanisms(fencing_mechanisms.clone());

        if checks.totem {
            builder.add(Stage::Totem, corosync::check_totem(input.corosync));
        }
        if checks.quorum {
            builder.add(Stage::Quorum, corosync::check_quorum(input.corosync));
        }

        if checks.fencing {
            let properties = fencing::check_cluster_properties(&model, self.config.fencing_policy)?;
            builder.add(Stage::ClusterProperties, properties);
            builder.add(Stage::Fencing, fencing::check_fence_agents(&model));

            if fencing_mechanisms.contains(&FencingMechanism::Sbd) {
                match input.sbd {
                    Some(text) => builder.add(
                        Stage::SbdDevices,
                        fencing::check_sbd_devices(&model, &parse_sbd(text)),
                    ),
                    None => log::info!("no sbd output given, skipping SBD device checks"),
                }
            }
        }

        if checks.nodes {
            builder.add(Stage::Nodes, common::check_nodes(&model));
            if let Some(hosts) = input.hosts {
                builder.add(Stage::Nodes, common::check_hosts(&model, hosts));
            }
        }
        builder.add(Stage::Topology, common::check_topology(topology));

        let topology_rules = rules_for(topology);
        if checks.resources {
            if let Some(rules) = &topology_rules {
                builder.add(
                    Stage::TopologyResources,
                    rules.check_resources(&model, &classification),
                );
            }
            builder.add(Stage::SharedResources, common::check_shared_kinds(&model));
        }
        if checks.constraints {
            if let Some(rules) = &topology_rules {
                builder.add(Stage::Constraints, rules.check_constraints(&model));
            }
            builder.add(Stage::Constraints, common::check_leftover_constraints(&model));
        }

        if checks.packages {
            let findings =
                PackageChecker::new().check(input.packages, input.os_version, &fencing_mechanisms);
            builder.add(Stage::Packages, findings);
        }

        let report = builder
            .classification(classification)
            .build(|f| self.config.keeps(f));
        log::info!(
            "{} finding(s) for {} cluster",
            report.findings.len(),
            report.topology
        );
        Ok(report)
    }
}

/// Check with the default configuration
pub fn check(input: &CheckInput<'_>) -> Result<Report, CheckError> {
    Checker::default().check(input)
}
