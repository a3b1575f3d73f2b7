//! Checks that apply whatever the topology

use super::{attr, check_resource, op, Expect, ResourceRules};
use crate::finding::{Category, Finding, Severity};
use crate::model::{ConfigModel, ConstraintKind, ResourceKind};
use crate::topology::Topology;
use std::collections::BTreeSet;

pub const AZURE_LB: ResourceRules = ResourceRules {
    meta: &[],
    params: &[attr("port", Expect::Present)],
    operations: &[op(
        "monitor",
        None,
        Some(Expect::Contains("10")),
        Some(Expect::Contains("20")),
    )],
};

/// Location constraints left behind by `crm resource move/ban`
const MIGRATION_PREFIXES: &[&str] = &["cli-prefer-", "cli-ban-"];

const SUPPORTED_NODE_COUNT: usize = 2;

/// Load balancer health-check resources
pub fn check_shared_kinds(model: &ConfigModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    for lb in model.primitives_of(ResourceKind::AzureLb) {
        check_resource(lb, &AZURE_LB, &mut findings);
    }

    // socat-based health check predates the azure-lb agent
    for rsc in model.primitives_of(ResourceKind::AnythingProbe) {
        findings.push(Finding::mismatch(
            Category::Resource(ResourceKind::AnythingProbe),
            &rsc.id,
            Some("type".to_string()),
            "azure-lb",
            rsc.agent_type().unwrap_or("anything"),
        ));
    }

    findings
}

pub fn check_leftover_constraints(model: &ConfigModel) -> Vec<Finding> {
    model
        .locations()
        .filter(|l| MIGRATION_PREFIXES.iter().any(|p| l.id.starts_with(p)))
        .map(|l| {
            log::info!("leftover migration constraint '{}'", l.id);
            Finding::mismatch(
                Category::Constraint(ConstraintKind::Location),
                &l.id,
                None,
                "absent",
                "present",
            )
        })
        .collect()
}

pub fn check_nodes(model: &ConfigModel) -> Vec<Finding> {
    let count = model.nodes.len();
    if count == SUPPORTED_NODE_COUNT {
        return Vec::new();
    }
    vec![Finding::mismatch(
        Category::Nodes,
        "nodes",
        None,
        SUPPORTED_NODE_COUNT.to_string(),
        count.to_string(),
    )]
}

/// Every cluster node must resolve through `/etc/hosts`
///
/// Names are matched case-insensitively, and a fully qualified hosts entry
/// also matches its short name.
pub fn check_hosts(model: &ConfigModel, hosts: &str) -> Vec<Finding> {
    let known = host_names(hosts);
    model
        .node_names()
        .into_iter()
        .filter(|node| !known.contains(&node.to_lowercase()))
        .map(|node| {
            log::info!("node '{}' not in hosts file", node);
            Finding::missing(Category::Nodes, node, Some("hosts".to_string()))
                .with_severity(Severity::Warning)
        })
        .collect()
}

fn host_names(hosts: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for line in hosts.lines() {
        let line = line.split('#').next().unwrap_or("");
        // First column is the address
        for name in line.split_whitespace().skip(1) {
            let name = name.to_lowercase();
            if let Some((short, _)) = name.split_once('.') {
                names.insert(short.to_string());
            }
            names.insert(name);
        }
    }
    names
}

/// Informational note when no topology-specific rules could run
pub fn check_topology(topology: Topology) -> Vec<Finding> {
    if topology != Topology::Unclassified {
        return Vec::new();
    }
    let known = [
        Topology::SapHanaCluster,
        Topology::AscsErsCluster,
        Topology::NfsCluster,
    ]
    .map(|t| t.as_str())
    .join("|");
    vec![Finding::new(
        Category::Topology,
        "topology",
        None,
        known,
        topology.as_str(),
        Severity::Info,
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(body: &str) -> ConfigModel {
        ConfigModel::from_xml(&format!("<cib><configuration>{}</configuration></cib>", body)).unwrap()
    }

    #[test]
    fn test_azure_lb() {
        let m = model(
            r#"<resources><primitive id="nc_NW1_ASCS" class="ocf" provider="heartbeat" type="azure-lb">
                 <instance_attributes id="ia"><nvpair id="p" name="port" value="62000"/></instance_attributes>
                 <operations><op id="o" name="monitor" interval="10" timeout="20s"/></operations>
               </primitive></resources>"#,
        );
        assert!(check_shared_kinds(&m).is_empty());
    }

    #[test]
    fn test_azure_lb_without_port() {
        let m = model(
            r#"<resources><primitive id="nc_NW1_ASCS" class="ocf" provider="heartbeat" type="azure-lb">
                 <instance_attributes id="ia"><nvpair id="p" name="nc" value="/usr/bin/nc"/></instance_attributes>
                 <operations><op id="o" name="monitor" interval="10" timeout="20s"/></operations>
               </primitive></resources>"#,
        );
        let findings = check_shared_kinds(&m);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].field.as_deref(), Some("port"));
        assert!(findings[0].is_unsupported());
    }

    #[test]
    fn test_socat_load_balancer_agent() {
        let m = model(
            r#"<resources><group id="g_ip"><primitive id="rsc_nc_HN1" class="ocf" provider="heartbeat" type="anything"/></group></resources>"#,
        );
        let findings = check_shared_kinds(&m);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].expected, "azure-lb");
        assert_eq!(findings[0].actual, "anything");
    }

    #[test]
    fn test_leftover_constraints() {
        let m = model(
            r#"<constraints>
                 <rsc_location id="cli-prefer-g-NW1_ASCS" rsc="g-NW1_ASCS" score="INFINITY" node="nw1-cl-0"/>
                 <rsc_location id="cli-ban-rsc_ip-on-vm2" rsc="rsc_ip" score="-INFINITY" node="vm2"/>
                 <rsc_location id="loc_sap" rsc="rsc_sap"/>
               </constraints>"#,
        );
        let findings = check_leftover_constraints(&m);
        let subjects: Vec<_> = findings.iter().map(|f| f.subject.as_str()).collect();
        assert_eq!(subjects, vec!["cli-prefer-g-NW1_ASCS", "cli-ban-rsc_ip-on-vm2"]);
    }

    #[test]
    fn test_node_count() {
        let two = model(r#"<nodes><node id="1" uname="a"/><node id="2" uname="b"/></nodes>"#);
        assert!(check_nodes(&two).is_empty());

        let three = model(r#"<nodes><node id="1"/><node id="2"/><node id="3"/></nodes>"#);
        let findings = check_nodes(&three);
        assert_eq!(findings[0].actual, "3");
        assert!(findings[0].is_warning());
    }

    #[test]
    fn test_hosts_lists_every_node() {
        let m = model(r#"<nodes><node id="1" uname="hn1-db-0"/><node id="2" uname="HN1-DB-1"/></nodes>"#);
        let hosts = "127.0.0.1\tlocalhost\n# cluster\n10.0.0.6 hn1-db-0\n10.0.0.7 hn1-db-1.contoso.local hn1-db-1-alias\n";
        assert!(check_hosts(&m, hosts).is_empty());
    }

    #[test]
    fn test_node_missing_from_hosts() {
        let m = model(r#"<nodes><node id="1" uname="hn1-db-0"/><node id="2" uname="hn1-db-1"/></nodes>"#);
        let hosts = "127.0.0.1 localhost\n10.0.0.6 hn1-db-0\n#10.0.0.7 hn1-db-1\n";
        let findings = check_hosts(&m, hosts);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].target(), "hn1-db-1/hosts");
        assert_eq!(findings[0].category, Category::Nodes);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].actual, "missing");
    }

    #[test]
    fn test_unclassified_topology_is_info() {
        assert!(check_topology(Topology::NfsCluster).is_empty());
        let findings = check_topology(Topology::Unclassified);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].actual, "unclassified");
    }
}
