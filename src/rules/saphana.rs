//! SAP HANA system replication baseline

use super::{
    attr, check_constraint_field, check_resource, missing_constraint, op, Expect, ResourceRules,
    TopologyRules, IS_MANAGED,
};
use crate::finding::{Category, Finding};
use crate::model::{ConfigModel, ConstraintKind, ResourceKind, ResourceNode, Role};
use crate::topology::{Classification, Topology};

const MASTER_ROLE: Expect = Expect::OneOf(&["Master", "Promoted"]);

/// SAPHanaTopology clone
pub const TOPOLOGY_CLONE: ResourceRules = ResourceRules {
    meta: &[
        attr("clone-node-max", Expect::Exact("1")),
        attr("interleave", Expect::Exact("true")),
        IS_MANAGED,
    ],
    ..ResourceRules::EMPTY
};

pub const TOPOLOGY_PRIMITIVE: ResourceRules = ResourceRules {
    operations: &[
        op("monitor", None, Some(Expect::Exact("10")), Some(Expect::Exact("600"))),
        op("start", None, Some(Expect::Exact("0")), Some(Expect::Exact("600"))),
        op("stop", None, Some(Expect::Exact("0")), Some(Expect::Exact("300"))),
    ],
    ..ResourceRules::EMPTY
};

/// SAPHana multi-state
pub const HANA_MULTI_STATE: ResourceRules = ResourceRules {
    meta: &[
        attr("notify", Expect::Exact("true")),
        attr("clone-max", Expect::Exact("2")),
        attr("clone-node-max", Expect::Exact("1")),
        attr("interleave", Expect::Exact("true")),
        IS_MANAGED,
    ],
    ..ResourceRules::EMPTY
};

pub const HANA_PRIMITIVE: ResourceRules = ResourceRules {
    meta: &[],
    params: &[
        attr("PREFER_SITE_TAKEOVER", Expect::Exact("true")),
        attr("DUPLICATE_PRIMARY_TIMEOUT", Expect::Exact("7200")),
        attr("AUTOMATED_REGISTER", Expect::Exact("false")),
    ],
    operations: &[
        op("start", None, Some(Expect::Exact("0")), Some(Expect::Exact("3600"))),
        op("stop", None, Some(Expect::Exact("0")), Some(Expect::Exact("3600"))),
        op("promote", None, Some(Expect::Exact("0")), Some(Expect::Exact("3600"))),
        op("monitor", Some(Role::Promoted), Some(Expect::Exact("60")), Some(Expect::Exact("700"))),
        op("monitor", Some(Role::Unpromoted), Some(Expect::Exact("61")), Some(Expect::Exact("700"))),
    ],
};

#[derive(Debug, Default)]
pub struct SapHanaRules;

impl SapHanaRules {
    pub fn new() -> Self {
        Self
    }

    fn check_set(
        &self,
        model: &ConfigModel,
        kind: ResourceKind,
        is_container: fn(&ResourceNode) -> bool,
        container_rules: &ResourceRules,
        primitive_rules: &ResourceRules,
        findings: &mut Vec<Finding>,
    ) {
        let sets: Vec<&ResourceNode> = model
            .resources
            .iter()
            .filter(|r| is_container(r) && r.kind == kind)
            .collect();

        if sets.is_empty() {
            let what = if kind == ResourceKind::SapHanaTopology {
                "SAPHanaTopology clone"
            } else {
                "SAPHana multi-state"
            };
            findings.push(Finding::missing(Category::Resource(kind), what, None));
            return;
        }

        for set in sets {
            check_resource(set, container_rules, findings);
            for primitive in set.primitives_of(kind) {
                check_resource(primitive, primitive_rules, findings);
            }
        }
    }
}

/// Id of the SAPHana set, as opposed to the SAPHanaTopology clone
fn is_hana_set(id: Option<&str>) -> bool {
    id.is_some_and(|id| id.contains("SAPHana") && !id.contains("SAPHanaTopology"))
}

impl TopologyRules for SapHanaRules {
    fn topology(&self) -> Topology {
        Topology::SapHanaCluster
    }

    fn check_resources(&self, model: &ConfigModel, _classification: &Classification) -> Vec<Finding> {
        let mut findings = Vec::new();
        self.check_set(
            model,
            ResourceKind::SapHanaTopology,
            ResourceNode::is_clone,
            &TOPOLOGY_CLONE,
            &TOPOLOGY_PRIMITIVE,
            &mut findings,
        );
        self.check_set(
            model,
            ResourceKind::SapHana,
            ResourceNode::is_multi_state,
            &HANA_MULTI_STATE,
            &HANA_PRIMITIVE,
            &mut findings,
        );
        findings
    }

    fn check_constraints(&self, model: &ConfigModel) -> Vec<Finding> {
        let mut findings = Vec::new();

        let colocations: Vec<_> = model
            .colocations()
            .filter(|c| is_hana_set(c.with_rsc.as_deref()))
            // Read-enabled secondary IP follows the Unpromoted instance
            .filter(|c| {
                !c.with_rsc_role
                    .as_deref()
                    .and_then(Role::parse)
                    .is_some_and(|r| r == Role::Unpromoted)
            })
            .collect();
        if colocations.is_empty() {
            findings.push(missing_constraint(
                ConstraintKind::Colocation,
                "colocation with SAPHana multi-state",
            ));
        }
        for col in colocations {
            let kind = ConstraintKind::Colocation;
            check_constraint_field(kind, &col.id, "score", col.score.as_deref(), Expect::Exact("4000"), &mut findings);
            // rsc-role defaults to Started when omitted
            let rsc_role = col.rsc_role.as_deref().or(Some("Started"));
            check_constraint_field(kind, &col.id, "rsc-role", rsc_role, Expect::Exact("Started"), &mut findings);
            check_constraint_field(kind, &col.id, "with-rsc-role", col.with_rsc_role.as_deref(), MASTER_ROLE, &mut findings);
        }

        let orders: Vec<_> = model
            .orders()
            .filter(|o| super::id_contains(o.first.as_deref(), "SAPHanaTopology"))
            .collect();
        if orders.is_empty() {
            findings.push(missing_constraint(
                ConstraintKind::Order,
                "order SAPHanaTopology before SAPHana",
            ));
        }
        for ord in orders {
            let kind = ConstraintKind::Order;
            let then = ord.then.as_deref();
            if !is_hana_set(then) {
                check_constraint_field(kind, &ord.id, "then", then, Expect::Contains("SAPHana"), &mut findings);
            }
            check_constraint_field(kind, &ord.id, "kind", ord.kind.as_deref(), Expect::Exact("Optional"), &mut findings);
        }

        findings
    }
}
