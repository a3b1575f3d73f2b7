//! SAP NetWeaver ASCS/ERS baseline

use super::{
    attr, check_constraint_field, check_resource, id_contains, missing_constraint, op, Expect,
    ResourceRules, TopologyRules,
};
use crate::finding::{Category, Finding};
use crate::model::{ConfigModel, ConstraintKind, ResourceKind, ResourceNode};
use crate::topology::{Classification, Topology};

pub const FILESYSTEM: ResourceRules = ResourceRules {
    meta: &[],
    params: &[
        attr("device", Expect::Present),
        attr("directory", Expect::Contains("/usr/sap/")),
        attr("fstype", Expect::Contains("nfs")),
    ],
    operations: &[
        op("start", None, None, Some(Expect::Contains("60"))),
        op("stop", None, None, Some(Expect::Contains("60"))),
        op("monitor", None, Some(Expect::Contains("20")), Some(Expect::Contains("40"))),
    ],
};

const INSTANCE_MONITOR: &[super::OpRule] =
    &[op("monitor", None, Some(Expect::Exact("11")), Some(Expect::Exact("60")))];

pub const ASCS_INSTANCE: ResourceRules = ResourceRules {
    meta: &[
        attr("resource-stickiness", Expect::Exact("5000")),
        attr("failure-timeout", Expect::Exact("60")),
        attr("migration-threshold", Expect::Exact("1")),
        attr("priority", Expect::Exact("10")),
    ],
    params: &[attr("AUTOMATIC_RECOVER", Expect::Exact("false"))],
    operations: INSTANCE_MONITOR,
};

pub const ERS_INSTANCE: ResourceRules = ResourceRules {
    meta: &[attr("priority", Expect::Exact("1000"))],
    params: &[
        attr("AUTOMATIC_RECOVER", Expect::Exact("false")),
        attr("IS_ERS", Expect::Exact("true")),
    ],
    operations: INSTANCE_MONITOR,
};

pub const ASCS_GROUP: ResourceRules = ResourceRules {
    meta: &[attr("resource-stickiness", Expect::Exact("3000"))],
    ..ResourceRules::EMPTY
};

/// Which half of the enqueue pair a resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instance {
    Ascs,
    Ers,
}

impl Instance {
    pub fn of(id: &str) -> Self {
        if id.contains("ASCS") {
            Instance::Ascs
        } else {
            Instance::Ers
        }
    }

    fn instance_rules(self) -> &'static ResourceRules {
        match self {
            Instance::Ascs => &ASCS_INSTANCE,
            Instance::Ers => &ERS_INSTANCE,
        }
    }
}

#[derive(Debug, Default)]
pub struct AscsErsRules;

impl AscsErsRules {
    pub fn new() -> Self {
        Self
    }

    fn check_instance(&self, resource: &ResourceNode, findings: &mut Vec<Finding>) {
        let instance = Instance::of(&resource.id);
        log::debug!("checking {:?} resources under '{}'", instance, resource.id);

        if resource.is_group() && instance == Instance::Ascs {
            check_resource(resource, &ASCS_GROUP, findings);
        }

        for fs in resource.primitives_of(ResourceKind::Filesystem) {
            check_resource(fs, &FILESYSTEM, findings);
        }

        let instances = resource.primitives_of(ResourceKind::SapInstance);
        if instances.is_empty() {
            findings.push(Finding::missing(
                Category::Resource(ResourceKind::SapInstance),
                &resource.id,
                Some("SAPInstance primitive".to_string()),
            ));
        }
        for sap in instances {
            check_resource(sap, instance.instance_rules(), findings);
        }
    }
}

impl TopologyRules for AscsErsRules {
    fn topology(&self) -> Topology {
        Topology::AscsErsCluster
    }

    fn check_resources(&self, model: &ConfigModel, classification: &Classification) -> Vec<Finding> {
        let mut findings = Vec::new();
        for id in &classification.resources {
            match model.resources.iter().find(|r| &r.id == id) {
                Some(resource) => self.check_instance(resource, &mut findings),
                None => log::warn!("classified resource '{}' not in model", id),
            }
        }
        findings
    }

    fn check_constraints(&self, model: &ConfigModel) -> Vec<Finding> {
        let mut findings = Vec::new();

        let colocations: Vec<_> = model
            .colocations()
            .filter(|c| id_contains(c.rsc.as_deref(), "ERS") && id_contains(c.with_rsc.as_deref(), "ASCS"))
            .collect();
        if colocations.is_empty() {
            findings.push(missing_constraint(
                ConstraintKind::Colocation,
                "colocation of ERS with ASCS",
            ));
        }
        for col in colocations {
            check_constraint_field(
                ConstraintKind::Colocation,
                &col.id,
                "score",
                col.score.as_deref(),
                Expect::Exact("-5000"),
                &mut findings,
            );
        }

        let orders: Vec<_> = model
            .orders()
            .filter(|o| id_contains(o.first.as_deref(), "ASCS"))
            .collect();
        if orders.is_empty() {
            findings.push(missing_constraint(
                ConstraintKind::Order,
                "order ASCS start before ERS stop",
            ));
        }
        for ord in orders {
            let checks = [
                ("kind", ord.kind.as_deref(), Expect::Exact("Optional")),
                ("first-action", ord.first_action.as_deref(), Expect::Exact("start")),
                ("then", ord.then.as_deref(), Expect::Contains("ERS")),
                ("then-action", ord.then_action.as_deref(), Expect::Exact("stop")),
                ("symmetrical", ord.symmetrical.as_deref(), Expect::Exact("false")),
            ];
            for (field, actual, expect) in checks {
                check_constraint_field(ConstraintKind::Order, &ord.id, field, actual, expect, &mut findings);
            }
        }

        // ENSA1 only; ENSA2 clusters have no such location
        for loc in model.locations() {
            for rule in &loc.rules {
                let Some(expr) = rule
                    .expressions
                    .iter()
                    .find(|e| e.attribute.starts_with("runs_ers_"))
                else {
                    continue;
                };
                let kind = ConstraintKind::Location;
                check_constraint_field(kind, &loc.id, "rule score", rule.score.as_deref(), Expect::Exact("2000"), &mut findings);
                check_constraint_field(kind, &loc.id, "expression operation", Some(expr.operation.as_str()), Expect::Exact("eq"), &mut findings);
                check_constraint_field(kind, &loc.id, "expression value", expr.value.as_deref(), Expect::Exact("1"), &mut findings);
            }
        }

        findings
    }
}
