//! Highly available NFS on DRBD baseline

use super::{
    attr, check_constraint_field, check_resource, id_contains, missing_constraint, op, Expect,
    ResourceRules, TopologyRules, IS_MANAGED,
};
use crate::finding::{Category, Finding};
use crate::model::{ConfigModel, ConstraintKind, ResourceKind, Role};
use crate::topology::{Classification, Topology};

pub const DRBD_MULTI_STATE: ResourceRules = ResourceRules {
    meta: &[
        attr("master-max", Expect::Exact("1")),
        attr("master-node-max", Expect::Exact("1")),
        attr("clone-max", Expect::Exact("2")),
        attr("clone-node-max", Expect::Exact("1")),
        attr("notify", Expect::Exact("true")),
        attr("interleave", Expect::Exact("true")),
        IS_MANAGED,
    ],
    ..ResourceRules::EMPTY
};

pub const DRBD_PRIMITIVE: ResourceRules = ResourceRules {
    meta: &[],
    params: &[attr("drbd_resource", Expect::Present)],
    operations: &[
        op("monitor", Some(Role::Promoted), Some(Expect::Exact("15")), None),
        op("monitor", Some(Role::Unpromoted), Some(Expect::Exact("30")), None),
    ],
};

pub const NFS_SERVER_CLONE: ResourceRules = ResourceRules {
    meta: &[IS_MANAGED],
    ..ResourceRules::EMPTY
};

pub const NFS_SERVER: ResourceRules = ResourceRules {
    operations: &[op("monitor", None, Some(Expect::Contains("30")), None)],
    ..ResourceRules::EMPTY
};

pub const FILESYSTEM: ResourceRules = ResourceRules {
    meta: &[],
    params: &[
        attr("device", Expect::Contains("/dev/drbd")),
        attr("directory", Expect::Contains("/srv/nfs")),
        attr("fstype", Expect::Exact("xfs")),
    ],
    operations: &[op("monitor", None, Some(Expect::Contains("10")), None)],
};

pub const EXPORTFS: ResourceRules = ResourceRules {
    meta: &[],
    params: &[
        attr("clientspec", Expect::Exact("*")),
        attr("options", Expect::Exact("rw,no_root_squash,crossmnt")),
        attr("fsid", Expect::Present),
        attr("wait_for_leasetime_on_stop", Expect::Exact("true")),
    ],
    operations: &[op("monitor", None, Some(Expect::Contains("30")), None)],
};

#[derive(Debug, Default)]
pub struct NfsRules;

impl NfsRules {
    pub fn new() -> Self {
        Self
    }
}

impl TopologyRules for NfsRules {
    fn topology(&self) -> Topology {
        Topology::NfsCluster
    }

    fn check_resources(&self, model: &ConfigModel, classification: &Classification) -> Vec<Finding> {
        let mut findings = Vec::new();

        let drbd_sets: Vec<_> = model
            .resources
            .iter()
            .filter(|r| r.is_multi_state() && r.kind == ResourceKind::Drbd)
            .collect();
        if drbd_sets.is_empty() {
            findings.push(Finding::missing(
                Category::Resource(ResourceKind::Drbd),
                "DRBD multi-state",
                None,
            ));
        }
        for set in drbd_sets {
            check_resource(set, &DRBD_MULTI_STATE, &mut findings);
            for drbd in set.primitives_of(ResourceKind::Drbd) {
                check_resource(drbd, &DRBD_PRIMITIVE, &mut findings);
            }
        }

        for id in &classification.resources {
            let Some(clone) = model.resources.iter().find(|r| &r.id == id) else {
                continue;
            };
            check_resource(clone, &NFS_SERVER_CLONE, &mut findings);
            for server in clone.primitives_of(ResourceKind::NfsServer) {
                check_resource(server, &NFS_SERVER, &mut findings);
            }
        }

        for fs in model.primitives_of(ResourceKind::Filesystem) {
            check_resource(fs, &FILESYSTEM, &mut findings);
        }
        for export in model.primitives_of(ResourceKind::ExportFs) {
            check_resource(export, &EXPORTFS, &mut findings);
        }

        findings
    }

    fn check_constraints(&self, model: &ConfigModel) -> Vec<Finding> {
        let mut findings = Vec::new();

        let orders: Vec<_> = model
            .orders()
            .filter(|o| id_contains(o.first.as_deref(), "drbd"))
            .collect();
        if orders.is_empty() {
            findings.push(missing_constraint(
                ConstraintKind::Order,
                "order DRBD promote before NFS group start",
            ));
        }
        for ord in orders {
            let score = ord.score.as_deref();
            let kind = ord.kind.as_deref();
            if score != Some("INFINITY") && kind != Some("Mandatory") {
                findings.push(Finding::mismatch(
                    Category::Constraint(ConstraintKind::Order),
                    &ord.id,
                    Some("score".to_string()),
                    "INFINITY|Mandatory",
                    kind.or(score).unwrap_or("unset"),
                ));
            }
            check_constraint_field(ConstraintKind::Order, &ord.id, "first-action", ord.first_action.as_deref(), Expect::Exact("promote"), &mut findings);
            check_constraint_field(ConstraintKind::Order, &ord.id, "then-action", ord.then_action.as_deref(), Expect::Exact("start"), &mut findings);
        }

        let colocations: Vec<_> = model
            .colocations()
            .filter(|c| id_contains(c.with_rsc.as_deref(), "drbd"))
            .collect();
        if colocations.is_empty() {
            findings.push(missing_constraint(
                ConstraintKind::Colocation,
                "colocation of NFS group with promoted DRBD",
            ));
        }
        for col in colocations {
            let kind = ConstraintKind::Colocation;
            check_constraint_field(kind, &col.id, "score", col.score.as_deref(), Expect::Exact("INFINITY"), &mut findings);
            check_constraint_field(
                kind,
                &col.id,
                "with-rsc-role",
                col.with_rsc_role.as_deref(),
                Expect::OneOf(&["Master", "Promoted"]),
                &mut findings,
            );
        }

        findings
    }
}
