//! Classification of the cluster's application pattern

use crate::model::{ConfigModel, ResourceKind, ResourceNode};
use serde::{Deserialize, Serialize};

/// Reference application pattern implemented by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    SapHanaCluster,
    AscsErsCluster,
    NfsCluster,
    #[default]
    Unclassified,
}

impl Topology {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topology::SapHanaCluster => "SAP HANA system replication",
            Topology::AscsErsCluster => "SAP ASCS/ERS",
            Topology::NfsCluster => "NFS",
            Topology::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chosen topology plus the top-level resources that qualified for it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Classification {
    pub topology: Topology,
    pub resources: Vec<String>,
}

/// Classify the model from resource ids and kinds only
pub fn classify(model: &ConfigModel) -> Classification {
    let rules: [(Topology, fn(&ResourceNode) -> bool); 3] = [
        (Topology::SapHanaCluster, |r| tree_has_id(r, &["SAPHana"])),
        (Topology::AscsErsCluster, |r| tree_has_id(r, &["ASCS", "ERS"])),
        (Topology::NfsCluster, is_nfs_server_clone),
    ];

    for (topology, qualifies) in rules {
        let resources: Vec<String> = model
            .resources
            .iter()
            .filter(|r| qualifies(r))
            .map(|r| r.id.clone())
            .collect();
        if !resources.is_empty() {
            log::info!("classified as {} from {:?}", topology, resources);
            return Classification {
                topology,
                resources,
            };
        }
    }

    log::info!("no reference topology matched");
    Classification::default()
}

fn tree_has_id(resource: &ResourceNode, needles: &[&str]) -> bool {
    resource
        .walk()
        .iter()
        .any(|node| needles.iter().any(|needle| node.id.contains(needle)))
}

fn is_nfs_server_clone(resource: &ResourceNode) -> bool {
    resource.is_clone()
        && resource
            .first_child()
            .is_some_and(|child| child.kind == ResourceKind::NfsServer)
}
