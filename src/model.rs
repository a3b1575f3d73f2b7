//! Typed model of the Cluster Information Base
//!
//! Built once from the XML tree and read-only afterwards. Evaluators look
//! things up by name (resource id, nvpair name, operation name + role), never
//! by position in the source document.

use crate::error::{MalformedConfigError, MissingFieldError};
use crate::xml::{self, XmlElement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// nvpair name -> value
pub type Attributes = BTreeMap<String, String>;

/// Resource classification derived from the agent type
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Filesystem,
    SapInstance,
    SapHana,
    SapHanaTopology,
    IpAddr2,
    AzureFenceAgent,
    SbdFenceAgent,
    AnythingProbe,
    AzureLb,
    ExportFs,
    Drbd,
    NfsServer,
    Other,
}

impl ResourceKind {
    /// Total mapping from a primitive's `type` attribute
    pub fn from_agent_type(agent_type: &str) -> Self {
        match agent_type {
            "Filesystem" => ResourceKind::Filesystem,
            "SAPInstance" => ResourceKind::SapInstance,
            "SAPHana" | "SAPHanaController" => ResourceKind::SapHana,
            "SAPHanaTopology" => ResourceKind::SapHanaTopology,
            "IPaddr2" => ResourceKind::IpAddr2,
            "fence_azure_arm" => ResourceKind::AzureFenceAgent,
            "external/sbd" | "fence_sbd" => ResourceKind::SbdFenceAgent,
            "anything" => ResourceKind::AnythingProbe,
            "azure-lb" => ResourceKind::AzureLb,
            "exportfs" => ResourceKind::ExportFs,
            "drbd" => ResourceKind::Drbd,
            "nfs-server" | "nfsserver" => ResourceKind::NfsServer,
            _ => ResourceKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Filesystem => "filesystem",
            ResourceKind::SapInstance => "sap_instance",
            ResourceKind::SapHana => "sap_hana",
            ResourceKind::SapHanaTopology => "sap_hana_topology",
            ResourceKind::IpAddr2 => "ip_addr2",
            ResourceKind::AzureFenceAgent => "azure_fence_agent",
            ResourceKind::SbdFenceAgent => "sbd_fence_agent",
            ResourceKind::AnythingProbe => "anything_probe",
            ResourceKind::AzureLb => "azure_lb",
            ResourceKind::ExportFs => "export_fs",
            ResourceKind::Drbd => "drbd",
            ResourceKind::NfsServer => "nfs_server",
            ResourceKind::Other => "other",
        }
    }
}

/// Resource role, with the legacy Master/Slave names folded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Started,
    Stopped,
    Promoted,
    Unpromoted,
}

impl Role {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Started" => Some(Role::Started),
            "Stopped" => Some(Role::Stopped),
            "Master" | "Promoted" => Some(Role::Promoted),
            "Slave" | "Unpromoted" => Some(Role::Unpromoted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Started => "Started",
            Role::Stopped => "Stopped",
            Role::Promoted => "Promoted",
            Role::Unpromoted => "Unpromoted",
        }
    }
}

/// A resource operation (`<op>`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub name: String,
    pub interval: Option<String>,
    pub timeout: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceVariant {
    /// `agent_type` is the primitive's `type` attribute
    Primitive { agent_type: String },
    Group(Vec<ResourceNode>),
    Clone(Vec<ResourceNode>),
    MultiState(Vec<ResourceNode>),
}

/// A node of the resource tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNode {
    pub id: String,
    /// For containers, the kind of the first child
    pub kind: ResourceKind,
    pub meta_attributes: Attributes,
    pub instance_attributes: Attributes,
    pub operations: Vec<Operation>,
    pub variant: ResourceVariant,
}

impl ResourceNode {
    pub fn children(&self) -> &[ResourceNode] {
        match &self.variant {
            ResourceVariant::Primitive { .. } => &[],
            ResourceVariant::Group(c) | ResourceVariant::Clone(c) | ResourceVariant::MultiState(c) => {
                c.as_slice()
            }
        }
    }

    pub fn first_child(&self) -> Option<&ResourceNode> {
        self.children().first()
    }

    /// Resource agent type of a primitive
    pub fn agent_type(&self) -> Option<&str> {
        match &self.variant {
            ResourceVariant::Primitive { agent_type } => Some(agent_type.as_str()),
            _ => None,
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.variant, ResourceVariant::Primitive { .. })
    }

    pub fn is_group(&self) -> bool {
        matches!(self.variant, ResourceVariant::Group(_))
    }

    pub fn is_clone(&self) -> bool {
        matches!(self.variant, ResourceVariant::Clone(_))
    }

    pub fn is_multi_state(&self) -> bool {
        matches!(self.variant, ResourceVariant::MultiState(_))
    }

    pub fn variant_name(&self) -> &'static str {
        match self.variant {
            ResourceVariant::Primitive { .. } => "primitive",
            ResourceVariant::Group(_) => "group",
            ResourceVariant::Clone(_) => "clone",
            ResourceVariant::MultiState(_) => "multi-state",
        }
    }

    pub fn meta(&self, name: &str) -> Result<&str, MissingFieldError> {
        self.meta_attributes
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| MissingFieldError::new(&self.id, name))
    }

    pub fn param(&self, name: &str) -> Result<&str, MissingFieldError> {
        self.instance_attributes
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| MissingFieldError::new(&self.id, name))
    }

    /// Find an operation by name and, when given, role
    pub fn operation(&self, name: &str, role: Option<Role>) -> Result<&Operation, MissingFieldError> {
        self.operations
            .iter()
            .find(|op| op.name == name && (role.is_none() || op.role == role))
            .ok_or_else(|| MissingFieldError::new(&self.id, operation_label(name, role)))
    }

    /// This node followed by all descendants, depth first
    pub fn walk(&self) -> Vec<&ResourceNode> {
        let mut out = vec![self];
        for child in self.children() {
            out.extend(child.walk());
        }
        out
    }

    /// Primitives of the given kind in this subtree
    pub fn primitives_of(&self, kind: ResourceKind) -> Vec<&ResourceNode> {
        self.walk()
            .into_iter()
            .filter(|n| n.is_primitive() && n.kind == kind)
            .collect()
    }
}

/// `op monitor` or `op monitor[Promoted]`
pub fn operation_label(name: &str, role: Option<Role>) -> String {
    match role {
        Some(role) => format!("op {}[{}]", name, role.as_str()),
        None => format!("op {}", name),
    }
}

/// Cluster node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRef {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintKind {
    Location,
    Colocation,
    Order,
}

impl ConstraintKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintKind::Location => "location",
            ConstraintKind::Colocation => "colocation",
            ConstraintKind::Order => "order",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expression {
    pub attribute: String,
    pub operation: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRule {
    pub score: Option<String>,
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationConstraint {
    pub id: String,
    pub rsc: Option<String>,
    pub score: Option<String>,
    pub node: Option<String>,
    pub rules: Vec<LocationRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColocationConstraint {
    pub id: String,
    pub score: Option<String>,
    pub rsc: Option<String>,
    pub rsc_role: Option<String>,
    pub with_rsc: Option<String>,
    pub with_rsc_role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderConstraint {
    pub id: String,
    pub kind: Option<String>,
    pub score: Option<String>,
    pub first: Option<String>,
    pub first_action: Option<String>,
    pub then: Option<String>,
    pub then_action: Option<String>,
    pub symmetrical: Option<String>,
}

/// Constraints reference resources by id only
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    Location(LocationConstraint),
    Colocation(ColocationConstraint),
    Order(OrderConstraint),
}

impl Constraint {
    pub fn id(&self) -> &str {
        match self {
            Constraint::Location(c) => &c.id,
            Constraint::Colocation(c) => &c.id,
            Constraint::Order(c) => &c.id,
        }
    }

    pub fn kind(&self) -> ConstraintKind {
        match self {
            Constraint::Location(_) => ConstraintKind::Location,
            Constraint::Colocation(_) => ConstraintKind::Colocation,
            Constraint::Order(_) => ConstraintKind::Order,
        }
    }
}

/// Fencing mechanism declared by a stonith resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FencingMechanism {
    AzureFenceAgent,
    Sbd,
}

impl std::fmt::Display for FencingMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FencingMechanism::AzureFenceAgent => write!(f, "azure fence agent"),
            FencingMechanism::Sbd => write!(f, "SBD"),
        }
    }
}

/// The cluster configuration of one checking run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigModel {
    pub properties: Attributes,
    pub nodes: Vec<NodeRef>,
    pub resources: Vec<ResourceNode>,
    pub constraints: Vec<Constraint>,
    /// Whether a `<constraints>` section was present at all
    pub has_constraints_section: bool,
    /// Problems the XML reader recovered from
    pub recovered: Vec<String>,
}

impl ConfigModel {
    /// Build from raw CIB XML, tolerating truncation
    pub fn from_xml(content: &str) -> Result<Self, MalformedConfigError> {
        let doc = xml::parse_recovering(content)?;
        let mut model = Self::from_element(&doc.root);
        model.recovered = doc.recovered;
        Ok(model)
    }

    /// Build from an already parsed `<cib>` or `<configuration>` element
    pub fn from_element(root: &XmlElement) -> Self {
        let properties = match root.find("crm_config") {
            Some(crm_config) => {
                let mut props = Attributes::new();
                let sets: Vec<_> = crm_config.children_named("cluster_property_set").collect();
                if sets.len() > 1 {
                    log::debug!("merging {} cluster_property_set sections", sets.len());
                }
                for set in sets {
                    props.extend(nvpairs(set));
                }
                props
            }
            None => {
                log::warn!("CIB has no crm_config section");
                Attributes::new()
            }
        };

        let nodes = root
            .find("nodes")
            .map(|nodes| {
                nodes
                    .children_named("node")
                    .filter_map(|n| n.attr("uname").or_else(|| n.attr("id")))
                    .map(|name| NodeRef {
                        name: name.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let resources = root
            .find("resources")
            .map(|r| r.children.iter().filter_map(build_resource).collect())
            .unwrap_or_default();

        let constraints_section = root.find("constraints");
        let constraints = constraints_section
            .map(|c| c.children.iter().filter_map(build_constraint).collect())
            .unwrap_or_default();

        Self {
            properties,
            nodes,
            resources,
            constraints,
            has_constraints_section: constraints_section.is_some(),
            recovered: Vec::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    pub fn node_names(&self) -> Vec<String> {
        self.nodes.iter().map(|n| n.name.clone()).collect()
    }

    /// Every resource node, depth first in document order
    pub fn all_resources(&self) -> Vec<&ResourceNode> {
        self.resources.iter().flat_map(|r| r.walk()).collect()
    }

    pub fn find_resource(&self, id: &str) -> Option<&ResourceNode> {
        self.all_resources().into_iter().find(|r| r.id == id)
    }

    /// Primitives of the given kind anywhere in the tree
    pub fn primitives_of(&self, kind: ResourceKind) -> Vec<&ResourceNode> {
        self.resources
            .iter()
            .flat_map(|r| r.primitives_of(kind))
            .collect()
    }

    pub fn locations(&self) -> impl Iterator<Item = &LocationConstraint> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Location(l) => Some(l),
            _ => None,
        })
    }

    pub fn colocations(&self) -> impl Iterator<Item = &ColocationConstraint> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Colocation(l) => Some(l),
            _ => None,
        })
    }

    pub fn orders(&self) -> impl Iterator<Item = &OrderConstraint> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Order(o) => Some(o),
            _ => None,
        })
    }

    /// Fencing mechanisms in order of first appearance
    pub fn fencing_mechanisms(&self) -> Vec<FencingMechanism> {
        let mut found = Vec::new();
        for resource in self.all_resources() {
            let mechanism = match resource.kind {
                ResourceKind::AzureFenceAgent if resource.is_primitive() => {
                    FencingMechanism::AzureFenceAgent
                }
                ResourceKind::SbdFenceAgent if resource.is_primitive() => FencingMechanism::Sbd,
                _ => continue,
            };
            if !found.contains(&mechanism) {
                found.push(mechanism);
            }
        }
        found
    }

    pub fn has_fencing(&self, mechanism: FencingMechanism) -> bool {
        self.fencing_mechanisms().contains(&mechanism)
    }
}

fn nvpairs(set: &XmlElement) -> Attributes {
    set.children_named("nvpair")
        .filter_map(|nv| {
            let name = nv.attr("name")?;
            Some((name.to_string(), nv.attr("value").unwrap_or("").to_string()))
        })
        .collect()
}

fn attribute_blocks(element: &XmlElement, block: &str) -> Attributes {
    let mut attrs = Attributes::new();
    for set in element.children_named(block) {
        attrs.extend(nvpairs(set));
    }
    attrs
}

fn operations(element: &XmlElement) -> Vec<Operation> {
    element
        .children_named("operations")
        .flat_map(|ops| ops.children_named("op"))
        .filter_map(|op| {
            Some(Operation {
                name: op.attr("name")?.to_string(),
                interval: op.attr("interval").map(str::to_string),
                timeout: op.attr("timeout").map(str::to_string),
                role: op.attr("role").and_then(Role::parse),
            })
        })
        .collect()
}

fn build_resource(element: &XmlElement) -> Option<ResourceNode> {
    let id = element.attr("id").unwrap_or_default().to_string();
    let meta_attributes = attribute_blocks(element, "meta_attributes");
    let instance_attributes = attribute_blocks(element, "instance_attributes");
    let operations = operations(element);

    let (kind, variant) = match element.name.as_str() {
        "primitive" => {
            let agent_type = element.attr("type").unwrap_or_default().to_string();
            (
                ResourceKind::from_agent_type(&agent_type),
                ResourceVariant::Primitive { agent_type },
            )
        }
        "group" | "clone" | "master" => {
            let children: Vec<ResourceNode> =
                element.children.iter().filter_map(build_resource).collect();
            let kind = children.first().map(|c| c.kind).unwrap_or(ResourceKind::Other);
            let promotable = meta_attributes
                .get("promotable")
                .is_some_and(|v| v == "true");
            let variant = match element.name.as_str() {
                "group" => ResourceVariant::Group(children),
                "master" => ResourceVariant::MultiState(children),
                _ if promotable => ResourceVariant::MultiState(children),
                _ => ResourceVariant::Clone(children),
            };
            (kind, variant)
        }
        // Attribute sets, operations, utilization, bundles...
        _ => return None,
    };

    if id.is_empty() {
        log::warn!("<{}> without id in resources section", element.name);
    }

    Some(ResourceNode {
        id,
        kind,
        meta_attributes,
        instance_attributes,
        operations,
        variant,
    })
}

fn owned(element: &XmlElement, name: &str) -> Option<String> {
    element.attr(name).map(str::to_string)
}

fn build_constraint(element: &XmlElement) -> Option<Constraint> {
    let id = element.attr("id").unwrap_or_default().to_string();

    let constraint = match element.name.as_str() {
        "rsc_location" => Constraint::Location(LocationConstraint {
            rsc: owned(element, "rsc").or_else(|| owned(element, "rsc-pattern")),
            score: owned(element, "score"),
            node: owned(element, "node"),
            rules: element
                .children_named("rule")
                .map(|rule| LocationRule {
                    score: owned(rule, "score"),
                    expressions: rule
                        .children_named("expression")
                        .map(|e| Expression {
                            attribute: e.attr("attribute").unwrap_or_default().to_string(),
                            operation: e.attr("operation").unwrap_or_default().to_string(),
                            value: owned(e, "value"),
                        })
                        .collect(),
                })
                .collect(),
            id,
        }),
        "rsc_colocation" => Constraint::Colocation(ColocationConstraint {
            score: owned(element, "score"),
            rsc: owned(element, "rsc"),
            rsc_role: owned(element, "rsc-role"),
            with_rsc: owned(element, "with-rsc"),
            with_rsc_role: owned(element, "with-rsc-role"),
            id,
        }),
        "rsc_order" => Constraint::Order(OrderConstraint {
            kind: owned(element, "kind"),
            score: owned(element, "score"),
            first: owned(element, "first"),
            first_action: owned(element, "first-action"),
            then: owned(element, "then"),
            then_action: owned(element, "then-action"),
            symmetrical: owned(element, "symmetrical"),
            id,
        }),
        other => {
            log::debug!("skipping <{}> in constraints section", other);
            return None;
        }
    };

    Some(constraint)
}
