//! Rule catalog and evaluators
//!
//! Expected values are static tables per resource kind. The helpers here walk
//! one resource or constraint against a table and record a finding per
//! deviating field. A missing field never aborts the walk; it becomes a single
//! Unsupported finding and the next field is checked.

pub mod ascs_ers;
pub mod common;
pub mod corosync;
pub mod fencing;
pub mod nfs;
pub mod saphana;

pub use ascs_ers::AscsErsRules;
pub use nfs::NfsRules;
pub use saphana::SapHanaRules;

use crate::error::MissingFieldError;
use crate::finding::{Category, Finding};
use crate::model::{operation_label, ConfigModel, ConstraintKind, ResourceNode, Role};
use crate::topology::{Classification, Topology};

/// How an actual value is compared with the baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// Byte-for-byte equal
    Exact(&'static str),
    /// Contains the text; used where values may carry unit suffixes
    Contains(&'static str),
    /// Equal to one of the spellings
    OneOf(&'static [&'static str]),
    /// Any value
    Present,
    /// Equal when set; leaving it unset is fine
    IfPresent(&'static str),
}

impl Expect {
    pub fn is_optional(&self) -> bool {
        matches!(self, Expect::IfPresent(_))
    }

    pub fn matches(&self, actual: &str) -> bool {
        match self {
            Expect::Exact(v) | Expect::IfPresent(v) => actual == *v,
            Expect::Contains(v) => actual.contains(v),
            Expect::OneOf(vs) => vs.contains(&actual),
            Expect::Present => true,
        }
    }

    /// Text used as `expected` in findings
    pub fn describe(&self) -> String {
        match self {
            Expect::Exact(v) | Expect::IfPresent(v) => v.to_string(),
            Expect::Contains(v) => format!("*{}*", v),
            Expect::OneOf(vs) => vs.join("|"),
            Expect::Present => "present".to_string(),
        }
    }
}

/// Expected value of one nvpair
#[derive(Debug, Clone, Copy)]
pub struct AttrRule {
    pub name: &'static str,
    pub expect: Expect,
}

pub const fn attr(name: &'static str, expect: Expect) -> AttrRule {
    AttrRule { name, expect }
}

/// `is-managed` must be unset or `true`
pub const IS_MANAGED: AttrRule = attr("is-managed", Expect::IfPresent("true"));

/// Expected timings of one operation
#[derive(Debug, Clone, Copy)]
pub struct OpRule {
    pub name: &'static str,
    pub role: Option<Role>,
    pub interval: Option<Expect>,
    pub timeout: Option<Expect>,
}

pub const fn op(
    name: &'static str,
    role: Option<Role>,
    interval: Option<Expect>,
    timeout: Option<Expect>,
) -> OpRule {
    OpRule {
        name,
        role,
        interval,
        timeout,
    }
}

/// Baseline for one kind of resource
#[derive(Debug, Clone, Copy)]
pub struct ResourceRules {
    pub meta: &'static [AttrRule],
    pub params: &'static [AttrRule],
    pub operations: &'static [OpRule],
}

impl ResourceRules {
    pub const EMPTY: ResourceRules = ResourceRules {
        meta: &[],
        params: &[],
        operations: &[],
    };
}

/// Evaluator for one reference topology
pub trait TopologyRules {
    fn topology(&self) -> Topology;

    /// Resource attributes and operation timings
    fn check_resources(&self, model: &ConfigModel, classification: &Classification) -> Vec<Finding>;

    /// Location, colocation and order constraints
    fn check_constraints(&self, model: &ConfigModel) -> Vec<Finding>;
}

/// Evaluator for a classified topology
pub fn rules_for(topology: Topology) -> Option<Box<dyn TopologyRules>> {
    match topology {
        Topology::SapHanaCluster => Some(Box::new(SapHanaRules::new())),
        Topology::AscsErsCluster => Some(Box::new(AscsErsRules::new())),
        Topology::NfsCluster => Some(Box::new(NfsRules::new())),
        Topology::Unclassified => None,
    }
}

/// Compare one looked-up value with its expectation
pub fn record(
    found: Result<&str, MissingFieldError>,
    expect: Expect,
    category: Category,
    subject: &str,
    field: &str,
    findings: &mut Vec<Finding>,
) {
    match found {
        Ok(actual) if expect.matches(actual) => {}
        Ok(actual) => findings.push(Finding::mismatch(
            category,
            subject,
            Some(field.to_string()),
            expect.describe(),
            actual,
        )),
        Err(_) if expect.is_optional() => {}
        Err(missing) => findings.push(missing.into_finding(category)),
    }
}

/// Whether an absent block is itself a deviation
fn requires_block(rules: &[AttrRule]) -> bool {
    rules.iter().any(|r| !r.expect.is_optional())
}

/// Check a resource's own attributes and operations against a table
pub fn check_resource(resource: &ResourceNode, rules: &ResourceRules, findings: &mut Vec<Finding>) {
    let category = Category::Resource(resource.kind);
    log::debug!("checking {} '{}'", resource.variant_name(), resource.id);

    if !rules.meta.is_empty() {
        if resource.meta_attributes.is_empty() && requires_block(rules.meta) {
            findings.push(Finding::missing(
                category,
                &resource.id,
                Some("meta_attributes".to_string()),
            ));
        } else {
            for rule in rules.meta {
                record(resource.meta(rule.name), rule.expect, category, &resource.id, rule.name, findings);
            }
        }
    }

    if !rules.params.is_empty() {
        if resource.instance_attributes.is_empty() && requires_block(rules.params) {
            findings.push(Finding::missing(
                category,
                &resource.id,
                Some("instance_attributes".to_string()),
            ));
        } else {
            for rule in rules.params {
                record(resource.param(rule.name), rule.expect, category, &resource.id, rule.name, findings);
            }
        }
    }

    if !rules.operations.is_empty() {
        if resource.operations.is_empty() {
            findings.push(Finding::missing(
                category,
                &resource.id,
                Some("operations".to_string()),
            ));
        } else {
            for rule in rules.operations {
                check_operation(resource, rule, category, findings);
            }
        }
    }
}

fn check_operation(resource: &ResourceNode, rule: &OpRule, category: Category, findings: &mut Vec<Finding>) {
    let op = match resource.operation(rule.name, rule.role) {
        Ok(op) => op,
        Err(missing) => {
            findings.push(missing.into_finding(category));
            return;
        }
    };
    let label = operation_label(rule.name, rule.role);

    let timings = [
        ("interval", rule.interval, op.interval.as_deref()),
        ("timeout", rule.timeout, op.timeout.as_deref()),
    ];
    for (what, expect, actual) in timings {
        let Some(expect) = expect else { continue };
        let field = format!("{} {}", label, what);
        let found = actual.ok_or_else(|| MissingFieldError::new(&resource.id, &field));
        record(found, expect, category, &resource.id, &field, findings);
    }
}

/// Check one attribute of a constraint
pub fn check_constraint_field(
    kind: ConstraintKind,
    id: &str,
    field: &str,
    actual: Option<&str>,
    expect: Expect,
    findings: &mut Vec<Finding>,
) {
    let found = actual.ok_or_else(|| MissingFieldError::new(id, field));
    record(found, expect, Category::Constraint(kind), id, field, findings);
}

/// A constraint the topology requires is not in the model
pub fn missing_constraint(kind: ConstraintKind, description: &str) -> Finding {
    Finding::missing(Category::Constraint(kind), description, None)
}

/// Whether an optional id contains `needle`
pub(crate) fn id_contains(value: Option<&str>, needle: &str) -> bool {
    value.is_some_and(|v| v.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Severity;
    use crate::model::{ConfigModel, ResourceKind};

    const RULES: ResourceRules = ResourceRules {
        meta: &[
            attr("clone-node-max", Expect::Exact("1")),
            attr("interleave", Expect::Exact("true")),
        ],
        params: &[attr("port", Expect::Present)],
        operations: &[
            op("monitor", None, Some(Expect::Contains("10")), Some(Expect::Contains("20"))),
            op("start", None, Some(Expect::Exact("0")), None),
        ],
    };

    fn resource(body: &str) -> ResourceNode {
        let xml = format!(
            r#"<resources><primitive id="rsc_nc" class="ocf" provider="heartbeat" type="azure-lb">{}</primitive></resources>"#,
            body
        );
        ConfigModel::from_xml(&xml).unwrap().resources.remove(0)
    }

    #[test]
    fn test_expect_matching() {
        assert!(Expect::Exact("600").matches("600"));
        assert!(!Expect::Exact("600").matches("600s"));
        assert!(Expect::Contains("20").matches("20s"));
        assert!(Expect::OneOf(&["Master", "Promoted"]).matches("Promoted"));
        assert!(Expect::Present.matches(""));
    }

    #[test]
    fn test_expect_describe() {
        assert_eq!(Expect::Exact("1").describe(), "1");
        assert_eq!(Expect::Contains("20").describe(), "*20*");
        assert_eq!(Expect::OneOf(&["Master", "Promoted"]).describe(), "Master|Promoted");
    }

    #[test]
    fn test_conforming_resource() {
        let r = resource(
            r#"<meta_attributes id="m"><nvpair id="a" name="clone-node-max" value="1"/><nvpair id="b" name="interleave" value="true"/></meta_attributes>
               <instance_attributes id="i"><nvpair id="c" name="port" value="62503"/></instance_attributes>
               <operations><op id="o1" name="start" interval="0"/><op id="o2" name="monitor" interval="10" timeout="20s"/></operations>"#,
        );
        let mut findings = Vec::new();
        check_resource(&r, &RULES, &mut findings);
        assert!(findings.is_empty(), "{:?}", findings);
    }

    #[test]
    fn test_one_finding_per_field() {
        let r = resource(
            r#"<meta_attributes id="m"><nvpair id="a" name="clone-node-max" value="2"/><nvpair id="b" name="interleave" value="false"/></meta_attributes>
               <instance_attributes id="i"><nvpair id="c" name="port" value="62503"/></instance_attributes>
               <operations><op id="o1" name="start" interval="0"/><op id="o2" name="monitor" interval="10" timeout="30"/></operations>"#,
        );
        let mut findings = Vec::new();
        check_resource(&r, &RULES, &mut findings);

        assert_eq!(findings.len(), 3);
        assert_eq!(findings[0].field.as_deref(), Some("clone-node-max"));
        assert_eq!(findings[0].expected, "1");
        assert_eq!(findings[0].actual, "2");
        assert_eq!(findings[0].category, Category::Resource(ResourceKind::AzureLb));
        assert_eq!(findings[2].field.as_deref(), Some("op monitor timeout"));
        assert!(findings.iter().all(|f| f.severity == Severity::Warning));
    }

    const OPTIONAL: ResourceRules = ResourceRules {
        meta: &[attr("is-managed", Expect::IfPresent("true"))],
        ..ResourceRules::EMPTY
    };

    #[test]
    fn test_optional_attribute() {
        let mut findings = Vec::new();
        check_resource(&resource(""), &OPTIONAL, &mut findings);
        assert!(findings.is_empty(), "{:?}", findings);

        let unmanaged = resource(
            r#"<meta_attributes id="m"><nvpair id="a" name="is-managed" value="false"/></meta_attributes>"#,
        );
        check_resource(&unmanaged, &OPTIONAL, &mut findings);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].target(), "rsc_nc/is-managed");
        assert_eq!(findings[0].expected, "true");
        assert_eq!(findings[0].actual, "false");
        assert_eq!(findings[0].severity, Severity::Warning);
    }

    #[test]
    fn test_missing_blocks_give_single_findings() {
        let r = resource("");
        let mut findings = Vec::new();
        check_resource(&r, &RULES, &mut findings);

        let fields: Vec<_> = findings.iter().filter_map(|f| f.field.as_deref()).collect();
        assert_eq!(fields, vec!["meta_attributes", "instance_attributes", "operations"]);
        assert!(findings.iter().all(|f| f.severity == Severity::Unsupported));
    }

    #[test]
    fn test_missing_operation_and_timing() {
        let r = resource(
            r#"<meta_attributes id="m"><nvpair id="a" name="clone-node-max" value="1"/><nvpair id="b" name="interleave" value="true"/></meta_attributes>
               <instance_attributes id="i"><nvpair id="c" name="port" value="62503"/></instance_attributes>
               <operations><op id="o2" name="monitor" interval="10"/></operations>"#,
        );
        let mut findings = Vec::new();
        check_resource(&r, &RULES, &mut findings);

        let fields: Vec<_> = findings.iter().filter_map(|f| f.field.as_deref()).collect();
        assert_eq!(fields, vec!["op monitor timeout", "op start"]);
        assert!(findings.iter().all(|f| f.actual == "missing"));
    }

    #[test]
    fn test_constraint_field() {
        let mut findings = Vec::new();
        check_constraint_field(ConstraintKind::Order, "ord", "kind", Some("Mandatory"), Expect::Exact("Optional"), &mut findings);
        check_constraint_field(ConstraintKind::Order, "ord", "then", None, Expect::Present, &mut findings);

        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[1].severity, Severity::Unsupported);
        assert_eq!(findings[1].category, Category::Constraint(ConstraintKind::Order));
    }

    #[test]
    fn test_rules_for() {
        assert!(rules_for(Topology::Unclassified).is_none());
        assert_eq!(
            rules_for(Topology::NfsCluster).unwrap().topology(),
            Topology::NfsCluster
        );
    }
}
