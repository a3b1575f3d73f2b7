//! Cluster properties and fence agents

use super::{attr, check_resource, op, Expect, ResourceRules};
use crate::config::FencingPolicy;
use crate::error::UnsupportedConfigurationError;
use crate::finding::{Category, Finding, Severity};
use crate::model::{ConfigModel, FencingMechanism, ResourceKind};
use crate::sbd::SbdDevice;

pub const AZURE_FENCE_AGENT: ResourceRules = ResourceRules {
    meta: &[],
    params: &[
        attr("pcmk_monitor_retries", Expect::Exact("4")),
        attr("pcmk_action_limit", Expect::Exact("3")),
        attr("power_timeout", Expect::Exact("240")),
        attr("pcmk_reboot_timeout", Expect::Exact("900")),
    ],
    operations: &[op(
        "monitor",
        None,
        Some(Expect::Contains("3600")),
        Some(Expect::Contains("120")),
    )],
};

pub const SBD_FENCE_AGENT: ResourceRules = ResourceRules {
    operations: &[op("monitor", None, Some(Expect::Exact("600")), Some(Expect::Exact("15")))],
    ..ResourceRules::EMPTY
};

/// Documented device header timeouts (`sbd create -1 60 -4 120`)
pub const SBD_DEVICE_TIMEOUTS: &[(&str, &str)] = &[("watchdog", "60"), ("msgwait", "120")];

/// Pacemaker spellings of a false boolean
const FALSE_VALUES: &[&str] = &["false", "no", "off", "0", "n"];

/// Check `crm_config` properties
///
/// `stonith-enabled=false` either ends the run or becomes a single finding,
/// depending on `policy`.
pub fn check_cluster_properties(
    model: &ConfigModel,
    policy: FencingPolicy,
) -> Result<Vec<Finding>, UnsupportedConfigurationError> {
    let mut findings = Vec::new();

    if let Some(value) = model.property("stonith-enabled") {
        if FALSE_VALUES.contains(&value.to_lowercase().as_str()) {
            match policy {
                FencingPolicy::Halt => {
                    return Err(UnsupportedConfigurationError {
                        property: "stonith-enabled".to_string(),
                        value: value.to_string(),
                    })
                }
                FencingPolicy::Report => {
                    log::warn!("stonith-enabled is '{}', reporting and continuing", value);
                    findings.push(Finding::new(
                        Category::ClusterProperty,
                        "stonith-enabled",
                        None,
                        "true",
                        value,
                        Severity::Unsupported,
                    ));
                }
            }
        }
    }

    let expected_timeout = if model.has_fencing(FencingMechanism::AzureFenceAgent) {
        Some("900")
    } else if model.has_fencing(FencingMechanism::Sbd) {
        Some("144")
    } else {
        None
    };
    if let Some(expected) = expected_timeout {
        match model.property("stonith-timeout") {
            Some(actual) if actual.contains(expected) => {}
            Some(actual) => findings.push(Finding::mismatch(
                Category::ClusterProperty,
                "stonith-timeout",
                None,
                Expect::Contains(expected).describe(),
                actual,
            )),
            None => findings.push(Finding::missing(
                Category::ClusterProperty,
                "stonith-timeout",
                None,
            )),
        }
    }

    Ok(findings)
}

/// Check every fence agent, or flag that there is none
pub fn check_fence_agents(model: &ConfigModel) -> Vec<Finding> {
    let mut findings = Vec::new();

    if model.fencing_mechanisms().is_empty() {
        log::warn!("no fencing resource configured");
        findings.push(Finding::missing(Category::Fencing, "stonith", None));
        return findings;
    }

    for agent in model.primitives_of(ResourceKind::AzureFenceAgent) {
        check_resource(agent, &AZURE_FENCE_AGENT, &mut findings);
    }
    for agent in model.primitives_of(ResourceKind::SbdFenceAgent) {
        check_resource(agent, &SBD_FENCE_AGENT, &mut findings);
    }

    findings
}

/// Check SBD device headers and slot messages
///
/// Every cluster node needs a slot on each device, and a slot carrying a
/// message other than `clear` has a fencing request pending.
pub fn check_sbd_devices(model: &ConfigModel, devices: &[SbdDevice]) -> Vec<Finding> {
    let category = Category::Fencing;
    let mut findings = Vec::new();

    if devices.is_empty() {
        log::warn!("SBD fencing configured but no device found in the sbd output");
        findings.push(Finding::missing(category, "sbd", Some("device".to_string())));
        return findings;
    }

    for device in devices {
        log::debug!("checking SBD device '{}'", device.path);

        for (name, expected) in SBD_DEVICE_TIMEOUTS {
            let field = format!("Timeout ({})", name);
            match device.timeout(name) {
                Some(actual) if actual == *expected => {}
                Some(actual) => findings.push(Finding::mismatch(
                    category,
                    &device.path,
                    Some(field),
                    *expected,
                    actual,
                )),
                None => findings.push(Finding::missing(category, &device.path, Some(field))),
            }
        }

        for slot in device.slots.iter().filter(|s| !s.is_clear()) {
            findings.push(Finding::mismatch(
                category,
                &device.path,
                Some(format!("slot {}", slot.node)),
                "clear",
                &slot.message,
            ));
        }

        // A bare dump has no slot listing to compare against
        if device.slots.is_empty() {
            continue;
        }
        for node in model.node_names() {
            if !device.slots.iter().any(|s| s.node.eq_ignore_ascii_case(&node)) {
                findings.push(Finding::missing(
                    category,
                    &device.path,
                    Some(format!("slot {}", node)),
                ));
            }
        }
    }

    findings
}
