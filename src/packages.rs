//! Installed package versions against per-OS minimums

use crate::finding::{Category, Finding, Severity};
use crate::model::FencingMechanism;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Installed package name -> raw version string
pub type InstalledPackages = BTreeMap<String, String>;

/// First two numeric components, ignoring anything after them
static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\D*?(\d+)(?:\.(\d+))?").unwrap());

/// Major of an OS version id such as `15-SP4`, `SLES 12 SP5` or `15.3`
static OS_MAJOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d+)").unwrap());

/// `major.minor`, compared numerically so 4.10 sorts after 4.9
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Normalize a raw version; `None` when it has no leading number
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = VERSION_RE.captures(raw.trim())?;
        let major = caps.get(1)?.as_str().parse().ok()?;
        let minor = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some(Self { major, minor })
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    AtLeast(Version),
    /// Exactly one legacy release, or anything newer than a later one
    ExactOrGreater { exact: Version, greater_than: Version },
}

impl Requirement {
    pub fn is_satisfied_by(&self, version: Version) -> bool {
        match self {
            Requirement::AtLeast(min) => version >= *min,
            Requirement::ExactOrGreater {
                exact,
                greater_than,
            } => version == *exact || version > *greater_than,
        }
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Requirement::AtLeast(min) => write!(f, "≥{}", min),
            Requirement::ExactOrGreater {
                exact,
                greater_than,
            } => write!(f, "={} or >{}", exact, greater_than),
        }
    }
}

/// One row of the requirement table
#[derive(Debug, Clone, Copy)]
pub struct PackageRequirement {
    pub name: &'static str,
    pub requirement: Requirement,
    /// Only relevant when the Azure fence agent is in use
    pub needs_azure_fencing: bool,
}

const fn at_least(name: &'static str, major: u32, minor: u32, needs_azure_fencing: bool) -> PackageRequirement {
    PackageRequirement {
        name,
        requirement: Requirement::AtLeast(Version::new(major, minor)),
        needs_azure_fencing,
    }
}

const SLES15: &[PackageRequirement] = &[
    at_least("resource-agents", 4, 3, false),
    at_least("fence-agents", 4, 4, true),
    at_least("python3-azure-mgmt-compute", 17, 0, true),
    at_least("python3-azure-identity", 1, 0, true),
    at_least("python3-azure-core", 1, 9, true),
];

const SLES12: &[PackageRequirement] = &[
    at_least("resource-agents", 4, 3, false),
    at_least("fence-agents", 4, 9, true),
    PackageRequirement {
        name: "python-azure-mgmt-compute",
        requirement: Requirement::ExactOrGreater {
            exact: Version::new(4, 6),
            greater_than: Version::new(17, 0),
        },
        needs_azure_fencing: true,
    },
    at_least("python-azure-identity", 1, 0, true),
    at_least("python-azure-core", 1, 9, true),
];

/// Requirement table for an OS major
pub fn requirements_for(os_major: u32) -> Option<&'static [PackageRequirement]> {
    match os_major {
        15 => Some(SLES15),
        12 => Some(SLES12),
        _ => None,
    }
}

pub fn os_major(os_version: &str) -> Option<u32> {
    OS_MAJOR_RE
        .captures(os_version)?
        .get(1)?
        .as_str()
        .parse()
        .ok()
}

/// Why a requirement is not met
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageStatus {
    Missing,
    IncorrectVersion,
}

/// Status of one requirement, `None` when satisfied
pub fn evaluate(requirement: &PackageRequirement, installed: &InstalledPackages) -> Option<PackageStatus> {
    let Some(raw) = installed.get(requirement.name) else {
        return Some(PackageStatus::Missing);
    };
    match Version::parse(raw) {
        Some(v) if requirement.requirement.is_satisfied_by(v) => None,
        Some(_) => Some(PackageStatus::IncorrectVersion),
        None => {
            log::warn!("unparseable version '{}' for {}", raw, requirement.name);
            Some(PackageStatus::IncorrectVersion)
        }
    }
}

#[derive(Debug, Default)]
pub struct PackageChecker;

impl PackageChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(
        &self,
        installed: &InstalledPackages,
        os_version: &str,
        fencing: &[FencingMechanism],
    ) -> Vec<Finding> {
        let Some(table) = os_major(os_version).and_then(requirements_for) else {
            log::warn!("no package requirements for OS '{}'", os_version);
            return vec![Finding::new(
                Category::Package,
                "os",
                None,
                "12|15",
                os_version,
                Severity::Unsupported,
            )];
        };

        let azure = fencing.contains(&FencingMechanism::AzureFenceAgent);
        let mut findings = Vec::new();

        for requirement in table {
            let Some(status) = evaluate(requirement, installed) else {
                continue;
            };
            let severity = if requirement.needs_azure_fencing && !azure {
                Severity::Info
            } else {
                Severity::Warning
            };
            let actual = match status {
                PackageStatus::Missing => "missing",
                PackageStatus::IncorrectVersion => installed
                    .get(requirement.name)
                    .map(String::as_str)
                    .unwrap_or_default(),
            };
            log::debug!("{}: {:?}", requirement.name, status);
            findings.push(Finding::new(
                Category::Package,
                requirement.name,
                None,
                requirement.requirement.to_string(),
                actual,
                severity,
            ));
        }

        findings
    }
}

/// Parse an `rpm -qa`-style table: name in the first column, version in the last
///
/// Header rows and lines whose last column does not start with a digit are skipped.
pub fn parse_listing(text: &str) -> InstalledPackages {
    let mut installed = InstalledPackages::new();
    for line in text.lines() {
        let columns: Vec<&str> = line.split_whitespace().collect();
        let (Some(name), Some(version)) = (columns.first(), columns.last()) else {
            continue;
        };
        if columns.len() < 2 || name.starts_with('#') {
            continue;
        }
        if !version.starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        installed.insert(name.to_string(), version.to_string());
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn installed(pairs: &[(&str, &str)]) -> InstalledPackages {
        pairs
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect()
    }

    const SLES15_OK: &[(&str, &str)] = &[
        ("resource-agents", "4.8.0+git30.d0077df0-150300.8.28.1"),
        ("fence-agents", "4.9.0+git.1624456340.8d87d6bd-150300.3.30.1"),
        ("python3-azure-mgmt-compute", "26.1.0-150400.14.7.1"),
        ("python3-azure-identity", "1.10.0-150400.11.3.1"),
        ("python3-azure-core", "1.26.0-150400.8.3.1"),
    ];

    #[test]
    fn test_version_parse() {
        assert_eq!(Version::parse("4.9.0+git.1624456340"), Some(Version::new(4, 9)));
        assert_eq!(Version::parse("17"), Some(Version::new(17, 0)));
        assert_eq!(Version::parse("1.0.0b1"), Some(Version::new(1, 0)));
        assert_eq!(Version::parse("unknown"), None);
    }

    #[test]
    fn test_version_compares_numerically() {
        assert!(Version::new(4, 10) > Version::new(4, 9));
        assert!(Requirement::AtLeast(Version::new(4, 9)).is_satisfied_by(Version::new(4, 10)));
    }

    #[test]
    fn test_exact_or_greater() {
        let req = Requirement::ExactOrGreater {
            exact: Version::new(4, 6),
            greater_than: Version::new(17, 0),
        };
        assert!(req.is_satisfied_by(Version::new(4, 6)));
        assert!(req.is_satisfied_by(Version::new(17, 1)));
        assert!(!req.is_satisfied_by(Version::new(17, 0)));
        assert!(!req.is_satisfied_by(Version::new(5, 0)));
        assert_eq!(req.to_string(), "=4.6 or >17.0");
    }

    #[test]
    fn test_os_major() {
        assert_eq!(os_major("15-SP4"), Some(15));
        assert_eq!(os_major("SLES 12 SP5"), Some(12));
        assert_eq!(os_major("15.3"), Some(15));
        assert_eq!(os_major("tumbleweed"), None);
    }

    #[test]
    fn test_all_satisfied() {
        let findings = PackageChecker::new().check(
            &installed(SLES15_OK),
            "15-SP4",
            &[FencingMechanism::AzureFenceAgent],
        );
        assert!(findings.is_empty(), "{:?}", findings);
    }

    #[test]
    fn test_old_fence_agents_with_azure_fencing() {
        let mut pkgs = installed(SLES15_OK);
        pkgs.insert("fence-agents".to_string(), "4.2.1".to_string());

        let findings =
            PackageChecker::new().check(&pkgs, "15", &[FencingMechanism::AzureFenceAgent]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].subject, "fence-agents");
        assert_eq!(findings[0].expected, "≥4.4");
        assert_eq!(findings[0].actual, "4.2.1");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(
            evaluate(&SLES15[1], &pkgs),
            Some(PackageStatus::IncorrectVersion)
        );
    }

    #[test]
    fn test_old_fence_agents_without_azure_fencing() {
        let mut pkgs = installed(SLES15_OK);
        pkgs.insert("fence-agents".to_string(), "4.2.1".to_string());

        let findings = PackageChecker::new().check(&pkgs, "15", &[FencingMechanism::Sbd]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].expected, "≥4.4");
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_missing_package() {
        let mut pkgs = installed(SLES15_OK);
        pkgs.remove("resource-agents");

        let findings = PackageChecker::new().check(&pkgs, "15", &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].actual, "missing");
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(evaluate(&SLES15[0], &pkgs), Some(PackageStatus::Missing));
    }

    #[test]
    fn test_sles12_compute_legacy_release() {
        let pkgs = installed(&[
            ("resource-agents", "4.3.018"),
            ("fence-agents", "4.9.0"),
            ("python-azure-mgmt-compute", "4.6.2"),
            ("python-azure-identity", "1.4.0"),
            ("python-azure-core", "1.9.0"),
        ]);
        let findings = PackageChecker::new().check(&pkgs, "12-SP5", &[FencingMechanism::AzureFenceAgent]);
        assert!(findings.is_empty(), "{:?}", findings);
    }

    #[test]
    fn test_unknown_os() {
        let findings = PackageChecker::new().check(&installed(SLES15_OK), "8.6", &[]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].subject, "os");
        assert!(findings[0].is_unsupported());
    }

    #[test]
    fn test_parse_listing() {
        let text = "\
NAME                           DISTRIBUTION                   VERSION
fence-agents                   SUSE Linux Enterprise 15       4.9.0+git.1624456340
resource-agents                SUSE Linux Enterprise 15       4.8.0+git30

gpg-pubkey                     (none)                         (none)
";
        let pkgs = parse_listing(text);
        assert_eq!(pkgs.len(), 2);
        assert_eq!(pkgs["fence-agents"], "4.9.0+git.1624456340");
    }
}
