//! cluster-checker - Pacemaker/corosync conformance checker
//!
//! Audits a captured cluster configuration (the CIB plus corosync totem and
//! quorum sections) against the documented baseline for the high-availability
//! pattern it implements, and reports every deviation.
//!
//! # Architecture
//!
//! ```text
//! corosync text ─> block ──────────────┐
//! CIB XML ──> xml ─> model ─> topology ─> rules ─> report
//! package listing ─> packages ─────────┤
//! sbd dump ─> sbd ─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use cluster_checker::{packages, CheckInput, Checker, CheckerConfig};
//!
//! let corosync = std::fs::read_to_string("corosync.conf").unwrap();
//! let cib = std::fs::read_to_string("cib.xml").unwrap();
//! let installed = packages::parse_listing(&std::fs::read_to_string("rpm.txt").unwrap());
//!
//! let report = Checker::new(CheckerConfig::default())
//!     .check(&CheckInput {
//!         corosync: &corosync,
//!         cib_xml: &cib,
//!         os_version: "15-SP4",
//!         packages: &installed,
//!         hosts: None,
//!         sbd: None,
//!     })
//!     .unwrap();
//!
//! for finding in &report.findings {
//!     println!("{}: {} (expected {})", finding.severity, finding.target(), finding.expected);
//! }
//! ```

pub mod block;
pub mod config;
pub mod engine;
pub mod error;
pub mod finding;
pub mod model;
pub mod output;
pub mod packages;
pub mod report;
pub mod rules;
pub mod sbd;
pub mod topology;
pub mod xml;

// Re-export main types
pub use block::{parse_block, BlockMap};
pub use config::{CheckerConfig, ChecksConfig, ConfigError, FencingPolicy};
pub use engine::{check, CheckInput, Checker};
pub use error::{
    CheckError, MalformedBlockError, MalformedConfigError, MissingFieldError,
    UnsupportedConfigurationError,
};
pub use finding::{Category, Finding, Severity};
pub use model::{ConfigModel, FencingMechanism, ResourceKind, ResourceNode, Role};
pub use output::{JsonFormatter, OutputFormatter, TextFormatter};
pub use packages::{InstalledPackages, PackageChecker, PackageStatus, Requirement, Version};
pub use report::{Report, ReportBuilder, Summary};
pub use sbd::{parse_sbd, SbdDevice, SbdSlot};
pub use topology::{classify, Classification, Topology};
