//! cluster-checker CLI
//!
//! Reads files already extracted from a diagnostic bundle and prints the
//! conformance report.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use cluster_checker::{
    packages, CheckError, CheckInput, Checker, CheckerConfig, FencingPolicy, InstalledPackages,
    JsonFormatter, OutputFormatter, Severity, TextFormatter,
};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "cluster-checker")]
#[command(about = "Check a Pacemaker/corosync cluster configuration against the documented baseline")]
#[command(version)]
struct Cli {
    /// corosync.conf, or any text dump containing its totem and quorum sections
    #[arg(long)]
    corosync: PathBuf,

    /// CIB XML (cibadmin -Q output, possibly truncated)
    #[arg(long)]
    cib: PathBuf,

    /// Installed package listing (name first column, version last)
    #[arg(long)]
    packages: Option<PathBuf>,

    /// Hosts file, checked for every cluster node name
    #[arg(long)]
    hosts: Option<PathBuf>,

    /// Output of `sbd -d <dev> dump` and `sbd -d <dev> list`
    #[arg(long)]
    sbd: Option<PathBuf>,

    /// OS version id, e.g. 15-SP4
    #[arg(long, default_value = "15")]
    os_version: String,

    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Minimum severity to report
    #[arg(long, value_enum)]
    min_severity: Option<MinSeverity>,

    /// Record stonith-enabled=false as a finding instead of stopping
    #[arg(long)]
    report_disabled_fencing: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum MinSeverity {
    Info,
    Warning,
    Unsupported,
}

impl From<MinSeverity> for Severity {
    fn from(arg: MinSeverity) -> Self {
        match arg {
            MinSeverity::Info => Severity::Info,
            MinSeverity::Warning => Severity::Warning,
            MinSeverity::Unsupported => Severity::Unsupported,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<u8> {
    let mut config = match &cli.config {
        Some(path) => CheckerConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => CheckerConfig::default(),
    };
    if let Some(min) = cli.min_severity {
        config.min_severity = min.into();
    }
    if cli.report_disabled_fencing {
        config.fencing_policy = FencingPolicy::Report;
    }

    let corosync = read(&cli.corosync)?;
    let cib = read(&cli.cib)?;
    let installed = match &cli.packages {
        Some(path) => packages::parse_listing(&read(path)?),
        None => {
            if config.checks.packages {
                log::warn!("no package listing given, skipping package checks");
            }
            config.checks.packages = false;
            InstalledPackages::new()
        }
    };

    let hosts = cli.hosts.as_deref().map(read).transpose()?;
    let sbd = cli.sbd.as_deref().map(read).transpose()?;

    let input = CheckInput {
        corosync: &corosync,
        cib_xml: &cib,
        os_version: &cli.os_version,
        packages: &installed,
        hosts: hosts.as_deref(),
        sbd: sbd.as_deref(),
    };

    let report = match Checker::new(config).check(&input) {
        Ok(report) => report,
        Err(CheckError::UnsupportedConfiguration(e)) => {
            eprintln!("{}: {}", "Unsupported".red().bold(), e);
            eprintln!("Re-run with --report-disabled-fencing to check the rest of the configuration.");
            return Ok(2);
        }
        Err(e) => return Err(e.into()),
    };

    let output = match cli.format {
        Format::Text => {
            let formatter = TextFormatter::new();
            if cli.no_color {
                formatter.without_color().format(&report)
            } else {
                formatter.format(&report)
            }
        }
        Format::Json => JsonFormatter::new().pretty().format(&report),
    };
    println!("{}", output);

    Ok(report.exit_code() as u8)
}

fn read(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}
