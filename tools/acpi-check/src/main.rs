use clap::Parser;
use fwts_acpi::{RawTable, Signature};
use fwts_log::{ConsoleLogger, emit_report};
use fwts_report::{Severity, Summary, ValidationReport};
use log::{LevelFilter, debug, error, info, warn};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

/// Run the ACPI table checks over raw table dumps.
#[derive(Debug, Parser)]
#[command(name = "acpi-check", version)]
struct Cli {
    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, env = "FWTS_LOG", default_value = "info", value_parser = parse_level)]
    log_level: LevelFilter,

    /// Check only tables with this signature; may be repeated.
    #[arg(long, value_name = "SIG", value_parser = parse_signature)]
    only: Vec<Signature>,

    /// Exit non-zero on failures of this severity or worse.
    #[arg(long, value_name = "SEVERITY", default_value_t = Severity::Low)]
    fail_on: Severity,

    /// Raw table dumps, e.g. /sys/firmware/acpi/tables/APIC.
    #[arg(required = true, value_name = "TABLE")]
    files: Vec<PathBuf>,
}

fn parse_level(s: &str) -> Result<LevelFilter, String> {
    s.trim().parse().map_err(|_| format!("unknown log level '{s}'"))
}

fn parse_signature(s: &str) -> Result<Signature, String> {
    Signature::from_text(s).ok_or_else(|| format!("'{s}' is not a four-character signature"))
}

/// Check one table dump; returns `None` if it was skipped.
fn check_file(
    path: &Path,
    bytes: &[u8],
    only: &[Signature],
    instances: &mut HashMap<Signature, u32>,
) -> Option<(String, ValidationReport)> {
    let table = match RawTable::from_bytes(bytes, 0, 0) {
        Ok(t) => t,
        Err(e) => {
            let mut report = ValidationReport::new();
            report.failed(
                Severity::Critical,
                "TableTruncated",
                format!("{} is too short to be an ACPI table: {e}", path.display()),
            );
            return Some((path.display().to_string(), report));
        }
    };

    if !only.is_empty() && !only.contains(&table.signature) {
        debug!("{}: {} not selected", path.display(), table.signature);
        return None;
    }

    let instance = instances.entry(table.signature).or_insert(0);
    let table = RawTable {
        instance: *instance,
        ..table
    };
    *instance += 1;

    let name = if table.instance == 0 {
        table.signature.to_string()
    } else {
        format!("{}#{}", table.signature, table.instance)
    };

    if let Some(report) = fwts_acpi_tables::run(&table) {
        Some((name, report))
    } else {
        warn!(
            "{}: no check for {} tables, skipped",
            path.display(),
            table.signature
        );
        None
    }
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    ConsoleLogger::new(cli.log_level)
        .init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    let mut instances = HashMap::new();
    let mut total = Summary::default();
    let mut checked = 0usize;
    for path in &cli.files {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) => {
                error!("{}: {e}", path.display());
                total.failed += 1;
                total.by_severity[Severity::Critical.index()] += 1;
                continue;
            }
        };

        if let Some((name, report)) = check_file(path, &bytes, &cli.only, &mut instances) {
            emit_report(&name, &report);
            total.merge(&report.summary());
            checked += 1;
        }
    }

    info!(
        "{checked} tables checked: {} passed, {} failed, {} warnings",
        total.passed, total.failed, total.warnings
    );

    let failing = total.failed_at_least(cli.fail_on);
    if failing > 0 {
        error!("{failing} failures at {} or above", cli.fail_on);
        log::logger().flush();
        process::exit(1);
    }
    Ok(())
}
