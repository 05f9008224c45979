use fwts_report::{Severity, ValidationOutcome, ValidationReport};
use log::{Level, info, log};

/// `log` target used for report lines.
pub const REPORT_TARGET: &str = "fwts::report";

/// The log level and line for one outcome of the check named `name`.
#[must_use]
pub fn render(name: &str, outcome: &ValidationOutcome) -> (Level, String) {
    match outcome {
        ValidationOutcome::Passed => (Level::Info, format!("{name}: PASSED")),
        ValidationOutcome::Failed {
            severity,
            code,
            message,
        } => {
            let level = if *severity >= Severity::High {
                Level::Error
            } else {
                Level::Warn
            };
            (level, format!("{name}: FAILED [{severity}] {code}: {message}"))
        }
        ValidationOutcome::Warning { message } => (Level::Warn, format!("{name}: WARNING {message}")),
        ValidationOutcome::Info { message } => (Level::Info, format!("{name}: {message}")),
    }
}

/// Log every outcome of `report`, then a one-line summary.
pub fn emit_report(name: &str, report: &ValidationReport) {
    for outcome in report {
        let (level, line) = render(name, outcome);
        log!(target: REPORT_TARGET, level, "{line}");
    }

    let s = report.summary();
    info!(
        target: REPORT_TARGET,
        "{name}: {} passed, {} failed, {} warnings, {} info",
        s.passed, s.failed, s.warnings, s.infos
    );
}
