//! Turning structural errors into report entries.

use crate::{CursorError, WalkerError};
use alloc::format;
use fwts_report::{Severity, ValidationReport};

/// Record a walk that ended on a structural error.
///
/// The failure code is `table` followed by [`WalkerError::code_suffix`], e.g.
/// `APMTStructLengthZero`, graded [`Severity::Critical`]. A dispatcher abort
/// records nothing: the dispatcher already logged its reason.
pub fn report_walk_error(report: &mut ValidationReport, table: &str, err: &WalkerError) {
    if matches!(err, WalkerError::DispatcherAborted { .. }) {
        return;
    }
    report.failed(
        Severity::Critical,
        format!("{table}{}", err.code_suffix()),
        format!("{table} {err}; aborting checks of the remaining sub-structures"),
    );
}

/// Record a field that could not be read.
///
/// Truncated reads are [`Severity::Critical`]; non-ASCII text is
/// [`Severity::Low`].
pub fn report_cursor_error(report: &mut ValidationReport, table: &str, err: &CursorError) {
    let severity = match err {
        CursorError::TruncatedRead { .. } => Severity::Critical,
        CursorError::NonAsciiField { .. } => Severity::Low,
    };
    report.failed(
        severity,
        format!("{table}{}", err.code_suffix()),
        format!("{table} {err}"),
    );
}
