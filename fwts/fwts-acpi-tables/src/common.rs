//! Checks shared by every table, and the per-table failure-label helper.

use alloc::format;
use fwts_acpi::{
    BinaryCursor, CursorError, RawTable, Signature, TableHeader, WalkerError, report_cursor_error,
    report_walk_error, validators,
};
use fwts_report::{Severity, ValidationOutcome, ValidationReport};
use log::{debug, info};

/// A table whose header has been checked and can be walked.
#[derive(Debug, Clone)]
pub struct TableContext<'a> {
    pub header: TableHeader,
    /// Limited to `min(declared length, loaded bytes)`.
    pub cursor: BinaryCursor<'a>,
}

/// Records outcomes under one table's label prefix.
///
/// `chk.field(outcome, Severity::High, "ReservedNonZero", "Node Reserved")` on
/// the APMT records code `APMTReservedNonZero` with message
/// `APMT Node Reserved: ...`.
pub struct Checker<'r> {
    table: &'static str,
    report: &'r mut ValidationReport,
}

impl<'r> Checker<'r> {
    pub const fn new(table: &'static str, report: &'r mut ValidationReport) -> Self {
        Self { table, report }
    }

    #[must_use]
    pub const fn table(&self) -> &'static str {
        self.table
    }

    /// Grade and record a validator outcome; returns whether it passed.
    pub fn field(
        &mut self,
        outcome: ValidationOutcome,
        severity: Severity,
        code: &str,
        field: &str,
    ) -> bool {
        let table = self.table;
        self.report.check(
            outcome
                .graded(severity, format!("{table}{code}"))
                .named(&format!("{table} {field}")),
        )
    }

    pub fn fail(&mut self, severity: Severity, code: &str, message: impl core::fmt::Display) {
        let table = self.table;
        self.report
            .failed(severity, format!("{table}{code}"), format!("{table} {message}"));
    }

    pub fn warn(&mut self, message: impl core::fmt::Display) {
        self.report.warning(format!("{} {message}", self.table));
    }

    pub fn info(&mut self, message: impl core::fmt::Display) {
        self.report.info(format!("{} {message}", self.table));
    }

    pub fn cursor_error(&mut self, err: &CursorError) {
        report_cursor_error(self.report, self.table, err);
    }

    pub fn walk_error(&mut self, err: &WalkerError) {
        report_walk_error(self.report, self.table, err);
    }

    pub fn report(&mut self) -> &mut ValidationReport {
        self.report
    }
}

/// Validate the header and length of `table`.
///
/// Returns `None` when the table is too broken to look at any further; the
/// reason has been recorded.
pub fn begin<'a>(
    table: &RawTable<'a>,
    signature: Signature,
    min_length: usize,
    chk: &mut Checker<'_>,
) -> Option<TableContext<'a>> {
    let cursor = table.cursor();
    let header = match TableHeader::parse(&cursor) {
        Ok(h) => h,
        Err(e) => {
            chk.fail(
                Severity::High,
                "TooShort",
                format_args!("table is too short to hold a header: {e}"),
            );
            return None;
        }
    };

    info!(
        "{} table: revision {}, {} bytes, OEM '{}' '{}'",
        chk.table(),
        header.revision,
        header.length,
        header.oem_id_str(),
        header.oem_table_id_str()
    );

    if header.signature != signature {
        chk.fail(
            Severity::High,
            "BadSignature",
            format_args!("table signature is '{}', expected '{signature}'", header.signature),
        );
        return None;
    }

    let available = cursor.limit();
    if header.declared_length() < min_length || available < min_length {
        chk.fail(
            Severity::High,
            "TooShort",
            format_args!(
                "table too short, expecting at least {min_length} bytes, declared {} with {available} loaded",
                header.length
            ),
        );
        return None;
    }

    if table.length_matches_data() {
        chk.field(
            validators::checksum(cursor.as_bytes()),
            Severity::Medium,
            "BadChecksum",
            "Checksum",
        );
    } else {
        chk.warn(format_args!(
            "declared length {} differs from the {} bytes loaded; checking the first {available}",
            header.length,
            table.data.len()
        ));
    }

    debug!("{} header ok, {available} bytes to check", chk.table());
    Some(TableContext { header, cursor })
}

/// Record the final verdict for a table.
pub fn finish(chk: &mut Checker<'_>) {
    if chk.report().all_passed() {
        let table = chk.table();
        chk.report().passed();
        chk.report()
            .info(format!("No issues found in {table} table."));
    }
}
