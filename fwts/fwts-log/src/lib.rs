//! Logging for the table-check driver.
//!
//! [`ConsoleLogger`] is the `log` backend: one `[LEVEL] target: message` line
//! per record on stderr. [`emit_report`] forwards a finished
//! [`ValidationReport`](fwts_report::ValidationReport) through the `log`
//! macros, so check results and diagnostics share one stream and one filter.

mod console;
mod emit;

pub use console::ConsoleLogger;
pub use emit::{REPORT_TARGET, emit_report, render};
