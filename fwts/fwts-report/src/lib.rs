//! # Validation Reports
//!
//! Every firmware table check produces a sequence of outcomes: individual
//! fields that failed a constraint, informational notes, warnings about
//! suspicious-but-legal values, and a final verdict. This crate holds those
//! outcomes as plain data so the checks themselves never talk to a logger.
//!
//! ## Key Components
//!
//! ### Severity ([`Severity`])
//! Ordered failure grades mirroring the suite's log levels:
//! `Low < Medium < High < Critical`.
//!
//! ### Outcomes ([`ValidationOutcome`])
//! One result of one check: `Passed`, `Failed { severity, code, message }`,
//! `Warning { message }` or `Info { message }`. Failure codes are short,
//! stable identifiers such as `NFITBadRangeIndexZero` so tooling can match on
//! them across runs.
//!
//! ### Reports ([`ValidationReport`])
//! An insertion-ordered sink owned by whoever invokes a check. The report does
//! no I/O; rendering belongs to the caller.
//!
//! ## Usage
//!
//! ```rust
//! use fwts_report::{Severity, ValidationOutcome, ValidationReport};
//!
//! let mut report = ValidationReport::new();
//! report.info("APMT has 2 nodes");
//! report.failed(Severity::High, "APMTBadNodeType", "APMT node 1 has invalid type 0x07");
//!
//! assert!(!report.all_passed());
//! assert_eq!(report.summary().failed, 1);
//! assert!(matches!(report.iter().next(), Some(ValidationOutcome::Info { .. })));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod outcome;
mod report;
mod severity;

pub use outcome::ValidationOutcome;
pub use report::{Summary, ValidationReport};
pub use severity::{ParseSeverityError, Severity};
