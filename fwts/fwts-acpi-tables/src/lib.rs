//! # Per-table ACPI checks
//!
//! Each supported table gets one check function that validates the header,
//! walks the table's sub-structures with
//! [`SubstructureWalker`](fwts_acpi::SubstructureWalker) and grades every
//! field it understands into a [`ValidationReport`].
//!
//! ## Supported tables
//!
//! | Signature | Table                                          | Feature |
//! |-----------|------------------------------------------------|---------|
//! | `APMT`    | Arm Performance Monitoring Unit                | `apmt`  |
//! | `GTDT`    | Generic Timer Description                      | `gtdt`  |
//! | `iBFT`    | iSCSI Boot Firmware                            | `ibft`  |
//! | `NFIT`    | NVDIMM Firmware Interface                      | `nfit`  |
//! | `PCCT`    | Platform Communications Channel                | `pcct`  |
//! | `VIOT`    | Virtual I/O Translation                        | `viot`  |
//!
//! ## Failure labels
//!
//! Failures carry a stable label of the form `<TABLE><Problem>`, for
//! example `VIOTBadNodeLength` or `PCCTReservedNonZero`. Structural walk
//! errors use the suffixes of [`WalkerError::code_suffix`](fwts_acpi::WalkerError::code_suffix).
//!
//! ## Usage
//!
//! ```rust
//! use fwts_acpi::{RawTable, Signature};
//!
//! let mut bytes = vec![0u8; 48];
//! bytes[0..4].copy_from_slice(b"PCCT");
//! bytes[4..8].copy_from_slice(&48u32.to_le_bytes());
//! bytes[9] = 0u8.wrapping_sub(fwts_acpi::sum(&bytes));
//!
//! let table = RawTable::from_bytes(&bytes, 0, 0).unwrap();
//! let report = fwts_acpi_tables::run(&table).expect("PCCT is supported");
//! assert!(report.all_passed());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

pub mod common;
#[cfg(test)]
mod testutil;

#[cfg(feature = "apmt")]
pub mod apmt;
#[cfg(feature = "gtdt")]
pub mod gtdt;
#[cfg(feature = "ibft")]
pub mod ibft;
#[cfg(feature = "nfit")]
pub mod nfit;
#[cfg(feature = "pcct")]
pub mod pcct;
#[cfg(feature = "viot")]
pub mod viot;

use alloc::vec::Vec;
use fwts_acpi::{RawTable, Signature};
use fwts_report::ValidationReport;
use log::debug;

/// A registered table check.
#[derive(Debug, Clone, Copy)]
pub struct TableCheck {
    pub signature: Signature,
    /// Human-readable table name.
    pub name: &'static str,
    pub run: fn(&RawTable<'_>, &mut ValidationReport),
}

/// Every check compiled into this build.
#[must_use]
pub fn checks() -> Vec<TableCheck> {
    let mut v = Vec::new();
    #[cfg(feature = "apmt")]
    v.push(TableCheck {
        signature: Signature::APMT,
        name: "Arm Performance Monitoring Unit Table",
        run: apmt::check,
    });
    #[cfg(feature = "gtdt")]
    v.push(TableCheck {
        signature: Signature::GTDT,
        name: "Generic Timer Description Table",
        run: gtdt::check,
    });
    #[cfg(feature = "ibft")]
    v.push(TableCheck {
        signature: Signature::IBFT,
        name: "iSCSI Boot Firmware Table",
        run: ibft::check,
    });
    #[cfg(feature = "nfit")]
    v.push(TableCheck {
        signature: Signature::NFIT,
        name: "NVDIMM Firmware Interface Table",
        run: nfit::check,
    });
    #[cfg(feature = "pcct")]
    v.push(TableCheck {
        signature: Signature::PCCT,
        name: "Platform Communications Channel Table",
        run: pcct::check,
    });
    #[cfg(feature = "viot")]
    v.push(TableCheck {
        signature: Signature::VIOT,
        name: "Virtual I/O Translation Table",
        run: viot::check,
    });
    v
}

/// The check registered for `signature`, if any.
#[must_use]
pub fn find(signature: Signature) -> Option<TableCheck> {
    checks().into_iter().find(|c| c.signature == signature)
}

/// Run the matching check over `table`.
///
/// Returns `None` when no check is registered for the table's signature.
#[must_use]
pub fn run(table: &RawTable<'_>) -> Option<ValidationReport> {
    let Some(check) = find(table.signature) else {
        debug!("no check registered for {}", table.signature);
        return None;
    };
    let mut report = ValidationReport::new();
    (check.run)(table, &mut report);
    Some(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_signature_is_registered_once() {
        let all = checks();
        for (i, a) in all.iter().enumerate() {
            assert!(all[i + 1..].iter().all(|b| b.signature != a.signature));
        }
    }

    #[test]
    fn unknown_signature_has_no_check() {
        assert!(find(Signature::new(*b"XXXX")).is_none());

        let mut bytes = [0u8; 36];
        bytes[0..4].copy_from_slice(b"XXXX");
        let table = RawTable::from_bytes(&bytes, 0, 0).unwrap();
        assert!(run(&table).is_none());
    }

    #[cfg(feature = "pcct")]
    #[test]
    fn pcct_is_found() {
        let check = find(Signature::PCCT).unwrap();
        assert_eq!(check.name, "Platform Communications Channel Table");
    }
}
