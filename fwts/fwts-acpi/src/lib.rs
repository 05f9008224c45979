//! # ACPI Table Walking and Validation
//!
//! This crate is the reusable engine behind the firmware test suite's ACPI
//! table checks. Firmware hands the OS a set of self-describing binary tables;
//! many of them carry a fixed part followed by a run of variable-length
//! sub-structures. Every table check needs to walk such a run without trusting
//! a single length or offset the firmware supplied.
//!
//! ## Architecture
//!
//! ```text
//! table loader (bytes from firmware / sysfs)
//!     ↓
//! RawTable ──► BinaryCursor ──► TableHeader
//!                  ↓
//!          SubstructureWalker ──► SubRecord (bounded view) ──► table-specific match
//!                                                                   ↓
//!                                                           validators::* ──► ValidationReport
//! ```
//!
//! ## Key Components
//!
//! ### Bounds-checked reads ([`BinaryCursor`])
//! * **Typed reads**: little-endian `u8`/`u16`/`u32`/`u64`, byte slices, arrays, ASCII text
//! * **Absolute offsets**: fields are often located through other fields
//! * **No panics**: every out-of-range read is a [`CursorError::TruncatedRead`]
//!
//! ### Table header ([`TableHeader`])
//! The common 36-byte header, decoded once.
//!
//! ### Sub-structure walking ([`SubstructureWalker`])
//! * **Layouts**: type/length field positions per table family ([`SubHeaderLayout`])
//! * **Zero-length detection**: a record of length zero always ends the walk
//! * **Range detection**: a record extending past the table always ends the walk
//! * **Explicit stepping**: [`AdvanceBy`] states how the walk advances
//!
//! ### Field validation ([`validators`])
//! Pure predicates returning [`ValidationOutcome`](fwts_report::ValidationOutcome)s;
//! the caller decides severity and failure label.
//!
//! ## Usage
//!
//! ```rust
//! use fwts_acpi::{BinaryCursor, Flow, SubHeaderLayout, SubstructureWalker, TableHeader};
//!
//! let mut bytes = vec![0u8; 44];
//! bytes[0..4].copy_from_slice(b"TEST");
//! bytes[4..8].copy_from_slice(&44u32.to_le_bytes());
//! bytes[36] = 1; // type
//! bytes[37] = 8; // length
//!
//! let cursor = BinaryCursor::new(&bytes);
//! let header = TableHeader::parse(&cursor).unwrap();
//! assert_eq!(header.length, 44);
//!
//! let summary = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8)
//!     .starting_at(TableHeader::SIZE)
//!     .walk(&cursor, |record| {
//!         assert_eq!(record.kind, 1);
//!         Flow::Continue
//!     })
//!     .unwrap();
//! assert_eq!(summary.records, 1);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

extern crate alloc;

mod cursor;
mod diag;
mod gas;
mod guid;
mod header;
mod signature;
mod table;
pub mod validators;
mod walker;

pub use cursor::{BinaryCursor, CursorError, FieldWidth};
pub use diag::{report_cursor_error, report_walk_error};
pub use gas::{AddressSpaceId, Gas};
pub use guid::Guid;
pub use header::TableHeader;
pub use signature::Signature;
pub use table::RawTable;
pub use walker::{
    AdvanceBy, Flow, SubHeaderLayout, SubRecord, SubRecords, SubstructureWalker, WalkSummary,
    WalkerError,
};

/// 8-bit wrapping sum; a valid ACPI table sums to zero.
#[must_use]
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |a, &b| a.wrapping_add(b))
}
