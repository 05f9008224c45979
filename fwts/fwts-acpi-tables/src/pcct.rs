//! # PCCT: Platform Communications Channel Table
//!
//! A 12-byte fixed part (`u32` flags, `u64` reserved) is followed by
//! subspace structures with a one-byte type and one-byte length.
//!
//! | Type | Subspace                                   | Length |
//! |------|--------------------------------------------|--------|
//! | 0    | Generic communications                     | 62     |
//! | 1    | HW-reduced communications                  | 62     |
//! | 2    | HW-reduced communications, type 2          | 90     |
//! | 3    | Extended PCC master                        | 164    |
//! | 4    | Extended PCC slave                         | 164    |
//! | 5    | HW registers based                         | 96     |

use crate::common::{Checker, begin, finish};
use bitfield_struct::bitfield;
use fwts_acpi::{
    AddressSpaceId, BinaryCursor, CursorError, Flow, Gas, RawTable, Signature, SubHeaderLayout,
    SubRecord, SubstructureWalker, TableHeader, validators,
};
use fwts_report::{Severity, ValidationReport};
use log::{debug, trace};

/// Offset of the first subspace.
const SUBSPACES: usize = TableHeader::SIZE + 12;

/// A table may describe at most 256 subspaces.
const MAX_SUBSPACES: usize = 256;

/// Table-level flags.
#[bitfield(u32)]
pub struct PcctFlags {
    /// Platform interrupt (SCI doorbell) is used for command completion.
    pub platform_interrupt: bool,
    #[bits(31)]
    pub reserved: u32,
}

/// Platform interrupt flags of subspace types 1 to 4.
#[bitfield(u8)]
pub struct InterruptFlags {
    /// Active-low polarity.
    pub polarity: bool,
    /// Edge-triggered.
    pub mode: bool,
    #[bits(6)]
    pub reserved: u8,
}

/// Expected length of a subspace of type `kind`.
#[must_use]
pub const fn subspace_length(kind: u32) -> Option<usize> {
    match kind {
        0 | 1 => Some(62),
        2 => Some(90),
        3 | 4 => Some(164),
        5 => Some(96),
        _ => None,
    }
}

const DOORBELL_SPACES: [u8; 2] = [
    AddressSpaceId::SystemMemory.id(),
    AddressSpaceId::SystemIo.id(),
];

pub fn check(table: &RawTable<'_>, report: &mut ValidationReport) {
    let mut chk = Checker::new("PCCT", report);
    let Some(ctx) = begin(table, Signature::PCCT, SUBSPACES, &mut chk) else {
        return;
    };

    if let Err(e) = check_fixed(&ctx.cursor, &mut chk) {
        chk.cursor_error(&e);
    }

    let result = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8)
        .starting_at(SUBSPACES)
        .walk(&ctx.cursor, |subspace| {
            if let Err(e) = check_subspace(&subspace, &mut chk) {
                chk.cursor_error(&e);
            }
            Flow::Continue
        });

    match result {
        Ok(summary) => {
            debug!("PCCT: {} subspaces", summary.records);
            if summary.records > MAX_SUBSPACES {
                chk.fail(
                    Severity::Low,
                    "TooManySubspaces",
                    format_args!(
                        "has {} subspaces, at most {MAX_SUBSPACES} are allowed",
                        summary.records
                    ),
                );
            }
        }
        Err(e) => chk.walk_error(&e),
    }
    finish(&mut chk);
}

fn check_fixed(c: &BinaryCursor<'_>, chk: &mut Checker<'_>) -> Result<(), CursorError> {
    let flags = PcctFlags::from_bits(c.read_u32(36)?);
    trace!("PCCT flags {flags:?}");
    chk.field(
        validators::reserved_zero(flags.reserved()),
        Severity::Medium,
        "ReservedNonZero",
        "Flags reserved bits [31:1]",
    );
    chk.field(
        validators::reserved_zero(c.read_u64(40)?),
        Severity::Medium,
        "ReservedNonZero",
        "Reserved",
    );
    Ok(())
}

fn check_subspace(sub: &SubRecord<'_>, chk: &mut Checker<'_>) -> Result<(), CursorError> {
    let Some(expected) = subspace_length(sub.kind) else {
        chk.fail(
            Severity::High,
            "BadSubspaceType",
            format_args!(
                "subspace {} at offset {:#x} has unknown type {:#x}",
                sub.index, sub.offset, sub.kind
            ),
        );
        return Ok(());
    };
    if !chk.field(
        validators::fixed_value(sub.length, expected),
        Severity::High,
        "BadSubspaceLength",
        "Subspace Length",
    ) {
        return Ok(());
    }

    let c = sub.cursor();
    match sub.kind {
        0 => {
            chk.field(
                validators::reserved_bytes(c.read_bytes(2, 6)?),
                Severity::Medium,
                "ReservedNonZero",
                "Generic Subspace Reserved",
            );
        }
        1..=4 => {
            let flags = InterruptFlags::from_bits(c.read_u8(6)?);
            chk.field(
                validators::reserved_zero(flags.reserved()),
                Severity::Medium,
                "ReservedNonZero",
                "Subspace Platform Interrupt Flags reserved bits [7:2]",
            );
            chk.field(
                validators::reserved_zero(c.read_u8(7)?),
                Severity::Medium,
                "ReservedNonZero",
                "Subspace Reserved",
            );
        }
        _ => {}
    }

    if sub.kind <= 2 {
        check_register(&Gas::read(&c, 24)?, chk, "Doorbell Register");
    }
    if sub.kind == 2 {
        check_register(&Gas::read(&c, 62)?, chk, "Platform Interrupt Ack Register");
    }
    Ok(())
}

fn check_register(gas: &Gas, chk: &mut Checker<'_>, name: &str) {
    chk.field(
        validators::address_space_id(gas.address_space_id, &DOORBELL_SPACES),
        Severity::High,
        "BadAddressSpaceId",
        name,
    );
    chk.field(
        gas.check_access_size(),
        Severity::Medium,
        "BadAccessSize",
        name,
    );
}
