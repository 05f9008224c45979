//! # APMT: Arm Performance Monitoring Unit Table
//!
//! A run of fixed-size PMU nodes follows the header. Each node starts with
//! its `u16` length, then a flags byte and the node type:
//!
//! ```text
//! 0   Length                      2   always 56
//! 2   Node Flags                  1   bits [7:3] reserved
//! 3   Node Type                   1   0..=4
//! 4   Identifier                  4
//! 8   Node Instance Primary       8
//! 16  Node Instance Secondary     4
//! 20  Base Address 0              8
//! 28  Base Address 1              8
//! 36  Overflow Interrupt GSIV     4
//! 40  Reserved                    4
//! 44  Overflow Interrupt Flags    4   bits [31:1] reserved
//! 48  Processor Affinity          4
//! 52  Implementation ID           4
//! ```

use crate::common::{Checker, begin, finish};
use bitfield_struct::bitfield;
use fwts_acpi::{
    CursorError, Flow, RawTable, Signature, SubHeaderLayout, SubRecord, SubstructureWalker,
    TableHeader, validators,
};
use fwts_report::{Severity, ValidationReport};
use log::debug;

pub const NODE_LENGTH: usize = 56;

/// Highest defined node type (CPU cache).
const NODE_TYPE_MAX: u32 = 4;

/// APMT node flags.
#[bitfield(u8)]
pub struct NodeFlags {
    /// PMU implements the dual-page extension; Base Address 1 is valid.
    pub dual_page: bool,
    /// Processor Affinity names a processor container rather than a processor.
    pub processor_container: bool,
    /// 64-bit single-copy atomic access is supported.
    pub atomic_64bit: bool,
    #[bits(5)]
    pub reserved: u8,
}

pub fn check(table: &RawTable<'_>, report: &mut ValidationReport) {
    let mut chk = Checker::new("APMT", report);
    let Some(ctx) = begin(table, Signature::APMT, TableHeader::SIZE, &mut chk) else {
        return;
    };

    let result = SubstructureWalker::new(SubHeaderLayout::LengthU16TypeU8At3)
        .starting_at(TableHeader::SIZE)
        .walk(&ctx.cursor, |node| {
            if let Err(e) = check_node(&node, &mut chk) {
                chk.cursor_error(&e);
            }
            Flow::Continue
        });

    match result {
        Ok(summary) => debug!("APMT: {} PMU nodes", summary.records),
        Err(e) => chk.walk_error(&e),
    }
    finish(&mut chk);
}

fn check_node(node: &SubRecord<'_>, chk: &mut Checker<'_>) -> Result<(), CursorError> {
    if !chk.field(
        validators::fixed_value(node.length, NODE_LENGTH),
        Severity::High,
        "BadNodeLength",
        "PMU Node Length",
    ) {
        return Ok(());
    }

    let c = node.cursor();
    chk.field(
        validators::in_range(node.kind, 0, NODE_TYPE_MAX),
        Severity::High,
        "InvalidNodeType",
        "PMU Node Type",
    );

    let flags = NodeFlags::from_bits(c.read_u8(2)?);
    chk.field(
        validators::reserved_zero(flags.reserved()),
        Severity::Medium,
        "ReservedNonZero",
        "PMU Node Flags reserved bits [7:3]",
    );

    let base0 = c.read_u64(20)?;
    if base0 == 0 {
        chk.fail(
            Severity::Low,
            "BadBaseAddress",
            format_args!("PMU node {} Base Address 0 is zero", node.index),
        );
    }
    if flags.dual_page() && c.read_u64(28)? == 0 {
        chk.fail(
            Severity::Low,
            "BadBaseAddress",
            format_args!(
                "PMU node {} advertises dual-page support but Base Address 1 is zero",
                node.index
            ),
        );
    }

    chk.field(
        validators::reserved_zero(c.read_u32(40)?),
        Severity::Medium,
        "ReservedNonZero",
        "PMU Node Reserved",
    );
    chk.field(
        validators::reserved_bits(c.read_u32(44)?, 1, 31),
        Severity::Medium,
        "ReservedBitsSet",
        "PMU Node Overflow Interrupt Flags",
    );
    Ok(())
}
