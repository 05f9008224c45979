//! # NFIT: NVDIMM Firmware Interface Table
//!
//! A `u32` reserved field is followed by structures with `u16` type and
//! `u16` length.
//!
//! | Type | Structure                               | Length          |
//! |------|-----------------------------------------|-----------------|
//! | 0    | System Physical Address (SPA) Range     | 56, or 64       |
//! | 1    | NVDIMM Region Mapping                   | 48              |
//! | 2    | Interleave                              | 16 + 4 × lines  |
//! | 3    | SMBIOS Management Information           | >= 8            |
//! | 4    | NVDIMM Control Region                   | >= 32           |
//! | 5    | NVDIMM Block Data Window Region         | 40              |
//! | 6    | Flush Hint Address                      | 16 + 8 × hints  |
//! | 7    | Platform Capabilities                   | 16              |

use crate::common::{Checker, begin, finish};
use bitfield_struct::bitfield;
use fwts_acpi::{
    CursorError, Flow, Guid, RawTable, Signature, SubHeaderLayout, SubRecord, SubstructureWalker,
    TableHeader, validators,
};
use fwts_report::{Severity, ValidationReport};
use log::debug;

/// Offset of the first structure.
const STRUCTURES: usize = TableHeader::SIZE + 4;

pub const VOLATILE_MEMORY: Guid = Guid::from_fields(
    0x7305_944F,
    0xFDDA,
    0x44E3,
    [0xB1, 0x6C, 0x3F, 0x22, 0xD2, 0x52, 0xE5, 0xD0],
);
pub const PERSISTENT_MEMORY: Guid = Guid::from_fields(
    0x66F0_D379,
    0xB4F3,
    0x4074,
    [0xAC, 0x43, 0x0D, 0x33, 0x18, 0xB7, 0x8C, 0xDB],
);
pub const CONTROL_REGION: Guid = Guid::from_fields(
    0x92F7_01F6,
    0x13B4,
    0x405D,
    [0x91, 0x0B, 0x29, 0x93, 0x67, 0xE8, 0x23, 0x4C],
);
pub const BLOCK_DATA_WINDOW: Guid = Guid::from_fields(
    0x91AF_0530,
    0x5D86,
    0x470E,
    [0xA6, 0xB0, 0x0A, 0x2D, 0xB9, 0x40, 0x82, 0x49],
);
pub const VOLATILE_VIRTUAL_DISK: Guid = Guid::from_fields(
    0x77AB_535A,
    0x45FC,
    0x624B,
    [0x55, 0x60, 0xF7, 0xB2, 0x81, 0xD1, 0xF9, 0x6E],
);
pub const VOLATILE_VIRTUAL_CD: Guid = Guid::from_fields(
    0x3D5A_BD30,
    0x4175,
    0x87CE,
    [0x6D, 0x64, 0xD2, 0xAD, 0xE5, 0x23, 0xC4, 0xBB],
);
pub const PERSISTENT_VIRTUAL_DISK: Guid = Guid::from_fields(
    0x5CEA_02C9,
    0x4D07,
    0x69D3,
    [0x26, 0x9F, 0x44, 0x96, 0xFB, 0xE0, 0x96, 0xF9],
);
pub const PERSISTENT_VIRTUAL_CD: Guid = Guid::from_fields(
    0x0801_8188,
    0x42CD,
    0xBB48,
    [0x10, 0x0F, 0x53, 0x87, 0xD5, 0x3D, 0xED, 0x3D],
);

/// Address range type GUIDs accepted in an SPA range structure.
pub const RANGE_TYPES: [Guid; 8] = [
    VOLATILE_MEMORY,
    PERSISTENT_MEMORY,
    CONTROL_REGION,
    BLOCK_DATA_WINDOW,
    VOLATILE_VIRTUAL_DISK,
    VOLATILE_VIRTUAL_CD,
    PERSISTENT_VIRTUAL_DISK,
    PERSISTENT_VIRTUAL_CD,
];

/// SPA range flags.
#[bitfield(u16)]
pub struct RangeFlags {
    /// Control region is for management only.
    pub management_only: bool,
    /// Proximity Domain is valid.
    pub proximity_valid: bool,
    /// SPA Location Cookie is valid.
    pub location_cookie_valid: bool,
    #[bits(13)]
    pub reserved: u16,
}

/// NVDIMM state flags of a region mapping.
#[bitfield(u16)]
pub struct StateFlags {
    pub save_failed: bool,
    pub restore_failed: bool,
    pub flush_failed: bool,
    pub not_armed: bool,
    pub smart_events: bool,
    pub smart_enabled: bool,
    pub map_failed: bool,
    #[bits(9)]
    pub reserved: u16,
}

pub fn check(table: &RawTable<'_>, report: &mut ValidationReport) {
    let mut chk = Checker::new("NFIT", report);
    let Some(ctx) = begin(table, Signature::NFIT, STRUCTURES, &mut chk) else {
        return;
    };

    match ctx.cursor.read_u32(TableHeader::SIZE) {
        Ok(v) => {
            chk.field(
                validators::reserved_zero(v),
                Severity::Medium,
                "ReservedNonZero",
                "Reserved",
            );
        }
        Err(e) => chk.cursor_error(&e),
    }

    let result = SubstructureWalker::new(SubHeaderLayout::TypeU16LengthU16)
        .starting_at(STRUCTURES)
        .walk(&ctx.cursor, |entry| {
            if let Err(e) = check_structure(&entry, &mut chk) {
                chk.cursor_error(&e);
            }
            Flow::Continue
        });

    match result {
        Ok(summary) => debug!("NFIT: {} structures", summary.records),
        Err(e) => chk.walk_error(&e),
    }
    finish(&mut chk);
}

fn length_is(entry: &SubRecord<'_>, expected: usize, chk: &mut Checker<'_>) -> bool {
    chk.field(
        validators::fixed_value(entry.length, expected),
        Severity::High,
        "BadLength",
        "Structure Length",
    )
}

fn length_at_least(entry: &SubRecord<'_>, minimum: usize, chk: &mut Checker<'_>) -> bool {
    chk.field(
        validators::minimum_length(entry.length, minimum),
        Severity::High,
        "BadLength",
        "Structure Length",
    )
}

fn check_structure(entry: &SubRecord<'_>, chk: &mut Checker<'_>) -> Result<(), CursorError> {
    let c = entry.cursor();
    match entry.kind {
        0 => {
            if !chk.field(
                validators::enumerated(entry.length, &[56, 64]),
                Severity::High,
                "BadLength",
                "SPA Range Length",
            ) {
                return Ok(());
            }
            let index = c.read_u16(4)?;
            let flags = RangeFlags::from_bits(c.read_u16(6)?);
            chk.field(
                validators::reserved_zero(flags.reserved()),
                Severity::Medium,
                "ReservedNonZero",
                "SPA Range Flags reserved bits [15:3]",
            );
            chk.field(
                validators::reserved_zero(c.read_u32(8)?),
                Severity::Medium,
                "ReservedNonZero",
                "SPA Range Reserved",
            );

            let range_type = Guid::read(&c, 16)?;
            chk.field(
                validators::guid_in(&range_type, &RANGE_TYPES),
                Severity::Medium,
                "BadRangeTypeGuid",
                "SPA Range Address Range Type GUID",
            );
            if index == 0 && range_type != CONTROL_REGION {
                chk.fail(
                    Severity::High,
                    "BadRangeIndexZero",
                    format_args!("SPA range of type {range_type} has index 0"),
                );
            }
            if flags.location_cookie_valid() && entry.length < 64 {
                chk.fail(
                    Severity::Medium,
                    "BadLength",
                    "SPA Range claims a location cookie but is only 56 bytes",
                );
            }
            if c.read_u64(40)? == 0 {
                chk.warn(format_args!("SPA range {index} has zero length"));
            }
        }
        1 => {
            if !length_is(entry, 48, chk) {
                return Ok(());
            }
            let state = StateFlags::from_bits(c.read_u16(44)?);
            chk.field(
                validators::reserved_zero(state.reserved()),
                Severity::Medium,
                "ReservedNonZero",
                "Region Mapping NVDIMM State Flags reserved bits [15:7]",
            );
            chk.field(
                validators::reserved_zero(c.read_u16(46)?),
                Severity::Medium,
                "ReservedNonZero",
                "Region Mapping Reserved",
            );
            if state.smart_events() {
                chk.info("NVDIMM reported SMART health events");
            }
        }
        2 => {
            if !length_at_least(entry, 16, chk) {
                return Ok(());
            }
            chk.field(
                validators::reserved_zero(c.read_u16(6)?),
                Severity::Medium,
                "ReservedNonZero",
                "Interleave Reserved",
            );
            let lines = usize::try_from(c.read_u32(8)?).unwrap_or(usize::MAX);
            let expected = lines.saturating_mul(4).saturating_add(16);
            length_is(entry, expected, chk);
        }
        3 => {
            if length_at_least(entry, 8, chk) {
                chk.field(
                    validators::reserved_zero(c.read_u32(4)?),
                    Severity::Medium,
                    "ReservedNonZero",
                    "SMBIOS Management Information Reserved",
                );
            }
        }
        4 => {
            length_at_least(entry, 32, chk);
        }
        5 => {
            length_is(entry, 40, chk);
        }
        6 => {
            if !length_at_least(entry, 16, chk) {
                return Ok(());
            }
            let hints = usize::from(c.read_u16(8)?);
            chk.field(
                validators::reserved_bytes(c.read_bytes(10, 6)?),
                Severity::Medium,
                "ReservedNonZero",
                "Flush Hint Reserved",
            );
            length_is(entry, 16 + hints * 8, chk);
        }
        7 => {
            if !length_is(entry, 16, chk) {
                return Ok(());
            }
            chk.field(
                validators::reserved_bytes(c.read_bytes(5, 3)?),
                Severity::Medium,
                "ReservedNonZero",
                "Platform Capabilities Reserved",
            );
            chk.field(
                validators::reserved_bits(c.read_u32(8)?, 3, 31),
                Severity::Medium,
                "ReservedBitsSet",
                "Platform Capabilities",
            );
            chk.field(
                validators::reserved_zero(c.read_u32(12)?),
                Severity::Medium,
                "ReservedNonZero",
                "Platform Capabilities Reserved",
            );
        }
        other => {
            chk.fail(
                Severity::High,
                "BadSubtableType",
                format_args!(
                    "structure at {:#x} has unknown type {other:#x}",
                    entry.offset
                ),
            );
        }
    }
    Ok(())
}
