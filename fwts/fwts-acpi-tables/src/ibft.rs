//! # iBFT: iSCSI Boot Firmware Table
//!
//! Unlike most tables the iBFT is not a walkable run of sub-structures. A
//! control structure at offset 48 holds `u16` table offsets of the
//! initiator, NIC and target structures; each of those is reached directly.
//! All structures share a six-byte header:
//!
//! ```text
//! 0  Structure ID     1
//! 1  Version          1
//! 2  Length           2
//! 4  Index            1
//! 5  Flags            1
//! ```
//!
//! Strings (names, CHAP secrets) are stored elsewhere in the table and
//! referenced by `u16` length and offset pairs.

use crate::common::{Checker, begin, finish};
use fwts_acpi::{
    BinaryCursor, CursorError, FieldWidth, RawTable, Signature, SubHeaderLayout, SubRecord,
    SubstructureWalker, TableHeader, validators,
};
use fwts_report::{Severity, ValidationReport};
use log::{debug, trace};

/// Offset of the control structure.
pub const CONTROL_OFFSET: usize = TableHeader::SIZE + 12;

const CONTROL_ID: u32 = 1;
const CONTROL_MIN_LENGTH: usize = 18;
/// Offset of the first structure pointer inside the control structure.
const CONTROL_SLOTS: usize = 8;

/// Structure ID at 0, `u16` length at 2.
pub const HEADER: SubHeaderLayout = SubHeaderLayout::Custom {
    type_offset: 0,
    type_width: FieldWidth::U8,
    length_offset: 2,
    length_width: FieldWidth::U16,
};

/// A structure referenced from the control structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Slot {
    Initiator,
    Nic(u8),
    Target(u8),
}

/// Pointer order inside the control structure.
const SLOTS: [Slot; 5] = [
    Slot::Initiator,
    Slot::Nic(0),
    Slot::Target(0),
    Slot::Nic(1),
    Slot::Target(1),
];

impl Slot {
    #[must_use]
    pub const fn id(self) -> u32 {
        match self {
            Self::Initiator => 2,
            Self::Nic(_) => 3,
            Self::Target(_) => 4,
        }
    }

    #[must_use]
    pub const fn length(self) -> usize {
        match self {
            Self::Initiator => 74,
            Self::Nic(_) => 102,
            Self::Target(_) => 54,
        }
    }

    /// Highest defined flag bit.
    const fn last_flag(self) -> u32 {
        match self {
            Self::Initiator => 1,
            Self::Nic(_) => 2,
            Self::Target(_) => 3,
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Initiator => "Initiator",
            Self::Nic(_) => "NIC",
            Self::Target(_) => "Target",
        }
    }
}

pub fn check(table: &RawTable<'_>, report: &mut ValidationReport) {
    let mut chk = Checker::new("iBFT", report);
    let Some(ctx) = begin(table, Signature::IBFT, CONTROL_OFFSET, &mut chk) else {
        return;
    };

    if let Err(e) = check_structures(&ctx.cursor, &mut chk) {
        chk.cursor_error(&e);
    }
    finish(&mut chk);
}

fn check_structures(c: &BinaryCursor<'_>, chk: &mut Checker<'_>) -> Result<(), CursorError> {
    chk.field(
        validators::reserved_bytes(c.read_bytes(TableHeader::SIZE, 12)?),
        Severity::Medium,
        "ReservedNonZero",
        "Reserved",
    );

    let walker = SubstructureWalker::new(HEADER);
    let control = match walker.record_at(c, CONTROL_OFFSET) {
        Ok(r) => r,
        Err(e) => {
            chk.walk_error(&e);
            return Ok(());
        }
    };
    if !check_control(&control, chk)? {
        return Ok(());
    }

    let mut slots = control.cursor();
    slots.seek(CONTROL_SLOTS)?;
    for slot in SLOTS {
        if slots.remaining() < 2 {
            break;
        }
        let offset = usize::from(slots.read_u16(slots.position())?);
        slots.advance(2)?;
        if offset == 0 {
            trace!("iBFT {slot:?} not present");
            continue;
        }

        if offset % 8 != 0 {
            chk.fail(
                Severity::Low,
                "UnalignedStructure",
                format_args!("{} structure offset {offset:#x} is not 8-byte aligned", slot.name()),
            );
        }
        match walker.record_at(c, offset) {
            Ok(record) => check_slot(slot, &record, c, chk)?,
            Err(e) => chk.walk_error(&e),
        }
    }
    Ok(())
}

/// Returns whether the control structure is sound enough to follow its pointers.
fn check_control(control: &SubRecord<'_>, chk: &mut Checker<'_>) -> Result<bool, CursorError> {
    let rc = control.cursor();
    let id_ok = chk.field(
        validators::fixed_value(control.kind, CONTROL_ID),
        Severity::High,
        "BadControlId",
        "Control Structure ID",
    );
    let len_ok = chk.field(
        validators::minimum_length(control.length, CONTROL_MIN_LENGTH),
        Severity::High,
        "BadControlLength",
        "Control Structure Length",
    );
    chk.field(
        validators::fixed_value(rc.read_u8(1)?, 1),
        Severity::Medium,
        "BadControlVersion",
        "Control Structure Version",
    );
    chk.field(
        validators::fixed_value(rc.read_u8(4)?, 0),
        Severity::Medium,
        "BadControlIndex",
        "Control Structure Index",
    );
    chk.field(
        validators::reserved_bits(rc.read_u8(5)?, 1, 7),
        Severity::Medium,
        "ReservedBitsSet",
        "Control Structure Flags",
    );
    debug!("iBFT control structure: {} bytes", control.length);
    Ok(id_ok && len_ok)
}

fn check_slot(
    slot: Slot,
    record: &SubRecord<'_>,
    table: &BinaryCursor<'_>,
    chk: &mut Checker<'_>,
) -> Result<(), CursorError> {
    let name = slot.name();
    if !chk.field(
        validators::fixed_value(record.kind, slot.id()),
        Severity::High,
        "BadStructureId",
        name,
    ) {
        return Ok(());
    }
    if !chk.field(
        validators::fixed_value(record.length, slot.length()),
        Severity::High,
        "BadStructureLength",
        name,
    ) {
        return Ok(());
    }

    let rc = record.cursor();
    chk.field(
        validators::fixed_value(rc.read_u8(1)?, 1),
        Severity::Medium,
        "BadStructureVersion",
        name,
    );
    if let Slot::Nic(index) | Slot::Target(index) = slot {
        chk.field(
            validators::fixed_value(rc.read_u8(4)?, index),
            Severity::Medium,
            "BadStructureIndex",
            name,
        );
    }
    chk.field(
        validators::reserved_bits(rc.read_u8(5)?, slot.last_flag() + 1, 7),
        Severity::Medium,
        "ReservedBitsSet",
        name,
    );

    match slot {
        Slot::Initiator => {
            check_string(table, &rc, 70, "Initiator Name", chk)?;
        }
        Slot::Nic(_) => {
            chk.field(
                validators::in_range(rc.read_u8(22)?, 0, 128),
                Severity::Medium,
                "BadSubnetPrefix",
                "NIC Subnet Mask Prefix",
            );
            check_string(table, &rc, 98, "NIC Host Name", chk)?;
        }
        Slot::Target(_) => {
            chk.field(
                validators::in_range(rc.read_u8(32)?, 0, 2),
                Severity::Medium,
                "BadChapType",
                "Target CHAP Type",
            );
            chk.field(
                validators::in_range(rc.read_u8(33)?, 0, 1),
                Severity::Medium,
                "BadNicAssociation",
                "Target NIC Association",
            );
            check_string(table, &rc, 34, "Target Name", chk)?;
            check_string(table, &rc, 38, "Target CHAP Name", chk)?;
            check_string(table, &rc, 42, "Target CHAP Secret", chk)?;
            check_string(table, &rc, 46, "Target Reverse CHAP Name", chk)?;
            check_string(table, &rc, 50, "Target Reverse CHAP Secret", chk)?;
        }
    }
    Ok(())
}

/// Check a string referenced by the `u16` length/offset pair at `at` in `rc`.
fn check_string(
    table: &BinaryCursor<'_>,
    rc: &BinaryCursor<'_>,
    at: usize,
    name: &str,
    chk: &mut Checker<'_>,
) -> Result<(), CursorError> {
    let len = usize::from(rc.read_u16(at)?);
    let offset = usize::from(rc.read_u16(at + 2)?);
    if len == 0 {
        return Ok(());
    }

    match table.read_fixed_str(offset, len) {
        Ok(s) => trace!("iBFT {name}: {s:?}"),
        Err(CursorError::TruncatedRead { .. }) => chk.fail(
            Severity::High,
            "BadStringOffset",
            format_args!("{name} ({len} bytes at {offset:#x}) lies outside the table"),
        ),
        Err(CursorError::NonAsciiField { .. }) => chk.fail(
            Severity::Low,
            "NonAsciiString",
            format_args!("{name} at {offset:#x} contains non-ASCII bytes"),
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{TableBuilder, patch, table};

    const INITIATOR_AT: u16 = 72;
    const NIC_AT: u16 = 152;
    const TARGET_AT: u16 = 256;
    const STRINGS_AT: u16 = 312;
    const NAME: &[u8] = b"iqn.2026-10.org.example:host";

    fn header(b: TableBuilder, id: u8, length: u16, index: u8, flags: u8) -> TableBuilder {
        b.u8(id).u8(1).u16(length).u8(index).u8(flags)
    }

    /// Control, initiator, one NIC and one target, followed by the initiator name.
    fn ibft() -> TableBuilder {
        let name_len = u16::try_from(NAME.len()).unwrap();
        let b = TableBuilder::new(*b"iBFT", 1).zeros(12);
        // control at 48, padded to 72
        let b = header(b, 1, 18, 0, 0)
            .u16(0)
            .u16(INITIATOR_AT)
            .u16(NIC_AT)
            .u16(TARGET_AT)
            .u16(0)
            .u16(0)
            .zeros(6);
        // initiator at 72, padded to 152
        let b = header(b, 2, 74, 0, 0b11)
            .zeros(64)
            .u16(name_len)
            .u16(STRINGS_AT)
            .zeros(6);
        // NIC at 152, padded to 256
        let b = header(b, 3, 102, 0, 0b11)
            .zeros(16)
            .u8(24)
            .u8(0)
            .zeros(64)
            .u16(0)
            .bytes(&[0x52, 0x54, 0x00, 0x12, 0x34, 0x56])
            .u16(0x0018)
            .u16(0)
            .u16(0)
            .zeros(2);
        // target at 256, 56 bytes to 312
        let b = header(b, 4, 54, 0, 0b11)
            .zeros(16)
            .u16(3260)
            .zeros(8)
            .u8(0)
            .u8(0)
            .u16(name_len)
            .u16(STRINGS_AT)
            .zeros(16)
            .zeros(2);
        b.bytes(NAME)
    }

    fn run(bytes: &[u8]) -> ValidationReport {
        let mut report = ValidationReport::new();
        check(&table(bytes), &mut report);
        report
    }

    #[test]
    fn clean_table_passes() {
        let report = run(&ibft().build());
        assert!(report.all_passed(), "{report:?}");
    }

    #[test]
    fn wrong_structure_behind_pointer() {
        let mut bytes = ibft().build();
        // NIC pointer now leads to the target structure.
        patch(&mut bytes, 48 + 10, &TARGET_AT.to_le_bytes());
        assert!(run(&bytes).has_failure("iBFTBadStructureId"));
    }

    #[test]
    fn unaligned_pointer() {
        let mut bytes = ibft().build();
        patch(&mut bytes, 48 + 8, &(INITIATOR_AT + 2).to_le_bytes());
        let report = run(&bytes);
        assert!(report.has_failure("iBFTUnalignedStructure"));
    }

    #[test]
    fn pointer_past_the_table() {
        let mut bytes = ibft().build();
        patch(&mut bytes, 48 + 12, &0x4000u16.to_le_bytes());
        assert!(run(&bytes).has_failure("iBFTTruncatedSubtable"));
    }

    #[test]
    fn bad_control_structure_stops_early() {
        let mut bytes = ibft().build();
        patch(&mut bytes, 48, &[9]);
        let report = run(&bytes);
        assert!(report.has_failure("iBFTBadControlId"));
        assert_eq!(report.summary().failed, 1);
    }

    #[test]
    fn target_name_outside_the_table() {
        let mut bytes = ibft().build();
        patch(&mut bytes, usize::from(TARGET_AT) + 36, &0x0FF0u16.to_le_bytes());
        assert!(run(&bytes).has_failure("iBFTBadStringOffset"));
    }

    #[test]
    fn non_ascii_initiator_name() {
        let mut bytes = ibft().build();
        patch(&mut bytes, usize::from(STRINGS_AT) + 3, &[0xE9]);
        assert!(run(&bytes).has_failure("iBFTNonAsciiString"));
    }

    #[test]
    fn structure_index_is_the_byte_after_length() {
        let mut bytes = ibft().build();
        // Offset 3 is the high byte of Length; Index sits at 4.
        patch(&mut bytes, usize::from(TARGET_AT) + 4, &[1]);
        let report = run(&bytes);
        assert!(report.has_failure("iBFTBadStructureIndex"));
        assert_eq!(report.summary().failed, 1);
    }

    #[test]
    fn nic_subnet_prefix() {
        let at = usize::from(NIC_AT) + 22;
        let mut bytes = ibft().build();
        patch(&mut bytes, at, &[128]);
        assert!(run(&bytes).all_passed());
        patch(&mut bytes, at, &[129]);
        assert!(run(&bytes).has_failure("iBFTBadSubnetPrefix"));
    }

    #[test]
    fn target_chap_type() {
        let at = usize::from(TARGET_AT) + 32;
        let mut bytes = ibft().build();
        patch(&mut bytes, at, &[2]);
        assert!(run(&bytes).all_passed());
        patch(&mut bytes, at, &[3]);
        assert!(run(&bytes).has_failure("iBFTBadChapType"));
    }

    #[test]
    fn target_nic_association() {
        let at = usize::from(TARGET_AT) + 33;
        let mut bytes = ibft().build();
        patch(&mut bytes, at, &[1]);
        assert!(run(&bytes).all_passed());
        patch(&mut bytes, at, &[2]);
        assert!(run(&bytes).has_failure("iBFTBadNicAssociation"));
    }

    #[test]
    fn reserved_flag_bits() {
        let mut bytes = ibft().build();
        patch(&mut bytes, usize::from(NIC_AT) + 5, &[0b1000_0011]);
        assert!(run(&bytes).has_failure("iBFTReservedBitsSet"));
    }
}
