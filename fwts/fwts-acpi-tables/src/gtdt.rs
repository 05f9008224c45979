//! # GTDT: Generic Timer Description Table
//!
//! ```text
//! 36  CntControlBase Physical Address     8
//! 44  Reserved                            4
//! 48  Secure EL1 Timer GSIV / Flags       4 + 4
//! 56  Non-Secure EL1 Timer GSIV / Flags   4 + 4
//! 64  Virtual EL1 Timer GSIV / Flags      4 + 4
//! 72  EL2 Timer GSIV / Flags              4 + 4
//! 80  CntReadBase Physical Address        8
//! 88  Platform Timer Count                4
//! 92  Platform Timer Offset               4
//! 96  Virtual EL2 Timer GSIV / Flags      4 + 4   revision 3 and later
//! ```
//!
//! Platform timers (GT blocks and SBSA watchdogs) follow at the platform
//! timer offset, each with `u8` type and `u16` length. A GT block carries its
//! own array of 40-byte timer entries at an offset relative to the block.

use crate::common::{Checker, begin, finish};
use bitfield_struct::bitfield;
use fwts_acpi::{
    BinaryCursor, CursorError, Flow, RawTable, Signature, SubHeaderLayout, SubRecord,
    SubstructureWalker, validators,
};
use fwts_report::{Severity, ValidationReport};
use log::{debug, trace};

pub const MIN_LENGTH: usize = 96;
pub const MIN_LENGTH_REV3: usize = 104;

const GT_BLOCK: u32 = 0;
const WATCHDOG: u32 = 1;

const GT_BLOCK_HEADER: usize = 20;
const GT_BLOCK_TIMER_LENGTH: usize = 40;
const GT_BLOCK_MAX_TIMERS: u32 = 8;
const WATCHDOG_LENGTH: usize = 28;

/// Flags of the per-processor timers in the fixed part.
#[bitfield(u32)]
pub struct TimerFlags {
    /// Edge-triggered.
    pub mode: bool,
    /// Active-low polarity.
    pub polarity: bool,
    /// Timer keeps running in low-power states.
    pub always_on: bool,
    #[bits(29)]
    pub reserved: u32,
}

/// Flags of the SBSA generic watchdog.
#[bitfield(u32)]
pub struct WatchdogFlags {
    pub mode: bool,
    pub polarity: bool,
    pub secure: bool,
    #[bits(29)]
    pub reserved: u32,
}

pub fn check(table: &RawTable<'_>, report: &mut ValidationReport) {
    let mut chk = Checker::new("GTDT", report);
    let min = if table.revision >= 3 {
        MIN_LENGTH_REV3
    } else {
        MIN_LENGTH
    };
    let Some(ctx) = begin(table, Signature::GTDT, min, &mut chk) else {
        return;
    };

    let (count, offset) = match check_fixed(&ctx.cursor, ctx.header.revision, &mut chk) {
        Ok(v) => v,
        Err(e) => {
            chk.cursor_error(&e);
            finish(&mut chk);
            return;
        }
    };

    if count == 0 {
        debug!("GTDT: no platform timers");
        finish(&mut chk);
        return;
    }
    if offset < min {
        chk.fail(
            Severity::High,
            "BadPlatformTimerOffset",
            format_args!("Platform Timer Offset {offset:#x} points inside the fixed part"),
        );
        finish(&mut chk);
        return;
    }

    let result = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU16)
        .starting_at(offset)
        .walk(&ctx.cursor, |timer| {
            if let Err(e) = check_platform_timer(&timer, &mut chk) {
                chk.cursor_error(&e);
            }
            Flow::Continue
        });

    match result {
        Ok(summary) => {
            let found = u32::try_from(summary.records).unwrap_or(u32::MAX);
            if found != count {
                chk.fail(
                    Severity::Medium,
                    "PlatformTimerCount",
                    format_args!("Platform Timer Count is {count} but {found} timers were found"),
                );
            }
        }
        Err(e) => chk.walk_error(&e),
    }
    finish(&mut chk);
}

fn check_timer_flags(value: u32, chk: &mut Checker<'_>, timer: &str) {
    let flags = TimerFlags::from_bits(value);
    trace!("GTDT {timer} flags {flags:?}");
    chk.field(
        validators::reserved_zero(flags.reserved()),
        Severity::Medium,
        "ReservedNonZero",
        timer,
    );
}

fn check_fixed(
    c: &BinaryCursor<'_>,
    revision: u8,
    chk: &mut Checker<'_>,
) -> Result<(u32, usize), CursorError> {
    chk.field(
        validators::reserved_zero(c.read_u32(44)?),
        Severity::Medium,
        "ReservedNonZero",
        "Reserved",
    );
    check_timer_flags(c.read_u32(52)?, chk, "Secure EL1 Timer Flags");
    check_timer_flags(c.read_u32(60)?, chk, "Non-Secure EL1 Timer Flags");
    check_timer_flags(c.read_u32(68)?, chk, "Virtual EL1 Timer Flags");
    check_timer_flags(c.read_u32(76)?, chk, "EL2 Timer Flags");
    if revision >= 3 {
        check_timer_flags(c.read_u32(100)?, chk, "Virtual EL2 Timer Flags");
    }

    let count = c.read_u32(88)?;
    let offset = usize::try_from(c.read_u32(92)?).unwrap_or(usize::MAX);
    Ok((count, offset))
}

fn check_platform_timer(timer: &SubRecord<'_>, chk: &mut Checker<'_>) -> Result<(), CursorError> {
    let c = timer.cursor();
    match timer.kind {
        GT_BLOCK => check_gt_block(timer, &c, chk),
        WATCHDOG => {
            if !chk.field(
                validators::fixed_value(timer.length, WATCHDOG_LENGTH),
                Severity::High,
                "BadWatchdogLength",
                "Watchdog Length",
            ) {
                return Ok(());
            }
            chk.field(
                validators::reserved_zero(c.read_u8(3)?),
                Severity::Medium,
                "ReservedNonZero",
                "Watchdog Reserved",
            );
            let flags = WatchdogFlags::from_bits(c.read_u32(24)?);
            chk.field(
                validators::reserved_zero(flags.reserved()),
                Severity::Medium,
                "ReservedNonZero",
                "Watchdog Timer Flags",
            );
            Ok(())
        }
        other => {
            chk.fail(
                Severity::High,
                "InvalidPlatformTimerType",
                format_args!(
                    "platform timer at {:#x} has unknown type {other:#x}",
                    timer.offset
                ),
            );
            Ok(())
        }
    }
}

fn check_gt_block(
    block: &SubRecord<'_>,
    c: &BinaryCursor<'_>,
    chk: &mut Checker<'_>,
) -> Result<(), CursorError> {
    if !chk.field(
        validators::minimum_length(block.length, GT_BLOCK_HEADER),
        Severity::High,
        "BadGtBlockLength",
        "GT Block Length",
    ) {
        return Ok(());
    }
    chk.field(
        validators::reserved_zero(c.read_u8(3)?),
        Severity::Medium,
        "ReservedNonZero",
        "GT Block Reserved",
    );

    let count = c.read_u32(12)?;
    if !chk.field(
        validators::in_range(count, 0, GT_BLOCK_MAX_TIMERS),
        Severity::High,
        "GtBlockTimerCount",
        "GT Block Timer Count",
    ) {
        return Ok(());
    }
    let offset = usize::try_from(c.read_u32(16)?).unwrap_or(usize::MAX);
    let count = usize::try_from(count).unwrap_or(usize::MAX);

    let Ok(timers) = c.window(offset, count * GT_BLOCK_TIMER_LENGTH) else {
        chk.fail(
            Severity::High,
            "BadGtBlockTimerOffset",
            format_args!(
                "GT block at {:#x}: {count} timers at offset {offset:#x} do not fit its {} bytes",
                block.offset, block.length
            ),
        );
        return Ok(());
    };

    for i in 0..count {
        let entry = timers.window(i * GT_BLOCK_TIMER_LENGTH, GT_BLOCK_TIMER_LENGTH)?;
        let frame = entry.read_u8(0)?;
        if frame >= 8 {
            chk.fail(
                Severity::High,
                "BadGtBlockFrameNumber",
                format_args!("GT block timer {i} has frame number {frame}, expected 0..=7"),
            );
        }
        chk.field(
            validators::reserved_bytes(entry.read_bytes(1, 3)?),
            Severity::Medium,
            "ReservedNonZero",
            "GT Block Timer Reserved",
        );
        chk.field(
            validators::reserved_bits(entry.read_u32(24)?, 2, 31),
            Severity::Medium,
            "ReservedBitsSet",
            "GT Block Physical Timer Flags",
        );
        chk.field(
            validators::reserved_bits(entry.read_u32(32)?, 2, 31),
            Severity::Medium,
            "ReservedBitsSet",
            "GT Block Virtual Timer Flags",
        );
        chk.field(
            validators::reserved_bits(entry.read_u32(36)?, 2, 31),
            Severity::Medium,
            "ReservedBitsSet",
            "GT Block Common Flags",
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{TableBuilder, patch, table};

    fn fixed(revision: u8, count: u32, offset: u32) -> TableBuilder {
        let b = TableBuilder::new(*b"GTDT", revision)
            .u64(0)
            .u32(0)
            .u32(29)
            .u32(0b100)
            .u32(30)
            .u32(0b100)
            .u32(27)
            .u32(0b100)
            .u32(26)
            .u32(0b100)
            .u64(u64::MAX)
            .u32(count)
            .u32(offset);
        if revision >= 3 { b.u32(28).u32(0) } else { b }
    }

    /// GT block with one timer entry (60 bytes).
    fn gt_block(b: TableBuilder, frame: u8) -> TableBuilder {
        b.u8(0)
            .u16(60)
            .u8(0)
            .u64(0x2A81_0000)
            .u32(1)
            .u32(20)
            .u8(frame)
            .zeros(3)
            .u64(0x2A82_0000)
            .u64(0)
            .u32(58)
            .u32(0)
            .u32(0)
            .u32(0)
            .u32(0b01)
    }

    /// GT block holding `n` clean timer entries.
    fn gt_block_of(b: TableBuilder, n: u32) -> TableBuilder {
        let length = u16::try_from(20 + 40 * n).unwrap();
        let mut b = b.u8(0).u16(length).u8(0).u64(0x2A81_0000).u32(n).u32(20);
        for frame in 0..n {
            let frame = u8::try_from(frame % 8).unwrap();
            b = b.u8(frame).zeros(3).u64(0x2A82_0000).u64(0).zeros(20);
        }
        b
    }

    fn watchdog(b: TableBuilder, flags: u32) -> TableBuilder {
        b.u8(1)
            .u16(28)
            .u8(0)
            .u64(0x2A44_0000)
            .u64(0x2A45_0000)
            .u32(93)
            .u32(flags)
    }

    fn run(bytes: &[u8]) -> ValidationReport {
        let mut report = ValidationReport::new();
        check(&table(bytes), &mut report);
        report
    }

    #[test]
    fn clean_table_passes() {
        let bytes = watchdog(gt_block(fixed(2, 2, 96), 0), 0b100).build();
        let report = run(&bytes);
        assert!(report.all_passed(), "{report:?}");
    }

    #[test]
    fn revision_3_needs_104_bytes() {
        let bytes = fixed(3, 0, 0).build();
        assert!(run(&bytes).all_passed());

        let mut bytes = fixed(2, 0, 0).build();
        patch(&mut bytes, 8, &[3]);
        assert!(run(&bytes).has_failure("GTDTTooShort"));
    }

    #[test]
    fn reserved_timer_flag_bits() {
        let mut bytes = fixed(2, 0, 0).build();
        patch(&mut bytes, 60, &0x10u32.to_le_bytes());
        assert!(run(&bytes).has_failure("GTDTReservedNonZero"));
    }

    #[test]
    fn platform_timer_count_mismatch() {
        let bytes = gt_block(fixed(2, 2, 96), 0).build();
        assert!(run(&bytes).has_failure("GTDTPlatformTimerCount"));
    }

    #[test]
    fn bad_frame_number() {
        let bytes = gt_block(fixed(2, 1, 96), 9).build();
        assert!(run(&bytes).has_failure("GTDTBadGtBlockFrameNumber"));
    }

    #[test]
    fn gt_block_timers_outside_the_block() {
        let mut bytes = gt_block(fixed(2, 1, 96), 0).build();
        patch(&mut bytes, 96 + 16, &24u32.to_le_bytes());
        assert!(run(&bytes).has_failure("GTDTBadGtBlockTimerOffset"));
    }

    #[test]
    fn gt_block_with_eight_timers() {
        let bytes = gt_block_of(fixed(2, 1, 96), 8).build();
        let report = run(&bytes);
        assert!(report.all_passed(), "{report:?}");
    }

    #[test]
    fn gt_block_with_nine_timers() {
        let bytes = gt_block_of(fixed(2, 1, 96), 9).build();
        let report = run(&bytes);
        assert!(report.has_failure("GTDTGtBlockTimerCount"));
        assert_eq!(report.summary().failed, 1);
    }

    #[test]
    fn watchdog_length_must_be_28() {
        let mut bytes = watchdog(fixed(2, 1, 96), 0).u32(0).build();
        patch(&mut bytes, 96 + 1, &32u16.to_le_bytes());
        let report = run(&bytes);
        assert!(report.has_failure("GTDTBadWatchdogLength"));
        assert!(!report.has_failure("GTDTReservedNonZero"));
    }

    #[test]
    fn watchdog_reserved_flags() {
        let bytes = watchdog(fixed(2, 1, 96), 0x100).build();
        assert!(run(&bytes).has_failure("GTDTReservedNonZero"));
    }

    #[test]
    fn unknown_platform_timer_type() {
        let bytes = fixed(2, 1, 96).u8(7).u16(4).u8(0).build();
        assert!(run(&bytes).has_failure("GTDTInvalidPlatformTimerType"));
    }

    #[test]
    fn zero_length_platform_timer() {
        let bytes = fixed(2, 1, 96).u8(0).u16(0).u8(0).build();
        assert!(run(&bytes).has_failure("GTDTStructLengthZero"));
    }
}
