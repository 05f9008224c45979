use fwts_acpi::{
    BinaryCursor, CursorError, Flow, RawTable, SubHeaderLayout, SubstructureWalker, TableHeader,
    WalkerError, report_walk_error, validators,
};
use fwts_report::{Severity, ValidationReport};

fn header(signature: &[u8; 4], length: u32, total: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; total];
    bytes[0..4].copy_from_slice(signature);
    bytes[4..8].copy_from_slice(&length.to_le_bytes());
    bytes[8] = 1;
    bytes
}

#[test]
fn header_claims_more_than_was_loaded() {
    let bytes = header(b"TEST", 40, 36);
    let table = RawTable::from_bytes(&bytes, 0, 0).unwrap();
    let cursor = table.cursor();

    let h = TableHeader::parse(&cursor).unwrap();
    assert_eq!(h.length, 40);

    for read in [
        cursor.read_u8(36).map(u64::from),
        cursor.read_u16(36).map(u64::from),
        cursor.read_u32(36).map(u64::from),
        cursor.read_u64(36),
    ] {
        assert!(matches!(
            read,
            Err(CursorError::TruncatedRead {
                offset: 36,
                available: 0,
                ..
            })
        ));
    }
}

#[test]
fn zero_length_record_after_a_valid_one() {
    let mut bytes = header(b"TEST", 60, 60);
    bytes[36] = 0;
    bytes[37] = 8;
    bytes[44] = 1;
    bytes[45] = 0;

    let table = RawTable::from_bytes(&bytes, 0, 0).unwrap();
    let cursor = table.cursor();
    let mut report = ValidationReport::new();
    let mut offsets = Vec::new();

    let result = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8)
        .starting_at(TableHeader::SIZE)
        .walk(&cursor, |record| {
            offsets.push(record.offset);
            Flow::Continue
        });

    let err = result.unwrap_err();
    assert_eq!(err, WalkerError::ZeroLengthSubstructure { offset: 44 });
    assert_eq!(offsets, [36]);

    report_walk_error(&mut report, "TEST", &err);
    assert!(!report.all_passed());
    assert!(report.has_failure("TESTStructLengthZero"));
}

#[test]
fn reserved_bits_in_an_eight_bit_field() {
    let outcome = validators::reserved_bits(0b1000_0000u8, 3, 7);
    assert!(outcome.is_failed());

    let graded = outcome.graded(Severity::High, "TESTReservedBits");
    assert_eq!(graded.severity(), Some(Severity::High));
}

#[test]
fn nested_walk_inside_a_record() {
    // Outer record (type 0, length 16) at 36 holding two inner 4-byte records at +8.
    let mut bytes = header(b"TEST", 52, 52);
    bytes[36] = 0;
    bytes[37..39].copy_from_slice(&16u16.to_le_bytes());
    bytes[44] = 0xA;
    bytes[45] = 0;
    bytes[46..48].copy_from_slice(&4u16.to_le_bytes());
    bytes[48] = 0xB;
    bytes[49] = 0;
    bytes[50..52].copy_from_slice(&4u16.to_le_bytes());

    let cursor = BinaryCursor::new(&bytes);
    let outer = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU16).starting_at(36);
    let inner = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU16At2).starting_at(8);

    let mut inner_kinds = Vec::new();
    outer
        .walk(&cursor, |record| {
            let rc = record.cursor();
            inner
                .walk(&rc, |nested| {
                    inner_kinds.push(nested.kind);
                    Flow::Continue
                })
                .unwrap();
            Flow::Continue
        })
        .unwrap();

    assert_eq!(inner_kinds, [0xA, 0xB]);
}

#[test]
fn partial_results_survive_an_abort() {
    let mut bytes = header(b"TEST", 52, 52);
    // record 0: type 0, length 8, with a non-zero reserved byte at +4
    bytes[36] = 0;
    bytes[37] = 8;
    bytes[40] = 0x55;
    // record 1: type 1, length 0xFF (out of range)
    bytes[44] = 1;
    bytes[45] = 0xFF;

    let cursor = BinaryCursor::new(&bytes);
    let mut report = ValidationReport::new();
    let result = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8)
        .starting_at(36)
        .walk(&cursor, |record| {
            let rc = record.cursor();
            if let Ok(reserved) = rc.read_u8(4) {
                report.check(
                    validators::reserved_zero(reserved).graded(Severity::Low, "TESTReserved"),
                );
            }
            Flow::Continue
        });
    if let Err(e) = result {
        report_walk_error(&mut report, "TEST", &e);
    }

    let codes: Vec<_> = report.failures().filter_map(|o| o.code()).collect();
    assert_eq!(codes, ["TESTReserved", "TESTOutOfRangeOffset"]);
}
