//! # Field validators
//!
//! Pure predicates over decoded field values. Each returns a
//! [`ValidationOutcome`]; failures carry [`Severity::Medium`](fwts_report::Severity::Medium)
//! and a generic label that the calling table check re-grades:
//!
//! ```rust
//! use fwts_acpi::validators;
//! use fwts_report::Severity;
//!
//! let outcome = validators::reserved_zero(0x10u32)
//!     .graded(Severity::High, "VIOTReservedNonZero")
//!     .named("VIOT Reserved");
//! assert_eq!(outcome.code(), Some("VIOTReservedNonZero"));
//! ```

use crate::{AddressSpaceId, Guid, sum};
use alloc::format;
use alloc::string::String;
use core::fmt::{self, Write};
use fwts_report::ValidationOutcome;

fn join<T>(items: &[T], mut each: impl FnMut(&mut String, &T) -> fmt::Result) -> String {
    let mut out = String::new();
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        // Writing into a String cannot fail.
        let _ = each(&mut out, item);
    }
    out
}

/// The whole field must be zero.
#[must_use]
pub fn reserved_zero(value: impl Into<u128>) -> ValidationOutcome {
    let value = value.into();
    if value == 0 {
        ValidationOutcome::Passed
    } else {
        ValidationOutcome::failure(
            "ReservedNonZero",
            format!("reserved field must be zero, got {value:#x}"),
        )
    }
}

/// Every byte of a reserved byte array must be zero.
#[must_use]
pub fn reserved_bytes(bytes: &[u8]) -> ValidationOutcome {
    match bytes.iter().position(|&b| b != 0) {
        None => ValidationOutcome::Passed,
        Some(i) => ValidationOutcome::failure(
            "ReservedNonZero",
            format!(
                "reserved bytes must be zero, byte {i} is {:#04x}",
                bytes[i]
            ),
        ),
    }
}

/// Bits `lsb..=msb` must be clear.
///
/// An inverted range is swapped; bits past 127 are ignored.
#[must_use]
pub fn reserved_bits(value: impl Into<u128>, lsb: u32, msb: u32) -> ValidationOutcome {
    let value = value.into();
    let (lo, hi) = if lsb <= msb { (lsb, msb) } else { (msb, lsb) };
    if lo > 127 {
        return ValidationOutcome::Passed;
    }
    let hi = hi.min(127);
    let width = hi - lo + 1;
    let mask = if width == 128 {
        u128::MAX
    } else {
        ((1u128 << width) - 1) << lo
    };

    let set = value & mask;
    if set == 0 {
        ValidationOutcome::Passed
    } else {
        ValidationOutcome::failure(
            "ReservedBitsSet",
            format!("reserved bits [{hi}:{lo}] must be zero, got {value:#x} (set: {set:#x})"),
        )
    }
}

/// The field must equal a fixed value.
#[must_use]
pub fn fixed_value<T>(value: T, expected: T) -> ValidationOutcome
where
    T: PartialEq + fmt::LowerHex,
{
    if value == expected {
        ValidationOutcome::Passed
    } else {
        ValidationOutcome::failure(
            "BadFixedValue",
            format!("expected {expected:#x}, got {value:#x}"),
        )
    }
}

/// The field must be one of `allowed`.
#[must_use]
pub fn enumerated<T>(value: T, allowed: &[T]) -> ValidationOutcome
where
    T: PartialEq + fmt::LowerHex,
{
    if allowed.contains(&value) {
        ValidationOutcome::Passed
    } else {
        let list = join(allowed, |out, v| write!(out, "{v:#x}"));
        ValidationOutcome::failure(
            "BadEnumValue",
            format!("{value:#x} is not one of [{list}]"),
        )
    }
}

/// The field must lie in `min..=max`.
#[must_use]
pub fn in_range<T>(value: T, min: T, max: T) -> ValidationOutcome
where
    T: PartialOrd + fmt::LowerHex,
{
    if value >= min && value <= max {
        ValidationOutcome::Passed
    } else {
        ValidationOutcome::failure(
            "OutOfRange",
            format!("{value:#x} is outside {min:#x}..={max:#x}"),
        )
    }
}

/// A Generic Address Structure's address space must be one of `allowed_ids`.
#[must_use]
pub fn address_space_id(value: u8, allowed_ids: &[u8]) -> ValidationOutcome {
    if allowed_ids.contains(&value) {
        return ValidationOutcome::Passed;
    }
    let list = join(allowed_ids, |out, &id| {
        write!(out, "{id:#04x} ({})", AddressSpaceId::from(id))
    });
    ValidationOutcome::failure(
        "BadAddressSpaceId",
        format!(
            "address space {value:#04x} ({}) is not one of [{list}]",
            AddressSpaceId::from(value)
        ),
    )
}

/// The GUID must be one of `allowed`.
#[must_use]
pub fn guid_in(value: &Guid, allowed: &[Guid]) -> ValidationOutcome {
    if allowed.contains(value) {
        ValidationOutcome::Passed
    } else {
        ValidationOutcome::failure("UnknownGuid", format!("GUID {value} is not recognised"))
    }
}

/// Every byte must be 7-bit ASCII.
#[must_use]
pub fn ascii_printable(bytes: &[u8]) -> ValidationOutcome {
    match bytes.iter().position(|b| !b.is_ascii()) {
        None => ValidationOutcome::Passed,
        Some(i) => ValidationOutcome::failure(
            "NonAsciiField",
            format!("non-ASCII byte {:#04x} at index {i}", bytes[i]),
        ),
    }
}

/// The bytes must sum to zero modulo 256.
#[must_use]
pub fn checksum(bytes: &[u8]) -> ValidationOutcome {
    match sum(bytes) {
        0 => ValidationOutcome::Passed,
        s => ValidationOutcome::failure(
            "BadChecksum",
            format!("checksum over {} bytes is {s:#04x}, expected 0x00", bytes.len()),
        ),
    }
}

/// A length must be at least `minimum` bytes.
#[must_use]
pub fn minimum_length(actual: usize, minimum: usize) -> ValidationOutcome {
    if actual >= minimum {
        ValidationOutcome::Passed
    } else {
        ValidationOutcome::failure(
            "TooShort",
            format!("length {actual} is less than the minimum of {minimum} bytes"),
        )
    }
}
