//! # Generic Address Structure
//!
//! ACPI 6.5, section 5.2.3.2:
//!
//! ```text
//! 0  Address Space ID     1
//! 1  Register Bit Width   1
//! 2  Register Bit Offset  1
//! 3  Access Size          1   0 = undefined, 1 = byte .. 4 = qword
//! 4  Address              8
//! ```

use crate::validators;
use crate::{BinaryCursor, CursorError};
use core::fmt;
use fwts_report::ValidationOutcome;

/// Address space a GAS register lives in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AddressSpaceId {
    SystemMemory,
    SystemIo,
    PciConfig,
    EmbeddedController,
    SmBus,
    SystemCmos,
    PciBarTarget,
    Ipmi,
    GeneralPurposeIo,
    GenericSerialBus,
    PlatformCommChannel,
    PlatformRuntimeMechanism,
    FunctionalFixedHardware,
    /// `0x0C..=0x7E` and `0x80..=0xBF`.
    Reserved(u8),
    /// `0xC0..=0xFF`.
    Oem(u8),
}

impl AddressSpaceId {
    #[must_use]
    pub const fn id(self) -> u8 {
        match self {
            Self::SystemMemory => 0x00,
            Self::SystemIo => 0x01,
            Self::PciConfig => 0x02,
            Self::EmbeddedController => 0x03,
            Self::SmBus => 0x04,
            Self::SystemCmos => 0x05,
            Self::PciBarTarget => 0x06,
            Self::Ipmi => 0x07,
            Self::GeneralPurposeIo => 0x08,
            Self::GenericSerialBus => 0x09,
            Self::PlatformCommChannel => 0x0A,
            Self::PlatformRuntimeMechanism => 0x0B,
            Self::FunctionalFixedHardware => 0x7F,
            Self::Reserved(id) | Self::Oem(id) => id,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SystemMemory => "System Memory",
            Self::SystemIo => "System I/O",
            Self::PciConfig => "PCI Configuration Space",
            Self::EmbeddedController => "Embedded Controller",
            Self::SmBus => "SMBus",
            Self::SystemCmos => "System CMOS",
            Self::PciBarTarget => "PCI BAR Target",
            Self::Ipmi => "IPMI",
            Self::GeneralPurposeIo => "General Purpose I/O",
            Self::GenericSerialBus => "Generic Serial Bus",
            Self::PlatformCommChannel => "Platform Communications Channel",
            Self::PlatformRuntimeMechanism => "Platform Runtime Mechanism",
            Self::FunctionalFixedHardware => "Functional Fixed Hardware",
            Self::Reserved(_) => "Reserved",
            Self::Oem(_) => "OEM Defined",
        }
    }
}

impl From<u8> for AddressSpaceId {
    fn from(id: u8) -> Self {
        match id {
            0x00 => Self::SystemMemory,
            0x01 => Self::SystemIo,
            0x02 => Self::PciConfig,
            0x03 => Self::EmbeddedController,
            0x04 => Self::SmBus,
            0x05 => Self::SystemCmos,
            0x06 => Self::PciBarTarget,
            0x07 => Self::Ipmi,
            0x08 => Self::GeneralPurposeIo,
            0x09 => Self::GenericSerialBus,
            0x0A => Self::PlatformCommChannel,
            0x0B => Self::PlatformRuntimeMechanism,
            0x7F => Self::FunctionalFixedHardware,
            0xC0..=0xFF => Self::Oem(id),
            _ => Self::Reserved(id),
        }
    }
}

impl fmt::Display for AddressSpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decoded Generic Address Structure.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Gas {
    pub address_space_id: u8,
    pub register_bit_width: u8,
    pub register_bit_offset: u8,
    pub access_size: u8,
    pub address: u64,
}

impl Gas {
    pub const SIZE: usize = 12;

    /// # Errors
    /// [`CursorError::TruncatedRead`] if 12 bytes are not available at `offset`.
    pub fn read(cursor: &BinaryCursor<'_>, offset: usize) -> Result<Self, CursorError> {
        let gas = cursor.window(offset, Self::SIZE)?;
        Ok(Self {
            address_space_id: gas.read_u8(0)?,
            register_bit_width: gas.read_u8(1)?,
            register_bit_offset: gas.read_u8(2)?,
            access_size: gas.read_u8(3)?,
            address: gas.read_u64(4)?,
        })
    }

    #[must_use]
    pub fn address_space(&self) -> AddressSpaceId {
        AddressSpaceId::from(self.address_space_id)
    }

    /// Access size must be one of the defined encodings, `0..=4`.
    #[must_use]
    pub fn check_access_size(&self) -> ValidationOutcome {
        validators::in_range(self.access_size, 0, 4)
    }
}
