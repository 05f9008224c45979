//! # System Description Table Header
//!
//! Every ACPI system description table starts with the same 36-byte header
//! (ACPI 6.5, section 5.2.6):
//!
//! ```text
//! 0   Signature         4
//! 4   Length            4
//! 8   Revision          1
//! 9   Checksum          1
//! 10  OEMID             6
//! 16  OEM Table ID      8
//! 24  OEM Revision      4
//! 28  Creator ID        4
//! 32  Creator Revision  4
//! ```

use crate::{BinaryCursor, CursorError, Signature};
use alloc::borrow::Cow;
use alloc::string::String;

/// Decoded common table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    pub signature: Signature,
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: [u8; 4],
    pub creator_revision: u32,
}

impl TableHeader {
    pub const SIZE: usize = 36;

    /// Decode the header from the first 36 bytes under the cursor.
    ///
    /// Only the header bytes need to be present; a table whose declared length
    /// exceeds the buffer still yields a header.
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if fewer than 36 bytes are readable.
    pub fn parse(cursor: &BinaryCursor<'_>) -> Result<Self, CursorError> {
        if cursor.limit() < Self::SIZE {
            return Err(CursorError::TruncatedRead {
                offset: 0,
                needed: Self::SIZE,
                available: cursor.limit(),
            });
        }

        Ok(Self {
            signature: Signature(cursor.read_array(0)?),
            length: cursor.read_u32(4)?,
            revision: cursor.read_u8(8)?,
            checksum: cursor.read_u8(9)?,
            oem_id: cursor.read_array(10)?,
            oem_table_id: cursor.read_array(16)?,
            oem_revision: cursor.read_u32(24)?,
            creator_id: cursor.read_array(28)?,
            creator_revision: cursor.read_u32(32)?,
        })
    }

    /// Declared table length in bytes.
    #[must_use]
    pub fn declared_length(&self) -> usize {
        usize::try_from(self.length).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn oem_id_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.oem_id)
    }

    #[must_use]
    pub fn oem_table_id_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.oem_table_id)
    }

    #[must_use]
    pub fn creator_id_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.creator_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(length: u32) -> [u8; 36] {
        let mut h = [0u8; 36];
        h[0..4].copy_from_slice(b"GTDT");
        h[4..8].copy_from_slice(&length.to_le_bytes());
        h[8] = 3;
        h[9] = 0xAB;
        h[10..16].copy_from_slice(b"FWTSOE");
        h[16..24].copy_from_slice(b"FWTSTBL ");
        h[24..28].copy_from_slice(&7u32.to_le_bytes());
        h[28..32].copy_from_slice(b"INTL");
        h[32..36].copy_from_slice(&0x2023_0628u32.to_le_bytes());
        h
    }

    #[test]
    fn decodes_all_fields() {
        let bytes = header_bytes(104);
        let h = TableHeader::parse(&BinaryCursor::new(&bytes)).unwrap();
        assert_eq!(h.signature, Signature::GTDT);
        assert_eq!(h.length, 104);
        assert_eq!(h.revision, 3);
        assert_eq!(h.checksum, 0xAB);
        assert_eq!(h.oem_id_str(), "FWTSOE");
        assert_eq!(h.oem_table_id_str(), "FWTSTBL ");
        assert_eq!(h.oem_revision, 7);
        assert_eq!(h.creator_id_str(), "INTL");
        assert_eq!(h.creator_revision, 0x2023_0628);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let bytes = header_bytes(36);
        assert_eq!(
            TableHeader::parse(&BinaryCursor::new(&bytes[..35])),
            Err(CursorError::TruncatedRead {
                offset: 0,
                needed: 36,
                available: 35
            })
        );
    }
}
