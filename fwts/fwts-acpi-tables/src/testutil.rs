use alloc::vec::Vec;
use fwts_acpi::{RawTable, sum};

/// Assembles a table image field by field; `build` patches length and checksum.
pub struct TableBuilder {
    bytes: Vec<u8>,
}

impl TableBuilder {
    pub fn new(signature: [u8; 4], revision: u8) -> Self {
        let mut bytes = Vec::with_capacity(64);
        bytes.extend_from_slice(&signature);
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.push(revision);
        bytes.push(0);
        bytes.extend_from_slice(b"FWTS  ");
        bytes.extend_from_slice(b"TESTTBL ");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(b"FWTS");
        bytes.extend_from_slice(&1u32.to_le_bytes());
        Self { bytes }
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.bytes.push(v);
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.bytes.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn bytes(mut self, v: &[u8]) -> Self {
        self.bytes.extend_from_slice(v);
        self
    }

    pub fn zeros(mut self, n: usize) -> Self {
        self.bytes.resize(self.bytes.len() + n, 0);
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let len = u32::try_from(self.bytes.len()).unwrap();
        self.bytes[4..8].copy_from_slice(&len.to_le_bytes());
        self.bytes[9] = 0;
        self.bytes[9] = 0u8.wrapping_sub(sum(&self.bytes));
        self.bytes
    }
}

/// Overwrite bytes of an already built image and fix up the checksum.
pub fn patch(bytes: &mut [u8], offset: usize, value: &[u8]) {
    bytes[offset..offset + value.len()].copy_from_slice(value);
    bytes[9] = 0;
    bytes[9] = 0u8.wrapping_sub(sum(bytes));
}

pub fn table(bytes: &[u8]) -> RawTable<'_> {
    RawTable::from_bytes(bytes, 0, 0).unwrap()
}
