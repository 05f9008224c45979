use crate::{BinaryCursor, CursorError, Signature, TableHeader};

/// One loaded ACPI table, as handed over by a table loader.
///
/// The loader owns the bytes; a `RawTable` borrows them for the duration of
/// one check.
#[derive(Debug, Clone, Copy)]
pub struct RawTable<'a> {
    pub signature: Signature,
    /// Length declared by the table header; may disagree with `data.len()`.
    pub length: u32,
    pub revision: u8,
    pub data: &'a [u8],
    /// Physical address the table was loaded from, or zero if unknown.
    pub address: u64,
    /// Index among tables sharing the same signature (e.g. several SSDTs).
    pub instance: u32,
}

impl<'a> RawTable<'a> {
    /// Fill signature, length and revision from the header bytes.
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if the buffer does not even hold those fields.
    pub fn from_bytes(data: &'a [u8], address: u64, instance: u32) -> Result<Self, CursorError> {
        let c = BinaryCursor::new(data);
        Ok(Self {
            signature: Signature(c.read_array(0)?),
            length: c.read_u32(4)?,
            revision: c.read_u8(8)?,
            data,
            address,
            instance,
        })
    }

    /// A cursor limited to `min(length, data.len())`.
    #[must_use]
    pub fn cursor(&self) -> BinaryCursor<'a> {
        let limit = usize::try_from(self.length).unwrap_or(usize::MAX);
        BinaryCursor::with_limit(self.data, limit)
    }

    /// # Errors
    /// [`CursorError::TruncatedRead`] if the table is shorter than a header.
    pub fn header(&self) -> Result<TableHeader, CursorError> {
        TableHeader::parse(&self.cursor())
    }

    /// Whether the declared length matches the number of loaded bytes.
    #[must_use]
    pub fn length_matches_data(&self) -> bool {
        usize::try_from(self.length).is_ok_and(|len| len == self.data.len())
    }
}
