//! # Bounds-checked table reads

use core::ops::Range;

/// Failure to read a field from a table buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CursorError {
    #[error(
        "read of {needed} bytes at offset {offset:#x} exceeds table bounds ({available} bytes available)"
    )]
    TruncatedRead {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("field of {len} bytes at offset {offset:#x} contains non-ASCII bytes")]
    NonAsciiField { offset: usize, len: usize },
}

impl CursorError {
    /// Stable label suffix, appended to a table name to form a failure code.
    #[must_use]
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::TruncatedRead { .. } => "TruncatedRead",
            Self::NonAsciiField { .. } => "NonAsciiField",
        }
    }
}

/// Width of an unsigned little-endian integer field.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldWidth {
    U8,
    U16,
    U32,
}

impl FieldWidth {
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// Read cursor over one table's bytes.
///
/// All reads take an absolute offset relative to the start of the buffer and
/// are checked against `limit`, which never exceeds the buffer length. The
/// current position only matters to [`advance`](Self::advance),
/// [`seek`](Self::seek) and [`remaining`](Self::remaining).
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    data: &'a [u8],
    offset: usize,
    limit: usize,
}

impl<'a> BinaryCursor<'a> {
    /// A cursor over the whole buffer.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            offset: 0,
            limit: data.len(),
        }
    }

    /// A cursor limited to the first `limit` bytes (or fewer, if the buffer is shorter).
    ///
    /// Tables whose header claims more bytes than were actually loaded get the
    /// smaller of the two.
    #[must_use]
    pub fn with_limit(data: &'a [u8], limit: usize) -> Self {
        Self {
            data,
            offset: 0,
            limit: limit.min(data.len()),
        }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.offset
    }

    #[must_use]
    pub const fn limit(&self) -> usize {
        self.limit
    }

    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.limit - self.offset
    }

    /// The readable bytes, `[0, limit)`.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        let data: &'a [u8] = self.data;
        data.get(..self.limit).unwrap_or(data)
    }

    fn span(&self, offset: usize, needed: usize) -> Result<Range<usize>, CursorError> {
        offset
            .checked_add(needed)
            .filter(|&end| end <= self.limit)
            .map(|end| offset..end)
            .ok_or(CursorError::TruncatedRead {
                offset,
                needed,
                available: self.limit.saturating_sub(offset),
            })
    }

    /// Borrow `len` bytes starting at `offset`.
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if `offset + len` exceeds the limit.
    pub fn read_bytes(&self, offset: usize, len: usize) -> Result<&'a [u8], CursorError> {
        let range = self.span(offset, len)?;
        let data: &'a [u8] = self.data;
        data.get(range).ok_or(CursorError::TruncatedRead {
            offset,
            needed: len,
            available: 0,
        })
    }

    /// Copy `N` bytes starting at `offset`.
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if the array does not fit.
    pub fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], CursorError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(offset, N)?);
        Ok(out)
    }

    /// # Errors
    /// [`CursorError::TruncatedRead`] if the field does not fit.
    pub fn read_u8(&self, offset: usize) -> Result<u8, CursorError> {
        let [b] = self.read_array::<1>(offset)?;
        Ok(b)
    }

    /// # Errors
    /// [`CursorError::TruncatedRead`] if the field does not fit.
    pub fn read_u16(&self, offset: usize) -> Result<u16, CursorError> {
        Ok(u16::from_le_bytes(self.read_array(offset)?))
    }

    /// # Errors
    /// [`CursorError::TruncatedRead`] if the field does not fit.
    pub fn read_u32(&self, offset: usize) -> Result<u32, CursorError> {
        Ok(u32::from_le_bytes(self.read_array(offset)?))
    }

    /// # Errors
    /// [`CursorError::TruncatedRead`] if the field does not fit.
    pub fn read_u64(&self, offset: usize) -> Result<u64, CursorError> {
        Ok(u64::from_le_bytes(self.read_array(offset)?))
    }

    /// Read an unsigned integer of the given width, widened to `u32`.
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if the field does not fit.
    pub fn read_uint(&self, offset: usize, width: FieldWidth) -> Result<u32, CursorError> {
        match width {
            FieldWidth::U8 => self.read_u8(offset).map(u32::from),
            FieldWidth::U16 => self.read_u16(offset).map(u32::from),
            FieldWidth::U32 => self.read_u32(offset),
        }
    }

    /// Borrow a fixed-length text field (OEM ids, signatures, iSCSI names).
    ///
    /// Trailing NUL padding is trimmed; interior NULs are kept.
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if the field does not fit, and
    /// [`CursorError::NonAsciiField`] if any byte is outside `0x00..=0x7F`.
    pub fn read_fixed_str(&self, offset: usize, len: usize) -> Result<&'a str, CursorError> {
        let bytes = self.read_bytes(offset, len)?;
        if !bytes.is_ascii() {
            return Err(CursorError::NonAsciiField { offset, len });
        }
        core::str::from_utf8(bytes)
            .map(|s| s.trim_end_matches('\0'))
            .map_err(|_| CursorError::NonAsciiField { offset, len })
    }

    /// A cursor over `len` bytes at `offset`, addressed from zero.
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if the window does not fit.
    pub fn window(&self, offset: usize, len: usize) -> Result<Self, CursorError> {
        self.read_bytes(offset, len).map(Self::new)
    }

    /// Move the current position forward.
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if the new position would pass the limit;
    /// the position is left unchanged.
    pub fn advance(&mut self, by: usize) -> Result<(), CursorError> {
        let range = self.span(self.offset, by)?;
        self.offset = range.end;
        Ok(())
    }

    /// Set the current position. `offset == limit` is allowed (nothing remains).
    ///
    /// # Errors
    /// [`CursorError::TruncatedRead`] if `offset` is past the limit.
    pub fn seek(&mut self, offset: usize) -> Result<(), CursorError> {
        self.span(offset, 0)?;
        self.offset = offset;
        Ok(())
    }
}
