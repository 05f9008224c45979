//! # Sub-structure walking
//!
//! Many ACPI tables consist of a fixed part followed by a run of
//! variable-length sub-structures, each starting with a small type/length
//! header. The walker encodes that loop once:
//!
//! ```text
//!          ┌───────────────┐
//!          │ Positioned(o) │◄──────────────────────┐
//!          └──────┬────────┘                       │
//!       o >= limit│ else                           │
//!          ┌──────▼──────┐   peek (type, length)   │
//!   Done ◄─┤             ├──► length == 0 ────────►│ Aborted
//!          │  Dispatch   │    length < header ────►│ Aborted
//!          │             │    o + length > limit ─►│ Aborted
//!          └──────┬──────┘                         │
//!     Continue    │ Abort ─────────────────────────┼──► Aborted
//!                 ▼                                │
//!          Advanced(o + step) ─────────────────────┘
//! ```
//!
//! The dispatcher only ever sees a record whose declared bytes lie entirely
//! inside the table, so per-type code interprets fields without repeating
//! bounds arithmetic.

use crate::cursor::{BinaryCursor, CursorError, FieldWidth};
use alloc::string::String;
use core::iter::FusedIterator;
use core::num::NonZeroUsize;
use log::trace;

/// Position and width of the type and length fields of a sub-structure header.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SubHeaderLayout {
    /// `u8` type at 0, `u8` length at 1 (MADT, PCCT).
    TypeU8LengthU8,
    /// `u8` type at 0, `u16` length at 1 (GTDT platform timers).
    TypeU8LengthU16,
    /// `u8` type at 0, reserved byte, `u16` length at 2 (VIOT, PMTT).
    TypeU8LengthU16At2,
    /// `u16` type at 0, `u16` length at 2 (NFIT, RHCT, ASPT).
    TypeU16LengthU16,
    /// `u16` length at 0, `u8` type at 3 (APMT).
    LengthU16TypeU8At3,
    /// `u8` id at 0, `u16` length at 2 (iBFT structure headers).
    Custom {
        type_offset: usize,
        type_width: FieldWidth,
        length_offset: usize,
        length_width: FieldWidth,
    },
}

impl SubHeaderLayout {
    /// Offset and width of the type field.
    #[must_use]
    pub const fn type_field(self) -> (usize, FieldWidth) {
        match self {
            Self::TypeU8LengthU8 | Self::TypeU8LengthU16 | Self::TypeU8LengthU16At2 => {
                (0, FieldWidth::U8)
            }
            Self::TypeU16LengthU16 => (0, FieldWidth::U16),
            Self::LengthU16TypeU8At3 => (3, FieldWidth::U8),
            Self::Custom {
                type_offset,
                type_width,
                ..
            } => (type_offset, type_width),
        }
    }

    /// Offset and width of the length field.
    #[must_use]
    pub const fn length_field(self) -> (usize, FieldWidth) {
        match self {
            Self::TypeU8LengthU8 => (1, FieldWidth::U8),
            Self::TypeU8LengthU16 => (1, FieldWidth::U16),
            Self::TypeU8LengthU16At2 | Self::TypeU16LengthU16 => (2, FieldWidth::U16),
            Self::LengthU16TypeU8At3 => (0, FieldWidth::U16),
            Self::Custom {
                length_offset,
                length_width,
                ..
            } => (length_offset, length_width),
        }
    }

    /// Bytes covered by the header; no record can be shorter than this.
    #[must_use]
    pub const fn header_size(self) -> usize {
        let (t_off, t_w) = self.type_field();
        let (l_off, l_w) = self.length_field();
        let t_end = t_off + t_w.bytes();
        let l_end = l_off + l_w.bytes();
        if t_end > l_end { t_end } else { l_end }
    }
}

/// How far the walker moves after dispatching a record.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AdvanceBy {
    /// Advance by the record's own length field.
    #[default]
    DeclaredLength,
    /// Advance by a constant stride, ignoring the length field for stepping.
    ///
    /// The length field is still validated and still bounds the record view.
    FixedStride(NonZeroUsize),
}

/// What the dispatcher wants the walker to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop the walk. The dispatcher is expected to have recorded why.
    Abort(String),
}

/// A bounds-checked view of one sub-structure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRecord<'a> {
    /// Value of the type field.
    pub kind: u32,
    /// Offset of the record within the walked buffer.
    pub offset: usize,
    /// Declared length; always `>=` the header size and within bounds.
    pub length: usize,
    /// Zero-based position in the walk.
    pub index: usize,
    bytes: &'a [u8],
}

impl<'a> SubRecord<'a> {
    /// The record's declared bytes.
    #[must_use]
    pub const fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// A cursor over the record, addressed from the record start.
    #[must_use]
    pub const fn cursor(&self) -> BinaryCursor<'a> {
        BinaryCursor::new(self.bytes)
    }
}

/// Result of a walk that ran to the end of the buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct WalkSummary {
    /// Number of records handed to the dispatcher.
    pub records: usize,
    /// Offset at which the walk stopped.
    pub end_offset: usize,
}

/// Structural failure that ends a walk.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WalkerError {
    #[error("sub-structure header at offset {offset:#x} is truncated: {source}")]
    HeaderTruncated { offset: usize, source: CursorError },
    #[error("sub-structure at offset {offset:#x} has zero length")]
    ZeroLengthSubstructure { offset: usize },
    #[error(
        "sub-structure at offset {offset:#x} has length {length}, shorter than its {minimum}-byte header"
    )]
    SubstructureTooShort {
        offset: usize,
        length: usize,
        minimum: usize,
    },
    #[error(
        "sub-structure at offset {offset:#x} with length {length} runs past the end of the table ({limit} bytes)"
    )]
    SubstructureOutOfRange {
        offset: usize,
        length: usize,
        limit: usize,
    },
    #[error("walk aborted at offset {offset:#x}: {reason}")]
    DispatcherAborted { offset: usize, reason: String },
}

impl WalkerError {
    /// Offset of the record that ended the walk.
    #[must_use]
    pub const fn offset(&self) -> usize {
        match self {
            Self::HeaderTruncated { offset, .. }
            | Self::ZeroLengthSubstructure { offset }
            | Self::SubstructureTooShort { offset, .. }
            | Self::SubstructureOutOfRange { offset, .. }
            | Self::DispatcherAborted { offset, .. } => *offset,
        }
    }

    /// Stable label suffix, appended to a table name to form a failure code.
    #[must_use]
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::HeaderTruncated { .. } => "TruncatedSubtable",
            Self::ZeroLengthSubstructure { .. } => "StructLengthZero",
            Self::SubstructureTooShort { .. } => "BadSubtableLength",
            Self::SubstructureOutOfRange { .. } => "OutOfRangeOffset",
            Self::DispatcherAborted { .. } => "Aborted",
        }
    }
}

/// Walks a run of type/length sub-structures.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubstructureWalker {
    layout: SubHeaderLayout,
    start: usize,
    advance: AdvanceBy,
}

impl SubstructureWalker {
    #[must_use]
    pub const fn new(layout: SubHeaderLayout) -> Self {
        Self {
            layout,
            start: 0,
            advance: AdvanceBy::DeclaredLength,
        }
    }

    /// Offset of the first record.
    #[must_use]
    pub const fn starting_at(mut self, offset: usize) -> Self {
        self.start = offset;
        self
    }

    #[must_use]
    pub const fn advancing_by(mut self, advance: AdvanceBy) -> Self {
        self.advance = advance;
        self
    }

    #[must_use]
    pub const fn layout(&self) -> SubHeaderLayout {
        self.layout
    }

    /// Iterate records; the iterator yields at most one error and then ends.
    #[must_use]
    pub fn records<'a>(&self, cursor: &BinaryCursor<'a>) -> SubRecords<'a> {
        SubRecords {
            cursor: cursor.clone(),
            layout: self.layout,
            advance: self.advance,
            offset: self.start,
            index: 0,
            done: false,
        }
    }

    /// Walk every record, handing each to `dispatch`.
    ///
    /// # Errors
    /// The first structural [`WalkerError`], or
    /// [`WalkerError::DispatcherAborted`] if the dispatcher returned [`Flow::Abort`].
    pub fn walk<'a, F>(
        &self,
        cursor: &BinaryCursor<'a>,
        mut dispatch: F,
    ) -> Result<WalkSummary, WalkerError>
    where
        F: FnMut(SubRecord<'a>) -> Flow,
    {
        let mut records = 0;
        let mut iter = self.records(cursor);
        for record in iter.by_ref() {
            let record = record?;
            let offset = record.offset;
            records += 1;
            if let Flow::Abort(reason) = dispatch(record) {
                trace!("walk aborted by dispatcher at {offset:#x}: {reason}");
                return Err(WalkerError::DispatcherAborted { offset, reason });
            }
        }

        Ok(WalkSummary {
            records,
            end_offset: iter.offset,
        })
    }

    /// Validate and return the single record at `offset`.
    ///
    /// For structures reached through an offset stored elsewhere in the table
    /// rather than by walking.
    ///
    /// # Errors
    /// The same structural checks as a walk.
    pub fn record_at<'a>(
        &self,
        cursor: &BinaryCursor<'a>,
        offset: usize,
    ) -> Result<SubRecord<'a>, WalkerError> {
        peek(cursor, self.layout, offset, 0)
    }
}

fn peek<'a>(
    cursor: &BinaryCursor<'a>,
    layout: SubHeaderLayout,
    offset: usize,
    index: usize,
) -> Result<SubRecord<'a>, WalkerError> {
    let header_size = layout.header_size();
    let header = cursor
        .window(offset, header_size)
        .map_err(|source| WalkerError::HeaderTruncated { offset, source })?;

    let (type_offset, type_width) = layout.type_field();
    let (length_offset, length_width) = layout.length_field();
    let kind = header
        .read_uint(type_offset, type_width)
        .map_err(|source| WalkerError::HeaderTruncated { offset, source })?;
    let length = header
        .read_uint(length_offset, length_width)
        .map_err(|source| WalkerError::HeaderTruncated { offset, source })?;
    let length = usize::try_from(length).unwrap_or(usize::MAX);

    if length == 0 {
        return Err(WalkerError::ZeroLengthSubstructure { offset });
    }
    if length < header_size {
        return Err(WalkerError::SubstructureTooShort {
            offset,
            length,
            minimum: header_size,
        });
    }

    let limit = cursor.limit();
    let bytes = cursor
        .read_bytes(offset, length)
        .map_err(|_| WalkerError::SubstructureOutOfRange {
            offset,
            length,
            limit,
        })?;

    trace!("sub-structure #{index} type {kind:#x} at {offset:#x}, {length} bytes");
    Ok(SubRecord {
        kind,
        offset,
        length,
        index,
        bytes,
    })
}

/// Iterator over the records of a walk.
#[derive(Debug, Clone)]
pub struct SubRecords<'a> {
    cursor: BinaryCursor<'a>,
    layout: SubHeaderLayout,
    advance: AdvanceBy,
    offset: usize,
    index: usize,
    done: bool,
}

impl SubRecords<'_> {
    /// Offset of the next record to be read.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for SubRecords<'a> {
    type Item = Result<SubRecord<'a>, WalkerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.offset >= self.cursor.limit() {
            self.done = true;
            trace!("walk done at {:#x} after {} records", self.offset, self.index);
            return None;
        }

        match peek(&self.cursor, self.layout, self.offset, self.index) {
            Ok(record) => {
                let step = match self.advance {
                    AdvanceBy::DeclaredLength => record.length,
                    AdvanceBy::FixedStride(stride) => stride.get(),
                };
                self.offset = self.offset.saturating_add(step);
                self.index += 1;
                Some(Ok(record))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl FusedIterator for SubRecords<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    /// Header padding plus records encoded as `TypeU8LengthU8`.
    fn table(records: &[(u8, u8)], total: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; total];
        let mut off = 36;
        for &(kind, len) in records {
            bytes[off] = kind;
            bytes[off + 1] = len;
            off += usize::from(len.max(2));
        }
        bytes
    }

    #[test]
    fn header_sizes() {
        assert_eq!(SubHeaderLayout::TypeU8LengthU8.header_size(), 2);
        assert_eq!(SubHeaderLayout::TypeU8LengthU16.header_size(), 3);
        assert_eq!(SubHeaderLayout::TypeU8LengthU16At2.header_size(), 4);
        assert_eq!(SubHeaderLayout::TypeU16LengthU16.header_size(), 4);
        assert_eq!(SubHeaderLayout::LengthU16TypeU8At3.header_size(), 4);
        let custom = SubHeaderLayout::Custom {
            type_offset: 4,
            type_width: FieldWidth::U32,
            length_offset: 0,
            length_width: FieldWidth::U32,
        };
        assert_eq!(custom.header_size(), 8);
    }

    #[test]
    fn walks_to_the_end() {
        let bytes = table(&[(0, 8), (1, 4), (2, 12)], 60);
        let c = BinaryCursor::new(&bytes);
        let walker = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8).starting_at(36);

        let mut seen = Vec::new();
        let summary = walker
            .walk(&c, |r| {
                seen.push((r.kind, r.offset, r.length, r.index));
                Flow::Continue
            })
            .unwrap();

        assert_eq!(seen, [(0, 36, 8, 0), (1, 44, 4, 1), (2, 48, 12, 2)]);
        assert_eq!(
            summary,
            WalkSummary {
                records: 3,
                end_offset: 60
            }
        );
    }

    #[test]
    fn zero_length_aborts_before_dispatch() {
        let bytes = table(&[(0, 8), (1, 0)], 60);
        let c = BinaryCursor::new(&bytes);
        let walker = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8).starting_at(36);

        let mut dispatched = Vec::new();
        let err = walker
            .walk(&c, |r| {
                dispatched.push(r.offset);
                Flow::Continue
            })
            .unwrap_err();

        assert_eq!(err, WalkerError::ZeroLengthSubstructure { offset: 44 });
        assert_eq!(dispatched, [36]);
    }

    #[test]
    fn out_of_range_aborts_before_dispatch() {
        let bytes = table(&[(0, 8), (1, 200)], 60);
        let c = BinaryCursor::new(&bytes);
        let walker = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8).starting_at(36);

        let mut dispatched = 0;
        let err = walker
            .walk(&c, |_| {
                dispatched += 1;
                Flow::Continue
            })
            .unwrap_err();

        assert_eq!(
            err,
            WalkerError::SubstructureOutOfRange {
                offset: 44,
                length: 200,
                limit: 60
            }
        );
        assert_eq!(dispatched, 1);
        assert_eq!(err.code_suffix(), "OutOfRangeOffset");
    }

    #[test]
    fn records_shorter_than_their_header_are_rejected() {
        let bytes = table(&[(0, 1)], 40);
        let c = BinaryCursor::new(&bytes);
        let err = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8)
            .starting_at(36)
            .walk(&c, |_| Flow::Continue)
            .unwrap_err();
        assert_eq!(
            err,
            WalkerError::SubstructureTooShort {
                offset: 36,
                length: 1,
                minimum: 2
            }
        );
    }

    #[test]
    fn trailing_bytes_shorter_than_a_header() {
        let mut bytes = vec![0u8; 39];
        bytes[36] = 0;
        bytes[37] = 2;
        let c = BinaryCursor::new(&bytes);
        let err = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU16At2)
            .starting_at(36)
            .walk(&c, |_| Flow::Continue)
            .unwrap_err();
        assert!(matches!(
            err,
            WalkerError::HeaderTruncated { offset: 36, .. }
        ));
    }

    #[test]
    fn dispatcher_abort_stops_the_walk() {
        let bytes = table(&[(0, 8), (7, 8), (0, 8)], 60);
        let c = BinaryCursor::new(&bytes);
        let mut visited = 0;
        let err = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8)
            .starting_at(36)
            .walk(&c, |r| {
                visited += 1;
                if r.kind == 7 {
                    Flow::Abort("unknown type".into())
                } else {
                    Flow::Continue
                }
            })
            .unwrap_err();
        assert_eq!(visited, 2);
        assert_eq!(
            err,
            WalkerError::DispatcherAborted {
                offset: 44,
                reason: "unknown type".into()
            }
        );
    }

    #[test]
    fn record_views_are_bounded() {
        let mut bytes = table(&[(3, 6)], 48);
        bytes[40] = 0xAA;
        let c = BinaryCursor::new(&bytes);
        let rec = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8)
            .record_at(&c, 36)
            .unwrap();
        assert_eq!(rec.bytes().len(), 6);
        let rc = rec.cursor();
        assert_eq!(rc.read_u8(4), Ok(0xAA));
        assert!(rc.read_u8(6).is_err());
    }

    #[test]
    fn fixed_stride_ignores_declared_length_for_stepping() {
        // Four overlapping records on a 2-byte grid.
        let mut bytes = vec![0u8; 44];
        for (slot, len) in [6u8, 6, 4, 2].into_iter().enumerate() {
            bytes[36 + slot * 2] = u8::try_from(slot).unwrap();
            bytes[36 + slot * 2 + 1] = len;
        }
        let c = BinaryCursor::new(&bytes);
        let walker = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8).starting_at(36);

        let by_length: Vec<u32> = walker.records(&c).map(|r| r.unwrap().kind).collect();
        assert_eq!(by_length, [0, 3]);

        let stride = NonZeroUsize::new(2).unwrap();
        let by_stride: Vec<u32> = walker
            .advancing_by(AdvanceBy::FixedStride(stride))
            .records(&c)
            .map(|r| r.unwrap().kind)
            .collect();
        assert_eq!(by_stride, [0, 1, 2, 3]);
    }

    #[test]
    fn iterator_is_fused_after_error() {
        let bytes = table(&[(0, 0)], 40);
        let c = BinaryCursor::new(&bytes);
        let mut it = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU8)
            .starting_at(36)
            .records(&c);
        assert!(matches!(it.next(), Some(Err(_))));
        assert!(it.next().is_none());
        assert!(it.next().is_none());
    }

    #[test]
    fn start_past_limit_is_an_empty_walk() {
        let bytes = vec![0u8; 36];
        let c = BinaryCursor::new(&bytes);
        let summary = SubstructureWalker::new(SubHeaderLayout::TypeU16LengthU16)
            .starting_at(40)
            .walk(&c, |_| Flow::Continue)
            .unwrap();
        assert_eq!(summary.records, 0);
    }
}
