//! # VIOT: Virtual I/O Translation Table
//!
//! Describes which paravirtualized IOMMU translates DMA for which
//! endpoints. The fixed part holds the node count and the offset of the
//! first node; every node starts with `u8` type, reserved byte, `u16` length.
//!
//! ```text
//! 36  Node Count          2
//! 38  Node Offset         2   >= 48
//! 40  Reserved            8
//! ```
//!
//! Endpoint nodes (PCI range, MMIO) name their IOMMU through an
//! `Output Node` table offset, which must land on a virtio-pci or
//! virtio-mmio IOMMU node.

use crate::common::{Checker, begin, finish};
use alloc::vec::Vec;
use fwts_acpi::{
    BinaryCursor, CursorError, Flow, RawTable, Signature, SubHeaderLayout, SubRecord,
    SubstructureWalker, TableHeader, validators,
};
use fwts_report::{Severity, ValidationReport};
use log::debug;

/// Size of the fixed part; nodes may not start before it.
pub const FIXED_LENGTH: usize = TableHeader::SIZE + 12;

/// VIOT node types.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeType {
    PciRange,
    MmioEndpoint,
    VirtioPciIommu,
    VirtioMmioIommu,
}

impl NodeType {
    #[must_use]
    pub const fn from_kind(kind: u32) -> Option<Self> {
        match kind {
            1 => Some(Self::PciRange),
            2 => Some(Self::MmioEndpoint),
            3 => Some(Self::VirtioPciIommu),
            4 => Some(Self::VirtioMmioIommu),
            _ => None,
        }
    }

    #[must_use]
    pub const fn length(self) -> usize {
        match self {
            Self::PciRange | Self::MmioEndpoint => 24,
            Self::VirtioPciIommu | Self::VirtioMmioIommu => 16,
        }
    }

    #[must_use]
    pub const fn is_iommu(self) -> bool {
        matches!(self, Self::VirtioPciIommu | Self::VirtioMmioIommu)
    }
}

/// An endpoint's reference to its translating IOMMU.
struct OutputRef {
    node: usize,
    target: usize,
}

#[derive(Default)]
struct Nodes {
    iommus: Vec<usize>,
    outputs: Vec<OutputRef>,
}

pub fn check(table: &RawTable<'_>, report: &mut ValidationReport) {
    let mut chk = Checker::new("VIOT", report);
    let Some(ctx) = begin(table, Signature::VIOT, FIXED_LENGTH, &mut chk) else {
        return;
    };

    let (count, offset) = match check_fixed(&ctx.cursor, &mut chk) {
        Ok(fixed) => fixed,
        Err(e) => {
            chk.cursor_error(&e);
            finish(&mut chk);
            return;
        }
    };
    if offset < FIXED_LENGTH {
        chk.fail(
            Severity::High,
            "BadNodeOffset",
            format_args!("Node Offset {offset:#x} points inside the fixed part (< {FIXED_LENGTH:#x})"),
        );
        finish(&mut chk);
        return;
    }

    let mut nodes = Nodes::default();
    let result = SubstructureWalker::new(SubHeaderLayout::TypeU8LengthU16At2)
        .starting_at(offset)
        .walk(&ctx.cursor, |node| {
            if let Err(e) = check_node(&node, &mut nodes, &mut chk) {
                chk.cursor_error(&e);
            }
            Flow::Continue
        });

    // Nodes at or past a failed walk's stop offset were never seen.
    let walked_to = match result {
        Ok(summary) => {
            debug!("VIOT: {} nodes", summary.records);
            if summary.records != usize::from(count) {
                chk.fail(
                    Severity::Medium,
                    "NodeCountMismatch",
                    format_args!(
                        "Node Count is {count} but {} nodes were found",
                        summary.records
                    ),
                );
            }
            None
        }
        Err(e) => {
            chk.walk_error(&e);
            Some(e.offset())
        }
    };

    for out in &nodes.outputs {
        if walked_to.is_some_and(|end| out.target >= end) {
            debug!(
                "VIOT: output node {:#x} lies past the end of the walk, not resolved",
                out.target
            );
            continue;
        }
        if !nodes.iommus.contains(&out.target) {
            chk.fail(
                Severity::High,
                "BadOutputNode",
                format_args!(
                    "node at {:#x} has Output Node {:#x}, which is not an IOMMU node",
                    out.node, out.target
                ),
            );
        }
    }
    finish(&mut chk);
}

fn check_fixed(c: &BinaryCursor<'_>, chk: &mut Checker<'_>) -> Result<(u16, usize), CursorError> {
    let count = c.read_u16(36)?;
    let offset = c.read_u16(38)?;
    chk.field(
        validators::reserved_bytes(c.read_bytes(40, 8)?),
        Severity::Medium,
        "ReservedNonZero",
        "Reserved",
    );
    Ok((count, usize::from(offset)))
}

fn check_node(
    node: &SubRecord<'_>,
    nodes: &mut Nodes,
    chk: &mut Checker<'_>,
) -> Result<(), CursorError> {
    let c = node.cursor();
    chk.field(
        validators::reserved_zero(c.read_u8(1)?),
        Severity::Medium,
        "ReservedNonZero",
        "Node Reserved",
    );

    let Some(kind) = NodeType::from_kind(node.kind) else {
        chk.fail(
            Severity::High,
            "BadNodeType",
            format_args!("node at {:#x} has unknown type {:#x}", node.offset, node.kind),
        );
        return Ok(());
    };
    if !chk.field(
        validators::fixed_value(node.length, kind.length()),
        Severity::High,
        "BadNodeLength",
        "Node Length",
    ) {
        return Ok(());
    }

    match kind {
        NodeType::PciRange => {
            let (seg_start, seg_end) = (c.read_u16(8)?, c.read_u16(10)?);
            let (bdf_start, bdf_end) = (c.read_u16(12)?, c.read_u16(14)?);
            if seg_start > seg_end {
                chk.fail(
                    Severity::Medium,
                    "BadRange",
                    format_args!("PCI range segment start {seg_start:#x} > end {seg_end:#x}"),
                );
            }
            if bdf_start > bdf_end {
                chk.fail(
                    Severity::Medium,
                    "BadRange",
                    format_args!("PCI range BDF start {bdf_start:#x} > end {bdf_end:#x}"),
                );
            }
            nodes.outputs.push(OutputRef {
                node: node.offset,
                target: usize::from(c.read_u16(16)?),
            });
            chk.field(
                validators::reserved_bytes(c.read_bytes(18, 6)?),
                Severity::Medium,
                "ReservedNonZero",
                "PCI Range Reserved",
            );
        }
        NodeType::MmioEndpoint => {
            if c.read_u64(8)? == 0 {
                chk.fail(
                    Severity::Low,
                    "BadBaseAddress",
                    format_args!("MMIO endpoint at {:#x} has a zero base address", node.offset),
                );
            }
            nodes.outputs.push(OutputRef {
                node: node.offset,
                target: usize::from(c.read_u16(16)?),
            });
            chk.field(
                validators::reserved_bytes(c.read_bytes(18, 6)?),
                Severity::Medium,
                "ReservedNonZero",
                "MMIO Endpoint Reserved",
            );
        }
        NodeType::VirtioPciIommu => {
            nodes.iommus.push(node.offset);
            chk.field(
                validators::reserved_bytes(c.read_bytes(8, 8)?),
                Severity::Medium,
                "ReservedNonZero",
                "virtio-pci IOMMU Reserved",
            );
        }
        NodeType::VirtioMmioIommu => {
            nodes.iommus.push(node.offset);
            chk.field(
                validators::reserved_zero(c.read_u32(4)?),
                Severity::Medium,
                "ReservedNonZero",
                "virtio-mmio IOMMU Reserved",
            );
            if c.read_u64(8)? == 0 {
                chk.fail(
                    Severity::Low,
                    "BadBaseAddress",
                    format_args!("virtio-mmio IOMMU at {:#x} has a zero base address", node.offset),
                );
            }
        }
    }
    Ok(())
}
