//! Dataset buffer writer.
//!
//! Builds a complete dataset buffer from in-memory occurrence trees.
//! Nodes are emitted post-order so every child pointer is a backward
//! relative distance, and field widths are chosen minimally per node.
//! The metadata blob is written first, which keeps byte offset 0 occupied:
//! a root offset of 0 in the trailer means "no data" and must never name
//! a real node.

use crate::trailer::{DatasetMeta, DatasetTrailer};
use crate::uint::{min_width, write_uint};
use bytes::{Bytes, BytesMut};
use quadrat_common::{sub_grid, Country, QuadratError, Result, Status, MAX_PRECISION};
use std::collections::BTreeMap;

/// Status and own-level frequency for one partition of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreePartition {
    /// Establishment status.
    pub status: Status,
    /// Occurrences recorded at this node's own precision level.
    pub residual: u64,
}

/// One node of an occurrence tree under construction.
///
/// Children are keyed by sub-grid cell index at the node's precision
/// level; child frequencies are derived during encoding, never stored.
#[derive(Debug, Clone)]
pub struct TreeNode {
    partitions: Vec<TreePartition>,
    children: BTreeMap<usize, TreeNode>,
}

impl TreeNode {
    /// Creates a node with the given partition count, all partitions
    /// unknown and empty.
    pub fn new(partitions: usize) -> Self {
        Self {
            partitions: vec![
                TreePartition {
                    status: Status::Unknown,
                    residual: 0,
                };
                partitions
            ],
            children: BTreeMap::new(),
        }
    }

    /// Creates a single-partition node.
    pub fn single(status: Status, residual: u64) -> Self {
        let mut node = Self::new(1);
        node.set_partition(0, status, residual);
        node
    }

    /// Sets one partition's status and residual frequency.
    pub fn set_partition(&mut self, index: usize, status: Status, residual: u64) -> &mut Self {
        self.partitions[index] = TreePartition { status, residual };
        self
    }

    /// Returns the child at a sub-grid cell, creating it if absent.
    pub fn child_mut(&mut self, cell: usize) -> &mut TreeNode {
        let partitions = self.partitions.len();
        self.children
            .entry(cell)
            .or_insert_with(|| TreeNode::new(partitions))
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Writes per-country occurrence trees as one dataset buffer.
pub struct TreeWriter {
    meta: DatasetMeta,
    roots: [Option<TreeNode>; 3],
}

/// Trailer slot for a country.
fn country_slot(country: Country) -> usize {
    match country {
        Country::Gb => 0,
        Country::Ie => 1,
        Country::Ci => 2,
    }
}

impl TreeWriter {
    /// Creates a writer for a dataset with the given metadata.
    pub fn new(meta: DatasetMeta) -> Self {
        Self {
            meta,
            roots: [None, None, None],
        }
    }

    /// Replaces a country's tree.
    pub fn set_root(&mut self, country: Country, node: TreeNode) {
        self.roots[country_slot(country)] = Some(node);
    }

    /// Returns a country's root, creating an empty one if absent.
    pub fn root_mut(&mut self, country: Country) -> &mut TreeNode {
        let partitions = self.meta.number_of_partitions;
        self.roots[country_slot(country)].get_or_insert_with(|| TreeNode::new(partitions))
    }

    /// Encodes the dataset and returns the finished buffer.
    pub fn finish(&self) -> Result<Bytes> {
        self.meta.validate()?;

        let mut out = BytesMut::new();
        self.meta.write(&mut out)?;

        let mut roots = [0u32; 3];
        for country in Country::ALL {
            if let Some(node) = &self.roots[country_slot(country)] {
                let (offset, _) = self.encode_node(&mut out, node, 1, country)?;
                roots[country_slot(country)] = u32::try_from(offset).map_err(|_| {
                    QuadratError::CorruptData("dataset exceeds 32-bit addressing".to_string())
                })?;
            }
        }

        DatasetTrailer {
            meta_offset: 0,
            roots,
        }
        .write(&mut out);
        Ok(out.freeze())
    }

    /// Encodes a node and its subtree; returns the node's offset and its
    /// per-partition totals (residual plus everything below).
    fn encode_node(
        &self,
        out: &mut BytesMut,
        node: &TreeNode,
        level: u8,
        country: Country,
    ) -> Result<(usize, Vec<u64>)> {
        let partitions = self.meta.number_of_partitions;
        if node.partitions.len() != partitions {
            return Err(QuadratError::PartitionMismatch {
                expected: partitions,
                actual: node.partitions.len(),
            });
        }

        let is_leaf = node.children.is_empty();
        if !is_leaf && level > MAX_PRECISION {
            return Err(QuadratError::CorruptData(format!(
                "node below precision level {} cannot have children",
                MAX_PRECISION
            )));
        }

        // Children first, so every pointer in the table runs backward.
        let mut child_offsets: BTreeMap<usize, usize> = BTreeMap::new();
        let mut child_freq = vec![0u64; partitions];
        if !is_leaf {
            let grid = sub_grid(level, country);
            for (&cell, child) in &node.children {
                if cell >= grid.len() {
                    return Err(QuadratError::CorruptData(format!(
                        "cell index {} outside the {}-cell grid at level {}",
                        cell,
                        grid.len(),
                        level
                    )));
                }
                let (offset, totals) = self.encode_node(out, child, level + 1, country)?;
                child_offsets.insert(cell, offset);
                for (sum, total) in child_freq.iter_mut().zip(&totals) {
                    *sum += total;
                }
            }
        }

        let node_offset = out.len();

        // Minimal frequency width across every field this node stores.
        let mut max_freq = 0u64;
        for (partition, &child) in node.partitions.iter().zip(&child_freq) {
            max_freq = max_freq.max(partition.residual);
            if !is_leaf {
                max_freq = max_freq.max(child);
            }
        }
        let max_freq = u32::try_from(max_freq).map_err(|_| {
            QuadratError::CorruptData("frequency exceeds 32-bit range".to_string())
        })?;
        let freq_width = min_width(max_freq);

        // Minimal pointer width across the child table.
        let offset_width = if is_leaf {
            0
        } else {
            let max_relative = child_offsets
                .values()
                .map(|&offset| (node_offset - offset) as u32)
                .max()
                .unwrap_or(1);
            min_width(max_relative)
        };

        let mut packed_status = 0u32;
        for (i, partition) in node.partitions.iter().enumerate() {
            packed_status |= (partition.status.code() as u32) << (4 * i);
        }
        write_uint(out, packed_status, 4);
        out.extend_from_slice(&[(freq_width << 4) | offset_width]);

        for (partition, &child) in node.partitions.iter().zip(&child_freq) {
            if !is_leaf {
                write_uint(out, child as u32, freq_width);
            }
            write_uint(out, partition.residual as u32, freq_width);
        }

        if !is_leaf {
            let grid = sub_grid(level, country);
            for cell in 0..grid.len() {
                let relative = child_offsets
                    .get(&cell)
                    .map(|&offset| (node_offset - offset) as u32)
                    .unwrap_or(0);
                write_uint(out, relative, offset_width);
            }
        }

        let totals = node
            .partitions
            .iter()
            .zip(&child_freq)
            .map(|(partition, &child)| partition.residual + child)
            .collect();
        Ok((node_offset, totals))
    }
}
