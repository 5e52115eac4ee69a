//! The occurrence store: point lookups, aggregates, and status walks.

use crate::gridref::grid_ref_path;
use bytes::Bytes;
use quadrat_codec::node::{decode_and_follow, decode_node, NodeSummary};
use quadrat_codec::trailer::{DatasetMeta, DatasetTrailer};
use quadrat_common::{sub_grid, Country, QuadratError, Result, Status, MAX_PRECISION};
use std::collections::BTreeSet;

/// Regrouping function for display-time partition coarsening.
///
/// Receives a country root's per-partition child frequencies in dataset
/// order and returns the coarsened frequencies (for example, eight date
/// classes collapsed to a recent/historical pair).
pub type RegroupFn<'a> = &'a dyn Fn(&[u64]) -> Vec<u64>;

/// A loaded, immutable occurrence dataset.
///
/// The store owns the dataset buffer and the root offsets parsed from its
/// trailer; every query is a read-only traversal that decodes nodes
/// transiently, so one store can serve concurrent queries.
#[derive(Debug, Clone)]
pub struct GridOccurrenceStore {
    pub(crate) buffer: Bytes,
    pub(crate) meta: DatasetMeta,
    pub(crate) trailer: DatasetTrailer,
}

impl GridOccurrenceStore {
    /// Opens a store over a completed dataset buffer.
    ///
    /// Parses the trailer and the metadata blob; an empty buffer is a load
    /// failure, a short or unreadable one is corrupt data.
    pub fn open(buffer: Bytes) -> Result<Self> {
        if buffer.is_empty() {
            return Err(QuadratError::LoadFailure(
                "dataset buffer is empty".to_string(),
            ));
        }
        let trailer = DatasetTrailer::read(&buffer)?;
        let meta = DatasetMeta::read(&buffer, trailer.meta_offset as usize)?;
        Ok(Self {
            buffer,
            meta,
            trailer,
        })
    }

    /// Dataset metadata parsed at load time.
    pub fn meta(&self) -> &DatasetMeta {
        &self.meta
    }

    /// Number of frequency partitions interleaved per node.
    pub fn partitions(&self) -> usize {
        self.meta.number_of_partitions
    }

    /// Root node offset for a country, `None` when the dataset has no
    /// data there.
    pub fn root(&self, country: Country) -> Option<usize> {
        self.trailer.root(country)
    }

    /// Decodes the single country-level node.
    pub fn lookup_country_level(&self, country: Country) -> Result<Option<NodeSummary>> {
        match self.trailer.root(country) {
            None => Ok(None),
            Some(offset) => {
                let (summary, _) = decode_node(&self.buffer, offset, self.partitions())?;
                Ok(Some(summary))
            }
        }
    }

    /// Point lookup: the chain of node summaries along a grid reference's
    /// descent path, one per precision level reached.
    ///
    /// Stops where the path is exhausted or a level has no child. Returns
    /// an empty chain when the country has no root; a malformed reference
    /// also yields an empty chain rather than failing the query.
    pub fn lookup_by_reference(
        &self,
        reference: &str,
        country: Country,
    ) -> Result<Vec<NodeSummary>> {
        let Some(root) = self.trailer.root(country) else {
            return Ok(Vec::new());
        };
        let path = match grid_ref_path(reference, country) {
            Ok(path) => path,
            Err(QuadratError::MalformedReference { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut chain = Vec::new();
        let mut next = Some(root);
        let mut level_idx = 0;
        while let Some(offset) = next {
            let (summary, follow) =
                decode_and_follow(&self.buffer, offset, self.partitions(), &path, level_idx)?;
            chain.push(summary);
            next = follow;
            level_idx += 1;
        }
        Ok(chain)
    }

    /// Sums child frequencies across the country roots into
    /// `target_partitions` buckets.
    ///
    /// With `target_partitions == 1` the whole-node child total is used.
    /// A regroup function, when supplied, coarsens each country's native
    /// partition vector before summing; without one the dataset's
    /// partition count must already match the target.
    pub fn aggregate_top_level(
        &self,
        target_partitions: usize,
        regroup: Option<RegroupFn<'_>>,
    ) -> Result<Vec<u64>> {
        let mut totals = vec![0u64; target_partitions];
        for country in Country::ALL {
            let Some(summary) = self.lookup_country_level(country)? else {
                continue;
            };

            match regroup {
                Some(regroup) => {
                    let native: Vec<u64> =
                        summary.partitions.iter().map(|p| p.child_freq).collect();
                    let grouped = regroup(&native);
                    if grouped.len() != target_partitions {
                        return Err(QuadratError::PartitionMismatch {
                            expected: target_partitions,
                            actual: grouped.len(),
                        });
                    }
                    for (total, value) in totals.iter_mut().zip(&grouped) {
                        *total += value;
                    }
                }
                None if target_partitions == 1 => totals[0] += summary.child_total,
                None if target_partitions == self.partitions() => {
                    for (total, partition) in totals.iter_mut().zip(&summary.partitions) {
                        *total += partition.child_freq;
                    }
                }
                None => {
                    return Err(QuadratError::PartitionMismatch {
                        expected: target_partitions,
                        actual: self.partitions(),
                    });
                }
            }
        }
        Ok(totals)
    }

    /// Collects the set of statuses present anywhere in the dataset down
    /// to `max_precision`.
    ///
    /// The walk is pruned: a node's children are visited only when some
    /// partition is mixed (finer squares are needed to disambiguate it),
    /// the node actually has descendants, and the next level stays within
    /// `max_precision`. Purely native or alien subtrees cannot change
    /// status by descending, so they are never entered.
    pub fn enumerate_statuses(&self, max_precision: u8) -> Result<BTreeSet<Status>> {
        let max_precision = max_precision.min(MAX_PRECISION);
        let mut statuses = BTreeSet::new();
        for country in Country::ALL {
            if let Some(root) = self.trailer.root(country) {
                self.collect_statuses(root, 1, max_precision, country, &mut statuses)?;
            }
        }
        Ok(statuses)
    }

    fn collect_statuses(
        &self,
        offset: usize,
        level: u8,
        max_precision: u8,
        country: Country,
        statuses: &mut BTreeSet<Status>,
    ) -> Result<()> {
        let (summary, table) = decode_node(&self.buffer, offset, self.partitions())?;

        for partition in &summary.partitions {
            // A partition with no occurrences has nothing on the map.
            if partition.child_freq + partition.residual_freq > 0 {
                statuses.insert(partition.status);
            }
        }

        if !summary.has_mixed_status() || summary.child_total == 0 || level >= max_precision {
            return Ok(());
        }
        let Some(table) = table else {
            return Ok(());
        };

        let grid = sub_grid(level, country);
        for cell in 0..grid.len() {
            if let Some(child) = table.child_offset(&self.buffer, cell)? {
                self.collect_statuses(child, level + 1, max_precision, country, statuses)?;
            }
        }
        Ok(())
    }
}
