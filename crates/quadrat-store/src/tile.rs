//! Windowed spatial range queries ("tile trees").
//!
//! A map renderer calls [`GridOccurrenceStore::tile_tree`] with a viewport
//! rectangle and a zoom-derived precision window, and receives the squares
//! it should draw: a flat list of [`TileSquare`] records plus the nested
//! [`Tile`] tree for hierarchical reasoning.

use crate::store::GridOccurrenceStore;
use quadrat_codec::node::{decode_node, PartitionSummary};
use quadrat_common::{cell_index, cell_size, sub_grid, Country, Result, MAX_PRECISION};

/// A viewport rectangle with precision bounds.
///
/// Coordinates are metres in the country's grid space; the rectangle is
/// half-open, so squares touching only `max_x`/`max_y` are excluded.
/// Viewports may extend past the country (or below zero); the query clamps
/// them to the valid bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileQuery {
    /// West edge in metres.
    pub min_x: i64,
    /// South edge in metres.
    pub min_y: i64,
    /// East edge in metres (exclusive).
    pub max_x: i64,
    /// North edge in metres (exclusive).
    pub max_y: i64,
    /// Shallowest precision level to emit.
    pub min_precision: u8,
    /// Deepest precision level to descend to; deeper data folds into the
    /// tiles at this level.
    pub max_precision: u8,
    /// Emit residual squares even when the square also has children.
    /// Without this, residue is only ever plotted standalone, never
    /// underneath a deeper plot.
    pub include_residue: bool,
}

impl TileQuery {
    /// A query covering a country's full extent at the given precision
    /// window.
    pub fn full_extent(country: Country, min_precision: u8, max_precision: u8) -> Self {
        Self {
            min_x: 0,
            min_y: 0,
            max_x: country.extent_x() as i64,
            max_y: country.extent_y() as i64,
            min_precision,
            max_precision,
            include_residue: false,
        }
    }
}

/// Clamped query rectangle in unsigned metres.
#[derive(Debug, Clone, Copy)]
struct Rect {
    min_x: u64,
    min_y: u64,
    max_x: u64,
    max_y: u64,
}

/// A node of the nested result tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Precision level of this square (1 = country frame).
    pub precision: u8,
    /// West edge of the square in metres.
    pub x: u64,
    /// South edge of the square in metres.
    pub y: u64,
    /// Extent in metres; equal to the height except for the level-1
    /// country frame, which covers the whole (non-square) grid.
    pub width: u64,
    /// North-south extent in metres.
    pub height: u64,
    /// Per-partition breakdown.
    pub partitions: Vec<PartitionSummary>,
    /// Sum of child frequencies across partitions (0 once folded).
    pub child_total: u64,
    /// Sum of residual frequencies across partitions.
    pub residual_total: u64,
    /// Children intersecting the query, in cell iteration order.
    pub children: Vec<Tile>,
}

/// A flat renderer-facing square: position, size, frequencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSquare {
    /// Precision level of this square.
    pub precision: u8,
    /// West edge in metres.
    pub x: u64,
    /// South edge in metres.
    pub y: u64,
    /// East-west extent in metres.
    pub width: u64,
    /// North-south extent in metres.
    pub height: u64,
    /// Per-partition breakdown.
    pub partitions: Vec<PartitionSummary>,
    /// Sum of child frequencies across partitions.
    pub child_total: u64,
    /// Sum of residual frequencies across partitions.
    pub residual_total: u64,
}

impl From<&Tile> for TileSquare {
    fn from(tile: &Tile) -> Self {
        Self {
            precision: tile.precision,
            x: tile.x,
            y: tile.y,
            width: tile.width,
            height: tile.height,
            partitions: tile.partitions.clone(),
            child_total: tile.child_total,
            residual_total: tile.residual_total,
        }
    }
}

impl GridOccurrenceStore {
    /// Extracts the tile tree for a viewport.
    ///
    /// Appends every square that should be plotted to `out` and returns
    /// the nested tree, or `None` when the country has no data or the
    /// rectangle misses its bounds entirely (decided before any decode).
    pub fn tile_tree(
        &self,
        out: &mut Vec<TileSquare>,
        country: Country,
        query: &TileQuery,
    ) -> Result<Option<Tile>> {
        let Some(root) = self.root(country) else {
            return Ok(None);
        };

        let min_precision = query.min_precision.max(1);
        let max_precision = query.max_precision.clamp(1, MAX_PRECISION);

        let extent_x = country.extent_x();
        let extent_y = country.extent_y();
        let rect = Rect {
            min_x: query.min_x.clamp(0, extent_x as i64) as u64,
            min_y: query.min_y.clamp(0, extent_y as i64) as u64,
            max_x: query.max_x.clamp(0, extent_x as i64) as u64,
            max_y: query.max_y.clamp(0, extent_y as i64) as u64,
        };
        if rect.min_x >= rect.max_x || rect.min_y >= rect.max_y {
            return Ok(None);
        }

        let frame = Frame {
            country,
            min_precision,
            max_precision,
            include_residue: query.include_residue,
        };
        self.tile_frame(out, &frame, root, 1, 0, 0, extent_x, extent_y, rect)
            .map(Some)
    }

    /// One recursive step of the walk: the node at `offset` covering the
    /// square at `(origin_x, origin_y)`.
    #[allow(clippy::too_many_arguments)]
    fn tile_frame(
        &self,
        out: &mut Vec<TileSquare>,
        frame: &Frame,
        offset: usize,
        level: u8,
        origin_x: u64,
        origin_y: u64,
        width: u64,
        height: u64,
        rect: Rect,
    ) -> Result<Tile> {
        let (summary, table) = decode_node(&self.buffer, offset, self.partitions())?;

        if level >= frame.max_precision {
            // Terminal zoom level: the caller capped the depth, so data
            // below it folds up into this square rather than dropping.
            let partitions: Vec<PartitionSummary> = summary
                .partitions
                .iter()
                .map(|p| PartitionSummary {
                    status: p.status,
                    child_freq: 0,
                    residual_freq: p.residual_freq + p.child_freq,
                })
                .collect();
            let tile = Tile {
                precision: level,
                x: origin_x,
                y: origin_y,
                width,
                height,
                partitions,
                child_total: 0,
                residual_total: summary.residual_total + summary.child_total,
                children: Vec::new(),
            };
            if level >= frame.min_precision {
                out.push(TileSquare::from(&tile));
            }
            return Ok(tile);
        }

        let mut tile = Tile {
            precision: level,
            x: origin_x,
            y: origin_y,
            width,
            height,
            partitions: summary.partitions.clone(),
            child_total: summary.child_total,
            residual_total: summary.residual_total,
            children: Vec::new(),
        };

        // Residue is plotted standalone: a square whose occurrences are
        // all pushed down plots as its children instead.
        if tile.residual_total > 0
            && level >= frame.min_precision
            && (frame.include_residue || summary.child_total == 0)
        {
            out.push(TileSquare::from(&tile));
        }

        if summary.child_total > 0 {
            if let Some(table) = table {
                let grid = sub_grid(level, frame.country);
                let cell = cell_size(level);

                // Half-open covering range: cells on the rectangle's upper
                // bound are excluded.
                let lo_x = ((rect.min_x - origin_x) / cell) as u32;
                let hi_x = (((rect.max_x - origin_x) + cell - 1) / cell).min(grid.cols as u64) as u32;
                let lo_y = ((rect.min_y - origin_y) / cell) as u32;
                let hi_y = (((rect.max_y - origin_y) + cell - 1) / cell).min(grid.rows as u64) as u32;

                for cx in lo_x..hi_x {
                    for cy in lo_y..hi_y {
                        let index = cell_index(level, grid, cx, cy);
                        let Some(child) = table.child_offset(&self.buffer, index)? else {
                            continue;
                        };

                        let child_x = origin_x + cx as u64 * cell;
                        let child_y = origin_y + cy as u64 * cell;
                        let child_rect = Rect {
                            min_x: rect.min_x.max(child_x),
                            min_y: rect.min_y.max(child_y),
                            max_x: rect.max_x.min(child_x + cell),
                            max_y: rect.max_y.min(child_y + cell),
                        };
                        let child_tile = self.tile_frame(
                            out,
                            frame,
                            child,
                            level + 1,
                            child_x,
                            child_y,
                            cell,
                            cell,
                            child_rect,
                        )?;
                        tile.children.push(child_tile);
                    }
                }
            }
        }

        Ok(tile)
    }
}

/// Query parameters that stay fixed across the recursive walk.
struct Frame {
    country: Country,
    min_precision: u8,
    max_precision: u8,
    include_residue: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use quadrat_codec::trailer::DatasetMeta;
    use quadrat_codec::writer::TreeWriter;
    use quadrat_common::Status;

    /// GB dataset: residual 1 at country level, hectad data inside 100 km
    /// square SD (cell 31, easting 3, northing 4).
    fn gb_store() -> GridOccurrenceStore {
        let mut writer = TreeWriter::new(DatasetMeta::with_partitions(1));
        let root = writer.root_mut(Country::Gb);
        root.set_partition(0, Status::Mixed, 1);
        let sd = root.child_mut(31);
        sd.set_partition(0, Status::Mixed, 2);
        sd.child_mut(56).set_partition(0, Status::Native, 4);
        sd.child_mut(9).set_partition(0, Status::Alien, 8);
        GridOccurrenceStore::open(writer.finish().unwrap()).unwrap()
    }

    fn open_store(buffer: Bytes) -> GridOccurrenceStore {
        GridOccurrenceStore::open(buffer).unwrap()
    }

    #[test]
    fn test_missing_country_returns_none() {
        let store = gb_store();
        let mut out = Vec::new();
        let tile = store
            .tile_tree(&mut out, Country::Ie, &TileQuery::full_extent(Country::Ie, 1, 3))
            .unwrap();
        assert!(tile.is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn test_rectangle_outside_bounds_returns_none() {
        let store = gb_store();
        let mut out = Vec::new();
        let query = TileQuery {
            min_x: -500_000,
            min_y: -500_000,
            max_x: 0,
            max_y: 0,
            min_precision: 1,
            max_precision: 3,
            include_residue: false,
        };
        assert!(store.tile_tree(&mut out, Country::Gb, &query).unwrap().is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn test_terminal_precision_folds_children() {
        let store = gb_store();
        let mut out = Vec::new();
        let query = TileQuery::full_extent(Country::Gb, 1, 1);
        let tile = store
            .tile_tree(&mut out, Country::Gb, &query)
            .unwrap()
            .unwrap();

        assert!(tile.children.is_empty());
        assert_eq!(tile.child_total, 0);
        assert_eq!(tile.residual_total, 15); // 1 + 2 + 4 + 8 folded up
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].residual_total, 15);
        assert_eq!(out[0].child_total, 0);
    }

    #[test]
    fn test_full_extent_conserves_totals() {
        let store = gb_store();
        let root = store.lookup_country_level(Country::Gb).unwrap().unwrap();

        for max_precision in 1..=4u8 {
            let mut out = Vec::new();
            let query = TileQuery::full_extent(Country::Gb, 1, max_precision);
            let tile = store
                .tile_tree(&mut out, Country::Gb, &query)
                .unwrap()
                .unwrap();
            assert_eq!(
                tile.residual_total + tile.child_total,
                root.residual_total + root.child_total,
                "totals not conserved at max precision {}",
                max_precision
            );
        }
    }

    #[test]
    fn test_residue_only_plotted_standalone() {
        let store = gb_store();
        let mut out = Vec::new();
        let query = TileQuery::full_extent(Country::Gb, 1, 3);
        store.tile_tree(&mut out, Country::Gb, &query).unwrap();

        // The country frame and square SD both have residue and children:
        // neither plots. The two hectads plot.
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|square| square.precision == 3));
        let mut totals: Vec<u64> = out.iter().map(|s| s.residual_total).collect();
        totals.sort_unstable();
        assert_eq!(totals, vec![4, 8]);
    }

    #[test]
    fn test_include_residue_plots_overlapping_squares() {
        let store = gb_store();
        let mut out = Vec::new();
        let mut query = TileQuery::full_extent(Country::Gb, 1, 3);
        query.include_residue = true;
        store.tile_tree(&mut out, Country::Gb, &query).unwrap();

        // Country frame, square SD, and both hectads.
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_min_precision_suppresses_shallow_squares() {
        let store = gb_store();
        let mut out = Vec::new();
        let mut query = TileQuery::full_extent(Country::Gb, 3, 3);
        query.include_residue = true;
        store.tile_tree(&mut out, Country::Gb, &query).unwrap();

        // Residue at precision 1 and 2 is suppressed by min_precision.
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|square| square.precision == 3));
    }

    #[test]
    fn test_window_prunes_cells() {
        let store = gb_store();

        // Hectad 56 of SD spans [350_000, 360_000) x [460_000, 470_000).
        let query = TileQuery {
            min_x: 350_000,
            min_y: 460_000,
            max_x: 360_000,
            max_y: 470_000,
            min_precision: 1,
            max_precision: 3,
            include_residue: false,
        };
        let mut out = Vec::new();
        let tile = store
            .tile_tree(&mut out, Country::Gb, &query)
            .unwrap()
            .unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].x, 350_000);
        assert_eq!(out[0].y, 460_000);
        assert_eq!(out[0].width, 10_000);
        assert_eq!(out[0].residual_total, 4);

        // The nested tree narrows the same way.
        assert_eq!(tile.children.len(), 1);
        assert_eq!(tile.children[0].children.len(), 1);
    }

    #[test]
    fn test_upper_bound_cells_excluded() {
        let store = gb_store();

        // A rectangle ending exactly on hectad 56's west edge must not
        // pick it up.
        let query = TileQuery {
            min_x: 340_000,
            min_y: 460_000,
            max_x: 350_000,
            max_y: 470_000,
            min_precision: 1,
            max_precision: 3,
            include_residue: false,
        };
        let mut out = Vec::new();
        store.tile_tree(&mut out, Country::Gb, &query).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_zero_child_total_never_recurses() {
        // A node whose table has entries but whose child frequencies sum
        // to zero must not be descended.
        let mut writer = TreeWriter::new(DatasetMeta::with_partitions(1));
        let root = writer.root_mut(Country::Ci);
        root.set_partition(0, Status::Native, 3);
        root.child_mut(0).set_partition(0, Status::Native, 0);
        let store = open_store(writer.finish().unwrap());

        let mut out = Vec::new();
        let query = TileQuery::full_extent(Country::Ci, 1, 4);
        let tile = store
            .tile_tree(&mut out, Country::Ci, &query)
            .unwrap()
            .unwrap();
        assert!(tile.children.is_empty());
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].residual_total, 3);
    }

    #[test]
    fn test_eight_partition_breakdown_survives() {
        let mut writer = TreeWriter::new(DatasetMeta::with_partitions(8));
        let root = writer.root_mut(Country::Ie);
        for i in 0..8 {
            root.set_partition(i, Status::Native, (i as u64 + 1) * 10);
        }
        let store = open_store(writer.finish().unwrap());

        let mut out = Vec::new();
        let query = TileQuery::full_extent(Country::Ie, 1, 1);
        store.tile_tree(&mut out, Country::Ie, &query).unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].partitions.len(), 8);
        for (i, partition) in out[0].partitions.iter().enumerate() {
            assert_eq!(partition.residual_freq, (i as u64 + 1) * 10);
            assert_eq!(partition.child_freq, 0);
        }
    }
}
