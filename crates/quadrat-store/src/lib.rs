//! Occurrence store and spatial range queries for Quadrat.
//!
//! This crate provides:
//! - Grid reference to descent-path translation for GB, IE and CI
//! - The read-only occurrence store over a loaded dataset buffer
//! - Point lookups, top-level aggregates, and pruned status enumeration
//! - The windowed spatial range query ("tile tree") map renderers call
//! - Dataset loading with one-shot observer notification

mod gridref;
mod loader;
mod store;
mod tile;

pub use gridref::grid_ref_path;
pub use loader::{DatasetLoader, LoadEvent};
pub use store::{GridOccurrenceStore, RegroupFn};
pub use tile::{Tile, TileQuery, TileSquare};
