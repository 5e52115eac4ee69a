//! Binary wire format for Quadrat occurrence quadtrees.
//!
//! This crate provides:
//! - Variable-width little-endian integer reads and writes
//! - Occurrence-node decoding with transient child-table views
//! - Dataset trailer and UTF-16 JSON metadata parsing
//! - A tree writer producing complete dataset buffers
//!
//! The format is the persisted/transmitted contract for pre-built atlas
//! datasets and must stay bit-exact for interoperability with existing
//! encoders.

pub mod node;
pub mod trailer;
pub mod uint;
pub mod writer;

pub use node::{decode_and_follow, decode_node, ChildTable, NodeSummary, PartitionSummary};
pub use trailer::{DatasetMeta, DatasetTrailer, TRAILER_LEN};
pub use uint::{min_width, read_uint, write_uint};
pub use writer::{TreeNode, TreeWriter};
