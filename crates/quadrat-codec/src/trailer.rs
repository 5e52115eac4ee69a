//! Dataset trailer and metadata blob.
//!
//! The last 16 bytes of a dataset buffer hold four little-endian u32s:
//! the offset of the metadata blob, then the root node offsets for gb, ie
//! and ci (0 = no data for that country). The metadata blob is a 4-byte
//! byte-length prefix followed by that many bytes of UTF-16LE JSON text.

use crate::uint::read_uint;
use bytes::BytesMut;
use quadrat_common::{Country, QuadratError, Result};
use serde::{Deserialize, Serialize};

/// Byte length of the dataset trailer.
pub const TRAILER_LEN: usize = 16;

/// The fixed-position trailer at the end of every dataset buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatasetTrailer {
    /// Offset of the length-prefixed metadata blob.
    pub meta_offset: u32,
    /// Root node offsets in gb, ie, ci order; 0 means no data.
    pub roots: [u32; 3],
}

impl DatasetTrailer {
    /// Reads the trailer from the last 16 bytes of the buffer.
    pub fn read(buf: &[u8]) -> Result<Self> {
        if buf.len() < TRAILER_LEN {
            return Err(QuadratError::CorruptData(format!(
                "buffer of {} bytes is too short for a {}-byte trailer",
                buf.len(),
                TRAILER_LEN
            )));
        }
        let base = buf.len() - TRAILER_LEN;
        Ok(Self {
            meta_offset: read_uint(buf, base, 4)?,
            roots: [
                read_uint(buf, base + 4, 4)?,
                read_uint(buf, base + 8, 4)?,
                read_uint(buf, base + 12, 4)?,
            ],
        })
    }

    /// Appends the trailer to a buffer under construction.
    pub fn write(&self, out: &mut BytesMut) {
        out.extend_from_slice(&self.meta_offset.to_le_bytes());
        for root in self.roots {
            out.extend_from_slice(&root.to_le_bytes());
        }
    }

    /// Returns the root node offset for a country, or `None` if the
    /// country has no data in this dataset.
    pub fn root(&self, country: Country) -> Option<usize> {
        let raw = match country {
            Country::Gb => self.roots[0],
            Country::Ie => self.roots[1],
            Country::Ci => self.roots[2],
        };
        (raw != 0).then_some(raw as usize)
    }
}

/// Dataset metadata carried in the JSON blob.
///
/// Only `numberOfPartitions` drives decoding; the descriptive fields are
/// passed through to UI layers untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMeta {
    /// How many parallel frequency partitions are interleaved per node.
    pub number_of_partitions: usize,
    /// Display title of the dataset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Attribution / provenance text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribution: Option<String>,
}

impl DatasetMeta {
    /// Creates metadata with the given partition count and no
    /// descriptive fields.
    pub fn with_partitions(number_of_partitions: usize) -> Self {
        Self {
            number_of_partitions,
            title: None,
            attribution: None,
        }
    }

    /// Validates the partition count against the packed status field.
    pub fn validate(&self) -> Result<()> {
        if !(1..=crate::node::MAX_PARTITIONS).contains(&self.number_of_partitions) {
            return Err(QuadratError::InvalidMetadata(format!(
                "numberOfPartitions {} outside 1-{}",
                self.number_of_partitions,
                crate::node::MAX_PARTITIONS
            )));
        }
        Ok(())
    }

    /// Reads and parses the metadata blob at `meta_offset`.
    pub fn read(buf: &[u8], meta_offset: usize) -> Result<Self> {
        let byte_len = read_uint(buf, meta_offset, 4)? as usize;
        let start = meta_offset + 4;
        if start + byte_len > buf.len() {
            return Err(QuadratError::OutOfBounds {
                offset: start,
                width: byte_len,
                len: buf.len(),
            });
        }
        if byte_len % 2 != 0 {
            return Err(QuadratError::InvalidMetadata(format!(
                "UTF-16 blob has odd byte length {}",
                byte_len
            )));
        }

        let units: Vec<u16> = buf[start..start + byte_len]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let text = String::from_utf16(&units)
            .map_err(|e| QuadratError::InvalidMetadata(e.to_string()))?;

        let meta: DatasetMeta = serde_json::from_str(&text)
            .map_err(|e| QuadratError::InvalidMetadata(e.to_string()))?;
        meta.validate()?;
        Ok(meta)
    }

    /// Appends the length-prefixed UTF-16LE JSON blob to a buffer under
    /// construction.
    pub fn write(&self, out: &mut BytesMut) -> Result<()> {
        self.validate()?;
        let text = serde_json::to_string(self)
            .map_err(|e| QuadratError::InvalidMetadata(e.to_string()))?;

        let units: Vec<u16> = text.encode_utf16().collect();
        out.extend_from_slice(&((units.len() * 2) as u32).to_le_bytes());
        for unit in units {
            out.extend_from_slice(&unit.to_le_bytes());
        }
        Ok(())
    }
}
