//! Occurrence status codes.

use serde::{Deserialize, Serialize};

/// Establishment status recorded for one partition of a node.
///
/// Stored on the wire as a 4-bit code; the mapping to and from the code
/// happens at the codec boundary only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    /// No data recorded, or status not known.
    Unknown = 0,
    /// Native occurrences only.
    Native = 1,
    /// Alien (introduced) occurrences only.
    Alien = 2,
    /// Both native and alien occurrences below this square.
    Mixed = 3,
    /// Casual (non-persistent) occurrences.
    Casual = 4,
}

impl Status {
    /// Decodes a 4-bit wire code. Out-of-range codes map to Unknown.
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Status::Native,
            2 => Status::Alien,
            3 => Status::Mixed,
            4 => Status::Casual,
            _ => Status::Unknown,
        }
    }

    /// Returns the 4-bit wire code for this status.
    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Returns the single-character legend symbol for this status.
    pub fn symbol(&self) -> char {
        match self {
            Status::Unknown => '-',
            Status::Native => '+',
            Status::Alien => 'x',
            Status::Mixed => '?',
            Status::Casual => '~',
        }
    }

    /// True for squares whose status can only be disambiguated by
    /// descending to finer precision.
    pub fn is_mixed(&self) -> bool {
        matches!(self, Status::Mixed)
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Status::Unknown => "unknown",
            Status::Native => "native",
            Status::Alien => "alien",
            Status::Mixed => "mixed",
            Status::Casual => "casual",
        };
        write!(f, "{}", name)
    }
}
