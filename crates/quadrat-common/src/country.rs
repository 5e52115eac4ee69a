//! Country definitions for the British Isles national grids.

use crate::error::{QuadratError, Result};
use serde::{Deserialize, Serialize};

/// Linear size of a level-1 (100 km) grid cell in metres.
pub const COUNTRY_CELL_METRES: u64 = 100_000;

/// A country with its own national grid.
///
/// Each country carries the dimensions of its 100 km cell grid and the
/// metre bounds derived from them. Coordinates are always metres from the
/// grid's false origin (south-west corner), eastings then northings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    /// Great Britain (Ordnance Survey national grid).
    Gb,
    /// Ireland (Irish national grid).
    Ie,
    /// Channel Islands (UTM zone 30U squares WA/WV).
    Ci,
}

impl Country {
    /// All countries, in dataset trailer order.
    pub const ALL: [Country; 3] = [Country::Gb, Country::Ie, Country::Ci];

    /// Returns the two-letter country code used in dataset metadata.
    pub fn code(&self) -> &'static str {
        match self {
            Country::Gb => "gb",
            Country::Ie => "ie",
            Country::Ci => "ci",
        }
    }

    /// Parses a country code (case-insensitive).
    pub fn from_code(code: &str) -> Result<Self> {
        match code.to_ascii_lowercase().as_str() {
            "gb" => Ok(Country::Gb),
            "ie" => Ok(Country::Ie),
            "ci" => Ok(Country::Ci),
            _ => Err(QuadratError::UnknownCountry(code.to_string())),
        }
    }

    /// Number of 100 km cell columns in this country's grid.
    pub fn grid_cols(&self) -> u32 {
        match self {
            Country::Gb => 7,
            Country::Ie => 4,
            Country::Ci => 1,
        }
    }

    /// Number of 100 km cell rows in this country's grid.
    pub fn grid_rows(&self) -> u32 {
        match self {
            Country::Gb => 13,
            Country::Ie => 5,
            Country::Ci => 2,
        }
    }

    /// Width of the country's valid coordinate space in metres.
    pub fn extent_x(&self) -> u64 {
        self.grid_cols() as u64 * COUNTRY_CELL_METRES
    }

    /// Height of the country's valid coordinate space in metres.
    pub fn extent_y(&self) -> u64 {
        self.grid_rows() as u64 * COUNTRY_CELL_METRES
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for country in Country::ALL {
            assert_eq!(Country::from_code(country.code()).unwrap(), country);
        }
    }

    #[test]
    fn test_from_code_case_insensitive() {
        assert_eq!(Country::from_code("GB").unwrap(), Country::Gb);
        assert_eq!(Country::from_code("Ie").unwrap(), Country::Ie);
        assert_eq!(Country::from_code("cI").unwrap(), Country::Ci);
    }

    #[test]
    fn test_from_code_unknown() {
        let err = Country::from_code("fr").unwrap_err();
        assert!(matches!(err, QuadratError::UnknownCountry(_)));
    }

    #[test]
    fn test_grid_dimensions() {
        assert_eq!(Country::Gb.grid_cols(), 7);
        assert_eq!(Country::Gb.grid_rows(), 13);
        assert_eq!(Country::Ie.grid_cols(), 4);
        assert_eq!(Country::Ie.grid_rows(), 5);
        assert_eq!(Country::Ci.grid_cols(), 1);
        assert_eq!(Country::Ci.grid_rows(), 2);
    }

    #[test]
    fn test_extents() {
        assert_eq!(Country::Gb.extent_x(), 700_000);
        assert_eq!(Country::Gb.extent_y(), 1_300_000);
        assert_eq!(Country::Ci.extent_x(), 100_000);
        assert_eq!(Country::Ci.extent_y(), 200_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Country::Gb.to_string(), "gb");
        assert_eq!(Country::Ie.to_string(), "ie");
        assert_eq!(Country::Ci.to_string(), "ci");
    }

    #[test]
    fn test_serde_roundtrip() {
        for country in Country::ALL {
            let serialized = serde_json::to_string(&country).unwrap();
            let deserialized: Country = serde_json::from_str(&serialized).unwrap();
            assert_eq!(country, deserialized);
        }
        assert_eq!(serde_json::to_string(&Country::Gb).unwrap(), "\"gb\"");
    }
}
