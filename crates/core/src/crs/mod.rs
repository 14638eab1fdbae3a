//! Coordinate reference systems
//!
//! Sources are only fused when they share a CRS, so the type mostly serves
//! equality checks and GeoTIFF tagging. No reprojection is done here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A CRS known by EPSG code or by WKT text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CRS {
    Epsg(u32),
    Wkt(String),
}

impl CRS {
    pub fn from_epsg(code: u32) -> Self {
        CRS::Epsg(code)
    }

    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        CRS::Wkt(wkt.into())
    }

    /// EPSG:4326
    pub fn wgs84() -> Self {
        CRS::Epsg(4326)
    }

    pub fn epsg(&self) -> Option<u32> {
        match self {
            CRS::Epsg(code) => Some(*code),
            CRS::Wkt(_) => None,
        }
    }

    /// Geographic (lat/lon) codes live in the EPSG 4000 block
    pub fn is_geographic(&self) -> bool {
        matches!(self, CRS::Epsg(code) if (4000..5000).contains(code))
    }

    /// Same code, or byte-identical WKT
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        self == other
    }

    /// Short label for logs and error messages
    pub fn identifier(&self) -> String {
        match self {
            CRS::Epsg(code) => format!("EPSG:{}", code),
            CRS::Wkt(wkt) => format!("WKT:{}", wkt.chars().take(50).collect::<String>()),
        }
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier())
    }
}

impl FromStr for CRS {
    type Err = std::convert::Infallible;

    /// `EPSG:32630` or a bare code parse as EPSG, anything else is kept as WKT
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let code = s
            .get(..5)
            .filter(|p| p.eq_ignore_ascii_case("epsg:"))
            .map_or(s, |_| &s[5..]);
        Ok(match code.parse::<u32>() {
            Ok(c) => CRS::Epsg(c),
            Err(_) => CRS::Wkt(s.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("EPSG:32630".parse::<CRS>().unwrap(), CRS::Epsg(32630));
        assert_eq!("epsg:4326".parse::<CRS>().unwrap(), CRS::wgs84());
        assert_eq!(" 3857 ".parse::<CRS>().unwrap().epsg(), Some(3857));
        assert!(matches!("LOCAL_CS[\"x\"]".parse::<CRS>().unwrap(), CRS::Wkt(_)));
    }

    #[test]
    fn test_equivalence_and_kind() {
        assert!(CRS::from_epsg(4326).is_equivalent(&CRS::wgs84()));
        assert!(!CRS::wgs84().is_equivalent(&CRS::from_wkt("LOCAL_CS[\"x\"]")));
        assert!(CRS::wgs84().is_geographic());
        assert!(!CRS::from_epsg(32630).is_geographic());
        assert_eq!(CRS::from_epsg(32630).to_string(), "EPSG:32630");
    }
}
