//! Coordinate reference systems
//!
//! A CRS is carried around by its EPSG code. Reprojection itself needs
//! PROJ and lives in the backend; this crate only names systems so that
//! configuration, reports and the WASM bindings can share them.

use serde::{Deserialize, Serialize};

use crate::error::CrsError;

/// Coordinate reference system identified by its EPSG code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Crs(u32);

impl Crs {
    /// Longitude/latitude in degrees
    pub const WGS84: Crs = Crs(4326);

    /// WGS 84 / UTM zone 22S, covering the monitored farms in southern Brazil
    pub const UTM_22S: Crs = Crs(32722);

    pub fn from_epsg(code: u32) -> Result<Self, CrsError> {
        if code == 0 {
            return Err(CrsError::Invalid(code.to_string()));
        }
        Ok(Crs(code))
    }

    pub fn epsg(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

impl std::str::FromStr for Crs {
    type Err = CrsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = trimmed
            .strip_prefix("EPSG:")
            .or_else(|| trimmed.strip_prefix("epsg:"))
            .unwrap_or(trimmed);
        let code: u32 = code.parse().map_err(|_| CrsError::Invalid(s.to_string()))?;
        Crs::from_epsg(code)
    }
}

impl TryFrom<String> for Crs {
    type Error = CrsError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_epsg_codes() {
        assert_eq!("EPSG:4326".parse::<Crs>().unwrap(), Crs::WGS84);
        assert_eq!("epsg:32722".parse::<Crs>().unwrap(), Crs::UTM_22S);
        // SIRGAS 2000 / UTM zone 22S
        assert_eq!("31982".parse::<Crs>().unwrap().epsg(), 31982);
        assert!("EPSG:0".parse::<Crs>().is_err());
        assert!("not-a-crs".parse::<Crs>().is_err());
    }

    #[test]
    fn test_crs_display_round_trips_through_string() {
        let crs = Crs::UTM_22S;
        assert_eq!(crs.to_string(), "EPSG:32722");
        assert_eq!(String::from(crs).parse::<Crs>().unwrap(), crs);
    }

    #[test]
    fn test_crs_serializes_as_epsg_string() {
        let json = serde_json::to_string(&Crs::UTM_22S).unwrap();
        assert_eq!(json, "\"EPSG:32722\"");
        let parsed: Crs = serde_json::from_str("\"EPSG:31982\"").unwrap();
        assert_eq!(parsed.epsg(), 31982);
    }
}
