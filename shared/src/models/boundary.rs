//! Stand boundary polygons

use geo::MultiPolygon;
use serde::Serialize;

/// Polygon of one stand (talhão) within a farm
#[derive(Debug, Clone, Serialize)]
pub struct StandBoundary {
    pub company: String,
    pub farm: String,
    pub stand: String,
    /// Geometry in the dataset's projected working CRS
    #[serde(skip)]
    pub geometry: MultiPolygon,
    /// Planar area in hectares, measured in the working CRS
    pub area_ha: f64,
}

/// Boundary that failed validation and was excluded from the dataset
#[derive(Debug, Clone, Serialize)]
pub struct RejectedBoundary {
    pub company: String,
    pub farm: String,
    pub stand: String,
    pub reason: String,
}
