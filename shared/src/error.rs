//! Error types for the defoliation pipeline

use thiserror::Error;

/// Errors raised while classifying or aggregating observations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("observation set is empty")]
    EmptyObservations,

    #[error("quantile must be within [0, 1], got {0}")]
    InvalidQuantile(f64),

    #[error("canopy cover must be a finite percentage, got {0}")]
    InvalidCanopyCover(f64),
}

/// Errors raised while validating or repairing a boundary polygon
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("geometry contains non-finite coordinates")]
    NonFinite,

    #[error("ring has fewer than three distinct vertices")]
    TooFewVertices,

    #[error("polygon encloses no area")]
    ZeroArea,

    #[error("geometry has no polygons")]
    Empty,
}

/// Errors raised while naming a coordinate reference system
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrsError {
    #[error("not an EPSG code: {0}")]
    Invalid(String),
}
