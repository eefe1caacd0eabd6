//! Input file readers
//!
//! Observations come from a CSV export of the prediction model; stand
//! boundaries from a GeoJSON FeatureCollection or an ESRI shapefile.

pub mod boundaries;
pub mod observations;

use shared::GeometryError;
use thiserror::Error;

use crate::projection::ProjectionError;

pub use boundaries::{load_boundaries, BoundaryLoad};
pub use observations::{load_observations, ObservationLoad};

/// Errors that abort loading an input file
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column {0}")]
    MissingColumn(String),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("shapefile error: {0}")]
    Shapefile(#[from] shapefile::Error),

    #[error("unsupported boundary file format: {0}")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

pub type IngestResult<T> = Result<T, IngestError>;
