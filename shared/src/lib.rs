//! Shared types and pipeline logic for the Ant Defoliation Monitor
//!
//! This crate holds everything that does not touch the filesystem or the
//! network: the domain models, the canopy-cover classifier, the farm and
//! stand aggregator, geometry repair and area, and CRS identifiers.
//! It is used by the backend server and by the WASM bindings.

pub mod aggregation;
pub mod classification;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod models;
pub mod types;
pub mod validation;

pub use aggregation::*;
pub use classification::*;
pub use error::*;
pub use models::*;
pub use crs::Crs;
pub use types::*;
pub use validation::*;
