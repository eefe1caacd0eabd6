//! Remote-sensing point observations

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One canopy-cover prediction point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub company: String,
    pub farm: String,
    pub stand: String,
    pub date: NaiveDate,
    /// Easting (or longitude) in the dataset's working CRS
    pub x: f64,
    /// Northing (or latitude) in the dataset's working CRS
    pub y: f64,
    /// Canopy cover percentage
    pub canopy_cover: f64,
}

/// Health status of a point relative to the defoliation threshold
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CanopyStatus {
    #[serde(rename = "Desfolha")]
    Defoliated,
    #[serde(rename = "Saudavel")]
    Healthy,
}

impl CanopyStatus {
    pub fn is_defoliated(&self) -> bool {
        matches!(self, CanopyStatus::Defoliated)
    }
}

impl std::fmt::Display for CanopyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CanopyStatus::Defoliated => write!(f, "Desfolha"),
            CanopyStatus::Healthy => write!(f, "Saudavel"),
        }
    }
}

/// Observation labelled by the classifier
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassifiedObservation {
    #[serde(flatten)]
    pub observation: Observation,
    pub status: CanopyStatus,
}

impl ClassifiedObservation {
    pub fn is_defoliated(&self) -> bool {
        self.status.is_defoliated()
    }
}
