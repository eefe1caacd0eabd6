//! Canopy-cover classification
//!
//! A point is defoliated when its canopy cover falls strictly below a low
//! quantile of the whole loaded dataset. The threshold is computed once per
//! dataset and reused for every classification so that narrowing the
//! selection never moves it.

use serde::Serialize;

use crate::error::PipelineError;
use crate::models::{CanopyStatus, ClassifiedObservation, Observation};

/// Default quantile separating defoliated from healthy canopy
pub const DEFAULT_QUANTILE: f64 = 0.10;

/// Quantile with linear interpolation between closest ranks.
///
/// Matches the default method of NumPy and pandas. Returns `None` for an
/// empty slice or a quantile outside `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}

/// Canopy-cover threshold below which a point counts as defoliated
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DefoliationThreshold {
    pub quantile: f64,
    pub canopy_cover: f64,
}

impl DefoliationThreshold {
    /// Compute the threshold over the full observation set
    pub fn compute(observations: &[Observation], q: f64) -> Result<Self, PipelineError> {
        if !(0.0..=1.0).contains(&q) {
            return Err(PipelineError::InvalidQuantile(q));
        }
        if let Some(bad) = observations.iter().find(|o| !o.canopy_cover.is_finite()) {
            return Err(PipelineError::InvalidCanopyCover(bad.canopy_cover));
        }
        let values: Vec<f64> = observations.iter().map(|o| o.canopy_cover).collect();
        let canopy_cover = quantile(&values, q).ok_or(PipelineError::EmptyObservations)?;
        Ok(Self {
            quantile: q,
            canopy_cover,
        })
    }

    pub fn status_of(&self, canopy_cover: f64) -> CanopyStatus {
        if canopy_cover < self.canopy_cover {
            CanopyStatus::Defoliated
        } else {
            CanopyStatus::Healthy
        }
    }
}

/// Label every observation against a precomputed threshold
pub fn classify_observations(
    observations: Vec<Observation>,
    threshold: &DefoliationThreshold,
) -> Vec<ClassifiedObservation> {
    observations
        .into_iter()
        .map(|observation| {
            let status = threshold.status_of(observation.canopy_cover);
            ClassifiedObservation {
                observation,
                status,
            }
        })
        .collect()
}
