//! Recommendation tables
//!
//! Stand areas at the selected date are summed per recommendation bucket,
//! company-wide or within one farm.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use shared::{summarize_recommendations, RecommendationLine};

use crate::services::dataset::{Dataset, Selection};

/// Recommendation service
#[derive(Clone)]
pub struct RecommendationService {
    dataset: Arc<Dataset>,
}

#[derive(Debug, Serialize)]
pub struct RecommendationTable {
    pub company: String,
    /// Farm the table is limited to, `None` for the whole company
    pub farm: Option<String>,
    pub date: NaiveDate,
    pub lines: Vec<RecommendationLine>,
}

impl RecommendationService {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    pub fn table(&self, selection: &Selection) -> RecommendationTable {
        let rows = self
            .dataset
            .stand_rows(&selection.company)
            .filter(|r| r.date == selection.date)
            .filter(|r| selection.farm.as_ref().map_or(true, |f| &r.farm == f))
            .map(|r| (r.metrics.bucket, r.metrics.total_area_ha));

        RecommendationTable {
            company: selection.company.clone(),
            farm: selection.farm.clone(),
            date: selection.date,
            lines: summarize_recommendations(rows),
        }
    }
}
