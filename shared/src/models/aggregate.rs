//! Farm and stand aggregates

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::recommendation::RecommendationBucket;
use crate::types::YearMonth;

/// Defoliation figures for one area unit on one observation date
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AggregateMetrics {
    pub defoliated_points: u64,
    pub total_points: u64,
    /// Boundary area, `None` when no boundary matched
    pub total_area_ha: Option<Decimal>,
    /// Defoliated points × 0.01 ha, never larger than the boundary area
    pub defoliated_area_ha: Decimal,
    /// `defoliated_area_ha / total_area_ha × 100`, `None` for unknown or zero area
    pub percentage: Option<Decimal>,
    pub year_month: YearMonth,
    /// Abbreviated month name in the configured locale
    pub month: String,
    pub monthly_average: Option<Decimal>,
    /// Change in percentage points since the previous observation date
    pub percentage_delta: Option<Decimal>,
    pub bucket: Option<RecommendationBucket>,
}

impl AggregateMetrics {
    /// Boundary area placed under the row's bucket, one slot per bucket
    pub fn bucket_areas(&self) -> [Option<Decimal>; 4] {
        let mut slots = [None; 4];
        if let Some(bucket) = self.bucket {
            if let Some(index) = RecommendationBucket::ALL.iter().position(|b| *b == bucket) {
                slots[index] = self.total_area_ha;
            }
        }
        slots
    }

    pub fn healthy_area_ha(&self) -> Option<Decimal> {
        self.total_area_ha
            .map(|total| (total - self.defoliated_area_ha).max(Decimal::ZERO))
    }
}

/// Aggregate for one farm on one date
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FarmAggregate {
    pub company: String,
    pub farm: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub metrics: AggregateMetrics,
}

/// Aggregate for one stand on one date
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StandAggregate {
    pub company: String,
    pub farm: String,
    pub stand: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub metrics: AggregateMetrics,
}
