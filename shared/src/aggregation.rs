//! Farm and stand aggregation
//!
//! Classified points are grouped per (company, farm[, stand], date). Each
//! defoliated point stands for 0.01 ha. The defoliated area is capped at
//! the boundary area and the percentage is taken against that area.
//! Both are computed from the unrounded boundary area. Only the reported
//! fields are rounded: boundary areas, percentages, averages and deltas to
//! one decimal, point-count areas to two.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;

use crate::models::{
    assign_bucket, AggregateMetrics, ClassifiedObservation, FarmAggregate, StandAggregate,
    StandBoundary,
};
use crate::types::{MonthLocale, YearMonth};

/// Decimal places used for areas and percentages in reports
pub const REPORT_DECIMALS: u32 = 1;

/// Decimal places of a point-count area (one point = 0.01 ha)
const POINT_AREA_DECIMALS: u32 = 2;

/// Round to the report precision and pad to a fixed scale (`12` becomes `12.0`)
pub fn report_round(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(REPORT_DECIMALS);
    rounded.rescale(REPORT_DECIMALS);
    rounded
}

/// Round a measured value for reporting, `None` for NaN or infinity
pub fn report_value(value: f64) -> Option<Decimal> {
    Decimal::from_f64(value).map(report_round)
}

/// Round a point-count area for reporting (`0.4` becomes `0.40`)
pub fn point_area_round(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp(POINT_AREA_DECIMALS);
    rounded.rescale(POINT_AREA_DECIMALS);
    rounded
}

/// Measured boundary area as an exact decimal, `None` for NaN or infinity
pub fn measured_area(area_ha: f64) -> Option<Decimal> {
    Decimal::from_f64(area_ha)
}

/// Area represented by a number of defoliated points, capped at the boundary area.
///
/// The result is not rounded when the cap applies.
pub fn defoliated_area_ha(defoliated_points: u64, total_area_ha: Option<Decimal>) -> Decimal {
    let points = i64::try_from(defoliated_points).unwrap_or(i64::MAX);
    let area = Decimal::new(points, POINT_AREA_DECIMALS);
    match total_area_ha {
        Some(total) => area.min(total.max(Decimal::ZERO)),
        None => area,
    }
}

/// Share of the boundary area that is defoliated, `None` when the area is unknown or zero
pub fn defoliation_percentage(defoliated_area_ha: Decimal, total_area_ha: Option<Decimal>) -> Option<Decimal> {
    let total = total_area_ha?;
    if total <= Decimal::ZERO {
        return None;
    }
    Some(report_round(defoliated_area_ha / total * Decimal::ONE_HUNDRED))
}

fn mean(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let sum: Decimal = values.iter().sum();
    Some(sum / Decimal::from(values.len() as u64))
}

/// Lookup of boundary areas by (company, farm) and by (company, farm, stand)
#[derive(Debug, Clone, Default)]
pub struct BoundaryIndex {
    stand_areas: HashMap<(String, String, String), f64>,
    farm_areas: HashMap<(String, String), f64>,
}

impl BoundaryIndex {
    pub fn new(boundaries: &[StandBoundary]) -> Self {
        let mut index = Self::default();
        for boundary in boundaries {
            *index
                .stand_areas
                .entry((
                    boundary.company.clone(),
                    boundary.farm.clone(),
                    boundary.stand.clone(),
                ))
                .or_insert(0.0) += boundary.area_ha;
            *index
                .farm_areas
                .entry((boundary.company.clone(), boundary.farm.clone()))
                .or_insert(0.0) += boundary.area_ha;
        }
        index
    }

    pub fn stand_area_ha(&self, company: &str, farm: &str, stand: &str) -> Option<f64> {
        self.stand_areas
            .get(&(company.to_string(), farm.to_string(), stand.to_string()))
            .copied()
    }

    pub fn farm_area_ha(&self, company: &str, farm: &str) -> Option<f64> {
        self.farm_areas
            .get(&(company.to_string(), farm.to_string()))
            .copied()
    }

    pub fn has_stand(&self, company: &str, farm: &str, stand: &str) -> bool {
        self.stand_area_ha(company, farm, stand).is_some()
    }
}

/// Group key carrying its own boundary-area lookup
trait AggregateKey: Ord + Clone {
    fn of(observation: &ClassifiedObservation) -> Self;
    fn area_ha(&self, index: &BoundaryIndex) -> Option<f64>;
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct FarmKey {
    company: String,
    farm: String,
}

impl AggregateKey for FarmKey {
    fn of(observation: &ClassifiedObservation) -> Self {
        Self {
            company: observation.observation.company.clone(),
            farm: observation.observation.farm.clone(),
        }
    }

    fn area_ha(&self, index: &BoundaryIndex) -> Option<f64> {
        index.farm_area_ha(&self.company, &self.farm)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct StandKey {
    company: String,
    farm: String,
    stand: String,
}

impl AggregateKey for StandKey {
    fn of(observation: &ClassifiedObservation) -> Self {
        Self {
            company: observation.observation.company.clone(),
            farm: observation.observation.farm.clone(),
            stand: observation.observation.stand.clone(),
        }
    }

    fn area_ha(&self, index: &BoundaryIndex) -> Option<f64> {
        index.stand_area_ha(&self.company, &self.farm, &self.stand)
    }
}

#[derive(Default)]
struct PointCounts {
    defoliated: u64,
    total: u64,
}

/// Shared aggregation pass. Rows come back ordered by key, then date.
fn aggregate_by<K: AggregateKey>(
    observations: &[ClassifiedObservation],
    boundaries: &BoundaryIndex,
    locale: MonthLocale,
) -> Vec<(K, NaiveDate, AggregateMetrics)> {
    let mut counts: BTreeMap<(K, NaiveDate), PointCounts> = BTreeMap::new();
    for observation in observations {
        let entry = counts
            .entry((K::of(observation), observation.observation.date))
            .or_default();
        entry.total += 1;
        if observation.is_defoliated() {
            entry.defoliated += 1;
        }
    }

    let mut rows: Vec<(K, NaiveDate, AggregateMetrics)> = counts
        .into_iter()
        .map(|((key, date), counts)| {
            let area_ha = key.area_ha(boundaries).and_then(measured_area);
            let defoliated = defoliated_area_ha(counts.defoliated, area_ha);
            let metrics = AggregateMetrics {
                defoliated_points: counts.defoliated,
                total_points: counts.total,
                total_area_ha: area_ha.map(report_round),
                defoliated_area_ha: point_area_round(defoliated),
                percentage: defoliation_percentage(defoliated, area_ha),
                year_month: YearMonth::of(date),
                month: locale.format_month(date),
                monthly_average: None,
                percentage_delta: None,
                bucket: None,
            };
            (key, date, metrics)
        })
        .collect();

    // Monthly average per key and calendar month
    let mut monthly: BTreeMap<(K, YearMonth), Vec<Decimal>> = BTreeMap::new();
    for (key, _, metrics) in &rows {
        let bucket = monthly.entry((key.clone(), metrics.year_month)).or_default();
        if let Some(percentage) = metrics.percentage {
            bucket.push(percentage);
        }
    }
    let averages: BTreeMap<(K, YearMonth), Option<Decimal>> = monthly
        .into_iter()
        .map(|(k, values)| (k, mean(&values).map(report_round)))
        .collect();

    // Trailing change against the previous dated row of the same key
    let mut previous: Option<(K, Option<Decimal>)> = None;
    for (key, _, metrics) in rows.iter_mut() {
        metrics.monthly_average = averages
            .get(&(key.clone(), metrics.year_month))
            .copied()
            .flatten();
        metrics.percentage_delta = match &previous {
            Some((prev_key, Some(prev))) if prev_key == key => metrics
                .percentage
                .map(|current| report_round(current - *prev)),
            _ => None,
        };
        metrics.bucket = assign_bucket(metrics.monthly_average, metrics.percentage_delta);
        previous = Some((key.clone(), metrics.percentage));
    }

    rows
}

/// Aggregate classified points per farm and date
pub fn aggregate_farms(
    observations: &[ClassifiedObservation],
    boundaries: &BoundaryIndex,
    locale: MonthLocale,
) -> Vec<FarmAggregate> {
    aggregate_by::<FarmKey>(observations, boundaries, locale)
        .into_iter()
        .map(|(key, date, metrics)| FarmAggregate {
            company: key.company,
            farm: key.farm,
            date,
            metrics,
        })
        .collect()
}

/// Aggregate classified points per stand and date
pub fn aggregate_stands(
    observations: &[ClassifiedObservation],
    boundaries: &BoundaryIndex,
    locale: MonthLocale,
) -> Vec<StandAggregate> {
    aggregate_by::<StandKey>(observations, boundaries, locale)
        .into_iter()
        .map(|(key, date, metrics)| StandAggregate {
            company: key.company,
            farm: key.farm,
            stand: key.stand,
            date,
            metrics,
        })
        .collect()
}
