//! Dashboard service: cards, chart series and map points

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    report_round, report_value, BoundingBox, CanopyStatus, DefoliationThreshold, StandAggregate, YearMonth,
};

use crate::services::dataset::{Dataset, Selection};
use crate::services::recommendation::{RecommendationService, RecommendationTable};

/// Dashboard service
#[derive(Clone)]
pub struct DashboardService {
    dataset: Arc<Dataset>,
}

/// Company-level cards
#[derive(Debug, Serialize, PartialEq)]
pub struct OverviewCards {
    pub company: String,
    pub date: NaiveDate,
    pub total_area_ha: Decimal,
    pub defoliated_area_ha: Decimal,
    pub farm_count: usize,
    pub stand_count: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct FarmCards {
    pub farm: String,
    pub date: NaiveDate,
    pub farm_area_ha: Decimal,
    pub defoliated_area_ha: Decimal,
    pub stand_count: usize,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct StandCards {
    pub stand: String,
    pub date: NaiveDate,
    pub stand_area_ha: Option<Decimal>,
    pub defoliated_area_ha: Decimal,
}

/// Stacked bar of one farm at the selected date
#[derive(Debug, Serialize, PartialEq)]
pub struct FarmAreaBar {
    pub farm: String,
    pub defoliated_area_ha: Decimal,
    pub healthy_area_ha: Option<Decimal>,
}

/// Entry of a top-N ranking by defoliated area
#[derive(Debug, Serialize, PartialEq)]
pub struct StandRanking {
    pub farm: String,
    pub stand: String,
    pub defoliated_area_ha: Decimal,
    pub percentage: Option<Decimal>,
}

/// Selected farm against the rest of the company
#[derive(Debug, Serialize, PartialEq)]
pub struct MonitoredSplit {
    pub farm: String,
    pub farm_area_ha: Decimal,
    pub other_farms_area_ha: Decimal,
}

/// Healthy vs defoliated canopy of a farm or stand
#[derive(Debug, Serialize, PartialEq)]
pub struct CanopySplit {
    pub total_area_ha: Option<Decimal>,
    pub healthy_area_ha: Option<Decimal>,
    pub defoliated_area_ha: Decimal,
}

/// One point of a monthly average series
#[derive(Debug, Serialize, PartialEq)]
pub struct MonthlyPoint {
    pub year_month: YearMonth,
    pub label: String,
    pub monthly_average: Option<Decimal>,
}

/// Row of a monitoring summary table
#[derive(Debug, Serialize, PartialEq)]
pub struct MonitoredArea {
    pub name: String,
    pub area_ha: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct OverviewDashboard {
    pub cards: OverviewCards,
    pub farm_bars: Vec<FarmAreaBar>,
    pub top_stands: Vec<StandRanking>,
    pub recommendations: RecommendationTable,
    pub monitoring: Vec<MonitoredArea>,
}

#[derive(Debug, Serialize)]
pub struct FarmDashboard {
    pub cards: FarmCards,
    pub monitored_split: MonitoredSplit,
    pub canopy: CanopySplit,
    pub top_stands: Vec<StandRanking>,
    pub monthly_average: Vec<MonthlyPoint>,
    pub recommendations: RecommendationTable,
    pub monitoring: Vec<MonitoredArea>,
}

#[derive(Debug, Serialize)]
pub struct StandDashboard {
    pub cards: StandCards,
    pub canopy: CanopySplit,
    pub monthly_average: Vec<MonthlyPoint>,
}

/// Map point in the working CRS
#[derive(Debug, Serialize, PartialEq)]
pub struct HeatmapPoint {
    pub x: f64,
    pub y: f64,
    pub canopy_cover: f64,
    pub status: CanopyStatus,
}

#[derive(Debug, Serialize)]
pub struct Heatmap {
    pub crs: String,
    pub threshold: DefoliationThreshold,
    pub bounds: Option<BoundingBox>,
    pub points: Vec<HeatmapPoint>,
}

fn round_area(area_ha: f64) -> Decimal {
    report_value(area_ha).unwrap_or_default()
}

fn canopy_split(total_area_ha: Option<Decimal>, defoliated_area_ha: Decimal) -> CanopySplit {
    CanopySplit {
        total_area_ha,
        healthy_area_ha: total_area_ha.map(|t| (t - defoliated_area_ha).max(Decimal::ZERO)),
        defoliated_area_ha,
    }
}

/// One point per calendar month, in chronological order
fn monthly_series<I>(rows: I, dataset: &Dataset) -> Vec<MonthlyPoint>
where
    I: IntoIterator<Item = (YearMonth, Option<Decimal>)>,
{
    let months: BTreeMap<YearMonth, Option<Decimal>> = rows.into_iter().collect();
    months
        .into_iter()
        .map(|(year_month, monthly_average)| MonthlyPoint {
            label: year_month.label(dataset.month_locale),
            year_month,
            monthly_average,
        })
        .collect()
}

fn ranking<'a, I>(rows: I, top_n: usize) -> Vec<StandRanking>
where
    I: IntoIterator<Item = &'a StandAggregate>,
{
    let mut ranked: Vec<&StandAggregate> = rows.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.metrics
            .defoliated_area_ha
            .cmp(&a.metrics.defoliated_area_ha)
            .then_with(|| a.stand.cmp(&b.stand))
    });
    ranked
        .into_iter()
        .take(top_n)
        .map(|row| StandRanking {
            farm: row.farm.clone(),
            stand: row.stand.clone(),
            defoliated_area_ha: row.metrics.defoliated_area_ha,
            percentage: row.metrics.percentage,
        })
        .collect()
}

impl DashboardService {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    fn stand_rows_at<'a>(&'a self, selection: &'a Selection) -> impl Iterator<Item = &'a StandAggregate> + 'a {
        self.dataset
            .stand_rows(&selection.company)
            .filter(move |r| r.date == selection.date)
            .filter(move |r| selection.farm.as_ref().map_or(true, |f| &r.farm == f))
    }

    /// Company cards, farm bars, company-wide ranking and tables
    pub fn overview(&self, selection: &Selection) -> OverviewDashboard {
        let ds = &self.dataset;
        let company = &selection.company;

        let boundaries: Vec<_> = ds.company_boundaries(company).collect();
        let total_area_ha = round_area(boundaries.iter().map(|b| b.area_ha).sum());
        let farm_count = boundaries
            .iter()
            .map(|b| b.farm.as_str())
            .collect::<BTreeSet<_>>()
            .len();
        let stand_count = boundaries.len();

        let farm_rows: Vec<_> = ds
            .farm_rows(company)
            .filter(|r| r.date == selection.date)
            .collect();
        let defoliated_area_ha = report_round(
            farm_rows
                .iter()
                .map(|r| r.metrics.defoliated_area_ha)
                .sum::<Decimal>(),
        );

        let farm_bars = farm_rows
            .iter()
            .map(|r| FarmAreaBar {
                farm: r.farm.clone(),
                defoliated_area_ha: r.metrics.defoliated_area_ha,
                healthy_area_ha: r.metrics.healthy_area_ha(),
            })
            .collect();

        let monitoring = farm_rows
            .iter()
            .map(|r| MonitoredArea {
                name: r.farm.clone(),
                area_ha: r.metrics.total_area_ha,
            })
            .collect();

        let company_wide = Selection {
            farm: None,
            stand: None,
            ..selection.clone()
        };

        OverviewDashboard {
            cards: OverviewCards {
                company: company.clone(),
                date: selection.date,
                total_area_ha,
                defoliated_area_ha,
                farm_count,
                stand_count,
            },
            farm_bars,
            top_stands: ranking(self.stand_rows_at(&company_wide), ds.top_n),
            recommendations: RecommendationService::new(ds.clone()).table(&company_wide),
            monitoring,
        }
    }

    /// Farm cards and charts; the selection must name a farm
    pub fn farm(&self, selection: &Selection, farm: &str) -> FarmDashboard {
        let ds = &self.dataset;
        let company = &selection.company;

        let farm_area_ha = round_area(ds.index.farm_area_ha(company, farm).unwrap_or(0.0));
        let company_area: f64 = ds.company_boundaries(company).map(|b| b.area_ha).sum();
        let other_farms_area_ha = (round_area(company_area) - farm_area_ha).max(Decimal::ZERO);
        let stand_count = ds.farm_boundaries(company, farm).count();

        let farm_rows: Vec<_> = ds.farm_rows(company).filter(|r| r.farm == farm).collect();
        let at_date = farm_rows.iter().find(|r| r.date == selection.date);
        let defoliated_area_ha = at_date
            .map(|r| r.metrics.defoliated_area_ha)
            .unwrap_or_default();

        let farm_selection = Selection {
            farm: Some(farm.to_string()),
            stand: None,
            ..selection.clone()
        };
        let monitoring = self
            .stand_rows_at(&farm_selection)
            .map(|r| MonitoredArea {
                name: r.stand.clone(),
                area_ha: r.metrics.total_area_ha,
            })
            .collect();

        FarmDashboard {
            cards: FarmCards {
                farm: farm.to_string(),
                date: selection.date,
                farm_area_ha,
                defoliated_area_ha,
                stand_count,
            },
            monitored_split: MonitoredSplit {
                farm: farm.to_string(),
                farm_area_ha,
                other_farms_area_ha,
            },
            canopy: canopy_split(Some(farm_area_ha), defoliated_area_ha),
            top_stands: ranking(self.stand_rows_at(&farm_selection), ds.top_n),
            monthly_average: monthly_series(
                farm_rows
                    .iter()
                    .map(|r| (r.metrics.year_month, r.metrics.monthly_average)),
                ds,
            ),
            recommendations: RecommendationService::new(ds.clone()).table(&farm_selection),
            monitoring,
        }
    }

    /// Stand cards and charts
    pub fn stand(&self, selection: &Selection, farm: &str, stand: &str) -> StandDashboard {
        let ds = &self.dataset;
        let stand_area_ha = ds
            .index
            .stand_area_ha(&selection.company, farm, stand)
            .and_then(report_value);

        let rows: Vec<_> = ds
            .stand_rows(&selection.company)
            .filter(|r| r.farm == farm && r.stand == stand)
            .collect();
        let defoliated_area_ha = rows
            .iter()
            .find(|r| r.date == selection.date)
            .map(|r| r.metrics.defoliated_area_ha)
            .unwrap_or_default();

        StandDashboard {
            cards: StandCards {
                stand: stand.to_string(),
                date: selection.date,
                stand_area_ha,
                defoliated_area_ha,
            },
            canopy: canopy_split(stand_area_ha, defoliated_area_ha),
            monthly_average: monthly_series(
                rows.iter()
                    .map(|r| (r.metrics.year_month, r.metrics.monthly_average)),
                ds,
            ),
        }
    }

    /// Points of the selection coloured by canopy cover
    pub fn heatmap(&self, selection: &Selection) -> Heatmap {
        let ds = &self.dataset;
        let points: Vec<HeatmapPoint> = ds
            .points(selection)
            .map(|p| HeatmapPoint {
                x: p.observation.x,
                y: p.observation.y,
                canopy_cover: p.observation.canopy_cover,
                status: p.status,
            })
            .collect();
        let bounds = BoundingBox::covering(points.iter().map(|p| (p.x, p.y)));

        Heatmap {
            crs: ds.working_crs.to_string(),
            threshold: ds.threshold,
            bounds,
            points,
        }
    }
}
