//! Loaded, classified and aggregated dataset
//!
//! Built once at startup and shared read-only between requests. Every
//! dashboard and export query filters the tables held here.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use shared::{
    aggregate_farms, aggregate_stands, classify_observations, normalize_identifier, BoundaryIndex,
    ClassifiedObservation, Crs, DefoliationThreshold, FarmAggregate, MonthLocale, PipelineError,
    RejectedBoundary, StandAggregate, StandBoundary,
};

use crate::config::{AnalysisConfig, Config};
use crate::error::{AppError, AppResult};
use crate::ingest::{load_boundaries, load_observations, BoundaryLoad, ObservationLoad};
use crate::projection::Reprojector;

/// Summary of what was loaded and what was left out
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub observations: usize,
    pub skipped_rows: usize,
    /// Observations whose (company, farm, stand) has no boundary
    pub unmatched_observations: usize,
    pub stands: usize,
    pub repaired_boundaries: usize,
    pub merged_boundaries: usize,
    pub rejected_boundaries: Vec<RejectedBoundary>,
    pub threshold: DefoliationThreshold,
    pub working_crs: Crs,
}

/// A validated company / farm / stand / date selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub company: String,
    pub farm: Option<String>,
    pub stand: Option<String>,
    pub date: NaiveDate,
}

impl Selection {
    /// Human-readable label used in titles and "no data" errors
    pub fn describe(&self) -> String {
        let place = match (&self.farm, &self.stand) {
            (_, Some(stand)) => format!("stand {}", stand),
            (Some(farm), None) => format!("farm {}", farm),
            (None, None) => format!("company {}", self.company),
        };
        format!("{} on {}", place, self.date)
    }
}

#[derive(Debug, Clone, Default)]
struct CompanyCatalog {
    farms: BTreeMap<String, BTreeSet<String>>,
    dates: BTreeSet<NaiveDate>,
}

pub struct Dataset {
    pub threshold: DefoliationThreshold,
    pub working_crs: Crs,
    pub month_locale: MonthLocale,
    pub top_n: usize,
    pub observations: Vec<ClassifiedObservation>,
    pub boundaries: Vec<StandBoundary>,
    pub index: BoundaryIndex,
    pub farms: Vec<FarmAggregate>,
    pub stands: Vec<StandAggregate>,
    pub report: LoadReport,
    catalog: BTreeMap<String, CompanyCatalog>,
}

impl Dataset {
    /// Read both input files and run the pipeline
    pub fn load(config: &Config) -> anyhow::Result<Self> {
        let working_crs = config.analysis.working_crs;

        let reprojector = Reprojector::new(config.data.observations_crs, working_crs)
            .context("preparing observation reprojection")?;
        let observations = load_observations(Path::new(&config.data.observations_path), &reprojector)
            .with_context(|| format!("loading observations from {}", config.data.observations_path))?;

        let reprojector = Reprojector::new(config.data.boundaries_crs, working_crs)
            .context("preparing boundary reprojection")?;
        let boundaries = load_boundaries(Path::new(&config.data.boundaries_path), &reprojector)
            .with_context(|| format!("loading boundaries from {}", config.data.boundaries_path))?;

        Self::build(observations, boundaries, &config.analysis).context("classifying observations")
    }

    /// Classify and aggregate already-loaded inputs
    pub fn build(
        observations: ObservationLoad,
        boundaries: BoundaryLoad,
        analysis: &AnalysisConfig,
    ) -> Result<Self, PipelineError> {
        let threshold = DefoliationThreshold::compute(&observations.observations, analysis.quantile)?;
        tracing::info!(
            quantile = threshold.quantile,
            canopy_cover = threshold.canopy_cover,
            "Computed defoliation threshold"
        );

        let index = BoundaryIndex::new(&boundaries.boundaries);
        let unmatched_observations = observations
            .observations
            .iter()
            .filter(|o| !index.has_stand(&o.company, &o.farm, &o.stand))
            .count();
        if unmatched_observations > 0 {
            tracing::warn!(
                unmatched_observations,
                "Observations without a matching stand boundary"
            );
        }

        let classified = classify_observations(observations.observations, &threshold);
        let farms = aggregate_farms(&classified, &index, analysis.month_locale);
        let stands = aggregate_stands(&classified, &index, analysis.month_locale);

        let mut catalog: BTreeMap<String, CompanyCatalog> = BTreeMap::new();
        for point in &classified {
            let o = &point.observation;
            let entry = catalog.entry(o.company.clone()).or_default();
            entry
                .farms
                .entry(o.farm.clone())
                .or_default()
                .insert(o.stand.clone());
            entry.dates.insert(o.date);
        }

        let report = LoadReport {
            observations: classified.len(),
            skipped_rows: observations.skipped_rows,
            unmatched_observations,
            stands: boundaries.boundaries.len(),
            repaired_boundaries: boundaries.repaired,
            merged_boundaries: boundaries.merged,
            rejected_boundaries: boundaries.rejected,
            threshold,
            working_crs: analysis.working_crs,
        };

        tracing::info!(
            observations = report.observations,
            farm_rows = farms.len(),
            stand_rows = stands.len(),
            "Dataset ready"
        );

        Ok(Self {
            threshold,
            working_crs: analysis.working_crs,
            month_locale: analysis.month_locale,
            top_n: analysis.top_n,
            observations: classified,
            boundaries: boundaries.boundaries,
            index,
            farms,
            stands,
            report,
            catalog,
        })
    }

    // ========================================================================
    // Selection options
    // ========================================================================

    pub fn companies(&self) -> Vec<String> {
        self.catalog.keys().cloned().collect()
    }

    pub fn farms_of(&self, company: &str) -> Vec<String> {
        self.catalog
            .get(company)
            .map(|c| c.farms.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stands_of(&self, company: &str, farm: &str) -> Vec<String> {
        self.catalog
            .get(company)
            .and_then(|c| c.farms.get(farm))
            .map(|stands| stands.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Observation dates of a company, ascending
    pub fn dates_of(&self, company: &str) -> Vec<NaiveDate> {
        self.catalog
            .get(company)
            .map(|c| c.dates.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn latest_date(&self, company: &str) -> Option<NaiveDate> {
        self.catalog
            .get(company)
            .and_then(|c| c.dates.iter().next_back().copied())
    }

    /// Validate a selection, normalizing identifiers and defaulting the date
    /// to the company's latest observation date
    pub fn resolve(
        &self,
        company: &str,
        farm: Option<&str>,
        stand: Option<&str>,
        date: Option<NaiveDate>,
    ) -> AppResult<Selection> {
        let company = normalize_identifier(company);
        let catalog = self
            .catalog
            .get(&company)
            .ok_or_else(|| AppError::NotFound(format!("Company {}", company)))?;

        let farm = farm.map(normalize_identifier).filter(|f| !f.is_empty());
        let stand = stand.map(normalize_identifier).filter(|s| !s.is_empty());

        let farm = match (farm, &stand) {
            (Some(farm), _) => Some(farm),
            // a stand alone identifies its farm
            (None, Some(stand)) => catalog
                .farms
                .iter()
                .find(|(_, stands)| stands.contains(stand))
                .map(|(farm, _)| farm.clone()),
            (None, None) => None,
        };

        if let Some(farm) = &farm {
            let stands = catalog
                .farms
                .get(farm)
                .ok_or_else(|| AppError::NotFound(format!("Farm {}", farm)))?;
            if let Some(stand) = &stand {
                if !stands.contains(stand) {
                    return Err(AppError::NotFound(format!("Stand {}", stand)));
                }
            }
        } else if let Some(stand) = &stand {
            return Err(AppError::NotFound(format!("Stand {}", stand)));
        }

        let date = match date {
            Some(date) => date,
            None => catalog
                .dates
                .iter()
                .next_back()
                .copied()
                .ok_or_else(|| AppError::NoData(format!("company {}", company)))?,
        };

        Ok(Selection {
            company,
            farm,
            stand,
            date,
        })
    }

    // ========================================================================
    // Table queries
    // ========================================================================

    /// Points of a selection on its date
    pub fn points<'a>(&'a self, selection: &'a Selection) -> impl Iterator<Item = &'a ClassifiedObservation> + 'a {
        self.observations.iter().filter(move |p| {
            let o = &p.observation;
            o.company == selection.company
                && o.date == selection.date
                && selection.farm.as_ref().map_or(true, |f| &o.farm == f)
                && selection.stand.as_ref().map_or(true, |s| &o.stand == s)
        })
    }

    pub fn farm_rows<'a>(&'a self, company: &'a str) -> impl Iterator<Item = &'a FarmAggregate> + 'a {
        self.farms.iter().filter(move |r| r.company == company)
    }

    pub fn stand_rows<'a>(&'a self, company: &'a str) -> impl Iterator<Item = &'a StandAggregate> + 'a {
        self.stands.iter().filter(move |r| r.company == company)
    }

    pub fn company_boundaries<'a>(&'a self, company: &'a str) -> impl Iterator<Item = &'a StandBoundary> + 'a {
        self.boundaries.iter().filter(move |b| b.company == company)
    }

    pub fn farm_boundaries<'a>(
        &'a self,
        company: &'a str,
        farm: &'a str,
    ) -> impl Iterator<Item = &'a StandBoundary> + 'a {
        self.company_boundaries(company).filter(move |b| b.farm == farm)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! In-memory dataset shared by service and router tests

    use super::*;
    use geo::{polygon, MultiPolygon};
    use shared::Observation;

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn square(company: &str, farm: &str, stand: &str, x0: f64, y0: f64, side: f64) -> StandBoundary {
        let geometry = MultiPolygon::new(vec![polygon![
            (x: x0, y: y0),
            (x: x0 + side, y: y0),
            (x: x0 + side, y: y0 + side),
            (x: x0, y: y0 + side),
            (x: x0, y: y0),
        ]]);
        StandBoundary {
            company: company.to_string(),
            farm: farm.to_string(),
            stand: stand.to_string(),
            area_ha: side * side / 10_000.0,
            geometry,
        }
    }

    fn points(
        farm: &str,
        stand: &str,
        on: NaiveDate,
        origin: (f64, f64),
        low: usize,
        high: usize,
    ) -> Vec<Observation> {
        (0..low + high)
            .map(|i| Observation {
                company: "ACME".to_string(),
                farm: farm.to_string(),
                stand: stand.to_string(),
                date: on,
                x: origin.0 + (i % 100) as f64 * 10.0,
                y: origin.1 + (i / 100) as f64 * 10.0,
                canopy_cover: if i < low { 5.0 } else { 80.0 },
            })
            .collect()
    }

    /// ACME with farms F1 (stands F1_1 = 100 ha, F1_2 = 25 ha) and F2 (F2_1 = 25 ha)
    /// observed on 2024-02-10 and 2024-03-10.
    pub fn dataset() -> Dataset {
        let boundaries = vec![
            square("ACME", "F1", "F1_1", 600_000.0, 7_200_000.0, 1_000.0),
            square("ACME", "F1", "F1_2", 601_000.0, 7_200_000.0, 500.0),
            square("ACME", "F2", "F2_1", 610_000.0, 7_200_000.0, 500.0),
        ];

        let mut observations = Vec::new();
        // February: F1_1 2 % defoliated
        observations.extend(points("F1", "F1_1", date(2024, 2, 10), (600_000.0, 7_200_000.0), 200, 800));
        observations.extend(points("F1", "F1_2", date(2024, 2, 10), (601_000.0, 7_200_000.0), 0, 500));
        observations.extend(points("F2", "F2_1", date(2024, 2, 10), (610_000.0, 7_200_000.0), 0, 500));
        // March: F1_1 jumps to 12 %, F2_1 reaches 6 %
        observations.extend(points("F1", "F1_1", date(2024, 3, 10), (600_000.0, 7_200_000.0), 1_200, 300));
        observations.extend(points("F1", "F1_2", date(2024, 3, 10), (601_000.0, 7_200_000.0), 0, 500));
        observations.extend(points("F2", "F2_1", date(2024, 3, 10), (610_000.0, 7_200_000.0), 150, 350));
        // a stand without boundary
        observations.extend(points("F2", "F2_9", date(2024, 3, 10), (620_000.0, 7_200_000.0), 0, 10));

        build(boundaries, observations)
    }

    /// [`dataset`] plus GLOBEX, whose farm is also named F1 (one 4 ha stand F1_1,
    /// 40 of 100 points defoliated on 2024-04-05)
    pub fn shared_farm_name() -> Dataset {
        let ds = dataset();
        let mut boundaries = ds.boundaries;
        boundaries.push(square("GLOBEX", "F1", "F1_1", 700_000.0, 7_300_000.0, 200.0));

        let mut observations: Vec<Observation> =
            ds.observations.into_iter().map(|p| p.observation).collect();
        observations.extend(
            points("F1", "F1_1", date(2024, 4, 5), (700_000.0, 7_300_000.0), 40, 60)
                .into_iter()
                .map(|o| Observation {
                    company: "GLOBEX".to_string(),
                    ..o
                }),
        );

        build(boundaries, observations)
    }

    fn build(boundaries: Vec<StandBoundary>, observations: Vec<Observation>) -> Dataset {
        // median of a two-valued set: every 5 % point is defoliated, every 80 % point healthy
        let analysis = AnalysisConfig {
            quantile: 0.5,
            ..AnalysisConfig::default()
        };
        Dataset::build(
            ObservationLoad {
                observations,
                skipped_rows: 3,
            },
            BoundaryLoad {
                boundaries,
                ..BoundaryLoad::default()
            },
            &analysis,
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::{dataset, date, shared_farm_name};
    use super::*;

    #[test]
    fn test_threshold_is_computed_over_all_points() {
        let ds = dataset();
        // 1 550 of 4 510 points have cover 5, the rest 80
        assert_eq!(ds.threshold.canopy_cover, 80.0);
        assert_eq!(ds.observations.iter().filter(|p| p.is_defoliated()).count(), 1_550);
    }

    #[test]
    fn test_load_report_counts() {
        let ds = dataset();
        assert_eq!(ds.report.skipped_rows, 3);
        assert_eq!(ds.report.unmatched_observations, 10);
        assert_eq!(ds.report.stands, 3);
    }

    #[test]
    fn test_selection_options() {
        let ds = dataset();
        assert_eq!(ds.companies(), vec!["ACME"]);
        assert_eq!(ds.farms_of("ACME"), vec!["F1", "F2"]);
        assert_eq!(ds.stands_of("ACME", "F2"), vec!["F2_1", "F2_9"]);
        assert_eq!(ds.dates_of("ACME"), vec![date(2024, 2, 10), date(2024, 3, 10)]);
        assert!(ds.farms_of("NOBODY").is_empty());
    }

    #[test]
    fn test_resolve_defaults_to_latest_date() {
        let ds = dataset();
        let sel = ds.resolve("acme", Some("f1"), None, None).unwrap();
        assert_eq!(sel.company, "ACME");
        assert_eq!(sel.farm.as_deref(), Some("F1"));
        assert_eq!(sel.date, date(2024, 3, 10));
    }

    #[test]
    fn test_resolve_finds_farm_of_stand() {
        let ds = dataset();
        let sel = ds.resolve("ACME", None, Some("F2_1"), None).unwrap();
        assert_eq!(sel.farm.as_deref(), Some("F2"));
    }

    #[test]
    fn test_resolve_rejects_unknown_names() {
        let ds = dataset();
        assert!(matches!(ds.resolve("NOBODY", None, None, None), Err(AppError::NotFound(_))));
        assert!(matches!(ds.resolve("ACME", Some("F9"), None, None), Err(AppError::NotFound(_))));
        assert!(matches!(
            ds.resolve("ACME", Some("F1"), Some("F2_1"), None),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_companies_sharing_a_farm_name_are_kept_apart() {
        let ds = shared_farm_name();
        assert_eq!(ds.farm_boundaries("ACME", "F1").count(), 2);
        assert_eq!(ds.farm_boundaries("GLOBEX", "F1").count(), 1);
        assert_eq!(ds.index.farm_area_ha("GLOBEX", "F1"), Some(4.0));
        assert_eq!(ds.index.farm_area_ha("ACME", "F1"), Some(125.0));

        let globex: Vec<_> = ds.farm_rows("GLOBEX").collect();
        assert_eq!(globex.len(), 1);
        assert_eq!(globex[0].metrics.percentage, Some("10.0".parse().unwrap()));
        assert_eq!(ds.report.unmatched_observations, 10);
    }

    #[test]
    fn test_points_filter_by_selection() {
        let ds = dataset();
        let sel = ds.resolve("ACME", Some("F1"), Some("F1_2"), Some(date(2024, 2, 10))).unwrap();
        assert_eq!(ds.points(&sel).count(), 500);
    }
}
