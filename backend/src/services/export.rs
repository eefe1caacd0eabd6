//! Spreadsheet export of farm and stand aggregates
//!
//! Column names follow the Portuguese recommendation sheet used in the field.
//! Each bucket column holds the row's total area when the row falls in that
//! bucket and is empty otherwise.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{AggregateMetrics, FarmAggregate, StandAggregate};

use crate::error::{AppError, AppResult};
use crate::services::dataset::Dataset;

/// Export service
#[derive(Clone)]
pub struct ExportService {
    dataset: Arc<Dataset>,
}

/// Rows to export; `None` fields do not filter
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    pub company: String,
    pub farm: Option<String>,
    pub stand: Option<String>,
    pub date: Option<NaiveDate>,
}

impl ExportFilter {
    fn describe(&self) -> String {
        let mut parts = vec![format!("company {}", self.company)];
        if let Some(farm) = &self.farm {
            parts.push(format!("farm {}", farm));
        }
        if let Some(stand) = &self.stand {
            parts.push(format!("stand {}", stand));
        }
        if let Some(date) = &self.date {
            parts.push(format!("date {}", date));
        }
        parts.join(", ")
    }
}

#[derive(Debug, Serialize)]
pub struct StandExportRow {
    #[serde(rename = "Data")]
    pub date: NaiveDate,
    #[serde(rename = "Fazenda")]
    pub farm: String,
    #[serde(rename = "Talhao")]
    pub stand: String,
    #[serde(rename = "Area total do talhao")]
    pub total_area_ha: Option<Decimal>,
    #[serde(rename = "Area total em desfolha")]
    pub defoliated_area_ha: Decimal,
    #[serde(rename = "Porcentagem")]
    pub percentage: Option<Decimal>,
    #[serde(rename = "Media mensal")]
    pub monthly_average: Option<Decimal>,
    #[serde(rename = "SDD")]
    pub no_defoliation: Option<Decimal>,
    #[serde(rename = "Controle 9M")]
    pub control_9_months: Option<Decimal>,
    #[serde(rename = "Controle 3M")]
    pub control_3_months: Option<Decimal>,
    #[serde(rename = "Outra Desfolha")]
    pub other_defoliation: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct FarmExportRow {
    #[serde(rename = "Data")]
    pub date: NaiveDate,
    #[serde(rename = "Fazenda")]
    pub farm: String,
    #[serde(rename = "Area total da fazenda")]
    pub total_area_ha: Option<Decimal>,
    #[serde(rename = "Area total em desfolha")]
    pub defoliated_area_ha: Decimal,
    #[serde(rename = "Porcentagem")]
    pub percentage: Option<Decimal>,
    #[serde(rename = "Media mensal")]
    pub monthly_average: Option<Decimal>,
    #[serde(rename = "SDD")]
    pub no_defoliation: Option<Decimal>,
    #[serde(rename = "Controle 9M")]
    pub control_9_months: Option<Decimal>,
    #[serde(rename = "Controle 3M")]
    pub control_3_months: Option<Decimal>,
    #[serde(rename = "Outra Desfolha")]
    pub other_defoliation: Option<Decimal>,
}

impl From<&StandAggregate> for StandExportRow {
    fn from(row: &StandAggregate) -> Self {
        let [no_defoliation, control_9_months, control_3_months, other_defoliation] =
            row.metrics.bucket_areas();
        Self {
            date: row.date,
            farm: row.farm.clone(),
            stand: row.stand.clone(),
            total_area_ha: row.metrics.total_area_ha,
            defoliated_area_ha: row.metrics.defoliated_area_ha,
            percentage: row.metrics.percentage,
            monthly_average: row.metrics.monthly_average,
            no_defoliation,
            control_9_months,
            control_3_months,
            other_defoliation,
        }
    }
}

impl From<&FarmAggregate> for FarmExportRow {
    fn from(row: &FarmAggregate) -> Self {
        let [no_defoliation, control_9_months, control_3_months, other_defoliation] =
            row.metrics.bucket_areas();
        Self {
            date: row.date,
            farm: row.farm.clone(),
            total_area_ha: row.metrics.total_area_ha,
            defoliated_area_ha: row.metrics.defoliated_area_ha,
            percentage: row.metrics.percentage,
            monthly_average: row.metrics.monthly_average,
            no_defoliation,
            control_9_months,
            control_3_months,
            other_defoliation,
        }
    }
}

fn matches(filter: &ExportFilter, farm: &str, date: NaiveDate, metrics: &AggregateMetrics) -> bool {
    // rows with no point at all never reach the aggregates; keep the guard explicit
    metrics.total_points > 0
        && filter.farm.as_deref().map_or(true, |f| f == farm)
        && filter.date.map_or(true, |d| d == date)
}

impl ExportService {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    /// Stand rows ordered by stand then date
    pub fn stand_rows(&self, filter: &ExportFilter) -> AppResult<Vec<StandExportRow>> {
        let rows: Vec<StandExportRow> = self
            .dataset
            .stand_rows(&filter.company)
            .filter(|r| matches(filter, &r.farm, r.date, &r.metrics))
            .filter(|r| filter.stand.as_deref().map_or(true, |s| s == r.stand))
            .map(StandExportRow::from)
            .collect();
        if rows.is_empty() {
            return Err(AppError::NoData(filter.describe()));
        }
        Ok(rows)
    }

    /// Farm rows ordered by farm then date
    pub fn farm_rows(&self, filter: &ExportFilter) -> AppResult<Vec<FarmExportRow>> {
        let rows: Vec<FarmExportRow> = self
            .dataset
            .farm_rows(&filter.company)
            .filter(|r| matches(filter, &r.farm, r.date, &r.metrics))
            .map(FarmExportRow::from)
            .collect();
        if rows.is_empty() {
            return Err(AppError::NoData(filter.describe()));
        }
        Ok(rows)
    }

    /// Export data to CSV format
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Export(format!("CSV serialization error: {}", e)))?;
        }
        let bytes = wtr
            .into_inner()
            .map_err(|e| AppError::Export(format!("CSV writer error: {}", e)))?;
        String::from_utf8(bytes).map_err(|e| AppError::Export(format!("UTF-8 conversion error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dataset::fixtures::{dataset, date};

    fn service() -> ExportService {
        ExportService::new(Arc::new(dataset()))
    }

    fn filter(farm: Option<&str>, on: Option<NaiveDate>) -> ExportFilter {
        ExportFilter {
            company: "ACME".to_string(),
            farm: farm.map(str::to_string),
            stand: None,
            date: on,
        }
    }

    #[test]
    fn test_stand_csv_header_and_bucket_columns() {
        let rows = service()
            .stand_rows(&filter(Some("F1"), Some(date(2024, 3, 10))))
            .unwrap();
        let csv = ExportService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();

        assert_eq!(
            lines.next().unwrap(),
            "Data,Fazenda,Talhao,Area total do talhao,Area total em desfolha,Porcentagem,\
             Media mensal,SDD,Controle 9M,Controle 3M,Outra Desfolha"
        );
        // F1_1: 12 % after 2 %, only the Outra Desfolha column is filled
        assert_eq!(
            lines.next().unwrap(),
            "2024-03-10,F1,F1_1,100.0,12.00,12.0,12.0,,,,100.0"
        );
        assert_eq!(lines.next().unwrap(), "2024-03-10,F1,F1_2,25.0,0.00,0.0,0.0,25.0,,,");
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_farm_rows_cover_every_date() {
        let rows = service().farm_rows(&filter(Some("F2"), None)).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].control_3_months, rows[1].total_area_ha);
        assert!(rows[1].other_defoliation.is_none());
    }

    #[test]
    fn test_empty_selection_is_no_data() {
        let err = service()
            .stand_rows(&filter(Some("F1"), Some(date(2023, 1, 1))))
            .unwrap_err();
        assert!(matches!(err, AppError::NoData(_)));

        let err = service()
            .farm_rows(&ExportFilter {
                company: "NOBODY".to_string(),
                ..ExportFilter::default()
            })
            .unwrap_err();
        assert!(matches!(err, AppError::NoData(_)));
    }
}
