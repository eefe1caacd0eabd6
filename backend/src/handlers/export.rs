//! Spreadsheet and GeoPDF download handlers

use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::normalize_identifier;
use validator::Validate;

use crate::error::AppResult;
use crate::handlers::SelectionQuery;
use crate::services::{ExportFilter, ExportService, GeoPdfService};
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct ExportQuery {
    #[validate(length(min = 1, max = 100))]
    pub company: String,
    #[validate(length(min = 1, max = 100))]
    pub farm: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub stand: Option<String>,
    /// All dates when absent
    pub date: Option<NaiveDate>,
}

impl ExportQuery {
    fn filter(&self) -> AppResult<ExportFilter> {
        self.validate()?;
        Ok(ExportFilter {
            company: normalize_identifier(&self.company),
            farm: self.farm.as_deref().map(normalize_identifier),
            stand: self.stand.as_deref().map(normalize_identifier),
            date: self.date,
        })
    }
}

/// Download stand rows as CSV
pub async fn export_stands_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ExportService::new(state.dataset.clone());
    let rows = service.stand_rows(&query.filter()?)?;
    let csv = ExportService::export_to_csv(&rows)?;
    Ok((
        [(header::CONTENT_TYPE, "text/csv"), (header::CONTENT_DISPOSITION, "attachment; filename=\"talhoes.csv\"")],
        csv,
    ))
}

/// Download farm rows as CSV
pub async fn export_farms_csv(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> AppResult<impl IntoResponse> {
    let service = ExportService::new(state.dataset.clone());
    let rows = service.farm_rows(&query.filter()?)?;
    let csv = ExportService::export_to_csv(&rows)?;
    Ok((
        [(header::CONTENT_TYPE, "text/csv"), (header::CONTENT_DISPOSITION, "attachment; filename=\"fazendas.csv\"")],
        csv,
    ))
}

/// Download the farm map as a GeoPDF
pub async fn export_farm_pdf(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> AppResult<impl IntoResponse> {
    let selection = query.resolve(&state.dataset)?;
    let pdf = GeoPdfService::new(state.dataset.clone()).farm_pdf(&selection)?;
    Ok((
        [(header::CONTENT_TYPE, "application/pdf"), (header::CONTENT_DISPOSITION, "attachment; filename=\"fazenda_georreferenciado.pdf\"")],
        pdf,
    ))
}

/// Download the stand map as a GeoPDF
pub async fn export_stand_pdf(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> AppResult<impl IntoResponse> {
    let selection = query.resolve(&state.dataset)?;
    let pdf = GeoPdfService::new(state.dataset.clone()).stand_pdf(&selection)?;
    Ok((
        [(header::CONTENT_TYPE, "application/pdf"), (header::CONTENT_DISPOSITION, "attachment; filename=\"talhao_georreferenciado.pdf\"")],
        pdf,
    ))
}
