//! Selection option handlers

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use shared::normalize_identifier;
use validator::Validate;

use crate::error::AppResult;
use crate::services::LoadReport;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CompanyQuery {
    #[validate(length(min = 1, max = 100))]
    pub company: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FarmQuery {
    #[validate(length(min = 1, max = 100))]
    pub company: String,
    #[validate(length(min = 1, max = 100))]
    pub farm: String,
}

/// List companies
pub async fn list_companies(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.dataset.companies())
}

/// List farms of a company
pub async fn list_farms(
    State(state): State<AppState>,
    Query(query): Query<CompanyQuery>,
) -> AppResult<Json<Vec<String>>> {
    query.validate()?;
    Ok(Json(state.dataset.farms_of(&normalize_identifier(&query.company))))
}

/// List stands of a farm
pub async fn list_stands(
    State(state): State<AppState>,
    Query(query): Query<FarmQuery>,
) -> AppResult<Json<Vec<String>>> {
    query.validate()?;
    Ok(Json(state.dataset.stands_of(
        &normalize_identifier(&query.company),
        &normalize_identifier(&query.farm),
    )))
}

/// List observation dates of a company, ascending
pub async fn list_dates(
    State(state): State<AppState>,
    Query(query): Query<CompanyQuery>,
) -> AppResult<Json<Vec<NaiveDate>>> {
    query.validate()?;
    Ok(Json(state.dataset.dates_of(&normalize_identifier(&query.company))))
}

/// What was loaded at startup and what was left out
pub async fn get_load_report(State(state): State<AppState>) -> Json<LoadReport> {
    Json(state.dataset.report.clone())
}
