//! Dashboard and heatmap handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::{AppError, AppResult};
use crate::handlers::SelectionQuery;
use crate::services::dashboard::{FarmDashboard, Heatmap, OverviewDashboard, StandDashboard};
use crate::services::{DashboardService, Selection};
use crate::AppState;

fn require_farm(selection: &Selection) -> AppResult<String> {
    selection.farm.clone().ok_or_else(|| AppError::Validation {
        field: "farm".to_string(),
        message: "A farm must be selected".to_string(),
        message_pt: "Selecione uma fazenda".to_string(),
    })
}

fn require_stand(selection: &Selection) -> AppResult<(String, String)> {
    match (&selection.farm, &selection.stand) {
        (Some(farm), Some(stand)) => Ok((farm.clone(), stand.clone())),
        _ => Err(AppError::Validation {
            field: "stand".to_string(),
            message: "A stand must be selected".to_string(),
            message_pt: "Selecione um talhão".to_string(),
        }),
    }
}

/// Company overview
pub async fn get_overview(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> AppResult<Json<OverviewDashboard>> {
    let selection = query.resolve(&state.dataset)?;
    let service = DashboardService::new(state.dataset.clone());
    Ok(Json(service.overview(&selection)))
}

/// Farm dashboard
pub async fn get_farm_dashboard(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> AppResult<Json<FarmDashboard>> {
    let selection = query.resolve(&state.dataset)?;
    let farm = require_farm(&selection)?;
    let service = DashboardService::new(state.dataset.clone());
    Ok(Json(service.farm(&selection, &farm)))
}

/// Stand dashboard
pub async fn get_stand_dashboard(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> AppResult<Json<StandDashboard>> {
    let selection = query.resolve(&state.dataset)?;
    let (farm, stand) = require_stand(&selection)?;
    let service = DashboardService::new(state.dataset.clone());
    Ok(Json(service.stand(&selection, &farm, &stand)))
}

/// Points of every stand of the farm
pub async fn get_farm_heatmap(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> AppResult<Json<Heatmap>> {
    let selection = query.resolve(&state.dataset)?;
    require_farm(&selection)?;
    let farm_selection = Selection {
        stand: None,
        ..selection
    };
    let service = DashboardService::new(state.dataset.clone());
    Ok(Json(service.heatmap(&farm_selection)))
}

/// Points of one stand
pub async fn get_stand_heatmap(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> AppResult<Json<Heatmap>> {
    let selection = query.resolve(&state.dataset)?;
    require_stand(&selection)?;
    let service = DashboardService::new(state.dataset.clone());
    Ok(Json(service.heatmap(&selection)))
}
