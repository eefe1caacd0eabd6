//! Recommendation handlers

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::handlers::SelectionQuery;
use crate::services::recommendation::RecommendationTable;
use crate::services::RecommendationService;
use crate::AppState;

/// Area per recommendation at the selected date, company-wide or for one farm
pub async fn get_recommendations(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> AppResult<Json<RecommendationTable>> {
    let selection = query.resolve(&state.dataset)?;
    let service = RecommendationService::new(state.dataset.clone());
    Ok(Json(service.table(&selection)))
}
