//! Route definitions for the Ant Defoliation Monitor

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/dataset", get(handlers::get_load_report))
        .nest("/selection", selection_routes())
        .nest("/dashboard", dashboard_routes())
        .nest("/heatmap", heatmap_routes())
        .route("/recommendations", get(handlers::get_recommendations))
        .nest("/exports", export_routes())
}

/// Company, farm, stand and date pickers
fn selection_routes() -> Router<AppState> {
    Router::new()
        .route("/companies", get(handlers::list_companies))
        .route("/farms", get(handlers::list_farms))
        .route("/stands", get(handlers::list_stands))
        .route("/dates", get(handlers::list_dates))
}

fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/overview", get(handlers::get_overview))
        .route("/farm", get(handlers::get_farm_dashboard))
        .route("/stand", get(handlers::get_stand_dashboard))
}

fn heatmap_routes() -> Router<AppState> {
    Router::new()
        .route("/farm", get(handlers::get_farm_heatmap))
        .route("/stand", get(handlers::get_stand_heatmap))
}

/// Downloads
fn export_routes() -> Router<AppState> {
    Router::new()
        .route("/stands.csv", get(handlers::export_stands_csv))
        .route("/farms.csv", get(handlers::export_farms_csv))
        .route("/farm.pdf", get(handlers::export_farm_pdf))
        .route("/stand.pdf", get(handlers::export_stand_pdf))
}
