//! Ant Defoliation Monitor - Backend Server
//!
//! Loads canopy-cover predictions and stand boundaries once at startup,
//! classifies and aggregates them, and serves dashboards, recommendation
//! tables and downloads over HTTP.

use axum::{routing::get, Router};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod error;
mod handlers;
mod ingest;
mod projection;
mod routes;
mod services;

pub use config::Config;
use services::Dataset;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dataset: Arc<Dataset>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "adm_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::load()?;

    tracing::info!("Starting Ant Defoliation Monitor Server");
    tracing::info!("Environment: {}", config.environment);

    tracing::info!(
        observations = %config.data.observations_path,
        boundaries = %config.data.boundaries_path,
        "Loading dataset..."
    );
    let dataset = Dataset::load(&config)?;
    tracing::info!(
        rejected_boundaries = dataset.report.rejected_boundaries.len(),
        skipped_rows = dataset.report.skipped_rows,
        "Dataset loaded"
    );

    // Create application state
    let state = AppState {
        config: Arc::new(config.clone()),
        dataset: Arc::new(dataset),
    };

    // Build application
    let app = create_app(state);

    // Start server
    let ip: std::net::IpAddr = config.server.host.parse()?;
    let addr = SocketAddr::from((ip, config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes and middleware
fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Ant Defoliation Monitor API v1.0"
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
