//! Query services over the loaded dataset

pub mod dashboard;
pub mod dataset;
pub mod export;
pub mod geopdf;
pub mod recommendation;

pub use dashboard::DashboardService;
pub use dataset::{Dataset, LoadReport, Selection};
pub use export::{ExportFilter, ExportService};
pub use geopdf::GeoPdfService;
pub use recommendation::RecommendationService;
