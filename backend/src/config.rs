//! Configuration management for the Ant Defoliation Monitor
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides: `ADM_` prefix, `__` between nested
//!    keys (`ADM_DATA__BOUNDARIES_CRS=EPSG:31982`)

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use shared::{Crs, MonthLocale, DEFAULT_QUANTILE};

use crate::projection;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Input files
    pub data: DataConfig,

    /// Classification and reporting parameters
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    /// Point predictions (CSV)
    pub observations_path: String,

    /// Stand boundaries (GeoJSON or ESRI shapefile)
    pub boundaries_path: String,

    /// CRS of the X/Y columns of the observation file
    pub observations_crs: Crs,

    /// CRS of the boundary geometries
    pub boundaries_crs: Crs,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Canopy-cover quantile below which a point is defoliated
    pub quantile: f64,

    /// Projected CRS used for areas, maps and PDF exports
    pub working_crs: Crs,

    /// Language of month labels
    pub month_locale: MonthLocale,

    /// Number of stands in top-N rankings
    pub top_n: usize,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("ADM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("data.observations_path", "data/observations.csv")?
            .set_default("data.boundaries_path", "data/boundaries.geojson")?
            .set_default("data.observations_crs", "EPSG:4326")?
            .set_default("data.boundaries_crs", "EPSG:4326")?
            .set_default("analysis.quantile", DEFAULT_QUANTILE)?
            .set_default("analysis.working_crs", Crs::UTM_22S.to_string())?
            .set_default("analysis.month_locale", MonthLocale::PtBr.code())?
            .set_default("analysis.top_n", 10)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (ADM_SECTION__KEY)
            .add_source(environment_overrides())
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        shared::validate_quantile(self.analysis.quantile)
            .map_err(|msg| ConfigError::Message(format!("analysis.quantile: {}", msg)))?;
        for (key, crs) in [
            ("data.observations_crs", self.data.observations_crs),
            ("data.boundaries_crs", self.data.boundaries_crs),
        ] {
            projection::describe(crs).map_err(|e| ConfigError::Message(format!("{}: {}", key, e)))?;
        }
        let working = projection::describe(self.analysis.working_crs)
            .map_err(|e| ConfigError::Message(format!("analysis.working_crs: {}", e)))?;
        if !working.projected {
            return Err(ConfigError::Message(format!(
                "analysis.working_crs must be a projected CRS, got {}",
                self.analysis.working_crs
            )));
        }
        if self.analysis.top_n == 0 {
            return Err(ConfigError::Message(
                "analysis.top_n must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            quantile: DEFAULT_QUANTILE,
            working_crs: Crs::UTM_22S,
            month_locale: MonthLocale::PtBr,
            top_n: 10,
        }
    }
}

fn environment_overrides() -> Environment {
    Environment::with_prefix("ADM")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}
