//! Point prediction table reader

use std::{fs::File, io::Read, path::Path};

use chrono::NaiveDate;
use geo::Coord;
use serde::Deserialize;
use shared::{
    normalize_identifier, validate_canopy_cover, validate_coordinates, validate_identifier,
    Observation,
};

use super::{IngestError, IngestResult};
use crate::projection::Reprojector;

const REQUIRED_COLUMNS: [&str; 7] = ["COMPANY", "FARM", "STAND", "DATE", "X", "Y", "canopycov"];

/// Raw row of the prediction export
#[derive(Debug, Deserialize)]
struct ObservationRecord {
    #[serde(rename = "COMPANY")]
    company: String,
    #[serde(rename = "FARM")]
    farm: String,
    #[serde(rename = "STAND")]
    stand: String,
    #[serde(rename = "DATE")]
    date: String,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
    #[serde(rename = "canopycov")]
    canopy_cover: f64,
}

/// Observations read from one file
#[derive(Debug, Clone)]
pub struct ObservationLoad {
    pub observations: Vec<Observation>,
    /// Rows dropped because a field was missing or invalid
    pub skipped_rows: usize,
}

/// Date part of an ISO date or timestamp (`2024-03-01`, `2024-03-01 00:00:00`, `2024-03-01T12:00:00Z`)
pub fn parse_observation_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

impl ObservationRecord {
    fn into_observation(self, reprojector: &Reprojector) -> Result<Observation, String> {
        for (name, value) in [("COMPANY", &self.company), ("FARM", &self.farm), ("STAND", &self.stand)] {
            validate_identifier(value).map_err(|msg| format!("{}: {}", name, msg))?;
        }
        let date = parse_observation_date(&self.date)
            .ok_or_else(|| format!("DATE: cannot parse {:?}", self.date))?;
        validate_coordinates(self.x, self.y).map_err(|msg| format!("X/Y: {}", msg))?;
        validate_canopy_cover(self.canopy_cover).map_err(|msg| format!("canopycov: {}", msg))?;

        let projected = reprojector
            .coord(Coord { x: self.x, y: self.y })
            .map_err(|e| e.to_string())?;

        Ok(Observation {
            company: normalize_identifier(&self.company),
            farm: normalize_identifier(&self.farm),
            stand: normalize_identifier(&self.stand),
            date,
            x: projected.x,
            y: projected.y,
            canopy_cover: self.canopy_cover,
        })
    }
}

/// Load the observation CSV, reprojecting X/Y into the working CRS
pub fn load_observations(path: &Path, reprojector: &Reprojector) -> IngestResult<ObservationLoad> {
    let file = File::open(path).map_err(|source| IngestError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let load = read_observations(file, reprojector)?;
    tracing::info!(
        path = %path.display(),
        crs = %reprojector.source(),
        rows = load.observations.len(),
        skipped = load.skipped_rows,
        "Loaded observations"
    );
    Ok(load)
}

/// Parse observations from any reader. Invalid rows are skipped and counted.
pub fn read_observations<R: Read>(reader: R, reprojector: &Reprojector) -> IngestResult<ObservationLoad> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(IngestError::MissingColumn(column.to_string()));
        }
    }

    let mut observations = Vec::new();
    let mut skipped_rows = 0;

    for (index, result) in csv_reader.deserialize::<ObservationRecord>().enumerate() {
        // header is line 1
        let line = index + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(line, error = %e, "Skipping unreadable observation row");
                skipped_rows += 1;
                continue;
            }
        };
        match record.into_observation(reprojector) {
            Ok(observation) => observations.push(observation),
            Err(reason) => {
                tracing::warn!(line, %reason, "Skipping invalid observation row");
                skipped_rows += 1;
            }
        }
    }

    Ok(ObservationLoad {
        observations,
        skipped_rows,
    })
}
