//! Stand boundary reader
//!
//! Boundaries are repaired in their source CRS, projected into the working
//! CRS and measured there. Features sharing a (company, farm, stand) key are
//! merged into one multipolygon. Unrepairable features are reported, never
//! zeroed.

use std::{collections::BTreeMap, fs, path::Path};

use geo::{Coord, LineString, MultiPolygon, Polygon};
use geojson::{GeoJson, Value};
use serde::Serialize;
use shapefile::dbase::{FieldValue, Record};
use shapefile::PolygonRing;
use shared::{
    geometry::{area_ha, repair_multipolygon},
    normalize_identifier, normalize_stand_code, stand_identifier, RejectedBoundary, StandBoundary,
};

use super::{IngestError, IngestResult};
use crate::projection::Reprojector;

pub const COMPANY_FIELD: &str = "Companhia";
pub const FARM_FIELD: &str = "Fazenda";
pub const STAND_CODE_FIELD: &str = "CD_TALHAO";

/// Boundary feature as read from disk, before normalization and repair
#[derive(Debug, Clone)]
struct RawBoundary {
    company: String,
    farm: String,
    stand_code: String,
    geometry: Option<MultiPolygon>,
}

/// Boundaries read from one file
#[derive(Debug, Clone, Default, Serialize)]
pub struct BoundaryLoad {
    pub boundaries: Vec<StandBoundary>,
    pub rejected: Vec<RejectedBoundary>,
    /// Features whose geometry needed fixing
    pub repaired: usize,
    /// Features folded into another feature of the same stand
    pub merged: usize,
}

/// Load boundaries from a GeoJSON (`.geojson`, `.json`) or ESRI (`.shp`) file
pub fn load_boundaries(path: &Path, reprojector: &Reprojector) -> IngestResult<BoundaryLoad> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let raw = match extension.as_str() {
        "geojson" | "json" => {
            let text = fs::read_to_string(path).map_err(|source| IngestError::Io {
                path: path.display().to_string(),
                source,
            })?;
            parse_geojson(&text)?
        }
        "shp" => read_shapefile(path)?,
        _ => return Err(IngestError::UnsupportedFormat(path.display().to_string())),
    };

    let load = build_boundaries(raw, reprojector);
    tracing::info!(
        path = %path.display(),
        crs = %reprojector.source(),
        stands = load.boundaries.len(),
        rejected = load.rejected.len(),
        repaired = load.repaired,
        merged = load.merged,
        "Loaded stand boundaries"
    );
    Ok(load)
}

/// Read boundaries from GeoJSON text
pub fn read_geojson_boundaries(text: &str, reprojector: &Reprojector) -> IngestResult<BoundaryLoad> {
    Ok(build_boundaries(parse_geojson(text)?, reprojector))
}

// ============================================================================
// GeoJSON
// ============================================================================

fn json_text(value: Option<&serde_json::Value>) -> String {
    match value {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => match n.as_i64() {
            Some(i) => i.to_string(),
            None => n.to_string(),
        },
        _ => String::new(),
    }
}

fn position_ring(ring: &[Vec<f64>]) -> LineString {
    LineString::new(
        ring.iter()
            .filter(|p| p.len() >= 2)
            .map(|p| Coord { x: p[0], y: p[1] })
            .collect(),
    )
}

fn position_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon> {
    let (exterior, holes) = rings.split_first()?;
    Some(Polygon::new(
        position_ring(exterior),
        holes.iter().map(|r| position_ring(r)).collect(),
    ))
}

fn geojson_multipolygon(value: &Value) -> Option<MultiPolygon> {
    match value {
        Value::Polygon(rings) => position_polygon(rings).map(|p| MultiPolygon::new(vec![p])),
        Value::MultiPolygon(polygons) => Some(MultiPolygon::new(
            polygons.iter().filter_map(|rings| position_polygon(rings)).collect(),
        )),
        _ => None,
    }
}

fn parse_geojson(text: &str) -> IngestResult<Vec<RawBoundary>> {
    let features = match text.parse::<GeoJson>()? {
        GeoJson::FeatureCollection(collection) => collection.features,
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(_) => {
            return Err(IngestError::UnsupportedFormat(
                "GeoJSON geometry without attributes".to_string(),
            ))
        }
    };

    Ok(features
        .iter()
        .map(|feature| RawBoundary {
            company: json_text(feature.property(COMPANY_FIELD)),
            farm: json_text(feature.property(FARM_FIELD)),
            stand_code: json_text(feature.property(STAND_CODE_FIELD)),
            geometry: feature
                .geometry
                .as_ref()
                .and_then(|g| geojson_multipolygon(&g.value)),
        })
        .collect())
}

// ============================================================================
// ESRI shapefile
// ============================================================================

fn field_text(value: Option<&FieldValue>) -> String {
    let number = |n: f64| {
        if n.fract() == 0.0 {
            format!("{}", n as i64)
        } else {
            n.to_string()
        }
    };
    match value {
        Some(FieldValue::Character(Some(s))) => s.clone(),
        Some(FieldValue::Memo(s)) => s.clone(),
        Some(FieldValue::Numeric(Some(n))) => number(*n),
        Some(FieldValue::Double(n)) => number(*n),
        Some(FieldValue::Float(Some(n))) => number(f64::from(*n)),
        Some(FieldValue::Integer(i)) => i.to_string(),
        _ => String::new(),
    }
}

/// Outer rings start a new polygon, inner rings attach to the previous one
fn shape_multipolygon(shape: &shapefile::Polygon) -> MultiPolygon {
    let mut polygons: Vec<(LineString, Vec<LineString>)> = Vec::new();
    for ring in shape.rings() {
        let line = LineString::new(
            ring.points()
                .iter()
                .map(|p| Coord { x: p.x, y: p.y })
                .collect(),
        );
        match ring {
            PolygonRing::Outer(_) => polygons.push((line, Vec::new())),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some((_, holes)) => holes.push(line),
                None => polygons.push((line, Vec::new())),
            },
        }
    }
    MultiPolygon::new(
        polygons
            .into_iter()
            .map(|(exterior, holes)| Polygon::new(exterior, holes))
            .collect(),
    )
}

fn read_shapefile(path: &Path) -> IngestResult<Vec<RawBoundary>> {
    let shapes = shapefile::read_as::<_, shapefile::Polygon, Record>(path)?;
    Ok(shapes
        .iter()
        .map(|(shape, record)| RawBoundary {
            company: field_text(record.get(COMPANY_FIELD)),
            farm: field_text(record.get(FARM_FIELD)),
            stand_code: field_text(record.get(STAND_CODE_FIELD)),
            geometry: Some(shape_multipolygon(shape)),
        })
        .collect())
}

// ============================================================================
// Normalization, repair and measurement
// ============================================================================

fn build_boundaries(raw: Vec<RawBoundary>, reprojector: &Reprojector) -> BoundaryLoad {
    let mut load = BoundaryLoad::default();
    let mut by_stand: BTreeMap<(String, String, String), StandBoundary> = BTreeMap::new();

    for feature in raw {
        let company = normalize_identifier(&feature.company);
        let farm = normalize_identifier(&feature.farm);
        let stand = if normalize_stand_code(&feature.stand_code).is_empty() {
            String::new()
        } else {
            stand_identifier(&feature.farm, &feature.stand_code)
        };

        let mut reject = |reason: String| {
            tracing::warn!(%farm, %stand, %reason, "Excluding stand boundary");
            load.rejected.push(RejectedBoundary {
                company: company.clone(),
                farm: farm.clone(),
                stand: stand.clone(),
                reason,
            });
        };

        if farm.is_empty() || stand.is_empty() {
            reject(format!("missing {} or {}", FARM_FIELD, STAND_CODE_FIELD));
            continue;
        }
        let Some(geometry) = feature.geometry else {
            reject("geometry is not a polygon".to_string());
            continue;
        };
        let repaired = match repair_multipolygon(&geometry) {
            Ok(repaired) => repaired,
            Err(e) => {
                reject(e.to_string());
                continue;
            }
        };
        let projected = match reprojector.multipolygon(&repaired.geometry) {
            Ok(projected) => projected,
            Err(e) => {
                reject(e.to_string());
                continue;
            }
        };

        if repaired.was_modified() {
            tracing::debug!(%farm, %stand, fixes = ?repaired.fixes, "Repaired stand boundary");
            load.repaired += 1;
        }

        let area = area_ha(&projected);
        let key = (company.clone(), farm.clone(), stand.clone());
        match by_stand.get_mut(&key) {
            Some(existing) => {
                existing.geometry.0.extend(projected.0);
                existing.area_ha += area;
                load.merged += 1;
            }
            None => {
                by_stand.insert(
                    key,
                    StandBoundary {
                        company,
                        farm,
                        stand,
                        geometry: projected,
                        area_ha: area,
                    },
                );
            }
        }
    }

    load.boundaries = by_stand.into_values().collect();
    load
}
