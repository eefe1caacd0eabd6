//! Reprojection between coordinate reference systems
//!
//! Transforms go through GDAL's `SpatialRef`/`CoordTransform`, so any CRS
//! PROJ knows by EPSG code is accepted (SIRGAS 2000, WGS 84 UTM, ...).
//! Axis order is forced to the traditional GIS order: x is easting or
//! longitude, y is northing or latitude.

use gdal::errors::GdalError;
use gdal::spatial_ref::{AxisMappingStrategy, CoordTransform, SpatialRef};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use shared::Crs;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProjectionError {
    #[error("unknown coordinate reference system {crs}: {source}")]
    UnknownCrs {
        crs: Crs,
        #[source]
        source: GdalError,
    },

    #[error("cannot reproject from {from} to {to}: {source}")]
    Transform {
        from: Crs,
        to: Crs,
        #[source]
        source: GdalError,
    },

    #[error("coordinate ({x}, {y}) has no position in {to}")]
    OutOfRange { x: f64, y: f64, to: Crs },
}

pub type ProjectionResult<T> = Result<T, ProjectionError>;

fn spatial_ref(crs: Crs) -> ProjectionResult<SpatialRef> {
    let mut srs = SpatialRef::from_epsg(crs.epsg())
        .map_err(|source| ProjectionError::UnknownCrs { crs, source })?;
    srs.set_axis_mapping_strategy(AxisMappingStrategy::TraditionalGisOrder);
    Ok(srs)
}

/// Facts about a CRS needed by validation and GeoPDF metadata
#[derive(Debug, Clone)]
pub struct CrsDefinition {
    pub crs: Crs,
    pub projected: bool,
    pub wkt: String,
}

pub fn describe(crs: Crs) -> ProjectionResult<CrsDefinition> {
    let srs = spatial_ref(crs)?;
    let wkt = srs
        .to_wkt()
        .map_err(|source| ProjectionError::UnknownCrs { crs, source })?;
    Ok(CrsDefinition {
        crs,
        projected: srs.is_projected(),
        wkt,
    })
}

/// Transform from one CRS to another. Identity when both are the same.
pub struct Reprojector {
    from: Crs,
    to: Crs,
    transform: Option<CoordTransform>,
}

impl Reprojector {
    pub fn new(from: Crs, to: Crs) -> ProjectionResult<Self> {
        let transform = if from == to {
            None
        } else {
            let source = spatial_ref(from)?;
            let target = spatial_ref(to)?;
            let transform = CoordTransform::new(&source, &target)
                .map_err(|source| ProjectionError::Transform { from, to, source })?;
            Some(transform)
        };
        Ok(Self { from, to, transform })
    }

    pub fn identity(crs: Crs) -> Self {
        Self {
            from: crs,
            to: crs,
            transform: None,
        }
    }

    pub fn source(&self) -> Crs {
        self.from
    }

    pub fn target(&self) -> Crs {
        self.to
    }

    fn transform_in_place(&self, xs: &mut [f64], ys: &mut [f64]) -> ProjectionResult<()> {
        let Some(transform) = &self.transform else {
            return Ok(());
        };
        let mut zs = vec![0.0; xs.len()];
        transform
            .transform_coords(xs, ys, &mut zs)
            .map_err(|source| ProjectionError::Transform {
                from: self.from,
                to: self.to,
                source,
            })?;
        if let Some((x, y)) = xs
            .iter()
            .zip(ys.iter())
            .find(|(x, y)| !x.is_finite() || !y.is_finite())
        {
            return Err(ProjectionError::OutOfRange {
                x: *x,
                y: *y,
                to: self.to,
            });
        }
        Ok(())
    }

    pub fn coord(&self, coord: Coord) -> ProjectionResult<Coord> {
        let mut xs = [coord.x];
        let mut ys = [coord.y];
        self.transform_in_place(&mut xs, &mut ys)?;
        Ok(Coord { x: xs[0], y: ys[0] })
    }

    fn ring(&self, ring: &LineString) -> ProjectionResult<LineString> {
        let (mut xs, mut ys): (Vec<f64>, Vec<f64>) = ring.coords().map(|c| (c.x, c.y)).unzip();
        self.transform_in_place(&mut xs, &mut ys)?;
        Ok(xs
            .into_iter()
            .zip(ys)
            .map(|(x, y)| Coord { x, y })
            .collect())
    }

    pub fn polygon(&self, polygon: &Polygon) -> ProjectionResult<Polygon> {
        let exterior = self.ring(polygon.exterior())?;
        let interiors = polygon
            .interiors()
            .iter()
            .map(|ring| self.ring(ring))
            .collect::<ProjectionResult<Vec<_>>>()?;
        Ok(Polygon::new(exterior, interiors))
    }

    pub fn multipolygon(&self, multipolygon: &MultiPolygon) -> ProjectionResult<MultiPolygon> {
        multipolygon
            .iter()
            .map(|polygon| self.polygon(polygon))
            .collect::<ProjectionResult<Vec<_>>>()
            .map(MultiPolygon::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    fn sirgas_22s() -> Crs {
        Crs::from_epsg(31982).unwrap()
    }

    #[test]
    fn test_known_point_in_zone_22s() {
        // 50°W 25°S is 22J 600913 7234680
        let reprojector = Reprojector::new(Crs::WGS84, Crs::UTM_22S).unwrap();
        let c = reprojector.coord(Coord { x: -50.0, y: -25.0 }).unwrap();
        assert!((c.x - 600_913.0).abs() < 1.0, "easting {}", c.x);
        assert!((c.y - 7_234_680.0).abs() < 1.0, "northing {}", c.y);
    }

    #[test]
    fn test_sirgas_2000_utm_is_supported() {
        let wgs84 = Reprojector::new(Crs::WGS84, Crs::UTM_22S)
            .unwrap()
            .coord(Coord { x: -50.0, y: -25.0 })
            .unwrap();
        let sirgas = Reprojector::new(Crs::WGS84, sirgas_22s())
            .unwrap()
            .coord(Coord { x: -50.0, y: -25.0 })
            .unwrap();
        // SIRGAS 2000 and WGS 84 agree to well under a metre
        assert!((wgs84.x - sirgas.x).abs() < 1.0);
        assert!((wgs84.y - sirgas.y).abs() < 1.0);
    }

    #[test]
    fn test_inverse_recovers_geographic_coordinates() {
        let forward = Reprojector::new(Crs::WGS84, Crs::UTM_22S).unwrap();
        let inverse = Reprojector::new(Crs::UTM_22S, Crs::WGS84).unwrap();
        let back = inverse
            .coord(forward.coord(Coord { x: -49.37, y: -22.91 }).unwrap())
            .unwrap();
        assert!((back.x + 49.37).abs() < 1e-7);
        assert!((back.y + 22.91).abs() < 1e-7);
    }

    #[test]
    fn test_identity_leaves_coordinates_untouched() {
        let c = Coord { x: 1.0, y: 2.0 };
        assert_eq!(Reprojector::identity(Crs::UTM_22S).coord(c).unwrap(), c);
        assert_eq!(Reprojector::new(Crs::UTM_22S, Crs::UTM_22S).unwrap().coord(c).unwrap(), c);
    }

    #[test]
    fn test_polygon_area_survives_a_round_trip() {
        let square = polygon![
            (x: 600_000.0, y: 7_200_000.0),
            (x: 600_100.0, y: 7_200_000.0),
            (x: 600_100.0, y: 7_200_100.0),
            (x: 600_000.0, y: 7_200_100.0),
            (x: 600_000.0, y: 7_200_000.0),
        ];
        let to_sirgas = Reprojector::new(Crs::UTM_22S, sirgas_22s()).unwrap();
        let projected = to_sirgas.polygon(&square).unwrap();
        assert!((projected.unsigned_area() - 10_000.0).abs() < 1.0);
    }

    #[test]
    fn test_unknown_epsg_code_is_rejected() {
        let bogus = Crs::from_epsg(999_999).unwrap();
        assert!(matches!(
            Reprojector::new(Crs::WGS84, bogus),
            Err(ProjectionError::UnknownCrs { .. })
        ));
    }

    #[test]
    fn test_describe_reports_projection() {
        assert!(describe(Crs::UTM_22S).unwrap().projected);
        assert!(describe(sirgas_22s()).unwrap().projected);
        let wgs84 = describe(Crs::WGS84).unwrap();
        assert!(!wgs84.projected);
        assert!(wgs84.wkt.contains("WGS"));
    }
}
