//! Boundary geometry validation, repair and measurement
//!
//! Stand polygons coming from field shapefiles are frequently slightly
//! broken: repeated vertices, unclosed rings, clockwise exteriors, sliver
//! holes, exteriors that cross themselves. Those are fixed here before any
//! area is measured. A crossing exterior is cut at every crossing into
//! simple loops; each loop with area becomes a part, and a loop lying inside
//! another one becomes a hole of it. Only geometry with no area left after
//! repair is rejected.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::orient::{Direction, Orient};
use geo::{
    Area, BoundingRect, Contains, Coord, InteriorPoint, Intersects, Line, LineString, MultiPolygon,
    Polygon,
};
use serde::Serialize;

use crate::error::GeometryError;
use crate::types::BoundingBox;

const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

/// A fix applied while repairing a geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryFix {
    RemovedDuplicateVertices,
    ClosedRing,
    ReorientedRings,
    DroppedDegenerateHole,
    DroppedDegeneratePart,
    SplitSelfIntersection,
}

/// Result of a successful repair
#[derive(Debug, Clone)]
pub struct Repaired<G> {
    pub geometry: G,
    pub fixes: Vec<GeometryFix>,
}

impl<G> Repaired<G> {
    pub fn was_modified(&self) -> bool {
        !self.fixes.is_empty()
    }
}

fn push_fix(fixes: &mut Vec<GeometryFix>, fix: GeometryFix) {
    if !fixes.contains(&fix) {
        fixes.push(fix);
    }
}

/// Drop repeated vertices and make sure the ring is closed
fn clean_ring(ring: &LineString, fixes: &mut Vec<GeometryFix>) -> Result<LineString, GeometryError> {
    let mut coords: Vec<Coord> = Vec::with_capacity(ring.0.len() + 1);
    for c in ring.coords() {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(GeometryError::NonFinite);
        }
        if coords.last() == Some(c) {
            push_fix(fixes, GeometryFix::RemovedDuplicateVertices);
            continue;
        }
        coords.push(*c);
    }

    let closed = coords.len() > 1 && coords.first() == coords.last();
    let distinct = if closed { coords.len() - 1 } else { coords.len() };
    if distinct < 3 {
        return Err(GeometryError::TooFewVertices);
    }
    if !closed {
        push_fix(fixes, GeometryFix::ClosedRing);
        coords.push(coords[0]);
    }
    Ok(LineString::new(coords))
}

/// True when two non-adjacent edges of a closed ring touch or cross
pub fn ring_self_intersects(ring: &LineString) -> bool {
    let segments: Vec<Line> = ring.lines().collect();
    let n = segments.len();
    for i in 0..n {
        for j in (i + 2)..n {
            // first and last edges share the closing vertex
            if i == 0 && j == n - 1 {
                continue;
            }
            if segments[i].intersects(&segments[j]) {
                return true;
            }
        }
    }
    false
}

fn distance_squared(a: Coord, b: Coord) -> f64 {
    (a.x - b.x).powi(2) + (a.y - b.y).powi(2)
}

/// Closed ring with every crossing between non-adjacent edges inserted as a vertex
fn node_ring(ring: &LineString) -> Vec<Coord> {
    let segments: Vec<Line> = ring.lines().collect();
    let n = segments.len();
    let mut cuts: Vec<Vec<Coord>> = vec![Vec::new(); n];
    for i in 0..n {
        for j in (i + 2)..n {
            if i == 0 && j == n - 1 {
                continue;
            }
            match line_intersection(segments[i], segments[j]) {
                Some(LineIntersection::SinglePoint { intersection, .. }) => {
                    cuts[i].push(intersection);
                    cuts[j].push(intersection);
                }
                Some(LineIntersection::Collinear { intersection }) => {
                    for c in [intersection.start, intersection.end] {
                        cuts[i].push(c);
                        cuts[j].push(c);
                    }
                }
                None => {}
            }
        }
    }

    let mut noded = Vec::with_capacity(n + 1);
    for (segment, mut points) in segments.iter().zip(cuts) {
        noded.push(segment.start);
        points.retain(|c| *c != segment.start && *c != segment.end);
        points.sort_by(|a, b| {
            distance_squared(segment.start, *a).total_cmp(&distance_squared(segment.start, *b))
        });
        points.dedup();
        noded.extend(points);
    }
    if let Some(last) = segments.last() {
        noded.push(last.end);
    }
    noded
}

/// Walk a noded ring and cut off a loop each time a vertex is revisited
fn split_loops(noded: &[Coord]) -> Vec<LineString> {
    let mut loops = Vec::new();
    let mut path: Vec<Coord> = Vec::with_capacity(noded.len());
    for c in noded {
        if let Some(start) = path.iter().position(|p| p == c) {
            let mut ring = path.split_off(start);
            ring.push(*c);
            loops.push(LineString::new(ring));
        }
        path.push(*c);
    }
    loops
}

/// Cut a self-intersecting ring into simple polygons, nesting inner loops as holes
fn split_self_intersecting(ring: &LineString) -> Vec<Polygon> {
    let mut loops: Vec<Polygon> = split_loops(&node_ring(ring))
        .into_iter()
        .map(|ring| Polygon::new(ring, vec![]))
        .filter(|p| p.unsigned_area() > 0.0)
        .collect();
    loops.sort_by(|a, b| b.unsigned_area().total_cmp(&a.unsigned_area()));

    let mut shells: Vec<Polygon> = Vec::with_capacity(loops.len());
    for candidate in loops {
        let inside = candidate
            .interior_point()
            .and_then(|point| shells.iter_mut().find(|shell| shell.contains(&point)));
        match inside {
            Some(shell) => shell.interiors_push(candidate.exterior().clone()),
            None => shells.push(candidate),
        }
    }
    shells
}

/// Repair a single polygon, returning an error when nothing with area is left.
///
/// A crossing exterior can come back as several parts.
pub fn repair_polygon(polygon: &Polygon) -> Result<Repaired<MultiPolygon>, GeometryError> {
    let mut fixes = Vec::new();

    let exterior = clean_ring(polygon.exterior(), &mut fixes)?;
    let mut shells = if ring_self_intersects(&exterior) {
        push_fix(&mut fixes, GeometryFix::SplitSelfIntersection);
        split_self_intersecting(&exterior)
    } else {
        vec![Polygon::new(exterior, vec![])]
    };
    shells.retain(|shell| shell.unsigned_area() > 0.0);
    if shells.is_empty() {
        return Err(GeometryError::ZeroArea);
    }

    for hole in polygon.interiors() {
        match clean_ring(hole, &mut fixes) {
            Ok(ring) if !ring_self_intersects(&ring) => {
                let hole_polygon = Polygon::new(ring.clone(), vec![]);
                let owner = match hole_polygon.interior_point() {
                    Some(point) if hole_polygon.unsigned_area() > 0.0 => {
                        shells.iter_mut().find(|shell| shell.contains(&point))
                    }
                    _ => None,
                };
                match owner {
                    Some(shell) => shell.interiors_push(ring),
                    None => push_fix(&mut fixes, GeometryFix::DroppedDegenerateHole),
                }
            }
            Ok(_) | Err(GeometryError::TooFewVertices) => {
                push_fix(&mut fixes, GeometryFix::DroppedDegenerateHole)
            }
            Err(e) => return Err(e),
        }
    }

    let candidate = MultiPolygon::new(shells);
    let oriented = candidate.orient(Direction::Default);
    if oriented != candidate {
        push_fix(&mut fixes, GeometryFix::ReorientedRings);
    }

    Ok(Repaired {
        geometry: oriented,
        fixes,
    })
}

/// Repair every part of a multipolygon.
///
/// Degenerate parts are dropped as long as at least one valid part remains;
/// any other failure rejects the whole geometry.
pub fn repair_multipolygon(multipolygon: &MultiPolygon) -> Result<Repaired<MultiPolygon>, GeometryError> {
    let mut fixes = Vec::new();
    let mut parts = Vec::with_capacity(multipolygon.0.len());

    for polygon in multipolygon.iter() {
        match repair_polygon(polygon) {
            Ok(repaired) => {
                for fix in repaired.fixes {
                    push_fix(&mut fixes, fix);
                }
                parts.extend(repaired.geometry);
            }
            Err(GeometryError::TooFewVertices) | Err(GeometryError::ZeroArea)
                if multipolygon.0.len() > 1 =>
            {
                push_fix(&mut fixes, GeometryFix::DroppedDegeneratePart)
            }
            Err(e) => return Err(e),
        }
    }

    if parts.is_empty() {
        return Err(GeometryError::Empty);
    }

    Ok(Repaired {
        geometry: MultiPolygon::new(parts),
        fixes,
    })
}

/// Planar area in hectares. The geometry must be in a metric CRS.
pub fn area_ha(multipolygon: &MultiPolygon) -> f64 {
    multipolygon.unsigned_area() / SQUARE_METRES_PER_HECTARE
}

pub fn bounds(multipolygon: &MultiPolygon) -> Option<BoundingBox> {
    multipolygon.bounding_rect().map(|rect| BoundingBox {
        min_x: rect.min().x,
        min_y: rect.min().y,
        max_x: rect.max().x,
        max_y: rect.max().y,
    })
}
