//! Georeferenced PDF maps of canopy cover
//!
//! One A4 landscape page per farm or stand. Points are drawn as squares of
//! the sampling cell size coloured on a red-yellow-green ramp stretched
//! over the selection's canopy cover range, under the stand outlines. The
//! page carries a geospatial viewport (`/VP` with a `GEO` measure) and the
//! document information dictionary carries the `CRS` and
//! `Geospatial_Coordinates` tags.

use std::collections::BTreeMap;
use std::sync::Arc;

use geo::{Coord, LineString, MultiPolygon};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};
use shared::{BoundingBox, Crs};

use crate::error::{AppError, AppResult};
use crate::projection::{describe, ProjectionError, Reprojector};
use crate::services::dataset::{Dataset, Selection};

const PAGE_WIDTH: f64 = 842.0;
const PAGE_HEIGHT: f64 = 595.0;
const MARGIN: f64 = 36.0;
const TITLE_BAND: f64 = 36.0;
const COLORBAR_BAND: f64 = 70.0;

const MAP_LEFT: f64 = MARGIN;
const MAP_BOTTOM: f64 = MARGIN;
const MAP_WIDTH: f64 = PAGE_WIDTH - 2.0 * MARGIN - COLORBAR_BAND;
const MAP_HEIGHT: f64 = PAGE_HEIGHT - 2.0 * MARGIN - TITLE_BAND;

const COLORBAR_WIDTH: f64 = 12.0;
const COLORBAR_HEIGHT: f64 = 300.0;

/// Side of the sampling cell each point stands for, in metres
const POINT_SIZE_M: f64 = 10.0;
const MIN_POINT_SIZE_PT: f64 = 0.5;

/// Number of distinct fill colours; points are batched per colour
const COLOR_BINS: usize = 64;

/// RdYlGn anchors, low canopy cover first
const RAMP: [[u8; 3]; 5] = [
    [0xa5, 0x00, 0x26],
    [0xf4, 0x6d, 0x43],
    [0xff, 0xff, 0xbf],
    [0x66, 0xbd, 0x63],
    [0x00, 0x68, 0x37],
];

const AUTHOR: &str = "Ant Defoliation Monitor";
const SUBJECT: &str = "GeoPDF com dados geograficos";
const KEYWORDS: &str = "Mapa, GeoPDF, Desfolha";
const COLORBAR_LABEL: &str = "Cobertura do dossel (%)";

/// GeoPDF service
#[derive(Clone)]
pub struct GeoPdfService {
    dataset: Arc<Dataset>,
}

/// One map point in the working CRS
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPoint {
    pub x: f64,
    pub y: f64,
    pub canopy_cover: f64,
}

/// Everything drawn on one map page
#[derive(Debug)]
pub struct MapLayers<'a> {
    pub title: String,
    pub crs: Crs,
    pub points: Vec<MapPoint>,
    /// Outlines stroked in black
    pub outlines: Vec<&'a MultiPolygon>,
    /// Outline stroked in red on top of the others
    pub highlight: Option<&'a MultiPolygon>,
}

impl<'a> MapLayers<'a> {
    /// Extent of the outlines and point centres
    pub fn bounds(&self) -> Option<BoundingBox> {
        let outline_coords = self
            .outlines
            .iter()
            .chain(self.highlight.iter())
            .flat_map(|mp| mp.iter())
            .flat_map(|polygon| polygon.exterior().coords())
            .map(|c| (c.x, c.y));
        let point_coords = self.points.iter().map(|p| (p.x, p.y));
        BoundingBox::covering(outline_coords.chain(point_coords))
    }
}

/// Linear world-to-page transform fitting the bounds into the map area
#[derive(Debug, Clone, Copy)]
struct Frame {
    min_x: f64,
    min_y: f64,
    width: f64,
    height: f64,
    scale: f64,
    origin_x: f64,
    origin_y: f64,
}

impl Frame {
    fn fit(bounds: &BoundingBox) -> Self {
        let width = bounds.width().max(POINT_SIZE_M);
        let height = bounds.height().max(POINT_SIZE_M);
        let scale = (MAP_WIDTH / width).min(MAP_HEIGHT / height);
        Self {
            min_x: bounds.min_x,
            min_y: bounds.min_y,
            width,
            height,
            scale,
            origin_x: MAP_LEFT + (MAP_WIDTH - width * scale) / 2.0,
            origin_y: MAP_BOTTOM + (MAP_HEIGHT - height * scale) / 2.0,
        }
    }

    fn to_page(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.origin_x + (x - self.min_x) * self.scale,
            self.origin_y + (y - self.min_y) * self.scale,
        )
    }

    /// Page rectangle `[x0, y0, x1, y1]` of the mapped extent
    fn page_box(&self) -> [f64; 4] {
        [
            self.origin_x,
            self.origin_y,
            self.origin_x + self.width * self.scale,
            self.origin_y + self.height * self.scale,
        ]
    }

    /// World corners in the order lower-left, upper-left, upper-right, lower-right
    fn world_corners(&self) -> [Coord; 4] {
        let (x0, y0) = (self.min_x, self.min_y);
        let (x1, y1) = (self.min_x + self.width, self.min_y + self.height);
        [
            Coord { x: x0, y: y0 },
            Coord { x: x0, y: y1 },
            Coord { x: x1, y: y1 },
            Coord { x: x1, y: y0 },
        ]
    }
}

/// PDF number. Only page-space values and degrees come through here; map
/// coordinates are brought to the page with [`Frame::to_page`] first, so a
/// UTM northing never meets the `f32` narrowing.
fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn reals<const N: usize>(values: [f64; N]) -> Vec<Object> {
    values.into_iter().map(real).collect()
}

/// Colour of a position in `0..=1` on the ramp, as PDF RGB components
pub fn ramp_color(t: f64) -> [f64; 3] {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let segments = (RAMP.len() - 1) as f64;
    let scaled = t * segments;
    let index = (scaled.floor() as usize).min(RAMP.len() - 2);
    let local = scaled - index as f64;
    let (from, to) = (RAMP[index], RAMP[index + 1]);
    let mut rgb = [0.0; 3];
    for i in 0..3 {
        let a = from[i] as f64;
        let b = to[i] as f64;
        rgb[i] = (a + (b - a) * local) / 255.0;
    }
    rgb
}

fn color_bin(canopy_cover: f64, min: f64, max: f64) -> usize {
    // a flat range maps to the low end of the ramp
    let t = if max > min {
        (canopy_cover - min) / (max - min)
    } else {
        0.0
    };
    (t.clamp(0.0, 1.0) * (COLOR_BINS - 1) as f64).round() as usize
}

fn bin_color(bin: usize) -> [f64; 3] {
    ramp_color(bin as f64 / (COLOR_BINS - 1) as f64)
}

/// Fold text to the ASCII range of the standard Helvetica encoding
fn fold_ascii(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            c if c.is_ascii() => c,
            _ => '?',
        })
        .collect()
}

fn text(ops: &mut Vec<Operation>, x: f64, y: f64, size: f64, value: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec!["F1".into(), real(size)]));
    ops.push(Operation::new("Td", reals([x, y])));
    ops.push(Operation::new("Tj", vec![Object::string_literal(fold_ascii(value))]));
    ops.push(Operation::new("ET", vec![]));
}

fn trace_ring(ops: &mut Vec<Operation>, frame: &Frame, ring: &LineString) {
    let mut coords = ring.coords();
    if let Some(first) = coords.next() {
        let (x, y) = frame.to_page(first.x, first.y);
        ops.push(Operation::new("m", reals([x, y])));
        for c in coords {
            let (x, y) = frame.to_page(c.x, c.y);
            ops.push(Operation::new("l", reals([x, y])));
        }
        ops.push(Operation::new("h", vec![]));
    }
}

fn stroke_outline(ops: &mut Vec<Operation>, frame: &Frame, outline: &MultiPolygon) {
    for polygon in outline.iter() {
        trace_ring(ops, frame, polygon.exterior());
        for hole in polygon.interiors() {
            trace_ring(ops, frame, hole);
        }
    }
    ops.push(Operation::new("S", vec![]));
}

fn draw_colorbar(ops: &mut Vec<Operation>, min: f64, max: f64) {
    let x = PAGE_WIDTH - MARGIN - COLORBAR_BAND + 16.0;
    let y = MAP_BOTTOM + (MAP_HEIGHT - COLORBAR_HEIGHT) / 2.0;
    let slice = COLORBAR_HEIGHT / COLOR_BINS as f64;

    for bin in 0..COLOR_BINS {
        ops.push(Operation::new("rg", reals(bin_color(bin))));
        ops.push(Operation::new(
            "re",
            reals([x, y + bin as f64 * slice, COLORBAR_WIDTH, slice]),
        ));
        ops.push(Operation::new("f", vec![]));
    }
    ops.push(Operation::new("RG", reals([0.0, 0.0, 0.0])));
    ops.push(Operation::new("w", vec![real(0.5)]));
    ops.push(Operation::new("re", reals([x, y, COLORBAR_WIDTH, COLORBAR_HEIGHT])));
    ops.push(Operation::new("S", vec![]));

    ops.push(Operation::new("rg", reals([0.0, 0.0, 0.0])));
    text(ops, x + COLORBAR_WIDTH + 4.0, y - 2.0, 7.0, &format!("{:.1}", min));
    text(
        ops,
        x + COLORBAR_WIDTH + 4.0,
        y + COLORBAR_HEIGHT - 5.0,
        7.0,
        &format!("{:.1}", max),
    );
    text(ops, x - 12.0, y + COLORBAR_HEIGHT + 10.0, 7.0, COLORBAR_LABEL);
}

/// Content stream operations for a map page
fn map_operations(layers: &MapLayers, frame: &Frame) -> Vec<Operation> {
    let mut ops = Vec::new();

    let (min, max) = layers
        .points
        .iter()
        .map(|p| p.canopy_cover)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));

    let mut bins: BTreeMap<usize, Vec<&MapPoint>> = BTreeMap::new();
    for point in &layers.points {
        bins.entry(color_bin(point.canopy_cover, min, max))
            .or_default()
            .push(point);
    }

    let side = (POINT_SIZE_M * frame.scale).max(MIN_POINT_SIZE_PT);
    for (bin, points) in &bins {
        ops.push(Operation::new("rg", reals(bin_color(*bin))));
        for point in points {
            let (x, y) = frame.to_page(point.x, point.y);
            ops.push(Operation::new(
                "re",
                reals([x - side / 2.0, y - side / 2.0, side, side]),
            ));
        }
        ops.push(Operation::new("f", vec![]));
    }

    ops.push(Operation::new("RG", reals([0.0, 0.0, 0.0])));
    ops.push(Operation::new("w", vec![real(0.5)]));
    for outline in &layers.outlines {
        stroke_outline(&mut ops, frame, outline);
    }

    if let Some(highlight) = layers.highlight {
        ops.push(Operation::new("RG", reals([1.0, 0.0, 0.0])));
        ops.push(Operation::new("w", vec![real(0.8)]));
        stroke_outline(&mut ops, frame, highlight);
    }

    if !layers.points.is_empty() {
        draw_colorbar(&mut ops, min, max);
    }

    ops.push(Operation::new("rg", reals([0.0, 0.0, 0.0])));
    text(
        &mut ops,
        MARGIN,
        PAGE_HEIGHT - MARGIN - 14.0,
        14.0,
        &layers.title,
    );

    ops
}

/// `GEO` measure tying the viewport to geographic coordinates
fn geo_measure(frame: &Frame, crs: Crs) -> AppResult<Dictionary> {
    let projection_error =
        |e: ProjectionError| AppError::Export(format!("GeoPDF corner projection: {}", e));
    let definition = describe(crs).map_err(projection_error)?;
    let to_geographic = Reprojector::new(crs, Crs::WGS84).map_err(projection_error)?;

    let mut gpts = Vec::with_capacity(8);
    for corner in frame.world_corners() {
        let geographic = to_geographic.coord(corner).map_err(projection_error)?;
        gpts.push(real(geographic.y));
        gpts.push(real(geographic.x));
    }

    let gcs_type = if definition.projected { "PROJCS" } else { "GEOGCS" };
    Ok(dictionary! {
        "Type" => "Measure",
        "Subtype" => "GEO",
        "Bounds" => reals([0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0]),
        "LPTS" => reals([0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 0.0]),
        "GPTS" => gpts,
        "GCS" => dictionary! {
            "Type" => gcs_type,
            "EPSG" => Object::Integer(crs.epsg() as i64),
            "WKT" => Object::string_literal(definition.wkt),
        },
    })
}

/// Render a one-page GeoPDF
pub fn render_map(layers: &MapLayers) -> AppResult<Vec<u8>> {
    let bounds = layers
        .bounds()
        .ok_or_else(|| AppError::NoData(layers.title.clone()))?;
    let frame = Frame::fit(&bounds);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let content = Content {
        operations: map_operations(layers, &frame),
    };
    let encoded = content
        .encode()
        .map_err(|e| AppError::Export(format!("PDF content encoding error: {}", e)))?;
    let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

    let viewport = dictionary! {
        "Type" => "Viewport",
        "BBox" => reals(frame.page_box()),
        "Name" => Object::string_literal("Mapa"),
        "Measure" => geo_measure(&frame, layers.crs)?,
    };

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => reals([0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT]),
        "VP" => vec![Object::Dictionary(viewport)],
    });

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => Object::Integer(1),
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });

    let [min_x, min_y, max_x, max_y] = bounds.as_array();
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(fold_ascii(&format!("GeoPDF do Mapa - {}", layers.title))),
        "Author" => Object::string_literal(AUTHOR),
        "Subject" => Object::string_literal(SUBJECT),
        "Keywords" => Object::string_literal(KEYWORDS),
        "CRS" => Object::string_literal(layers.crs.to_string()),
        "Geospatial_Coordinates" => Object::string_literal(format!(
            "[{:.2}, {:.2}, {:.2}, {:.2}]",
            min_x, min_y, max_x, max_y
        )),
    });

    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Export(format!("PDF write error: {}", e)))?;
    Ok(buffer)
}

impl GeoPdfService {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        Self { dataset }
    }

    fn map_points(&self, selection: &Selection) -> AppResult<Vec<MapPoint>> {
        let points: Vec<MapPoint> = self
            .dataset
            .points(selection)
            .map(|p| MapPoint {
                x: p.observation.x,
                y: p.observation.y,
                canopy_cover: p.observation.canopy_cover,
            })
            .collect();
        if points.is_empty() {
            return Err(AppError::NoData(selection.describe()));
        }
        Ok(points)
    }

    /// Map of every point of the farm, with the selected stand outlined in red
    pub fn farm_pdf(&self, selection: &Selection) -> AppResult<Vec<u8>> {
        let farm = selection.farm.as_deref().ok_or_else(|| AppError::Validation {
            field: "farm".to_string(),
            message: "A farm must be selected".to_string(),
            message_pt: "Selecione uma fazenda".to_string(),
        })?;

        let farm_selection = Selection {
            stand: None,
            ..selection.clone()
        };
        let points = self.map_points(&farm_selection)?;

        let outlines: Vec<&MultiPolygon> = self
            .dataset
            .farm_boundaries(&selection.company, farm)
            .map(|b| &b.geometry)
            .collect();
        let highlight = selection.stand.as_deref().and_then(|stand| {
            self.dataset
                .farm_boundaries(&selection.company, farm)
                .find(|b| b.stand == stand)
                .map(|b| &b.geometry)
        });

        tracing::debug!(farm, points = points.len(), "Rendering farm GeoPDF");
        render_map(&MapLayers {
            title: format!("Fazenda {} - {}", farm, selection.date),
            crs: self.dataset.working_crs,
            points,
            outlines,
            highlight,
        })
    }

    /// Map of one stand's points over its outline
    pub fn stand_pdf(&self, selection: &Selection) -> AppResult<Vec<u8>> {
        let (farm, stand) = match (selection.farm.as_deref(), selection.stand.as_deref()) {
            (Some(farm), Some(stand)) => (farm, stand),
            _ => {
                return Err(AppError::Validation {
                    field: "stand".to_string(),
                    message: "A stand must be selected".to_string(),
                    message_pt: "Selecione um talhao".to_string(),
                })
            }
        };

        let points = self.map_points(selection)?;
        let outlines: Vec<&MultiPolygon> = self
            .dataset
            .farm_boundaries(&selection.company, farm)
            .filter(|b| b.stand == stand)
            .map(|b| &b.geometry)
            .collect();

        tracing::debug!(farm, stand, points = points.len(), "Rendering stand GeoPDF");
        render_map(&MapLayers {
            title: format!("Talhao {} - {}", stand, selection.date),
            crs: self.dataset.working_crs,
            points,
            outlines,
            highlight: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::dataset::fixtures::{dataset, date, shared_farm_name};

    fn service() -> (GeoPdfService, Arc<Dataset>) {
        let ds = Arc::new(dataset());
        (GeoPdfService::new(ds.clone()), ds)
    }

    fn info_text(doc: &Document, key: &[u8]) -> String {
        let info_id = doc.trailer.get(b"Info").unwrap().as_reference().unwrap();
        let info = doc.get_object(info_id).unwrap().as_dict().unwrap();
        match info.get(key).unwrap() {
            Object::String(bytes, _) => String::from_utf8(bytes.clone()).unwrap(),
            other => panic!("unexpected info value {:?}", other),
        }
    }

    // ========================================================================
    // Colour ramp
    // ========================================================================

    #[test]
    fn test_ramp_endpoints() {
        let low = ramp_color(0.0);
        assert!((low[0] - 165.0 / 255.0).abs() < 1e-9);
        assert_eq!(low[1], 0.0);

        let high = ramp_color(1.0);
        assert_eq!(high[0], 0.0);
        assert!((high[1] - 104.0 / 255.0).abs() < 1e-9);

        // midpoint is the pale yellow anchor
        let mid = ramp_color(0.5);
        assert_eq!(mid[0], 1.0);
        assert_eq!(mid[1], 1.0);
    }

    #[test]
    fn test_color_bins_stretch_over_range() {
        assert_eq!(color_bin(5.0, 5.0, 80.0), 0);
        assert_eq!(color_bin(80.0, 5.0, 80.0), COLOR_BINS - 1);
        assert_eq!(color_bin(42.0, 42.0, 42.0), 0);
    }

    #[test]
    fn test_fold_ascii() {
        assert_eq!(fold_ascii("Talhão Área"), "Talhao Area");
        assert_eq!(fold_ascii("cobertura ☂"), "cobertura ?");
    }

    // ========================================================================
    // Page content
    // ========================================================================

    #[test]
    fn test_highlight_is_stroked_in_red() {
        let ds = dataset();
        let outline = &ds.boundaries[0].geometry;
        let layers = MapLayers {
            title: "F1".to_string(),
            crs: Crs::UTM_22S,
            points: vec![MapPoint {
                x: 600_500.0,
                y: 7_200_500.0,
                canopy_cover: 50.0,
            }],
            outlines: vec![outline],
            highlight: Some(outline),
        };
        let frame = Frame::fit(&layers.bounds().unwrap());
        let ops = map_operations(&layers, &frame);

        let red = ops.iter().any(|op| {
            op.operator == "RG"
                && matches!(
                    op.operands.as_slice(),
                    [Object::Real(r), Object::Real(g), Object::Real(b)]
                        if *r == 1.0 && *g == 0.0 && *b == 0.0
                )
        });
        assert!(red);
        // one filled square for the single point
        assert!(ops.iter().any(|op| op.operator == "re"));
    }

    #[test]
    fn test_path_operands_are_in_page_space() {
        let ds = dataset();
        let outlines: Vec<&MultiPolygon> = ds.boundaries.iter().map(|b| &b.geometry).collect();
        let layers = MapLayers {
            title: "ACME".to_string(),
            crs: Crs::UTM_22S,
            points: vec![MapPoint {
                x: 610_499.5,
                y: 7_200_499.5,
                canopy_cover: 50.0,
            }],
            outlines,
            highlight: None,
        };
        let frame = Frame::fit(&layers.bounds().unwrap());
        let ops = map_operations(&layers, &frame);

        let mut checked = 0;
        for op in ops.iter().filter(|op| matches!(op.operator.as_str(), "m" | "l" | "re")) {
            for operand in &op.operands {
                match operand {
                    Object::Real(v) => {
                        assert!((0.0..=PAGE_WIDTH as f32).contains(v), "{} {}", op.operator, v);
                        checked += 1;
                    }
                    other => panic!("unexpected operand {:?}", other),
                }
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn test_frame_keeps_aspect_ratio() {
        let bounds = BoundingBox {
            min_x: 0.0,
            min_y: 0.0,
            max_x: 2_000.0,
            max_y: 1_000.0,
        };
        let frame = Frame::fit(&bounds);
        let [x0, y0, x1, y1] = frame.page_box();
        assert!(((x1 - x0) / (y1 - y0) - 2.0).abs() < 1e-9);
        assert!(x1 - x0 <= MAP_WIDTH + 1e-9);
        assert!(y1 - y0 <= MAP_HEIGHT + 1e-9);
    }

    // ========================================================================
    // Documents
    // ========================================================================

    #[test]
    fn test_stand_pdf_metadata() {
        let (service, ds) = service();
        let sel = ds
            .resolve("ACME", Some("F1"), Some("F1_2"), Some(date(2024, 2, 10)))
            .unwrap();
        let bytes = service.stand_pdf(&sel).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
        assert_eq!(info_text(&doc, b"CRS"), "EPSG:32722");
        // outline up to 7 200 500, points spread to 601 990
        assert_eq!(
            info_text(&doc, b"Geospatial_Coordinates"),
            "[601000.00, 7200000.00, 601990.00, 7200500.00]"
        );
        assert_eq!(info_text(&doc, b"Author"), AUTHOR);
    }

    #[test]
    fn test_farm_pdf_has_geo_viewport() {
        let (service, ds) = service();
        let sel = ds.resolve("ACME", Some("F1"), Some("F1_1"), None).unwrap();
        let bytes = service.farm_pdf(&sel).unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let viewports = page.get(b"VP").unwrap().as_array().unwrap();
        let measure = viewports[0]
            .as_dict()
            .unwrap()
            .get(b"Measure")
            .unwrap()
            .as_dict()
            .unwrap();
        assert_eq!(measure.get(b"Subtype").unwrap().as_name().unwrap(), b"GEO");
        assert_eq!(measure.get(b"GPTS").unwrap().as_array().unwrap().len(), 8);
    }

    #[test]
    fn test_farm_pdf_draws_only_the_selected_company() {
        let ds = Arc::new(shared_farm_name());
        let service = GeoPdfService::new(ds.clone());
        let sel = ds.resolve("GLOBEX", Some("F1"), None, None).unwrap();

        let doc = Document::load_mem(&service.farm_pdf(&sel).unwrap()).unwrap();
        // ACME's F1 outlines start at 600 000 and would widen the frame
        assert_eq!(
            info_text(&doc, b"Geospatial_Coordinates"),
            "[700000.00, 7300000.00, 700990.00, 7300200.00]"
        );
    }

    #[test]
    fn test_empty_selection_is_no_data() {
        let (service, ds) = service();
        let sel = ds
            .resolve("ACME", Some("F1"), Some("F1_1"), Some(date(2023, 1, 1)))
            .unwrap();
        assert!(matches!(service.stand_pdf(&sel), Err(AppError::NoData(_))));
        assert!(matches!(service.farm_pdf(&sel), Err(AppError::NoData(_))));
    }

    #[test]
    fn test_farm_pdf_requires_farm() {
        let (service, ds) = service();
        let sel = ds.resolve("ACME", None, None, None).unwrap();
        assert!(matches!(
            service.farm_pdf(&sel),
            Err(AppError::Validation { .. })
        ));
    }
}
