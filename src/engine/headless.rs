//! In-memory engine and collaborators, used by the stdio host and tests.
//!
//! The camera model is a flat equirectangular view: at zoom `z` one view
//! point spans `360 / (256 * 2^z)` degrees on both axes. That is enough to
//! make camera commands, visible regions and conversions consistent with
//! each other without real projection math.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use image::{Rgba, RgbaImage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{MapEngine, OverlayLayer, Viewport};
use crate::events::EngineEvent;
use crate::gateway::scene::{PoiFilter, PresentationContext, Scene, SceneError, ScenePresenter, SceneProvider};
use crate::gateway::snapshot::{OverlayShape, Projection, RasterError, RasterRequest, RasterTile, Rasterizer};
use crate::geo::{CameraPosition, LatLng, LatLngBounds, ScreenPoint};
use crate::options::{MapOptions, MapSettings};
use crate::overlay::{Annotation, Overlay, OverlayKind, RenderHint};

fn degrees_per_point(zoom: f64) -> f64 {
    360.0 / (256.0 * 2f64.powf(zoom))
}

// =============================================================================
// PROJECTION
// =============================================================================

/// Linear mapping from a lat/lng box onto a `width` x `height` surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearProjection {
    pub region: LatLngBounds,
    pub width: f64,
    pub height: f64,
}

impl LinearProjection {
    #[must_use]
    pub fn project(&self, c: LatLng) -> (f64, f64) {
        let sw = self.region.southwest;
        let ne = self.region.northeast;
        let lng_span = (ne.longitude - sw.longitude).max(f64::EPSILON);
        let lat_span = (ne.latitude - sw.latitude).max(f64::EPSILON);
        let x = (c.longitude - sw.longitude) / lng_span * self.width;
        let y = (ne.latitude - c.latitude) / lat_span * self.height;
        (x, y)
    }
}

impl Projection for LinearProjection {
    fn to_pixel(&self, coordinate: LatLng) -> (f64, f64) {
        self.project(coordinate)
    }
}

// =============================================================================
// ENGINE
// =============================================================================

pub struct HeadlessEngine {
    viewport: Viewport,
    camera: CameraPosition,
    settings: MapSettings,
    attached: bool,
    layers: HashMap<OverlayKind, HashMap<String, RenderHint>>,
    selected: Option<String>,
    events: Option<mpsc::Sender<EngineEvent>>,
}

impl HeadlessEngine {
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            camera: CameraPosition { target: LatLng::new(0.0, 0.0), zoom: 0.0, heading: 0.0, pitch: 0.0 },
            settings: MapSettings::default(),
            attached: true,
            layers: HashMap::new(),
            selected: None,
            events: None,
        }
    }

    /// Simulate the view being removed from (or added to) its window.
    pub fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    /// Ids on one overlay layer, sorted.
    #[must_use]
    pub fn layer_ids(&self, kind: OverlayKind) -> Vec<String> {
        let mut ids: Vec<String> = self.layers.get(&kind).map(|l| l.keys().cloned().collect()).unwrap_or_default();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn layer_hint(&self, kind: OverlayKind, id: &str) -> Option<&RenderHint> {
        self.layers.get(&kind)?.get(id)
    }

    #[must_use]
    pub fn selected_annotation(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn notify(&self, event: EngineEvent) {
        let Some(tx) = &self.events else {
            return;
        };
        if tx.try_send(event).is_err() {
            warn!("engine event dropped");
        }
    }

    /// Every camera change is bracketed by will/did-change signals.
    fn move_camera(&mut self, camera: CameraPosition, animated: bool) {
        debug!(
            lat = camera.target.latitude,
            lng = camera.target.longitude,
            zoom = camera.zoom,
            animated,
            "camera moved"
        );
        self.notify(EngineEvent::RegionWillChange);
        self.camera = camera;
        self.notify(EngineEvent::RegionDidChange);
    }
}

impl<T: Overlay> OverlayLayer<T> for HeadlessEngine {
    fn insert(&mut self, entity: &T) {
        self.layers.entry(T::KIND).or_default().insert(entity.id().to_string(), entity.render_hint());
    }

    fn replace(&mut self, entity: &T) {
        self.layers.entry(T::KIND).or_default().insert(entity.id().to_string(), entity.render_hint());
    }

    fn remove(&mut self, id: &str) {
        if let Some(layer) = self.layers.get_mut(&T::KIND) {
            layer.remove(id);
        }
        if T::KIND == OverlayKind::Annotation && self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
    }
}

impl MapEngine for HeadlessEngine {
    fn bind_events(&mut self, sink: mpsc::Sender<EngineEvent>) {
        self.events = Some(sink);
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn camera_position(&self) -> CameraPosition {
        self.camera
    }

    fn visible_region(&self) -> LatLngBounds {
        let dpp = degrees_per_point(self.camera.zoom);
        let half_lat = self.viewport.height * dpp / 2.0;
        let half_lng = self.viewport.width * dpp / 2.0;
        let t = self.camera.target;
        LatLngBounds::new(
            LatLng::new((t.latitude - half_lat).max(-90.0), t.longitude - half_lng),
            LatLng::new((t.latitude + half_lat).min(90.0), t.longitude + half_lng),
        )
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn settings(&self) -> MapSettings {
        self.settings.clone()
    }

    fn apply_options(&mut self, options: &MapOptions) {
        self.settings.apply(options);
        let zoom = self.settings.zoom_range.clamp(self.camera.zoom);
        if (zoom - self.camera.zoom).abs() > f64::EPSILON {
            self.move_camera(CameraPosition { zoom, ..self.camera }, false);
        }
    }

    fn set_center(
        &mut self,
        target: LatLng,
        zoom: Option<f64>,
        heading: Option<f64>,
        pitch: Option<f64>,
        animated: bool,
    ) {
        let camera = CameraPosition {
            target,
            zoom: zoom.unwrap_or(self.camera.zoom),
            heading: heading.unwrap_or(self.camera.heading),
            pitch: pitch.unwrap_or(self.camera.pitch),
        };
        self.move_camera(camera, animated);
    }

    fn set_bounds(&mut self, bounds: LatLngBounds, padding: f64, animated: bool) {
        let sw = bounds.southwest;
        let ne = bounds.northeast;
        let avail_w = (self.viewport.width - 2.0 * padding).max(1.0);
        let avail_h = (self.viewport.height - 2.0 * padding).max(1.0);
        let dpp = ((ne.longitude - sw.longitude) / avail_w).max((ne.latitude - sw.latitude) / avail_h);
        let range = self.settings.zoom_range;
        let zoom = if dpp > 0.0 { range.clamp((360.0 / (256.0 * dpp)).log2()) } else { range.max };
        let target = LatLng::new(f64::midpoint(sw.latitude, ne.latitude), f64::midpoint(sw.longitude, ne.longitude));
        self.move_camera(CameraPosition { target, zoom, ..self.camera }, animated);
    }

    fn set_zoom(&mut self, zoom: f64, animated: bool) {
        self.move_camera(CameraPosition { zoom, ..self.camera }, animated);
    }

    fn convert_to_point(&self, coordinate: LatLng) -> ScreenPoint {
        let projection = LinearProjection {
            region: self.visible_region(),
            width: self.viewport.width,
            height: self.viewport.height,
        };
        let (x, y) = projection.project(coordinate);
        ScreenPoint::new(x, y)
    }

    fn select_annotation(&mut self, id: &str) {
        self.selected = Some(id.to_string());
    }

    fn deselect_annotation(&mut self, id: &str) {
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
    }
}

// =============================================================================
// RASTERIZER
// =============================================================================

const SPRITE_SIZE: u32 = 8;

fn argb(color: u32) -> Rgba<u8> {
    let [a, r, g, b] = color.to_be_bytes();
    Rgba([r, g, b, a])
}

/// Flat-color base map with simple vertex-path overlays.
#[derive(Debug, Clone)]
pub struct HeadlessRasterizer {
    pub land: Rgba<u8>,
    pub buildings: Rgba<u8>,
}

impl Default for HeadlessRasterizer {
    fn default() -> Self {
        Self { land: Rgba([233, 229, 220, 255]), buildings: Rgba([214, 208, 196, 255]) }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn plot(img: &mut RgbaImage, (x, y): (f64, f64), color: Rgba<u8>) {
    if x < 0.0 || y < 0.0 {
        return;
    }
    let (x, y) = (x as u32, y as u32);
    if x < img.width() && y < img.height() {
        img.put_pixel(x, y, color);
    }
}

pub(super) fn plot_path(img: &mut RgbaImage, points: &[(f64, f64)], color: Rgba<u8>, closed: bool) {
    let mut segments: Vec<((f64, f64), (f64, f64))> = points.windows(2).map(|w| (w[0], w[1])).collect();
    if closed && points.len() > 2 {
        if let (Some(&last), Some(&first)) = (points.last(), points.first()) {
            segments.push((last, first));
        }
    }
    if points.len() == 1 {
        plot(img, points[0], color);
    }
    let bounds = (f64::from(img.width()), f64::from(img.height()));
    for (a, b) in segments {
        let Some((a, b)) = clip_segment(a, b, bounds) else {
            continue;
        };
        let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).ceil().max(1.0);
        let mut i = 0.0;
        while i <= steps {
            let t = i / steps;
            plot(img, (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t), color);
            i += 1.0;
        }
    }
}

/// Liang-Barsky clip of `a`-`b` to `[0, width] x [0, height]`. `None` when
/// the segment misses the image entirely.
pub(super) fn clip_segment(a: (f64, f64), b: (f64, f64), (width, height): (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let (mut t0, mut t1) = (0.0_f64, 1.0_f64);
    for (p, q) in [(-dx, a.0), (dx, width - a.0), (-dy, a.1), (dy, height - a.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }
    Some(((a.0 + dx * t0, a.1 + dy * t0), (a.0 + dx * t1, a.1 + dy * t1)))
}

#[async_trait]
impl Rasterizer for HeadlessRasterizer {
    async fn rasterize(&self, request: RasterRequest) -> Result<RasterTile, RasterError> {
        let (width, height) = request.viewport.pixel_size();
        let fill = if request.show_buildings { self.buildings } else { self.land };
        let image = RgbaImage::from_pixel(width, height, fill);
        let projection =
            LinearProjection { region: request.region, width: f64::from(width), height: f64::from(height) };
        Ok(RasterTile { image, projection: Arc::new(projection) })
    }

    fn annotation_sprite(&self, annotation: &Annotation) -> Option<RgbaImage> {
        annotation.visible.then(|| RgbaImage::from_pixel(SPRITE_SIZE, SPRITE_SIZE, Rgba([220, 40, 40, 255])))
    }

    fn overlay_layer(&self, shape: &OverlayShape, tile: &RasterTile) -> Option<RgbaImage> {
        let mut layer = RgbaImage::new(tile.image.width(), tile.image.height());
        let project = |points: &[LatLng]| points.iter().map(|p| tile.projection.to_pixel(*p)).collect::<Vec<_>>();
        match shape {
            OverlayShape::Polyline(line) => plot_path(&mut layer, &project(&line.points[..]), argb(line.color), false),
            OverlayShape::Polygon(polygon) => {
                plot_path(&mut layer, &project(&polygon.points[..]), argb(polygon.stroke_color), true);
            }
            OverlayShape::Circle(circle) => {
                let bounds = circle.bounds()?;
                let (cx, cy) = tile.projection.to_pixel(circle.center);
                let (ex, _) = tile.projection.to_pixel(bounds.northeast);
                let r = (ex - cx).abs();
                let ring: Vec<(f64, f64)> = (0..64)
                    .map(|i| {
                        let a = f64::from(i) * std::f64::consts::TAU / 64.0;
                        (cx + r * a.cos(), cy + r * a.sin())
                    })
                    .collect();
                plot_path(&mut layer, &ring, argb(circle.stroke_color), true);
            }
        }
        Some(layer)
    }
}

// =============================================================================
// SCENES
// =============================================================================

/// Scene lookup that finds a scene anywhere inside `coverage`.
#[derive(Debug, Clone, Default)]
pub struct HeadlessScenes {
    /// `None` covers the whole globe.
    pub coverage: Option<LatLngBounds>,
}

#[async_trait]
impl SceneProvider for HeadlessScenes {
    async fn lookup(&self, coordinate: LatLng) -> Result<Option<Scene>, SceneError> {
        let covered = self.coverage.is_none_or(|b| b.contains(coordinate));
        Ok(covered.then(|| Scene {
            id: format!("scene@{:.5},{:.5}", coordinate.latitude, coordinate.longitude),
            coordinate,
        }))
    }
}

/// Presentation surface that records scenes in the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingPresenter;

impl PresentationContext for LoggingPresenter {
    fn present(&self, scene: Scene, filter: PoiFilter) {
        let categories = match &filter {
            PoiFilter::Unrestricted => Vec::new(),
            PoiFilter::Including(c) => c.iter().map(|c| c.name().to_string()).collect(),
        };
        info!(scene = %scene.id, ?categories, "scene presented");
    }
}

impl ScenePresenter for LoggingPresenter {
    fn foreground_context(&self) -> Option<Arc<dyn PresentationContext>> {
        Some(Arc::new(*self))
    }
}
