//! Rendering engine collaborator.
//!
//! DESIGN
//! ======
//! The bridge never draws. Everything it needs from the platform map view
//! is behind `MapEngine`: camera reads/writes, settings, projection of one
//! coordinate, and per-kind overlay layers. Implementations are owned by
//! the session task and only touched from it, so the trait takes `&mut self`
//! and needs `Send` but not `Sync`.
//!
//! Engine-originated signals (region changes, taps, drags) go the other way
//! through the sink handed to `bind_events`.

mod headless;

use tokio::sync::mpsc;

use crate::events::EngineEvent;
use crate::geo::{CameraPosition, LatLng, LatLngBounds, ScreenPoint, ZoomRange};
use crate::options::{MapOptions, MapSettings};
use crate::overlay::{Annotation, Circle, Polygon, Polyline};

pub use headless::{HeadlessEngine, HeadlessRasterizer, HeadlessScenes, LinearProjection, LoggingPresenter};

/// One overlay collection as the engine sees it. Each call carries a full
/// entity; the engine swaps geometry and style together.
pub trait OverlayLayer<T> {
    fn insert(&mut self, entity: &T);
    fn replace(&mut self, entity: &T);
    fn remove(&mut self, id: &str);
}

/// View size in points plus the pixel scale factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

impl Viewport {
    /// Pixel dimensions, rounded up and never zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn pixel_size(&self) -> (u32, u32) {
        let px = |points: f64| (points * self.scale).ceil().clamp(1.0, f64::from(u32::MAX)) as u32;
        (px(self.width), px(self.height))
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self { width: 390.0, height: 844.0, scale: 3.0 }
    }
}

/// The platform map view.
pub trait MapEngine:
    Send + OverlayLayer<Annotation> + OverlayLayer<Polyline> + OverlayLayer<Polygon> + OverlayLayer<Circle>
{
    /// Hand the engine its outbound signal sink. Engines without signals
    /// may ignore it.
    fn bind_events(&mut self, _sink: mpsc::Sender<EngineEvent>) {}

    /// Whether the view is laid out in a window. Camera telemetry read
    /// while detached is stale.
    fn is_attached(&self) -> bool;

    fn camera_position(&self) -> CameraPosition;

    fn zoom_range(&self) -> ZoomRange {
        self.settings().zoom_range
    }

    fn visible_region(&self) -> LatLngBounds;

    fn viewport(&self) -> Viewport;

    fn settings(&self) -> MapSettings;

    fn apply_options(&mut self, options: &MapOptions);

    /// Recenter. `None` fields keep their current value.
    fn set_center(
        &mut self,
        target: LatLng,
        zoom: Option<f64>,
        heading: Option<f64>,
        pitch: Option<f64>,
        animated: bool,
    );

    /// Fit `bounds` inside the view inset by `padding` points.
    fn set_bounds(&mut self, bounds: LatLngBounds, padding: f64, animated: bool);

    fn set_zoom(&mut self, zoom: f64, animated: bool);

    /// Project a coordinate into view points.
    fn convert_to_point(&self, coordinate: LatLng) -> ScreenPoint;

    /// Open the callout of an annotation already on the map.
    fn select_annotation(&mut self, id: &str);

    fn deselect_annotation(&mut self, id: &str);
}

#[cfg(test)]
#[path = "headless_test.rs"]
mod tests;
