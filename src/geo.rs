//! Geographic and screen-space value types shared by every component.
//!
//! Projection math belongs to the engine; these are plain carriers with
//! the protocol shapes the host expects (`[lat, lng]` pairs, `{point: [x, y]}`).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[cfg(test)]
#[path = "geo_test.rs"]
mod tests;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl LatLng {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Protocol shape: `[lat, lng]`.
    #[must_use]
    pub fn to_value(self) -> Value {
        json!([self.latitude, self.longitude])
    }
}

/// A point in view coordinates (points, not pixels).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned lat/lng box. Does not handle antimeridian wrap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub southwest: LatLng,
    pub northeast: LatLng,
}

impl LatLngBounds {
    #[must_use]
    pub fn new(southwest: LatLng, northeast: LatLng) -> Self {
        Self { southwest, northeast }
    }

    /// Smallest box containing every point. `None` for an empty slice.
    #[must_use]
    pub fn enclosing(points: &[LatLng]) -> Option<Self> {
        let first = points.first()?;
        let mut sw = *first;
        let mut ne = *first;
        for p in &points[1..] {
            sw.latitude = sw.latitude.min(p.latitude);
            sw.longitude = sw.longitude.min(p.longitude);
            ne.latitude = ne.latitude.max(p.latitude);
            ne.longitude = ne.longitude.max(p.longitude);
        }
        Some(Self { southwest: sw, northeast: ne })
    }

    #[must_use]
    pub fn contains(&self, p: LatLng) -> bool {
        p.latitude >= self.southwest.latitude
            && p.latitude <= self.northeast.latitude
            && p.longitude >= self.southwest.longitude
            && p.longitude <= self.northeast.longitude
    }

    #[must_use]
    pub fn intersects(&self, other: &LatLngBounds) -> bool {
        self.southwest.latitude <= other.northeast.latitude
            && other.southwest.latitude <= self.northeast.latitude
            && self.southwest.longitude <= other.northeast.longitude
            && other.southwest.longitude <= self.northeast.longitude
    }

    /// Protocol shape for `map#getVisibleRegion`.
    #[must_use]
    pub fn to_value(self) -> Value {
        json!({
            "southwest": self.southwest.to_value(),
            "northeast": self.northeast.to_value(),
        })
    }
}

/// Camera telemetry. Recomputed from the engine on every query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPosition {
    pub target: LatLng,
    pub zoom: f64,
    pub heading: f64,
    pub pitch: f64,
}

impl CameraPosition {
    /// Protocol shape for `camera#onMove`.
    #[must_use]
    pub fn to_value(self) -> Value {
        json!({
            "heading": self.heading,
            "target": self.target.to_value(),
            "pitch": self.pitch,
            "zoom": self.zoom,
        })
    }
}

/// Zoom limits of the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl ZoomRange {
    #[must_use]
    pub fn clamp(self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self { min: 0.0, max: 21.0 }
    }
}
