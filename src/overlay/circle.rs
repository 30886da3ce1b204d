//! Circle entity. Radius is in meters.

use super::{Overlay, OverlayKind, RenderHint, decode_z_index};
use crate::codec::{Args, Decode, DecodeError};
use crate::geo::{LatLng, LatLngBounds};

/// Meters per degree of latitude, spherical approximation.
const METERS_PER_DEGREE: f64 = 111_320.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub id: String,
    pub center: LatLng,
    pub radius: f64,
    pub fill_color: u32,
    pub stroke_color: u32,
    pub stroke_width: f64,
    pub visible: bool,
    pub z_index: i32,
    pub consume_tap_events: bool,
}

impl Circle {
    #[must_use]
    pub fn new(id: impl Into<String>, center: LatLng, radius: f64) -> Self {
        Self {
            id: id.into(),
            center,
            radius,
            fill_color: 0x0000_0000,
            stroke_color: 0xFF00_0000,
            stroke_width: 10.0,
            visible: true,
            z_index: 0,
            consume_tap_events: false,
        }
    }
}

impl Decode for Circle {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        let radius = args.opt_f64("radius")?.unwrap_or(0.0).max(0.0);
        let mut circle = Self::new(args.req_str("circleId")?, args.req_lat_lng("center")?, radius);
        if let Some(c) = args.opt_color("fillColor")? {
            circle.fill_color = c;
        }
        if let Some(c) = args.opt_color("strokeColor")? {
            circle.stroke_color = c;
        }
        if let Some(w) = args.opt_f64("strokeWidth")? {
            circle.stroke_width = w.max(0.0);
        }
        if let Some(visible) = args.opt_bool("visible")? {
            circle.visible = visible;
        }
        if let Some(z) = decode_z_index(args)? {
            circle.z_index = z;
        }
        if let Some(consume) = args.opt_bool("consumeTapEvents")? {
            circle.consume_tap_events = consume;
        }
        Ok(circle)
    }
}

impl Overlay for Circle {
    const KIND: OverlayKind = OverlayKind::Circle;

    fn id(&self) -> &str {
        &self.id
    }

    fn render_hint(&self) -> RenderHint {
        RenderHint {
            stroke_color: Some(self.stroke_color),
            fill_color: Some(self.fill_color),
            line_width: self.stroke_width,
            dash_pattern: Vec::new(),
            z_index: self.z_index,
            visible: self.visible,
        }
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        let dlat = self.radius / METERS_PER_DEGREE;
        let cos = self.center.latitude.to_radians().cos().abs().max(1e-6);
        let dlng = (dlat / cos).min(180.0);
        Some(LatLngBounds::new(
            LatLng::new(self.center.latitude - dlat, self.center.longitude - dlng),
            LatLng::new(self.center.latitude + dlat, self.center.longitude + dlng),
        ))
    }

    fn consumes_taps(&self) -> bool {
        self.consume_tap_events
    }

    fn z_index(&self) -> i32 {
        self.z_index
    }

    fn visible(&self) -> bool {
        self.visible
    }
}
