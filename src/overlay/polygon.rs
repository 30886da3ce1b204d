//! Polygon entity.

use super::{Overlay, OverlayKind, RenderHint, decode_z_index};
use crate::codec::{Args, Decode, DecodeError};
use crate::geo::{LatLng, LatLngBounds};

#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub id: String,
    pub points: Vec<LatLng>,
    pub fill_color: u32,
    pub stroke_color: u32,
    pub stroke_width: f64,
    pub visible: bool,
    pub z_index: i32,
    pub consume_tap_events: bool,
}

impl Polygon {
    #[must_use]
    pub fn new(id: impl Into<String>, points: Vec<LatLng>) -> Self {
        Self {
            id: id.into(),
            points,
            fill_color: 0x0000_0000,
            stroke_color: 0xFF00_0000,
            stroke_width: 10.0,
            visible: true,
            z_index: 0,
            consume_tap_events: false,
        }
    }
}

impl Decode for Polygon {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        let points = args.opt_lat_lng_list("points")?.unwrap_or_default();
        let mut polygon = Self::new(args.req_str("polygonId")?, points);
        if let Some(c) = args.opt_color("fillColor")? {
            polygon.fill_color = c;
        }
        if let Some(c) = args.opt_color("strokeColor")? {
            polygon.stroke_color = c;
        }
        if let Some(w) = args.opt_f64("strokeWidth")? {
            polygon.stroke_width = w.max(0.0);
        }
        if let Some(visible) = args.opt_bool("visible")? {
            polygon.visible = visible;
        }
        if let Some(z) = decode_z_index(args)? {
            polygon.z_index = z;
        }
        if let Some(consume) = args.opt_bool("consumeTapEvents")? {
            polygon.consume_tap_events = consume;
        }
        Ok(polygon)
    }
}

impl Overlay for Polygon {
    const KIND: OverlayKind = OverlayKind::Polygon;

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
        LatLngBounds::enclosing(&self.points)
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
