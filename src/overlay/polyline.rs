//! Polyline entity.

use serde_json::Value;

use super::{Overlay, OverlayKind, RenderHint, decode_z_index};
use crate::codec::{Args, Decode, DecodeError};
use crate::geo::{LatLng, LatLngBounds};

const DEFAULT_COLOR: u32 = 0xFF00_0000;
const DEFAULT_WIDTH: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JointType {
    #[default]
    Mitered,
    Bevel,
    Round,
}

impl JointType {
    fn from_index(i: i64) -> Self {
        match i {
            1 => Self::Bevel,
            2 => Self::Round,
            _ => Self::Mitered,
        }
    }
}

/// One element of a stroke pattern: `["dash", 10]`, `["gap", 5]`, `["dot"]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PatternItem {
    Dash(f64),
    Gap(f64),
    Dot,
}

impl PatternItem {
    fn from_value(v: &Value, path: &str) -> Result<Self, DecodeError> {
        let bad = || DecodeError::Type { field: path.to_string(), expected: "pattern item" };
        let parts = v.as_array().ok_or_else(bad)?;
        let length = parts.get(1).and_then(Value::as_f64);
        match (parts.first().and_then(Value::as_str), length) {
            (Some("dash"), Some(len)) => Ok(Self::Dash(len)),
            (Some("gap"), Some(len)) => Ok(Self::Gap(len)),
            (Some("dot"), _) => Ok(Self::Dot),
            _ => Err(bad()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Polyline {
    pub id: String,
    pub points: Vec<LatLng>,
    /// ARGB.
    pub color: u32,
    pub width: f64,
    pub joint_type: JointType,
    pub patterns: Vec<PatternItem>,
    pub visible: bool,
    pub z_index: i32,
    pub consume_tap_events: bool,
}

impl Polyline {
    #[must_use]
    pub fn new(id: impl Into<String>, points: Vec<LatLng>) -> Self {
        Self {
            id: id.into(),
            points,
            color: DEFAULT_COLOR,
            width: DEFAULT_WIDTH,
            joint_type: JointType::default(),
            patterns: Vec::new(),
            visible: true,
            z_index: 0,
            consume_tap_events: false,
        }
    }

    /// Stroke pattern flattened to alternating on/off lengths. A dot is one
    /// stroke-width long.
    #[must_use]
    pub fn dash_pattern(&self) -> Vec<f64> {
        self.patterns
            .iter()
            .map(|p| match p {
                PatternItem::Dash(len) | PatternItem::Gap(len) => *len,
                PatternItem::Dot => self.width,
            })
            .collect()
    }
}

impl Decode for Polyline {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        let points = args.opt_lat_lng_list("points")?.unwrap_or_default();
        let mut line = Self::new(args.req_str("polylineId")?, points);
        if let Some(color) = args.opt_color("color")? {
            line.color = color;
        }
        if let Some(width) = args.opt_f64("width")? {
            line.width = width.max(0.0);
        }
        if let Some(joint) = args.opt_i64("jointType")? {
            line.joint_type = JointType::from_index(joint);
        }
        if let Some(patterns) = args.opt_list("patterns")? {
            let path = args.path("patterns");
            line.patterns = patterns
                .iter()
                .enumerate()
                .map(|(i, v)| PatternItem::from_value(v, &format!("{path}[{i}]")))
                .collect::<Result<_, _>>()?;
        }
        if let Some(visible) = args.opt_bool("visible")? {
            line.visible = visible;
        }
        if let Some(z) = decode_z_index(args)? {
            line.z_index = z;
        }
        if let Some(consume) = args.opt_bool("consumeTapEvents")? {
            line.consume_tap_events = consume;
        }
        Ok(line)
    }
}

impl Overlay for Polyline {
    const KIND: OverlayKind = OverlayKind::Polyline;

    fn id(&self) -> &str {
        &self.id
    }

    fn render_hint(&self) -> RenderHint {
        RenderHint {
            stroke_color: Some(self.color),
            fill_color: None,
            line_width: self.width,
            dash_pattern: self.dash_pattern(),
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
