//! Annotation (marker) entity.

use serde_json::Value;

use super::{Overlay, OverlayKind, RenderHint, decode_z_index};
use crate::codec::{Args, Decode, DecodeError};
use crate::geo::{LatLng, LatLngBounds};

/// Icon descriptor. Protocol shape is a tagged list, e.g.
/// `["markerAnnotation", 120.0]` or `["fromAssetImage", "pin.png", 2.0]`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationIcon {
    Default,
    Marker { hue: Option<f64> },
    Pin { hue: Option<f64> },
    Asset { name: String, scale: f64 },
    Bytes(Vec<u8>),
}

impl AnnotationIcon {
    fn from_value(value: &Value, path: &str) -> Result<Self, DecodeError> {
        let bad = || DecodeError::Type { field: path.to_string(), expected: "icon descriptor" };
        let parts = value.as_array().ok_or_else(bad)?;
        let Some(tag) = parts.first().and_then(Value::as_str) else {
            return Err(bad());
        };
        let hue = parts.get(1).and_then(Value::as_f64);
        let icon = match tag {
            "defaultAnnotation" => Self::Default,
            "markerAnnotation" => Self::Marker { hue },
            "pinAnnotation" => Self::Pin { hue },
            "fromAssetImage" => Self::Asset {
                name: parts.get(1).and_then(Value::as_str).ok_or_else(bad)?.to_string(),
                scale: parts.get(2).and_then(Value::as_f64).unwrap_or(1.0),
            },
            "fromBytes" => {
                let raw = parts.get(1).and_then(Value::as_array).ok_or_else(bad)?;
                let bytes = raw
                    .iter()
                    .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect::<Option<Vec<u8>>>()
                    .ok_or_else(bad)?;
                Self::Bytes(bytes)
            }
            _ => return Err(bad()),
        };
        Ok(icon)
    }
}

/// Callout shown when the annotation is selected.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoWindow {
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub anchor: (f64, f64),
    pub consume_tap_events: bool,
}

impl Default for InfoWindow {
    fn default() -> Self {
        Self { title: None, snippet: None, anchor: (0.5, 0.0), consume_tap_events: false }
    }
}

impl Decode for InfoWindow {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        let defaults = Self::default();
        Ok(Self {
            title: args.opt_str("title")?.map(str::to_string),
            snippet: args.opt_str("snippet")?.map(str::to_string),
            anchor: args.opt_pair("anchor")?.unwrap_or(defaults.anchor),
            consume_tap_events: args.opt_bool("consumeTapEvents")?.unwrap_or(defaults.consume_tap_events),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub id: String,
    pub position: LatLng,
    pub alpha: f64,
    pub anchor: (f64, f64),
    pub draggable: bool,
    pub visible: bool,
    pub z_index: i32,
    pub consume_tap_events: bool,
    pub icon: AnnotationIcon,
    pub info_window: InfoWindow,
}

impl Annotation {
    /// A plain visible marker at `position`.
    #[must_use]
    pub fn new(id: impl Into<String>, position: LatLng) -> Self {
        Self {
            id: id.into(),
            position,
            alpha: 1.0,
            anchor: (0.5, 1.0),
            draggable: false,
            visible: true,
            z_index: 0,
            consume_tap_events: true,
            icon: AnnotationIcon::Default,
            info_window: InfoWindow::default(),
        }
    }
}

impl Decode for Annotation {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        let mut annotation = Self::new(args.req_str("annotationId")?, args.req_lat_lng("position")?);
        if let Some(alpha) = args.opt_f64("alpha")? {
            annotation.alpha = alpha.clamp(0.0, 1.0);
        }
        if let Some(a) = args.opt_pair("anchor")? {
            annotation.anchor = a;
        }
        if let Some(draggable) = args.opt_bool("draggable")? {
            annotation.draggable = draggable;
        }
        if let Some(visible) = args.opt_bool("visible")? {
            annotation.visible = visible;
        }
        if let Some(z) = decode_z_index(args)? {
            annotation.z_index = z;
        }
        if let Some(consume) = args.opt_bool("consumeTapEvents")? {
            annotation.consume_tap_events = consume;
        }
        if let Some(icon) = args.get("icon") {
            annotation.icon = AnnotationIcon::from_value(icon, &args.path("icon"))?;
        }
        if let Some(info) = args.opt_object("infoWindow")? {
            annotation.info_window = InfoWindow::decode(&info)?;
        }
        Ok(annotation)
    }
}

impl Overlay for Annotation {
    const KIND: OverlayKind = OverlayKind::Annotation;

    fn id(&self) -> &str {
        &self.id
    }

    fn render_hint(&self) -> RenderHint {
        RenderHint {
            stroke_color: None,
            fill_color: None,
            line_width: 0.0,
            dash_pattern: Vec::new(),
            z_index: self.z_index,
            visible: self.visible,
        }
    }

    fn bounds(&self) -> Option<LatLngBounds> {
        Some(LatLngBounds::new(self.position, self.position))
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
