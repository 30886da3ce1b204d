//! Camera command interpreter.
//!
//! DESIGN
//! ======
//! A `cameraUpdate` argument is a tagged list (`["newLatLngZoom", [lat, lng], 5.0]`).
//! Decoding produces a `CameraUpdate`; `interpret` maps it onto one of a
//! small set of engine instructions. Both steps are pure. Anything the
//! interpreter cannot make sense of becomes `CameraInstruction::Noop`: an
//! unknown tag or a missing required element never fails the call.

use serde_json::Value;
use tracing::debug;

use crate::codec::{self, Args, DecodeError};
use crate::engine::MapEngine;
use crate::geo::{LatLng, LatLngBounds, ZoomRange};

// =============================================================================
// UPDATE
// =============================================================================

/// Fields of a `newCameraPosition` object. Only `target` is required.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionUpdate {
    pub target: LatLng,
    pub zoom: Option<f64>,
    pub heading: Option<f64>,
    pub pitch: Option<f64>,
}

/// Decoded camera command. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraUpdate {
    NewCameraPosition(PositionUpdate),
    NewLatLng(LatLng),
    NewLatLngZoom(LatLng, f64),
    NewLatLngBounds(Vec<LatLng>, f64),
    ZoomBy(f64),
    ZoomTo(f64),
    ZoomIn,
    ZoomOut,
    /// Unknown tag or incomplete payload. Interpreted as a no-op.
    Unrecognized(String),
}

impl CameraUpdate {
    /// Decode the tagged list stored under `key`.
    ///
    /// # Errors
    ///
    /// `DecodeError` when `key` is absent or not a list. Malformed list
    /// contents decode to `CameraUpdate::Unrecognized` instead.
    pub fn decode_field(args: &Args<'_>, key: &str) -> Result<Self, DecodeError> {
        let items = args.req_list(key)?;
        Ok(Self::from_items(items, &args.path(key)))
    }

    fn from_items(items: &[Value], path: &str) -> Self {
        let Some(tag) = items.first().and_then(Value::as_str) else {
            return Self::Unrecognized(String::new());
        };
        let arg = |i: usize| items.get(i).filter(|v| !v.is_null());
        let number = |i: usize| arg(i).and_then(Value::as_f64);
        let point = |i: usize| arg(i).and_then(|v| codec::lat_lng(v, &format!("{path}[{i}]")).ok());

        let update = match tag {
            "newCameraPosition" => arg(1).and_then(|v| position(v, &format!("{path}[1]"))).map(Self::NewCameraPosition),
            "newLatLng" => point(1).map(Self::NewLatLng),
            "newLatLngZoom" => point(1).zip(number(2)).map(|(t, z)| Self::NewLatLngZoom(t, z)),
            "newLatLngBounds" => arg(1)
                .and_then(Value::as_array)
                .and_then(|list| list.iter().map(|v| codec::lat_lng(v, path).ok()).collect::<Option<Vec<_>>>())
                .zip(number(2))
                .map(|(targets, padding)| Self::NewLatLngBounds(targets, padding)),
            "zoomBy" => number(1).map(Self::ZoomBy),
            "zoomTo" => number(1).map(Self::ZoomTo),
            "zoomIn" => Some(Self::ZoomIn),
            "zoomOut" => Some(Self::ZoomOut),
            _ => None,
        };
        update.unwrap_or_else(|| {
            debug!(tag, "unrecognized camera update");
            Self::Unrecognized(tag.to_string())
        })
    }
}

fn position(value: &Value, path: &str) -> Option<PositionUpdate> {
    let args = Args::object(value, path).ok()?;
    Some(PositionUpdate {
        target: args.req_lat_lng("target").ok()?,
        zoom: args.opt_f64("zoom").ok()?,
        heading: args.opt_f64("heading").ok()?,
        pitch: args.opt_f64("pitch").ok()?,
    })
}

// =============================================================================
// INSTRUCTION
// =============================================================================

/// Relative or absolute zoom change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ZoomStep {
    By(f64),
    To(f64),
    In,
    Out,
}

impl ZoomStep {
    /// Target zoom level from `current`, clamped into `range`.
    #[must_use]
    pub fn resolve(self, current: f64, range: ZoomRange) -> f64 {
        let target = match self {
            Self::By(delta) => current + delta,
            Self::To(level) => level,
            Self::In => current + 1.0,
            Self::Out => current - 1.0,
        };
        range.clamp(target)
    }
}

/// What the engine is asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum CameraInstruction {
    SetCenter {
        target: LatLng,
        zoom: Option<f64>,
        heading: Option<f64>,
        pitch: Option<f64>,
        animated: bool,
    },
    SetBounds {
        targets: Vec<LatLng>,
        padding: f64,
        animated: bool,
    },
    Zoom {
        step: ZoomStep,
        animated: bool,
    },
    Noop,
}

/// Map a decoded update onto an engine instruction. `camera#move` passes
/// `animated = false`, `camera#animate` passes `true`.
#[must_use]
pub fn interpret(update: &CameraUpdate, animated: bool) -> CameraInstruction {
    let center = |target, zoom| CameraInstruction::SetCenter { target, zoom, heading: None, pitch: None, animated };
    let zoom = |step| CameraInstruction::Zoom { step, animated };
    match update {
        CameraUpdate::NewCameraPosition(p) => CameraInstruction::SetCenter {
            target: p.target,
            zoom: p.zoom,
            heading: p.heading,
            pitch: p.pitch,
            animated,
        },
        CameraUpdate::NewLatLng(target) => center(*target, None),
        CameraUpdate::NewLatLngZoom(target, z) => center(*target, Some(*z)),
        CameraUpdate::NewLatLngBounds(targets, _) if targets.is_empty() => CameraInstruction::Noop,
        CameraUpdate::NewLatLngBounds(targets, padding) => {
            CameraInstruction::SetBounds { targets: targets.clone(), padding: *padding, animated }
        }
        CameraUpdate::ZoomBy(delta) => zoom(ZoomStep::By(*delta)),
        CameraUpdate::ZoomTo(level) => zoom(ZoomStep::To(*level)),
        CameraUpdate::ZoomIn => zoom(ZoomStep::In),
        CameraUpdate::ZoomOut => zoom(ZoomStep::Out),
        CameraUpdate::Unrecognized(_) => CameraInstruction::Noop,
    }
}

impl CameraInstruction {
    /// Execute against the engine.
    pub fn apply<E: MapEngine + ?Sized>(&self, engine: &mut E) {
        match self {
            Self::SetCenter { target, zoom, heading, pitch, animated } => {
                let zoom = zoom.map(|z| engine.zoom_range().clamp(z));
                engine.set_center(*target, zoom, *heading, *pitch, *animated);
            }
            Self::SetBounds { targets, padding, animated } => {
                if let Some(bounds) = LatLngBounds::enclosing(targets) {
                    engine.set_bounds(bounds, *padding, *animated);
                }
            }
            Self::Zoom { step, animated } => {
                let level = step.resolve(engine.camera_position().zoom, engine.zoom_range());
                engine.set_zoom(level, *animated);
            }
            Self::Noop => {}
        }
    }
}

#[cfg(test)]
#[path = "camera_test.rs"]
mod tests;
