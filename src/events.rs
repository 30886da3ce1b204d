//! Outbound event emission.
//!
//! DESIGN
//! ======
//! Engine signals arrive as `EngineEvent`s on the session task; the session
//! decides what they mean and calls `EventEmitter` to produce `event`
//! frames. Emission is fire-and-forget: `try_send` on a bounded channel,
//! and a full or closed channel drops the event with a warning. Nothing on
//! the control path ever waits for the host to drain its queue.

use serde_json::{Value, json};
use tokio::sync::mpsc;
use tracing::{trace, warn};

use crate::engine::MapEngine;
use crate::frame::{Data, Frame};
use crate::geo::LatLng;
use crate::overlay::OverlayKind;

/// Signals raised by the rendering engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    RegionWillChange,
    RegionDidChange,
    AnnotationTapped(String),
    InfoWindowTapped(String),
    AnnotationDragEnded { id: String, position: LatLng },
    OverlayTapped { kind: OverlayKind, id: String },
    MapTapped(LatLng),
    MapLongPressed(LatLng),
    /// The engine closed an annotation's callout on its own.
    AnnotationDeselected(String),
}

#[derive(Debug, Clone)]
pub struct EventEmitter {
    view_id: i64,
    tx: mpsc::Sender<Frame>,
}

impl EventEmitter {
    #[must_use]
    pub fn new(view_id: i64, tx: mpsc::Sender<Frame>) -> Self {
        Self { view_id, tx }
    }

    fn emit(&self, method: &str, data: Data) {
        let frame = Frame::event(method, data).with_view_id(self.view_id);
        trace!(method, "event");
        if let Err(e) = self.tx.try_send(frame) {
            warn!(method, error = %e, "event dropped");
        }
    }

    fn emit_one(&self, method: &str, key: &str, value: Value) {
        let mut data = Data::new();
        data.insert(key.to_string(), value);
        self.emit(method, data);
    }

    /// `camera#onMoveStarted`.
    pub fn region_will_change(&self) {
        self.emit("camera#onMoveStarted", Data::new());
    }

    /// `camera#onMove` with the current camera, only while the view is
    /// attached, then `camera#onIdle` unconditionally.
    pub fn region_did_change<E: MapEngine + ?Sized>(&self, engine: &E) {
        if engine.is_attached() {
            self.emit_one("camera#onMove", "position", engine.camera_position().to_value());
        }
        self.emit("camera#onIdle", Data::new());
    }

    pub fn annotation_tapped(&self, id: &str) {
        self.emit_one("annotation#onTap", "annotationId", json!(id));
    }

    pub fn info_window_tapped(&self, id: &str) {
        self.emit_one("infoWindow#onTap", "annotationId", json!(id));
    }

    pub fn annotation_drag_ended(&self, id: &str, position: LatLng) {
        let mut data = Data::new();
        data.insert("annotationId".into(), json!(id));
        data.insert("position".into(), position.to_value());
        self.emit("annotation#onDragEnd", data);
    }

    /// `polyline#onTap {polylineId}` and friends.
    pub fn overlay_tapped(&self, kind: OverlayKind, id: &str) {
        self.emit_one(&format!("{}#onTap", kind.singular()), kind.id_key(), json!(id));
    }

    pub fn map_tapped(&self, position: LatLng) {
        self.emit_one("map#onTap", "position", position.to_value());
    }

    pub fn map_long_pressed(&self, position: LatLng) {
        self.emit_one("map#onLongPress", "position", position.to_value());
    }
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
