//! Session: one map instance, one control task.
//!
//! DESIGN
//! ======
//! `spawn_session` starts an actor that owns the engine and every overlay
//! collection. Its `select!` loop serializes three inputs:
//!
//! - method calls from `SessionHandle::call` (one reply per call)
//! - engine signals (region changes, gestures)
//! - completions of async work (snapshot raster and compositing stages)
//!
//! Handlers are synchronous and return an `Outcome`; the dispatch layer
//! turns it into the reply frame. Work that must not block the loop
//! (snapshot rasterizing, scene probes) takes the reply sender with it and
//! answers later, which is `Outcome::Deferred`.
//!
//! Engine signals are drained before the next call, so the events a call
//! causes are emitted before any later call runs.
//!
//! Nothing a single call does can end the loop. Decode failures become
//! error frames, unknown methods get `not_implemented`, and the loop only
//! stops when every handle is dropped.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::camera::{PositionUpdate, interpret};
use crate::codec::{self, Args, Command, Decode, DecodeError, Query};
use crate::config::BridgeConfig;
use crate::engine::MapEngine;
use crate::events::{EngineEvent, EventEmitter};
use crate::frame::{ErrorCode, Frame};
use crate::geo::LatLngBounds;
use crate::gateway::capability::Capabilities;
use crate::gateway::scene::{SceneGateway, ScenePresenter, SceneProvider};
use crate::gateway::snapshot::{
    Composition, OverlayShape, PendingSnapshot, RasterRequest, Rasterizer, SnapshotDone, SnapshotError,
    SnapshotGateway, SnapshotOptions, SnapshotStage,
};
use crate::options::MapOptions;
use crate::overlay::{
    Annotation, BatchUpdate, Circle, Overlay, OverlayKind, Polygon, Polyline, Reconciler, RenderHint, Selection,
};

// =============================================================================
// PUBLIC TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,
}

impl ErrorCode for SessionError {
    fn error_code(&self) -> &'static str {
        "E_SESSION_CLOSED"
    }
}

/// Parameters a map view is created with.
#[derive(Debug, Clone)]
pub struct CreationParams {
    pub options: MapOptions,
    pub initial_camera: PositionUpdate,
    pub annotations: Vec<Annotation>,
    pub polylines: Vec<Polyline>,
    pub polygons: Vec<Polygon>,
    pub circles: Vec<Circle>,
}

impl Decode for CreationParams {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        let camera = args.req_object("initialCameraPosition")?;
        Ok(Self {
            options: MapOptions::decode(&args.req_object("options")?)?,
            initial_camera: PositionUpdate {
                target: camera.req_lat_lng("target")?,
                zoom: camera.opt_f64("zoom")?,
                heading: camera.opt_f64("heading")?,
                pitch: camera.opt_f64("pitch")?,
            },
            annotations: args.list_of(&OverlayKind::Annotation.add_key())?,
            polylines: args.list_of(&OverlayKind::Polyline.add_key())?,
            polygons: args.list_of(&OverlayKind::Polygon.add_key())?,
            circles: args.list_of(&OverlayKind::Circle.add_key())?,
        })
    }
}

/// Collaborators a session runs against.
pub struct SessionDeps {
    pub engine: Box<dyn MapEngine>,
    pub capabilities: Arc<dyn Capabilities>,
    pub scenes: Arc<dyn SceneProvider>,
    pub presenter: Arc<dyn ScenePresenter>,
    pub rasterizer: Arc<dyn Rasterizer>,
}

enum Call {
    /// A protocol method call answered with one terminal frame.
    Method { frame: Frame, reply: oneshot::Sender<Frame> },
    /// Renderer style lookup on behalf of the engine.
    RenderHint { kind: OverlayKind, id: String, reply: oneshot::Sender<Option<RenderHint>> },
}

/// Cloneable handle to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    view_id: i64,
    calls: mpsc::Sender<Call>,
    engine_events: mpsc::Sender<EngineEvent>,
}

impl SessionHandle {
    #[must_use]
    pub fn view_id(&self) -> i64 {
        self.view_id
    }

    /// Queue one call and return the receiver for its reply. Calls are
    /// dispatched in submission order.
    ///
    /// # Errors
    ///
    /// `SessionError::Closed` if the session task has stopped.
    pub async fn submit(&self, frame: Frame) -> Result<oneshot::Receiver<Frame>, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.calls.send(Call::Method { frame, reply }).await.map_err(|_| SessionError::Closed)?;
        Ok(rx)
    }

    /// Submit a call and wait for its terminal reply.
    ///
    /// # Errors
    ///
    /// `SessionError::Closed` if the session task has stopped.
    pub async fn call(&self, frame: Frame) -> Result<Frame, SessionError> {
        self.submit(frame).await?.await.map_err(|_| SessionError::Closed)
    }

    /// Style for the overlay renderer of `kind`/`id`; `None` for unknown ids.
    ///
    /// # Errors
    ///
    /// `SessionError::Closed` if the session task has stopped.
    pub async fn render_hint(
        &self,
        kind: OverlayKind,
        id: impl Into<String>,
    ) -> Result<Option<RenderHint>, SessionError> {
        let (reply, rx) = oneshot::channel();
        let call = Call::RenderHint { kind, id: id.into(), reply };
        self.calls.send(call).await.map_err(|_| SessionError::Closed)?;
        rx.await.map_err(|_| SessionError::Closed)
    }

    /// Forward an engine signal, for hosts that relay gestures themselves.
    ///
    /// # Errors
    ///
    /// `SessionError::Closed` if the session task has stopped.
    pub async fn engine_event(&self, event: EngineEvent) -> Result<(), SessionError> {
        self.engine_events.send(event).await.map_err(|_| SessionError::Closed)
    }
}

/// Create a session and start its control task.
///
/// Returns the handle, the outbound event stream, and the task handle. The
/// task ends once every `SessionHandle` clone is dropped.
pub fn spawn_session(
    config: &BridgeConfig,
    params: CreationParams,
    deps: SessionDeps,
) -> (SessionHandle, mpsc::Receiver<Frame>, JoinHandle<()>) {
    let (call_tx, call_rx) = mpsc::channel(config.call_buffer);
    let (engine_tx, engine_rx) = mpsc::channel(config.event_buffer);
    let (event_tx, event_rx) = mpsc::channel(config.event_buffer);
    let (snapshot_tx, snapshot_rx) = mpsc::channel(4);

    let SessionDeps { mut engine, capabilities, scenes, presenter, rasterizer } = deps;
    engine.bind_events(engine_tx.clone());

    let mut session = Session {
        view_id: config.view_id,
        engine,
        annotations: Reconciler::new(),
        polylines: Reconciler::new(),
        polygons: Reconciler::new(),
        circles: Reconciler::new(),
        selection: Selection::new(),
        events: EventEmitter::new(config.view_id, event_tx),
        scenes: SceneGateway::new(Arc::clone(&capabilities), scenes, presenter),
        snapshots: SnapshotGateway::new(capabilities, rasterizer),
        snapshot_tx,
    };
    session.create(params);

    let task = tokio::spawn(session.run(call_rx, engine_rx, snapshot_rx));
    let handle = SessionHandle { view_id: config.view_id, calls: call_tx, engine_events: engine_tx };
    (handle, event_rx, task)
}

// =============================================================================
// OUTCOME
// =============================================================================

/// Result of a handler. The dispatch layer builds the reply frame.
enum Outcome {
    /// `done` with a `null` result.
    Done,
    /// `done` with one result value.
    Reply(Value),
    /// The handler took the reply sender and will answer later.
    Deferred,
    NotImplemented,
}

// =============================================================================
// SESSION
// =============================================================================

struct Session {
    view_id: i64,
    engine: Box<dyn MapEngine>,
    annotations: Reconciler<Annotation>,
    polylines: Reconciler<Polyline>,
    polygons: Reconciler<Polygon>,
    circles: Reconciler<Circle>,
    selection: Selection,
    events: EventEmitter,
    scenes: SceneGateway,
    snapshots: SnapshotGateway,
    snapshot_tx: mpsc::Sender<SnapshotDone>,
}

impl Session {
    /// Options, then initial overlays, then an unanimated jump to the
    /// initial camera.
    fn create(&mut self, params: CreationParams) {
        self.engine.apply_options(&params.options);
        let engine = self.engine.as_mut();
        self.annotations.apply_batch(BatchUpdate { to_add: params.annotations, ..Default::default() }, engine);
        self.polylines.apply_batch(BatchUpdate { to_add: params.polylines, ..Default::default() }, engine);
        self.polygons.apply_batch(BatchUpdate { to_add: params.polygons, ..Default::default() }, engine);
        self.circles.apply_batch(BatchUpdate { to_add: params.circles, ..Default::default() }, engine);

        let camera = params.initial_camera;
        let zoom = camera.zoom.map(|z| self.engine.zoom_range().clamp(z));
        self.engine.set_center(camera.target, zoom, camera.heading, camera.pitch, false);
        info!(
            view_id = self.view_id,
            annotations = self.annotations.len(),
            polylines = self.polylines.len(),
            polygons = self.polygons.len(),
            circles = self.circles.len(),
            "session created"
        );
    }

    async fn run(
        mut self,
        mut calls: mpsc::Receiver<Call>,
        mut engine_events: mpsc::Receiver<EngineEvent>,
        mut snapshots: mpsc::Receiver<SnapshotDone>,
    ) {
        loop {
            tokio::select! {
                biased;
                Some(event) = engine_events.recv() => self.on_engine_event(event),
                Some(done) = snapshots.recv() => self.on_snapshot_done(done),
                call = calls.recv() => match call {
                    Some(Call::Method { frame, reply }) => self.dispatch(frame, reply),
                    Some(Call::RenderHint { kind, id, reply }) => {
                        let _ = reply.send(self.render_hint(kind, &id));
                    }
                    None => break,
                },
            }
        }
        info!(view_id = self.view_id, "session stopped");
    }

    // -------------------------------------------------------------------------
    // dispatch
    // -------------------------------------------------------------------------

    fn dispatch(&mut self, mut frame: Frame, reply: oneshot::Sender<Frame>) {
        if frame.view_id.is_none() {
            frame.view_id = Some(self.view_id);
        }
        debug!(view_id = self.view_id, id = %frame.id, method = %frame.method, "dispatch");

        let mut reply = Some(reply);
        let result = self.handle(&frame, &mut reply);
        let Some(reply) = reply else {
            return;
        };

        let response = match result {
            Ok(Outcome::Done) => frame.done(),
            Ok(Outcome::Reply(value)) => frame.done_with(value),
            Ok(Outcome::NotImplemented) => {
                debug!(method = %frame.method, "method not implemented");
                frame.not_implemented()
            }
            Ok(Outcome::Deferred) => {
                // A deferred handler always takes the sender; reaching here is a bug.
                error!(method = %frame.method, "deferred handler left its reply behind");
                frame.error("internal: reply not sent")
            }
            Err(err_frame) => err_frame,
        };
        let _ = reply.send(response);
    }

    fn handle(&mut self, req: &Frame, reply: &mut Option<oneshot::Sender<Frame>>) -> Result<Outcome, Frame> {
        let command = match codec::decode(&req.method, &req.data) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(Outcome::NotImplemented),
            Err(e) => {
                warn!(method = %req.method, error = %e, "decode failed");
                return Err(req.error_from(&e));
            }
        };

        match command {
            Command::UpdateAnnotations(batch) => {
                for id in &batch.to_remove {
                    self.selection.forget(id);
                }
                let report = self.annotations.apply_batch(batch, self.engine.as_mut());
                debug!(?report, "annotations updated");
                Ok(Outcome::Done)
            }
            Command::UpdatePolylines(batch) => {
                let report = self.polylines.apply_batch(batch, self.engine.as_mut());
                debug!(?report, "polylines updated");
                Ok(Outcome::Done)
            }
            Command::UpdatePolygons(batch) => {
                let report = self.polygons.apply_batch(batch, self.engine.as_mut());
                debug!(?report, "polygons updated");
                Ok(Outcome::Done)
            }
            Command::UpdateCircles(batch) => {
                let report = self.circles.apply_batch(batch, self.engine.as_mut());
                debug!(?report, "circles updated");
                Ok(Outcome::Done)
            }
            Command::ShowInfoWindow(id) => {
                if self.annotations.contains(&id) {
                    self.selection.select(&id);
                    self.engine.select_annotation(&id);
                } else {
                    debug!(%id, "show info window for unknown annotation ignored");
                }
                Ok(Outcome::Done)
            }
            Command::HideInfoWindow(id) => {
                self.selection.deselect(&id);
                self.engine.deselect_annotation(&id);
                Ok(Outcome::Done)
            }
            Command::IsInfoWindowShown(id) => Ok(Outcome::Reply(json!(self.selection.is_selected(&id)))),
            Command::UpdateOptions(options) => {
                self.engine.apply_options(&options);
                Ok(Outcome::Done)
            }
            Command::AnimateCamera(update) => {
                interpret(&update, true).apply(self.engine.as_mut());
                Ok(Outcome::Done)
            }
            Command::MoveCamera(update) => {
                interpret(&update, false).apply(self.engine.as_mut());
                Ok(Outcome::Done)
            }
            Command::Convert(Some(coordinate)) => {
                let point = self.engine.convert_to_point(coordinate);
                Ok(Outcome::Reply(json!({ "point": [point.x, point.y] })))
            }
            Command::Convert(None) => Ok(Outcome::Done),
            Command::TakeSnapshot(options) => self.start_snapshot(req, reply, options),
            Command::LookAround { target, categories } => {
                if self.scenes.present(target, categories).is_none() {
                    debug!("look-around unavailable on this platform");
                }
                Ok(Outcome::Done)
            }
            Command::IsLookAroundAvailable(coordinate) => {
                let Some(reply) = reply.take() else {
                    return Ok(Outcome::Deferred);
                };
                let scenes = self.scenes.clone();
                let request = req.clone();
                tokio::spawn(async move {
                    let available = scenes.probe_availability(coordinate).await;
                    let _ = reply.send(request.done_with(available));
                });
                Ok(Outcome::Deferred)
            }
            Command::Query(query) => Ok(Outcome::Reply(self.query(query))),
        }
    }

    fn query(&self, query: Query) -> Value {
        let settings = self.engine.settings();
        match query {
            Query::VisibleRegion => self.engine.visible_region().to_value(),
            Query::CompassEnabled => json!(settings.compass_enabled),
            Query::PitchGesturesEnabled => json!(settings.pitch_gestures_enabled),
            Query::ScrollGesturesEnabled => json!(settings.scroll_gestures_enabled),
            Query::ZoomGesturesEnabled => json!(settings.zoom_gestures_enabled),
            Query::RotateGesturesEnabled => json!(settings.rotate_gestures_enabled),
            Query::MyLocationButtonEnabled => json!(settings.my_location_button_enabled),
            Query::MinMaxZoomLevels => settings.zoom_levels_value(),
            Query::ZoomLevel => json!(self.engine.camera_position().zoom),
        }
    }

    fn render_hint(&self, kind: OverlayKind, id: &str) -> Option<RenderHint> {
        match kind {
            OverlayKind::Annotation => self.annotations.render_hint(id),
            OverlayKind::Polyline => self.polylines.render_hint(id),
            OverlayKind::Polygon => self.polygons.render_hint(id),
            OverlayKind::Circle => self.circles.render_hint(id),
        }
    }

    // -------------------------------------------------------------------------
    // snapshots
    // -------------------------------------------------------------------------

    fn start_snapshot(
        &mut self,
        req: &Frame,
        reply: &mut Option<oneshot::Sender<Frame>>,
        options: SnapshotOptions,
    ) -> Result<Outcome, Frame> {
        if !self.snapshots.is_available() {
            return Err(req.error_from(&SnapshotError::Unavailable));
        }
        let Some(reply) = reply.take() else {
            return Ok(Outcome::Deferred);
        };
        let raster = RasterRequest {
            region: self.engine.visible_region(),
            viewport: self.engine.viewport(),
            show_buildings: options.show_buildings,
            show_points_of_interest: options.show_points_of_interest,
        };
        let ticket = self.snapshots.start(req.clone(), reply, options, raster, self.snapshot_tx.clone());
        debug!(ticket, "snapshot started");
        Ok(Outcome::Deferred)
    }

    fn on_snapshot_done(&mut self, done: SnapshotDone) {
        let SnapshotDone { ticket, stage } = done;
        let encoded = match stage {
            SnapshotStage::Rastered(Ok(tile)) => {
                let Some(pending) = self.snapshots.pending(ticket) else {
                    return;
                };
                let layers = self.composition(pending);
                self.snapshots.begin_compositing(ticket, tile, layers, self.snapshot_tx.clone());
                return;
            }
            SnapshotStage::Rastered(Err(e)) => Err(SnapshotError::from(e)),
            SnapshotStage::Encoded(result) => result,
        };

        let Some(PendingSnapshot { request, reply, .. }) = self.snapshots.complete(ticket) else {
            return;
        };
        let frame = match encoded {
            Ok(bytes) => request.done_bytes(bytes),
            Err(e) => {
                error!(ticket, error = %e, "snapshot failed");
                request.error_from(&e)
            }
        };
        let _ = reply.send(frame);
    }

    /// Annotations inside the captured region, then overlays that intersect
    /// it, taken from the collections as they are now.
    fn composition(&self, pending: &PendingSnapshot) -> Composition {
        let region = pending.region;
        let mut layers = Composition::default();

        if pending.options.show_annotations {
            layers.annotations = self
                .annotations
                .ordered()
                .into_iter()
                .filter(|a| a.visible && region.contains(a.position))
                .cloned()
                .collect();
        }

        if pending.options.show_overlays {
            let mut shapes: Vec<(i32, OverlayShape)> = Vec::new();
            let polylines = intersecting(&self.polylines, region);
            shapes.extend(polylines.map(|o| (o.z_index(), OverlayShape::Polyline(o.clone()))));
            let polygons = intersecting(&self.polygons, region);
            shapes.extend(polygons.map(|o| (o.z_index(), OverlayShape::Polygon(o.clone()))));
            let circles = intersecting(&self.circles, region);
            shapes.extend(circles.map(|o| (o.z_index(), OverlayShape::Circle(o.clone()))));
            shapes.sort_by_key(|(z, _)| *z);
            layers.shapes = shapes.into_iter().map(|(_, shape)| shape).collect();
        }

        layers
    }

    // -------------------------------------------------------------------------
    // engine signals
    // -------------------------------------------------------------------------

    fn on_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::RegionWillChange => self.events.region_will_change(),
            EngineEvent::RegionDidChange => self.events.region_did_change(self.engine.as_ref()),
            EngineEvent::AnnotationTapped(id) => {
                let Some(annotation) = self.annotations.get(&id) else {
                    debug!(%id, "tap on unknown annotation");
                    return;
                };
                let consume = annotation.consume_tap_events;
                self.selection.select(&id);
                if consume {
                    self.events.annotation_tapped(&id);
                }
            }
            EngineEvent::InfoWindowTapped(id) => {
                if self.annotations.contains(&id) {
                    self.events.info_window_tapped(&id);
                }
            }
            EngineEvent::AnnotationDragEnded { id, position } => {
                let Some(annotation) = self.annotations.get_mut(&id) else {
                    debug!(%id, "drag end on unknown annotation");
                    return;
                };
                annotation.position = position;
                self.events.annotation_drag_ended(&id, position);
            }
            EngineEvent::OverlayTapped { kind, id } => {
                let consumes = match kind {
                    OverlayKind::Annotation => self.annotations.get(&id).is_some_and(Overlay::consumes_taps),
                    OverlayKind::Polyline => self.polylines.get(&id).is_some_and(Overlay::consumes_taps),
                    OverlayKind::Polygon => self.polygons.get(&id).is_some_and(Overlay::consumes_taps),
                    OverlayKind::Circle => self.circles.get(&id).is_some_and(Overlay::consumes_taps),
                };
                if consumes {
                    self.events.overlay_tapped(kind, &id);
                }
            }
            EngineEvent::MapTapped(position) => self.events.map_tapped(position),
            EngineEvent::MapLongPressed(position) => self.events.map_long_pressed(position),
            EngineEvent::AnnotationDeselected(id) => self.selection.deselect(&id),
        }
    }
}

/// Visible overlays whose extent meets `region`, in draw order.
fn intersecting<T: Overlay>(overlays: &Reconciler<T>, region: LatLngBounds) -> impl Iterator<Item = &T> {
    overlays
        .ordered()
        .into_iter()
        .filter(move |o| o.visible() && o.bounds().is_some_and(|b| b.intersects(&region)))
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
