//! Rasterized map snapshots.
//!
//! DESIGN
//! ======
//! At most one snapshot is in flight per session. Starting a new one
//! cancels the previous one (cancel-then-start): its token fires, its
//! caller is answered with a `cancel` frame, and any late completion
//! carrying its ticket is ignored.
//!
//! A capture has two stages, both off the control task and both under the
//! same ticket and token:
//!
//! 1. `Rasterizer::rasterize` renders the base layer.
//! 2. The session collects the then-current annotations and overlays and
//!    `begin_compositing` runs `composite` on a blocking thread.
//!
//! The call stays in the pending slot until the encoded PNG comes back, so
//! a new capture can still cancel one that is compositing.

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::{ImageFormat, RgbaImage, imageops};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::capability::Capabilities;
use crate::codec::{Args, Decode, DecodeError};
use crate::engine::Viewport;
use crate::frame::{ErrorCode, Frame};
use crate::geo::{LatLng, LatLngBounds};
use crate::overlay::{Annotation, Circle, Polygon, Polyline};

// =============================================================================
// OPTIONS
// =============================================================================

/// Flags for one `map#takeSnapshot` call. Every flag defaults to on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotOptions {
    pub show_buildings: bool,
    pub show_points_of_interest: bool,
    pub show_annotations: bool,
    pub show_overlays: bool,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            show_buildings: true,
            show_points_of_interest: true,
            show_annotations: true,
            show_overlays: true,
        }
    }
}

impl Decode for SnapshotOptions {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            show_buildings: args.opt_bool("showBuildings")?.unwrap_or(true),
            show_points_of_interest: args.opt_bool("showPointsOfInterest")?.unwrap_or(true),
            show_annotations: args.opt_bool("showAnnotations")?.unwrap_or(true),
            show_overlays: args.opt_bool("showOverlays")?.unwrap_or(true),
        })
    }
}

// =============================================================================
// RASTERIZER
// =============================================================================

/// Maps coordinates onto one rendered tile, in pixels.
pub trait Projection: Send + Sync {
    fn to_pixel(&self, coordinate: LatLng) -> (f64, f64);
}

/// What to render for the base layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterRequest {
    pub region: LatLngBounds,
    pub viewport: Viewport,
    pub show_buildings: bool,
    pub show_points_of_interest: bool,
}

/// A rendered base layer plus the projection it was rendered with.
pub struct RasterTile {
    pub image: RgbaImage,
    pub projection: Arc<dyn Projection>,
}

/// An overlay to draw onto a snapshot.
#[derive(Debug, Clone)]
pub enum OverlayShape {
    Polyline(Polyline),
    Polygon(Polygon),
    Circle(Circle),
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct RasterError(pub String);

/// Platform snapshot renderer.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    /// Render the base map for `request`.
    ///
    /// # Errors
    ///
    /// `RasterError` with the platform's failure message.
    async fn rasterize(&self, request: RasterRequest) -> Result<RasterTile, RasterError>;

    /// Pixel image for one annotation, or `None` to skip it.
    fn annotation_sprite(&self, annotation: &Annotation) -> Option<RgbaImage>;

    /// A full-tile transparent layer with `shape` drawn on it, or `None`
    /// when the shape cannot be rendered.
    fn overlay_layer(&self, shape: &OverlayShape, tile: &RasterTile) -> Option<RgbaImage>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SnapshotError {
    #[error("snapshot rasterization failed: {0}")]
    Raster(#[from] RasterError),
    #[error("snapshot encoding failed: {0}")]
    Encode(String),
    #[error("snapshots are not supported on this platform")]
    Unavailable,
}

impl ErrorCode for SnapshotError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Raster(_) => "E_SNAPSHOT_RASTER",
            Self::Encode(_) => "E_SNAPSHOT_ENCODE",
            Self::Unavailable => "E_SNAPSHOT_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Raster(_))
    }
}

// =============================================================================
// COORDINATION
// =============================================================================

/// Stage result routed back to the session.
pub struct SnapshotDone {
    pub ticket: u64,
    pub stage: SnapshotStage,
}

pub enum SnapshotStage {
    /// The base raster finished; compositing has not started.
    Rastered(Result<RasterTile, RasterError>),
    /// Compositing and PNG encoding finished.
    Encoded(Result<Vec<u8>, SnapshotError>),
}

/// The one snapshot call waiting for its image.
pub struct PendingSnapshot {
    pub ticket: u64,
    pub request: Frame,
    pub reply: oneshot::Sender<Frame>,
    pub options: SnapshotOptions,
    pub region: LatLngBounds,
    token: CancellationToken,
}

pub struct SnapshotGateway {
    capabilities: Arc<dyn Capabilities>,
    rasterizer: Arc<dyn Rasterizer>,
    pending: Option<PendingSnapshot>,
    next_ticket: u64,
}

impl SnapshotGateway {
    #[must_use]
    pub fn new(capabilities: Arc<dyn Capabilities>, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self { capabilities, rasterizer, pending: None, next_ticket: 0 }
    }

    #[must_use]
    pub fn is_available(&self) -> bool {
        self.capabilities.supports_snapshots()
    }

    #[must_use]
    pub fn rasterizer(&self) -> Arc<dyn Rasterizer> {
        Arc::clone(&self.rasterizer)
    }

    #[must_use]
    pub fn in_flight(&self) -> Option<u64> {
        self.pending.as_ref().map(|p| p.ticket)
    }

    /// Cancel any in-flight capture, then start rasterizing `raster`.
    /// The completion is sent on `done`. Returns the new ticket.
    pub fn start(
        &mut self,
        request: Frame,
        reply: oneshot::Sender<Frame>,
        options: SnapshotOptions,
        raster: RasterRequest,
        done: mpsc::Sender<SnapshotDone>,
    ) -> u64 {
        if let Some(prev) = self.pending.take() {
            prev.token.cancel();
            debug!(ticket = prev.ticket, "snapshot superseded");
            let _ = prev.reply.send(prev.request.cancelled());
        }

        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let token = CancellationToken::new();
        self.pending = Some(PendingSnapshot {
            ticket,
            request,
            reply,
            options,
            region: raster.region,
            token: token.clone(),
        });

        let rasterizer = Arc::clone(&self.rasterizer);
        tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(ticket, "snapshot rasterization cancelled");
                }
                result = rasterizer.rasterize(raster) => {
                    let _ = done.send(SnapshotDone { ticket, stage: SnapshotStage::Rastered(result) }).await;
                }
            }
        });
        ticket
    }

    /// The live call for `ticket`, left in place. Stale tickets yield `None`.
    #[must_use]
    pub fn pending(&self, ticket: u64) -> Option<&PendingSnapshot> {
        self.pending.as_ref().filter(|p| p.ticket == ticket)
    }

    /// Composite `tile` with `layers` on a blocking thread and send the
    /// encoded result on `done`. The call stays pending, so a capture
    /// started meanwhile still cancels it. Returns `false` for a stale
    /// ticket.
    pub fn begin_compositing(
        &self,
        ticket: u64,
        tile: RasterTile,
        layers: Composition,
        done: mpsc::Sender<SnapshotDone>,
    ) -> bool {
        let Some(pending) = self.pending(ticket) else {
            debug!(ticket, "stale snapshot raster ignored");
            return false;
        };
        let token = pending.token.clone();
        let rasterizer = Arc::clone(&self.rasterizer);
        tokio::spawn(async move {
            let work = tokio::task::spawn_blocking(move || composite(&tile, &layers, rasterizer.as_ref()));
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(ticket, "snapshot compositing cancelled");
                }
                joined = work => {
                    let result = joined.unwrap_or_else(|e| Err(SnapshotError::Encode(e.to_string())));
                    if token.is_cancelled() {
                        return;
                    }
                    let _ = done.send(SnapshotDone { ticket, stage: SnapshotStage::Encoded(result) }).await;
                }
            }
        });
        true
    }

    /// Claim the pending call to answer it. Stale tickets yield `None`.
    pub fn complete(&mut self, ticket: u64) -> Option<PendingSnapshot> {
        if self.pending.as_ref().is_some_and(|p| p.ticket == ticket) {
            return self.pending.take();
        }
        debug!(ticket, "stale snapshot completion ignored");
        None
    }
}

// =============================================================================
// COMPOSITING
// =============================================================================

/// Layer content collected on the control task at completion time.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    /// Annotations in draw order.
    pub annotations: Vec<Annotation>,
    /// Overlays in draw order.
    pub shapes: Vec<OverlayShape>,
}

/// Draw annotations then overlays onto the base raster and encode as PNG.
///
/// # Errors
///
/// `SnapshotError::Encode` if PNG encoding fails.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn composite(
    tile: &RasterTile,
    layers: &Composition,
    rasterizer: &dyn Rasterizer,
) -> Result<Vec<u8>, SnapshotError> {
    let mut canvas = tile.image.clone();

    for annotation in &layers.annotations {
        let Some(mut sprite) = rasterizer.annotation_sprite(annotation) else {
            continue;
        };
        if annotation.alpha < 1.0 {
            for pixel in sprite.pixels_mut() {
                pixel[3] = (f64::from(pixel[3]) * annotation.alpha).round() as u8;
            }
        }
        let (px, py) = tile.projection.to_pixel(annotation.position);
        let x = px - annotation.anchor.0 * f64::from(sprite.width());
        let y = py - annotation.anchor.1 * f64::from(sprite.height());
        imageops::overlay(&mut canvas, &sprite, x.round() as i64, y.round() as i64);
    }

    for shape in &layers.shapes {
        if let Some(layer) = rasterizer.overlay_layer(shape, tile) {
            imageops::overlay(&mut canvas, &layer, 0, 0);
        }
    }

    let mut out = Cursor::new(Vec::new());
    canvas.write_to(&mut out, ImageFormat::Png).map_err(|e| SnapshotError::Encode(e.to_string()))?;
    let bytes = out.into_inner();
    info!(
        bytes = bytes.len(),
        annotations = layers.annotations.len(),
        overlays = layers.shapes.len(),
        "snapshot composited"
    );
    Ok(bytes)
}

#[cfg(test)]
#[path = "snapshot_test.rs"]
mod tests;
