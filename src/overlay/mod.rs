//! Overlay collections: identity-keyed reconciliation of map overlays.
//!
//! DESIGN
//! ======
//! Annotations, polylines, polygons and circles differ only in geometry,
//! so one generic `Reconciler<T>` serves all four. A batch is applied in a
//! fixed order: add → change → remove. That lets a single batch add an
//! entity and immediately restyle it.
//!
//! Each mutation reaches the rendering collaborator as one call
//! (`insert`, `replace`, `remove`); geometry and style travel together so
//! the engine never observes a half-updated overlay.
//!
//! UNKNOWN IDS
//! ===========
//! Change/remove on an absent id is skipped and counted in the report. The
//! host diffs its own model and may race a remove against a change, so these
//! are expected and never surfaced as failures.

mod annotation;
mod circle;
mod polygon;
mod polyline;
mod selection;

use std::collections::HashMap;

use tracing::debug;

use crate::codec::{Args, Decode, DecodeError};
use crate::engine::OverlayLayer;
use crate::geo::LatLngBounds;

pub use annotation::{Annotation, AnnotationIcon, InfoWindow};
pub use circle::Circle;
pub use polygon::Polygon;
pub use polyline::{JointType, PatternItem, Polyline};
pub use selection::Selection;

// =============================================================================
// KIND
// =============================================================================

/// The four overlay collections. Carries the protocol key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverlayKind {
    Annotation,
    Polyline,
    Polygon,
    Circle,
}

impl OverlayKind {
    /// Singular name, used as the event namespace (`polyline#onTap`).
    #[must_use]
    pub fn singular(self) -> &'static str {
        match self {
            Self::Annotation => "annotation",
            Self::Polyline => "polyline",
            Self::Polygon => "polygon",
            Self::Circle => "circle",
        }
    }

    /// Plural name, used as the method namespace (`polylines#update`).
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            Self::Annotation => "annotations",
            Self::Polyline => "polylines",
            Self::Polygon => "polygons",
            Self::Circle => "circles",
        }
    }

    /// Entity id field (`annotationId`).
    #[must_use]
    pub fn id_key(self) -> &'static str {
        match self {
            Self::Annotation => "annotationId",
            Self::Polyline => "polylineId",
            Self::Polygon => "polygonId",
            Self::Circle => "circleId",
        }
    }

    #[must_use]
    pub fn add_key(self) -> String {
        format!("{}ToAdd", self.plural())
    }

    #[must_use]
    pub fn change_key(self) -> String {
        format!("{}ToChange", self.plural())
    }

    /// `annotationIdsToRemove`, `polylineIdsToRemove`, ...
    #[must_use]
    pub fn remove_key(self) -> String {
        format!("{}IdsToRemove", self.singular())
    }
}

// =============================================================================
// OVERLAY TRAIT
// =============================================================================

/// Style the engine needs to build a renderer for one overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderHint {
    pub stroke_color: Option<u32>,
    pub fill_color: Option<u32>,
    pub line_width: f64,
    /// Alternating dash/gap lengths; empty for a solid line.
    pub dash_pattern: Vec<f64>,
    pub z_index: i32,
    pub visible: bool,
}

/// One entity in an overlay collection.
pub trait Overlay: Decode + Clone + std::fmt::Debug + Send + Sync + 'static {
    const KIND: OverlayKind;

    fn id(&self) -> &str;

    /// Swap in new geometry and style. Identity never changes.
    fn apply_update(&mut self, update: Self) {
        *self = update;
    }

    fn render_hint(&self) -> RenderHint;

    /// Geographic extent, used to decide snapshot intersection.
    fn bounds(&self) -> Option<LatLngBounds>;

    fn consumes_taps(&self) -> bool;

    fn z_index(&self) -> i32;

    fn visible(&self) -> bool;
}

/// `zIndex` saturated into `i32`.
fn decode_z_index(args: &Args<'_>) -> Result<Option<i32>, DecodeError> {
    Ok(args
        .opt_i64("zIndex")?
        .map(|z| i32::try_from(z).unwrap_or(if z < 0 { i32::MIN } else { i32::MAX })))
}

// =============================================================================
// BATCH UPDATE
// =============================================================================

/// One add/change/remove triad.
#[derive(Debug, Clone)]
pub struct BatchUpdate<T> {
    pub to_add: Vec<T>,
    pub to_change: Vec<T>,
    pub to_remove: Vec<String>,
}

impl<T> Default for BatchUpdate<T> {
    fn default() -> Self {
        Self { to_add: Vec::new(), to_change: Vec::new(), to_remove: Vec::new() }
    }
}

impl<T> BatchUpdate<T> {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_change.is_empty() && self.to_remove.is_empty()
    }
}

impl<T: Overlay> Decode for BatchUpdate<T> {
    fn decode(args: &Args<'_>) -> Result<Self, DecodeError> {
        let kind = T::KIND;
        Ok(Self {
            to_add: args.list_of(&kind.add_key())?,
            to_change: args.list_of(&kind.change_key())?,
            to_remove: args.strings(&kind.remove_key())?,
        })
    }
}

/// What one `apply_batch` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub added: usize,
    /// Adds that overwrote an existing id (last write wins).
    pub overwritten: usize,
    pub changed: usize,
    pub removed: usize,
    /// Change/remove ids that were not present.
    pub unknown: Vec<String>,
}

// =============================================================================
// RECONCILER
// =============================================================================

/// Identity-keyed collection of one overlay kind.
#[derive(Debug, Clone)]
pub struct Reconciler<T: Overlay> {
    entities: HashMap<String, T>,
}

impl<T: Overlay> Default for Reconciler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Overlay> Reconciler<T> {
    #[must_use]
    pub fn new() -> Self {
        Self { entities: HashMap::new() }
    }

    /// Apply one batch in add → change → remove order, mirroring every
    /// mutation onto `layer`.
    pub fn apply_batch<L>(&mut self, batch: BatchUpdate<T>, layer: &mut L) -> BatchReport
    where
        L: OverlayLayer<T> + ?Sized,
    {
        let mut report = BatchReport::default();

        for entity in batch.to_add {
            if self.entities.contains_key(entity.id()) {
                layer.replace(&entity);
                report.overwritten += 1;
            } else {
                layer.insert(&entity);
                report.added += 1;
            }
            self.entities.insert(entity.id().to_string(), entity);
        }

        for update in batch.to_change {
            let Some(existing) = self.entities.get_mut(update.id()) else {
                debug!(kind = T::KIND.singular(), id = update.id(), "change for unknown id ignored");
                report.unknown.push(update.id().to_string());
                continue;
            };
            existing.apply_update(update);
            layer.replace(existing);
            report.changed += 1;
        }

        for id in batch.to_remove {
            if self.entities.remove(&id).is_some() {
                layer.remove(&id);
                report.removed += 1;
            } else {
                debug!(kind = T::KIND.singular(), %id, "remove for unknown id ignored");
                report.unknown.push(id);
            }
        }

        report
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entities.get(id)
    }

    /// Mutable access for engine-originated edits (annotation drags).
    pub fn get_mut(&mut self, id: &str) -> Option<&mut T> {
        self.entities.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entities in draw order: ascending z index, then id.
    #[must_use]
    pub fn ordered(&self) -> Vec<&T> {
        let mut all: Vec<&T> = self.entities.values().collect();
        all.sort_by(|a, b| a.z_index().cmp(&b.z_index()).then_with(|| a.id().cmp(b.id())));
        all
    }

    #[must_use]
    pub fn render_hint(&self, id: &str) -> Option<RenderHint> {
        self.entities.get(id).map(Overlay::render_hint)
    }
}

#[cfg(test)]
#[path = "reconciler_test.rs"]
mod tests;
