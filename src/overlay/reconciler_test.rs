use serde_json::json;

use super::*;
use crate::frame::Data;
use crate::geo::LatLng;

/// Records every engine call in order.
#[derive(Default)]
struct RecordingLayer {
    calls: Vec<String>,
}

impl<T: Overlay> OverlayLayer<T> for RecordingLayer {
    fn insert(&mut self, entity: &T) {
        self.calls.push(format!("insert:{}", entity.id()));
    }

    fn replace(&mut self, entity: &T) {
        self.calls.push(format!("replace:{}", entity.id()));
    }

    fn remove(&mut self, id: &str) {
        self.calls.push(format!("remove:{id}"));
    }
}

fn line(id: &str, color: u32) -> Polyline {
    let mut l = Polyline::new(id, vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)]);
    l.color = color;
    l
}

fn data(value: serde_json::Value) -> Data {
    serde_json::from_value(value).expect("object")
}

// =============================================================================
// apply_batch
// =============================================================================

#[test]
fn add_change_remove_in_one_batch() {
    let mut rec = Reconciler::<Polyline>::new();
    let mut layer = RecordingLayer::default();
    rec.apply_batch(BatchUpdate { to_add: vec![line("p0", 0xFF00_0000)], ..Default::default() }, &mut layer);

    let batch = BatchUpdate {
        to_add: vec![line("p1", 0xFF00_00FF)],
        to_change: vec![line("p1", 0xFFFF_0000)],
        to_remove: vec!["p0".into()],
    };
    let report = rec.apply_batch(batch, &mut layer);

    assert_eq!(report.added, 1);
    assert_eq!(report.changed, 1);
    assert_eq!(report.removed, 1);
    assert!(report.unknown.is_empty());
    assert!(!rec.contains("p0"));
    assert_eq!(rec.get("p1").map(|l| l.color), Some(0xFFFF_0000));
    assert_eq!(layer.calls, vec!["insert:p0", "insert:p1", "replace:p1", "remove:p0"]);
}

#[test]
fn add_then_change_ends_with_changed_style() {
    let mut rec = Reconciler::<Polyline>::new();
    let mut layer = RecordingLayer::default();
    let batch = BatchUpdate {
        to_add: vec![line("p1", 0xFF00_00FF)],
        to_change: vec![line("p1", 0xFFFF_0000)],
        to_remove: vec![],
    };
    rec.apply_batch(batch, &mut layer);

    let hint = rec.render_hint("p1").expect("present");
    assert_eq!(hint.stroke_color, Some(0xFFFF_0000));
}

#[test]
fn remove_unknown_id_is_noop() {
    let mut rec = Reconciler::<Polyline>::new();
    let mut layer = RecordingLayer::default();
    rec.apply_batch(BatchUpdate { to_add: vec![line("p1", 1)], ..Default::default() }, &mut layer);
    layer.calls.clear();

    let report = rec.apply_batch(BatchUpdate { to_remove: vec!["ghost".into()], ..Default::default() }, &mut layer);

    assert_eq!(report.removed, 0);
    assert_eq!(report.unknown, vec!["ghost".to_string()]);
    assert_eq!(rec.len(), 1);
    assert!(layer.calls.is_empty());
}

#[test]
fn change_unknown_id_is_noop() {
    let mut rec = Reconciler::<Polyline>::new();
    let mut layer = RecordingLayer::default();
    let report = rec.apply_batch(BatchUpdate { to_change: vec![line("ghost", 1)], ..Default::default() }, &mut layer);

    assert_eq!(report.unknown, vec!["ghost".to_string()]);
    assert!(rec.is_empty());
    assert!(layer.calls.is_empty());
}

#[test]
fn duplicate_add_overwrites() {
    let mut rec = Reconciler::<Polyline>::new();
    let mut layer = RecordingLayer::default();
    let batch = BatchUpdate { to_add: vec![line("p1", 1), line("p1", 2)], ..Default::default() };
    let report = rec.apply_batch(batch, &mut layer);

    assert_eq!(report.added, 1);
    assert_eq!(report.overwritten, 1);
    assert_eq!(rec.len(), 1);
    assert_eq!(rec.get("p1").map(|l| l.color), Some(2));
    assert_eq!(layer.calls, vec!["insert:p1", "replace:p1"]);
}

#[test]
fn reapplying_same_batch_is_stable() {
    let mut rec = Reconciler::<Circle>::new();
    let mut layer = RecordingLayer::default();
    let make = || BatchUpdate {
        to_add: vec![Circle::new("c1", LatLng::new(1.0, 2.0), 100.0)],
        to_change: vec![],
        to_remove: vec!["c9".into()],
    };
    rec.apply_batch(make(), &mut layer);
    let first = rec.get("c1").cloned();
    rec.apply_batch(make(), &mut layer);

    assert_eq!(rec.len(), 1);
    assert_eq!(rec.get("c1").cloned(), first);
}

#[test]
fn change_keeps_identity() {
    let mut rec = Reconciler::<Annotation>::new();
    let mut layer = RecordingLayer::default();
    rec.apply_batch(
        BatchUpdate { to_add: vec![Annotation::new("a1", LatLng::new(0.0, 0.0))], ..Default::default() },
        &mut layer,
    );
    rec.apply_batch(
        BatchUpdate { to_change: vec![Annotation::new("a1", LatLng::new(5.0, 5.0))], ..Default::default() },
        &mut layer,
    );

    assert_eq!(rec.len(), 1);
    assert_eq!(rec.get("a1").map(|a| a.position), Some(LatLng::new(5.0, 5.0)));
}

#[test]
fn ordered_sorts_by_z_then_id() {
    let mut rec = Reconciler::<Polygon>::new();
    let mut layer = RecordingLayer::default();
    let mut top = Polygon::new("a", vec![]);
    top.z_index = 5;
    let to_add = vec![top, Polygon::new("c", vec![]), Polygon::new("b", vec![])];
    let batch = BatchUpdate { to_add, ..Default::default() };
    rec.apply_batch(batch, &mut layer);

    let ids: Vec<&str> = rec.ordered().iter().map(|p| p.id()).collect();
    assert_eq!(ids, vec!["b", "c", "a"]);
}

// =============================================================================
// decode
// =============================================================================

#[test]
fn batch_decodes_protocol_keys() {
    let d = data(json!({
        "polylinesToAdd": [{"polylineId": "p1", "points": [[0.0, 0.0], [1.0, 1.0]], "color": 4_294_901_760_u32}],
        "polylineIdsToRemove": ["p0"],
    }));
    let batch = BatchUpdate::<Polyline>::decode(&Args::top(&d)).expect("decode");

    assert_eq!(batch.to_add.len(), 1);
    assert_eq!(batch.to_add[0].color, 0xFFFF_0000);
    assert!(batch.to_change.is_empty());
    assert_eq!(batch.to_remove, vec!["p0".to_string()]);
}

#[test]
fn empty_bag_is_empty_batch() {
    let d = Data::new();
    let batch = BatchUpdate::<Circle>::decode(&Args::top(&d)).expect("decode");
    assert!(batch.is_empty());
}

#[test]
fn missing_entity_id_names_field() {
    let d = data(json!({"annotationsToAdd": [{"position": [1.0, 2.0]}]}));
    let err = BatchUpdate::<Annotation>::decode(&Args::top(&d)).unwrap_err();
    assert_eq!(err, DecodeError::Missing("annotationsToAdd[0].annotationId".into()));
}

#[test]
fn polyline_patterns_flatten_to_dash_lengths() {
    let d = data(json!({
        "polylineId": "p1",
        "width": 4.0,
        "jointType": 2,
        "patterns": [["dash", 10.0], ["gap", 5.0], ["dot"]],
    }));
    let line = Polyline::decode(&Args::top(&d)).expect("decode");

    assert_eq!(line.joint_type, JointType::Round);
    assert_eq!(line.render_hint().dash_pattern, vec![10.0, 5.0, 4.0]);
}

#[test]
fn bad_pattern_is_type_error() {
    let d = data(json!({"polylineId": "p1", "patterns": [["wiggle", 1.0]]}));
    let err = Polyline::decode(&Args::top(&d)).unwrap_err();
    assert!(matches!(err, DecodeError::Type { ref field, .. } if field == "patterns[0]"));
}

#[test]
fn circle_bounds_cover_radius() {
    let circle = Circle::new("c1", LatLng::new(0.0, 0.0), 111_320.0);
    let b = circle.bounds().expect("bounds");
    assert!((b.northeast.latitude - 1.0).abs() < 1e-9);
    assert!((b.southwest.longitude + 1.0).abs() < 1e-9);
}

#[test]
fn annotation_decode_defaults() {
    let d = data(json!({"annotationId": "a1", "position": [1.0, 2.0], "alpha": 3.0}));
    let a = Annotation::decode(&Args::top(&d)).expect("decode");

    assert_eq!(a.alpha, 1.0);
    assert!(a.visible);
    assert!(a.consume_tap_events);
    assert_eq!(a.icon, AnnotationIcon::Default);
    assert_eq!(a.info_window.anchor, (0.5, 0.0));
}

// =============================================================================
// selection
// =============================================================================

#[test]
fn select_is_exclusive_and_idempotent() {
    let mut sel = Selection::new();
    sel.select("a1");
    sel.select("a1");
    assert!(sel.is_selected("a1"));

    sel.select("a2");
    assert!(!sel.is_selected("a1"));
    assert!(sel.is_selected("a2"));
    assert_eq!(sel.current(), Some("a2"));
}

#[test]
fn unknown_id_is_not_selected() {
    let mut sel = Selection::new();
    assert!(!sel.is_selected("nope"));
    sel.deselect("nope");
    assert!(!sel.is_selected("nope"));
}

#[test]
fn forget_clears_state() {
    let mut sel = Selection::new();
    sel.select("a1");
    sel.forget("a1");
    assert!(!sel.is_selected("a1"));
    assert_eq!(sel.current(), None);
}
