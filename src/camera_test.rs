use serde_json::json;

use super::*;
use crate::frame::Data;

fn update(value: serde_json::Value) -> CameraUpdate {
    let data: Data = serde_json::from_value(json!({ "cameraUpdate": value })).expect("object");
    CameraUpdate::decode_field(&Args::top(&data), "cameraUpdate").expect("decode")
}

#[test]
fn new_lat_lng_zoom_sets_center_and_zoom() {
    let instruction = interpret(&update(json!(["newLatLngZoom", [10.0, 20.0], 5.0])), true);
    assert_eq!(
        instruction,
        CameraInstruction::SetCenter {
            target: LatLng::new(10.0, 20.0),
            zoom: Some(5.0),
            heading: None,
            pitch: None,
            animated: true,
        }
    );
}

#[test]
fn new_lat_lng_bounds_sets_bounds_and_padding() {
    let instruction = interpret(&update(json!(["newLatLngBounds", [[0, 0], [1, 1]], 8.0])), false);
    assert_eq!(
        instruction,
        CameraInstruction::SetBounds {
            targets: vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)],
            padding: 8.0,
            animated: false,
        }
    );
}

#[test]
fn new_camera_position_carries_all_fields() {
    let u = update(json!(["newCameraPosition", {"target": [1.0, 2.0], "zoom": 3.0, "heading": 45.0, "pitch": 10.0}]));
    assert_eq!(
        interpret(&u, false),
        CameraInstruction::SetCenter {
            target: LatLng::new(1.0, 2.0),
            zoom: Some(3.0),
            heading: Some(45.0),
            pitch: Some(10.0),
            animated: false,
        }
    );
}

#[test]
fn new_lat_lng_keeps_zoom() {
    let u = update(json!(["newLatLng", [1.0, 2.0]]));
    assert!(matches!(interpret(&u, true), CameraInstruction::SetCenter { zoom: None, animated: true, .. }));
}

#[test]
fn relative_zoom_honors_animated_flag() {
    assert_eq!(
        interpret(&update(json!(["zoomBy", 2.0])), false),
        CameraInstruction::Zoom { step: ZoomStep::By(2.0), animated: false }
    );
    assert_eq!(
        interpret(&update(json!(["zoomOut"])), true),
        CameraInstruction::Zoom { step: ZoomStep::Out, animated: true }
    );
}

#[test]
fn unknown_tag_is_noop() {
    let u = update(json!(["barrelRoll", 1.0]));
    assert_eq!(u, CameraUpdate::Unrecognized("barrelRoll".into()));
    assert_eq!(interpret(&u, true), CameraInstruction::Noop);
}

#[test]
fn missing_required_element_is_noop() {
    assert_eq!(interpret(&update(json!(["newLatLngZoom", [10.0, 20.0]])), true), CameraInstruction::Noop);
    assert_eq!(interpret(&update(json!(["newLatLngBounds", [[0, 0]]])), true), CameraInstruction::Noop);
    assert_eq!(interpret(&update(json!(["zoomTo"])), true), CameraInstruction::Noop);
    assert_eq!(interpret(&update(json!(["newCameraPosition", {"zoom": 3.0}])), true), CameraInstruction::Noop);
    assert_eq!(interpret(&update(json!([])), true), CameraInstruction::Noop);
}

#[test]
fn empty_bounds_list_is_noop() {
    assert_eq!(interpret(&update(json!(["newLatLngBounds", [], 4.0])), true), CameraInstruction::Noop);
}

#[test]
fn non_list_update_is_decode_error() {
    let data: Data = serde_json::from_value(json!({ "cameraUpdate": "zoomIn" })).expect("object");
    let err = CameraUpdate::decode_field(&Args::top(&data), "cameraUpdate").unwrap_err();
    assert_eq!(err, DecodeError::Type { field: "cameraUpdate".into(), expected: "list" });
}

#[test]
fn zoom_step_resolution_clamps() {
    let range = ZoomRange { min: 2.0, max: 10.0 };
    assert_eq!(ZoomStep::In.resolve(10.0, range), 10.0);
    assert_eq!(ZoomStep::Out.resolve(5.0, range), 4.0);
    assert_eq!(ZoomStep::By(-20.0).resolve(5.0, range), 2.0);
    assert_eq!(ZoomStep::To(7.5).resolve(5.0, range), 7.5);
}
