use serde_json::json;

use super::*;
use crate::camera::CameraUpdate;
use crate::gateway::scene::PoiCategory;

fn data(value: serde_json::Value) -> Data {
    serde_json::from_value(value).expect("object")
}

// =============================================================================
// Args
// =============================================================================

#[test]
fn null_counts_as_absent() {
    let d = data(json!({"title": null}));
    let args = Args::top(&d);
    assert_eq!(args.opt_str("title"), Ok(None));
    assert_eq!(args.req_str("title"), Err(DecodeError::Missing("title".into())));
}

#[test]
fn wrong_type_names_the_field() {
    let d = data(json!({"visible": "yes"}));
    let err = Args::top(&d).opt_bool("visible").unwrap_err();
    assert_eq!(err, DecodeError::Type { field: "visible".into(), expected: "bool" });
    assert_eq!(err.error_code(), "E_DECODE_TYPE");
}

#[test]
fn nested_paths_are_dotted() {
    let d = data(json!({"options": {"padding": "wide"}}));
    let args = Args::top(&d);
    let options = args.req_object("options").expect("object");
    let err = options.opt_f64("padding").unwrap_err();
    assert_eq!(err, DecodeError::Type { field: "options.padding".into(), expected: "number" });
}

#[test]
fn integer_accepts_whole_floats() {
    let d = data(json!({"a": 3.0, "b": 3.5}));
    let args = Args::top(&d);
    assert_eq!(args.opt_i64("a"), Ok(Some(3)));
    assert!(args.opt_i64("b").is_err());
}

#[test]
fn color_rejects_out_of_range() {
    let d = data(json!({"ok": 4_294_967_295_u64, "neg": -1}));
    let args = Args::top(&d);
    assert_eq!(args.opt_color("ok"), Ok(Some(u32::MAX)));
    assert!(args.opt_color("neg").is_err());
}

#[test]
fn lat_lng_list_reports_index() {
    let d = data(json!({"points": [[1.0, 2.0], [3.0]]}));
    let err = Args::top(&d).opt_lat_lng_list("points").unwrap_err();
    assert_eq!(err, DecodeError::Type { field: "points[1]".into(), expected: "[lat, lng]" });
}

// =============================================================================
// decode
// =============================================================================

#[test]
fn unknown_method_is_none() {
    let result = decode("map#doBarrelRoll", &Data::new()).expect("no error");
    assert!(result.is_none());
}

#[test]
fn queries_need_no_arguments() {
    let cmd = decode("camera#getZoomLevel", &Data::new()).expect("decode");
    assert!(matches!(cmd, Some(Command::Query(Query::ZoomLevel))));
    let cmd = decode("map#getMinMaxZoomLevels", &Data::new()).expect("decode");
    assert!(matches!(cmd, Some(Command::Query(Query::MinMaxZoomLevels))));
}

#[test]
fn info_window_requires_id() {
    let err = decode("annotations#showInfoWindow", &Data::new()).unwrap_err();
    assert_eq!(err, DecodeError::Missing("annotationId".into()));
    assert_eq!(err.error_code(), "E_DECODE_MISSING");
}

#[test]
fn convert_tolerates_missing_annotation() {
    let cmd = decode("camera#convert", &Data::new()).expect("decode");
    assert!(matches!(cmd, Some(Command::Convert(None))));

    let d = data(json!({"annotation": "garbage"}));
    let cmd = decode("camera#convert", &d).expect("decode");
    assert!(matches!(cmd, Some(Command::Convert(None))));

    let d = data(json!({"annotation": [10.0, 20.0]}));
    let cmd = decode("camera#convert", &d).expect("decode");
    assert!(matches!(cmd, Some(Command::Convert(Some(p))) if p == LatLng::new(10.0, 20.0)));
}

#[test]
fn camera_move_requires_update() {
    let err = decode("camera#move", &Data::new()).unwrap_err();
    assert_eq!(err, DecodeError::Missing("cameraUpdate".into()));

    let d = data(json!({"cameraUpdate": ["zoomIn"]}));
    let cmd = decode("camera#move", &d).expect("decode");
    assert!(matches!(cmd, Some(Command::MoveCamera(CameraUpdate::ZoomIn))));
}

#[test]
fn map_update_requires_options() {
    let err = decode("map#update", &Data::new()).unwrap_err();
    assert_eq!(err, DecodeError::Missing("options".into()));

    let d = data(json!({"options": {"compassEnabled": false}}));
    let Some(Command::UpdateOptions(options)) = decode("map#update", &d).expect("decode") else {
        panic!("expected options");
    };
    assert_eq!(options.compass_enabled, Some(false));
}

#[test]
fn look_around_maps_poi_names() {
    let d = data(json!({
        "latitude": 37.0,
        "longitude": -122.0,
        "poi_filter": ["cafe", "evCharger", "volcano"],
    }));
    let Some(Command::LookAround { target, categories }) = decode("map#lookAround", &d).expect("decode") else {
        panic!("expected lookAround");
    };
    assert_eq!(target, LatLng::new(37.0, -122.0));
    assert_eq!(
        categories,
        vec![PoiCategory::Cafe, PoiCategory::EvCharger, PoiCategory::Other("volcano".into())]
    );
}

#[test]
fn look_around_requires_coordinate() {
    let d = data(json!({"latitude": 37.0}));
    let err = decode("map#isLookAroundAvailable", &d).unwrap_err();
    assert_eq!(err, DecodeError::Missing("longitude".into()));
}

#[test]
fn snapshot_flags_default_true() {
    let d = data(json!({"showBuildings": false}));
    let Some(Command::TakeSnapshot(opts)) = decode("map#takeSnapshot", &d).expect("decode") else {
        panic!("expected snapshot");
    };
    assert!(!opts.show_buildings);
    assert!(opts.show_points_of_interest);
    assert!(opts.show_annotations);
    assert!(opts.show_overlays);
}

#[test]
fn batch_type_error_propagates() {
    let d = data(json!({"circlesToAdd": "nope"}));
    let err = decode("circles#update", &d).unwrap_err();
    assert_eq!(err, DecodeError::Type { field: "circlesToAdd".into(), expected: "list" });
}
