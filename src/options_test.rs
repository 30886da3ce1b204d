use serde_json::json;

use super::*;
use crate::frame::Data;

fn decode(value: serde_json::Value) -> Result<MapOptions, DecodeError> {
    let data: Data = serde_json::from_value(value).expect("object");
    MapOptions::decode(&Args::top(&data))
}

#[test]
fn partial_update_touches_named_fields_only() {
    let mut settings = MapSettings::default();
    settings.apply(&decode(json!({"compassEnabled": false, "mapType": 2})).expect("decode"));

    assert!(!settings.compass_enabled);
    assert_eq!(settings.map_type, MapType::Hybrid);
    assert!(settings.scroll_gestures_enabled);
    assert_eq!(settings.zoom_range, ZoomRange::default());
}

#[test]
fn zoom_preference_null_bound_is_unbounded() {
    let mut settings = MapSettings::default();
    settings.apply(&decode(json!({"minMaxZoomPreference": [3.0, null]})).expect("decode"));
    assert_eq!(settings.zoom_range, ZoomRange { min: 3.0, max: 21.0 });
    assert_eq!(settings.zoom_levels_value(), json!([3.0, 21.0]));
}

#[test]
fn inverted_zoom_preference_is_ignored() {
    let mut settings = MapSettings::default();
    settings.apply(&decode(json!({"minMaxZoomPreference": [10.0, 2.0]})).expect("decode"));
    assert_eq!(settings.zoom_range, ZoomRange::default());
}

#[test]
fn padding_needs_four_numbers() {
    let options = decode(json!({"padding": [1.0, 2.0, 3.0, 4.0]})).expect("decode");
    assert_eq!(options.padding, Some(Padding { top: 1.0, left: 2.0, bottom: 3.0, right: 4.0 }));

    let err = decode(json!({"padding": [1.0]})).unwrap_err();
    assert!(matches!(err, DecodeError::Type { ref field, .. } if field == "padding"));
}

#[test]
fn tracking_mode_indices() {
    let options = decode(json!({"trackingMode": 2})).expect("decode");
    assert_eq!(options.tracking_mode, Some(TrackingMode::FollowWithHeading));
}
