use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

#[test]
fn lat_lng_value_shape() {
    assert_eq!(LatLng::new(10.0, 20.0).to_value(), json!([10.0, 20.0]));
}

#[test]
fn enclosing_empty_is_none() {
    assert!(LatLngBounds::enclosing(&[]).is_none());
}

#[test]
fn enclosing_spans_all_points() {
    let b = LatLngBounds::enclosing(&[LatLng::new(1.0, 5.0), LatLng::new(-2.0, 3.0), LatLng::new(0.5, 9.0)])
        .expect("bounds");
    assert!(approx_eq(b.southwest.latitude, -2.0));
    assert!(approx_eq(b.southwest.longitude, 3.0));
    assert!(approx_eq(b.northeast.latitude, 1.0));
    assert!(approx_eq(b.northeast.longitude, 9.0));
}

#[test]
fn contains_is_inclusive() {
    let b = LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0));
    assert!(b.contains(LatLng::new(0.0, 0.0)));
    assert!(b.contains(LatLng::new(0.5, 1.0)));
    assert!(!b.contains(LatLng::new(1.5, 0.5)));
}

#[test]
fn intersects_detects_overlap_and_gap() {
    let a = LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0));
    let b = LatLngBounds::new(LatLng::new(0.5, 0.5), LatLng::new(2.0, 2.0));
    let c = LatLngBounds::new(LatLng::new(3.0, 3.0), LatLng::new(4.0, 4.0));
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
    assert!(!a.intersects(&c));
}

#[test]
fn camera_position_value_shape() {
    let pos = CameraPosition { target: LatLng::new(1.0, 2.0), zoom: 3.0, heading: 90.0, pitch: 45.0 };
    let v = pos.to_value();
    assert_eq!(v["target"], json!([1.0, 2.0]));
    assert_eq!(v["zoom"], json!(3.0));
    assert_eq!(v["heading"], json!(90.0));
    assert_eq!(v["pitch"], json!(45.0));
}

#[test]
fn zoom_range_clamps() {
    let range = ZoomRange { min: 2.0, max: 18.0 };
    assert!(approx_eq(range.clamp(0.0), 2.0));
    assert!(approx_eq(range.clamp(25.0), 18.0));
    assert!(approx_eq(range.clamp(9.5), 9.5));
}
