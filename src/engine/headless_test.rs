use image::Rgba;
use tokio::sync::mpsc;

use super::*;
use super::headless::{clip_segment, plot_path};
use crate::camera::{CameraInstruction, CameraUpdate, interpret};
use crate::gateway::scene::SceneProvider;
use crate::gateway::snapshot::{Composition, OverlayShape, RasterRequest, Rasterizer, composite};
use crate::overlay::{Circle, OverlayKind, Polyline};

fn engine() -> HeadlessEngine {
    HeadlessEngine::new(Viewport { width: 256.0, height: 256.0, scale: 1.0 })
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn zoom_zero_viewport_spans_the_globe() {
    let e = engine();
    let region = e.visible_region();
    assert!(approx(region.southwest.longitude, -180.0));
    assert!(approx(region.northeast.longitude, 180.0));
}

#[test]
fn convert_center_is_view_center() {
    let mut e = engine();
    e.set_center(LatLng::new(10.0, 20.0), Some(5.0), None, None, false);
    let p = e.convert_to_point(LatLng::new(10.0, 20.0));
    assert!(approx(p.x, 128.0));
    assert!(approx(p.y, 128.0));
}

#[test]
fn set_bounds_centers_and_fits() {
    let mut e = engine();
    let bounds = LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0));
    e.set_bounds(bounds, 8.0, false);

    let camera = e.camera_position();
    assert!(approx(camera.target.latitude, 0.5));
    assert!(approx(camera.target.longitude, 0.5));
    let region = e.visible_region();
    assert!(region.contains(bounds.southwest));
    assert!(region.contains(bounds.northeast));
}

#[test]
fn camera_changes_raise_will_and_did_signals() {
    let mut e = engine();
    let (tx, mut rx) = mpsc::channel(8);
    e.bind_events(tx);

    e.set_zoom(3.0, true);
    assert_eq!(rx.try_recv().ok(), Some(EngineEvent::RegionWillChange));
    assert_eq!(rx.try_recv().ok(), Some(EngineEvent::RegionDidChange));
    assert!(rx.try_recv().is_err());
}

#[test]
fn zoom_instructions_clamp_to_range() {
    let mut e = engine();
    e.apply_options(&MapOptions { min_max_zoom: Some((Some(2.0), Some(6.0))), ..MapOptions::default() });

    interpret(&CameraUpdate::ZoomTo(30.0), false).apply(&mut e);
    assert!(approx(e.camera_position().zoom, 6.0));

    interpret(&CameraUpdate::ZoomBy(-10.0), true).apply(&mut e);
    assert!(approx(e.camera_position().zoom, 2.0));

    interpret(&CameraUpdate::ZoomIn, true).apply(&mut e);
    assert!(approx(e.camera_position().zoom, 3.0));
}

#[test]
fn noop_leaves_camera_alone() {
    let mut e = engine();
    let before = e.camera_position();
    CameraInstruction::Noop.apply(&mut e);
    assert_eq!(e.camera_position(), before);
}

#[test]
fn layers_track_overlay_calls() {
    let mut e = engine();
    let line = Polyline::new("p1", vec![LatLng::new(0.0, 0.0)]);
    OverlayLayer::<Polyline>::insert(&mut e, &line);
    assert_eq!(e.layer_ids(OverlayKind::Polyline), vec!["p1".to_string()]);
    assert_eq!(e.layer_hint(OverlayKind::Polyline, "p1").map(|h| h.line_width), Some(10.0));

    OverlayLayer::<Polyline>::remove(&mut e, "p1");
    assert!(e.layer_ids(OverlayKind::Polyline).is_empty());
}

#[test]
fn removing_selected_annotation_clears_selection() {
    let mut e = engine();
    let a = Annotation::new("a1", LatLng::new(0.0, 0.0));
    OverlayLayer::<Annotation>::insert(&mut e, &a);
    e.select_annotation("a1");
    assert_eq!(e.selected_annotation(), Some("a1"));

    OverlayLayer::<Annotation>::remove(&mut e, "a1");
    assert_eq!(e.selected_annotation(), None);
}

#[tokio::test]
async fn rasterizer_and_composite_produce_png() {
    let e = engine();
    let rasterizer = HeadlessRasterizer::default();
    let request = RasterRequest {
        region: e.visible_region(),
        viewport: e.viewport(),
        show_buildings: false,
        show_points_of_interest: true,
    };
    let tile = rasterizer.rasterize(request).await.expect("raster");
    assert_eq!(tile.image.dimensions(), (256, 256));

    let layers = Composition {
        annotations: vec![Annotation::new("a1", LatLng::new(0.0, 0.0))],
        shapes: vec![OverlayShape::Circle(Circle::new("c1", LatLng::new(0.0, 0.0), 500_000.0))],
    };
    let png = composite(&tile, &layers, &rasterizer).expect("encode");
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");

    let decoded = image::load_from_memory(&png).expect("decode").to_rgba8();
    // Sprite sits above the anchor point at the view center.
    assert_eq!(decoded.get_pixel(125, 121), &Rgba([220, 40, 40, 255]));
    assert_eq!(decoded.get_pixel(5, 5), &rasterizer.land);
}

#[test]
fn segments_are_clipped_to_the_image() {
    let clipped = clip_segment((-1.0e9, 10.0), (1.0e9, 10.0), (256.0, 256.0)).expect("crosses the image");
    assert!(approx(clipped.0.0, 0.0) && approx(clipped.1.0, 256.0));
    assert!(approx(clipped.0.1, 10.0) && approx(clipped.1.1, 10.0));

    assert!(clip_segment((-10.0, -10.0), (-5.0, 300.0), (256.0, 256.0)).is_none());
    assert!(clip_segment((10.0, 300.0), (200.0, 300.0), (256.0, 256.0)).is_none());
}

#[test]
fn far_off_image_path_draws_only_visible_pixels() {
    let mut img = image::RgbaImage::new(8, 8);
    let red = Rgba([255, 0, 0, 255]);
    plot_path(&mut img, &[(-1.0e12, 4.0), (1.0e12, 4.0)], red, false);

    assert!((0..8).all(|x| *img.get_pixel(x, 4) == red));
    assert_eq!(img.pixels().filter(|p| **p == red).count(), 8);
}

#[tokio::test]
async fn headless_scenes_respect_coverage() {
    let scenes = HeadlessScenes {
        coverage: Some(LatLngBounds::new(LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0))),
    };
    assert!(scenes.lookup(LatLng::new(0.5, 0.5)).await.expect("lookup").is_some());
    assert!(scenes.lookup(LatLng::new(5.0, 5.0)).await.expect("lookup").is_none());
}
