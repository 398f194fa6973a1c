//! Persistence and Playback Tests
//!
//! Saving and loading documents on disk, undo snapshots and the playback
//! driver working against a real timeline.

use frameline_core::{
    BlendMode, Easing, FrameType, Playback, Timeline, TimelineConfig, TimelineError,
};
use frameline_data::{Document, VisualItem};
use glam::Vec2;
use std::time::{Duration, Instant};
use tempfile::tempdir;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn animated_timeline() -> Timeline {
    init_tracing();
    let mut tl = Timeline::new(TimelineConfig {
        total_frames: 30,
        fps: 24,
        ..TimelineConfig::default()
    });
    tl.add_item(VisualItem::rectangle(40.0, 20.0)).unwrap();
    tl.create_keyframe(10).unwrap();
    let id = tl.current_items()[0].0;
    tl.edit_item(id, |item| {
        item.transform.position = Vec2::new(200.0, 50.0);
        item.transform.rotation = 90.0;
    })
    .unwrap();
    tl.apply_tweening(1, 10, Easing::EaseInOut).unwrap();
    tl.create_extended_frame(14).unwrap();

    tl.add_layer(Some("Overlay"));
    tl.add_item(VisualItem::ellipse(5.0, 5.0)).unwrap();
    tl.set_layer_opacity(1, 0.5).unwrap();
    tl.set_layer_blend_mode(1, BlendMode::Overlay).unwrap();
    tl.set_layer_locked(1, true).unwrap();
    tl
}

#[test]
fn saved_document_loads_back_identically() {
    let tl = animated_timeline();
    let dir = tempdir().unwrap();
    let path = dir.path().join("scene.json");
    tl.save_json(&path).unwrap();

    let loaded = Timeline::load_json(&path, TimelineConfig::default()).unwrap();
    assert_eq!(loaded.to_document(), tl.to_document());
    assert_eq!(loaded.total_frames(), 30);
    assert_eq!(loaded.config().fps, 24);

    let overlay = loaded.layer(1).unwrap();
    assert_eq!(overlay.name(), "Overlay");
    assert!(overlay.is_locked());
    assert_eq!(overlay.blend_mode(), BlendMode::Overlay);
    assert_eq!(overlay.opacity(), 0.5);

    let base = loaded.layer(0).unwrap();
    assert_eq!(base.frame_type(5), FrameType::ExtendedFrame);
    assert_eq!(base.source_keyframe(14), Some(10));
    assert_eq!(
        base.record(1).unwrap().tween().map(|t| (t.end, t.easing)),
        Some((10, Easing::EaseInOut))
    );
}

#[test]
fn saved_json_uses_the_documented_layout() {
    let tl = animated_timeline();
    let dir = tempdir().unwrap();
    let path = dir.path().join("scene.json");
    tl.save_json(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["totalFrames"], 30);
    assert_eq!(raw["width"], 550);
    let frames = &raw["layers"][0]["frames"];
    assert_eq!(frames["1"]["type"], "keyframe");
    assert_eq!(frames["1"]["hasTween"], true);
    assert_eq!(frames["1"]["tweenEnd"], 10);
    assert_eq!(frames["1"]["easing"], "ease-in-out");
    assert_eq!(frames["5"]["type"], "extended");
    assert_eq!(frames["5"]["source"], 1);
    assert_eq!(frames["10"]["items"][0]["type"], "rectangle");
    assert_eq!(raw["layers"][1]["blendMode"], "overlay");
}

#[test]
fn loading_a_missing_file_is_an_io_error() {
    init_tracing();
    let dir = tempdir().unwrap();
    let result = Timeline::load_json(&dir.path().join("nope.json"), TimelineConfig::default());
    match result {
        Err(TimelineError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected an i/o error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn loaded_tween_interpolates_like_the_original() {
    let mut tl = animated_timeline();
    let doc: Document = tl.to_document();
    let mut loaded = Timeline::from_document(&doc, TimelineConfig::default());

    tl.set_current_frame(4);
    loaded.set_current_frame(4);
    let a = tl.scene().live_entries()[0].1.item.clone();
    let b = loaded.scene().live_entries()[0].1.item.clone();
    assert_eq!(a, b);
    assert!(a.transform.rotation > 0.0 && a.transform.rotation < 90.0);
}

#[test]
fn undo_restores_a_frame_by_value() {
    let mut tl = animated_timeline();
    tl.set_current_layer(0).unwrap();
    tl.set_current_frame(12);
    let before = tl.export_frame_data(0, 12).unwrap();
    assert_eq!(before.frame_type, FrameType::ExtendedFrame);

    let id = tl.current_items()[0].0;
    tl.remove_item(id).unwrap();
    assert_eq!(tl.frame_type(12), FrameType::Keyframe);
    assert!(tl.current_items().is_empty());

    tl.import_frame_data(0, 12, &before).unwrap();
    assert_eq!(tl.frame_type(12), FrameType::ExtendedFrame);
    assert_eq!(tl.current_items().len(), 1);
    assert_eq!(tl.current_items()[0].0, id);
}

#[test]
fn playback_loops_over_the_timeline() {
    let mut tl = animated_timeline();
    tl.set_current_frame(29);
    let mut playback = Playback::for_timeline(&tl);
    assert_eq!(playback.interval(), Duration::from_secs_f64(1.0 / 24.0));

    let t0 = Instant::now();
    playback.start(t0);
    let mut now = t0;
    let mut seen = Vec::new();
    for _ in 0..3 {
        now += playback.interval();
        assert!(playback.poll(now, &mut tl));
        seen.push(tl.current_frame());
    }
    assert_eq!(seen, vec![30, 1, 2]);
    playback.stop();
    assert!(!playback.poll(now + Duration::from_secs(1), &mut tl));
}
