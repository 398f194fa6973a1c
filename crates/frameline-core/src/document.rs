//! # Document Persistence
//!
//! Converts a timeline to and from the JSON [`Document`] model.
//!
//! Loading is forgiving: a frame that cannot be understood loads as an empty
//! frame. That covers unknown frame types, malformed items, extended frames
//! whose source is not an earlier keyframe, and keyframes whose tween does not
//! close on the next keyframe. Each repair is logged as a warning and the rest
//! of the document still loads.
//!
//! Item lists are stored in stacking order and each item's `z` is written
//! as-is.

use crate::animation::Easing;
use crate::config::TimelineConfig;
use crate::errors::Result;
use crate::frame::{FrameRecord, FrameSnapshot, FrameType, Tween};
use crate::layer::{BlendMode, Layer};
use crate::scene::{MemoryScene, SceneAdapter};
use crate::timeline::Timeline;
use crate::types::FrameNumber;
use frameline_data::{Document, FrameJson, LayerJson, VisualItem, DOCUMENT_VERSION};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

pub fn frame_to_json(snapshot: &FrameSnapshot) -> FrameJson {
    let items = snapshot
        .items
        .iter()
        .filter_map(|item| {
            serde_json::to_value(item)
                .map_err(|err| warn!(error = %err, "skipping unserializable item"))
                .ok()
        })
        .collect();
    FrameJson {
        kind: snapshot.frame_type.as_str().to_string(),
        source: snapshot.source,
        has_tween: snapshot.tween.is_some(),
        tween_end: snapshot.tween.map(|tween| tween.end),
        easing: snapshot.tween.map(|tween| tween.easing.as_str().to_string()),
        items,
    }
}

/// Parses a frame object. Anything malformed, a single item included,
/// rejects the whole frame with a reason.
pub fn frame_from_json(json: &FrameJson) -> std::result::Result<FrameSnapshot, String> {
    let frame_type = FrameType::parse(&json.kind)
        .ok_or_else(|| format!("unknown frame type '{}'", json.kind))?;
    match frame_type {
        FrameType::Empty => Ok(FrameSnapshot::empty()),
        FrameType::ExtendedFrame => {
            let source = json
                .source
                .ok_or_else(|| "extended frame without a source".to_string())?;
            Ok(FrameSnapshot {
                frame_type,
                source: Some(source),
                tween: None,
                items: Vec::new(),
            })
        }
        FrameType::Keyframe => {
            let items = json
                .items
                .iter()
                .enumerate()
                .map(|(index, value)| {
                    serde_json::from_value::<VisualItem>(value.clone())
                        .map_err(|err| format!("invalid item {index}: {err}"))
                })
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let tween = if json.has_tween {
                let end = json
                    .tween_end
                    .ok_or_else(|| "tween without an end frame".to_string())?;
                let easing = match json.easing.as_deref() {
                    None => Easing::default(),
                    Some(name) => name.parse().unwrap_or_else(|_| {
                        warn!(easing = name, "unknown easing, using linear");
                        Easing::Linear
                    }),
                };
                Some(Tween { end, easing })
            } else {
                None
            };

            Ok(FrameSnapshot {
                frame_type,
                source: None,
                tween,
                items,
            })
        }
    }
}

impl Timeline<MemoryScene> {
    pub fn from_document(doc: &Document, config: TimelineConfig) -> Self {
        Self::from_document_with_scene(doc, config, MemoryScene::new())
    }

    pub fn load_json(path: &Path, config: TimelineConfig) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let doc: Document = serde_json::from_str(&json)?;
        info!(path = %path.display(), layers = doc.layers.len(), "document loaded");
        Ok(Self::from_document(&doc, config))
    }
}

impl<S: SceneAdapter> Timeline<S> {
    /// Builds a timeline from `doc`. Canvas size, frame rate and length come
    /// from the document; the rest of `config` is kept. A document without
    /// layers gets one default layer.
    pub fn from_document_with_scene(doc: &Document, mut config: TimelineConfig, scene: S) -> Self {
        if doc.version > DOCUMENT_VERSION {
            warn!(version = doc.version, supported = DOCUMENT_VERSION, "document is newer than this reader");
        }
        config.total_frames = doc.total_frames.max(1);
        config.fps = doc.fps.max(1);
        config.canvas_width = doc.width;
        config.canvas_height = doc.height;

        let mut timeline = Self::bare(config, scene);
        for json in &doc.layers {
            timeline.load_layer(json);
        }
        if timeline.layers.is_empty() {
            warn!("document has no layers, adding a default one");
            timeline.push_default_layer();
        }
        timeline.load_frame();
        timeline
    }

    fn load_layer(&mut self, json: &LayerJson) {
        let id = self.allocate_layer_id();
        let mut layer = Layer::new(id, json.name.clone());
        layer.visible = json.visible;
        layer.locked = json.locked;
        layer.opacity = json.opacity.clamp(0.0, 1.0);
        layer.blend_mode = BlendMode::parse(&json.blend_mode).unwrap_or_else(|| {
            warn!(layer = %json.name, blend_mode = %json.blend_mode, "unknown blend mode, using normal");
            BlendMode::Normal
        });

        let mut parsed: BTreeMap<FrameNumber, FrameSnapshot> = BTreeMap::new();
        for (key, frame_json) in &json.frames {
            let frame = match key.parse::<FrameNumber>() {
                Ok(frame) if frame >= 1 => frame,
                _ => {
                    warn!(layer = %json.name, key = %key, "skipping frame with invalid number");
                    continue;
                }
            };
            match frame_from_json(frame_json) {
                Ok(snapshot) => {
                    parsed.insert(frame, snapshot);
                }
                Err(reason) => {
                    warn!(layer = %json.name, frame, reason = %reason, "invalid frame loaded as empty");
                }
            }
        }

        let mut tweens = Vec::new();
        for (&frame, snapshot) in &parsed {
            if snapshot.frame_type != FrameType::Keyframe {
                continue;
            }
            let ids = snapshot
                .items
                .iter()
                .map(|item| self.items.insert(item.clone()))
                .collect();
            layer.put_record(frame, FrameRecord::keyframe(ids));
            if let Some(tween) = snapshot.tween {
                tweens.push((frame, tween));
            }
        }

        // A keyframe whose tween does not close loads as empty, which can in
        // turn break the tween ending on it.
        loop {
            let broken: Vec<(FrameNumber, Tween)> = tweens
                .iter()
                .copied()
                .filter(|(frame, tween)| {
                    layer.has_keyframe(*frame) && !layer.tween_closes(*frame, tween.end)
                })
                .collect();
            if broken.is_empty() {
                break;
            }
            for (frame, tween) in broken {
                warn!(layer = %json.name, frame, end = tween.end, "tween does not close on the next keyframe; frame loaded as empty");
                for stale in layer.take_record(frame) {
                    self.items.remove(stale);
                }
            }
        }
        for (frame, tween) in tweens {
            layer.set_tween(frame, Some(tween));
        }

        for (&frame, snapshot) in &parsed {
            if snapshot.frame_type != FrameType::ExtendedFrame {
                continue;
            }
            match snapshot.source {
                Some(source) if source < frame && layer.has_keyframe(source) => {
                    layer.put_record(frame, FrameRecord::extended(source));
                }
                _ => warn!(
                    layer = %json.name,
                    frame,
                    source = ?snapshot.source,
                    "extended frame does not follow its source keyframe; frame loaded as empty"
                ),
            }
        }
        // Frame 1 always holds a keyframe.
        if !layer.has_keyframe(1) {
            layer.put_record(1, FrameRecord::keyframe(Vec::new()));
        }
        self.layers.push(layer);
    }

    /// Serializes the whole timeline.
    pub fn to_document(&self) -> Document {
        let layers = self
            .layers
            .iter()
            .enumerate()
            .map(|(index, layer)| LayerJson {
                name: layer.name().to_string(),
                visible: layer.is_visible(),
                locked: layer.is_locked(),
                opacity: layer.opacity(),
                blend_mode: layer.blend_mode().as_str().to_string(),
                frames: layer
                    .records()
                    .map(|(frame, _)| (frame.to_string(), frame_to_json(&self.snapshot(index, frame))))
                    .collect(),
            })
            .collect();
        Document {
            version: DOCUMENT_VERSION,
            width: self.config.canvas_width,
            height: self.config.canvas_height,
            fps: self.config.fps,
            total_frames: self.total_frames,
            layers,
        }
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.to_document())?;
        std::fs::write(path, json)?;
        info!(path = %path.display(), layers = self.layers.len(), "document saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frameline_data::Document;
    use glam::Vec2;
    use serde_json::json;

    fn config() -> TimelineConfig {
        TimelineConfig::default()
    }

    #[test]
    fn document_round_trip_preserves_structure() {
        let mut tl = Timeline::new(config());
        tl.add_item(VisualItem::rectangle(10.0, 10.0)).unwrap();
        tl.add_item(VisualItem::ellipse(4.0, 4.0).with_position(Vec2::new(3.0, 3.0)))
            .unwrap();
        tl.create_keyframe(12).unwrap();
        tl.apply_tweening(1, 12, Easing::EaseIn).unwrap();
        tl.create_extended_frame(15).unwrap();
        tl.add_layer(Some("Ink"));
        tl.set_layer_blend_mode(1, BlendMode::Screen).unwrap();

        let doc = tl.to_document();
        let back = Timeline::from_document(&doc, config());
        assert_eq!(back.to_document(), doc);
        assert_eq!(back.layer(1).unwrap().blend_mode(), BlendMode::Screen);
        for frame in [1, 5, 12, 15] {
            assert_eq!(
                back.export_frame_data(0, frame).unwrap(),
                tl.export_frame_data(0, frame).unwrap(),
                "frame {frame}"
            );
        }
    }

    #[test]
    fn items_keep_their_order_and_z() {
        let mut tl = Timeline::new(config());
        let back = tl.add_item(VisualItem::rectangle(1.0, 1.0)).unwrap();
        tl.add_item(VisualItem::ellipse(1.0, 1.0)).unwrap();
        tl.edit_item(back, |item| item.z = 7.0).unwrap();

        let doc = tl.to_document();
        let items = &doc.layers[0].frames["1"].items;
        assert_eq!(items[0]["type"], "rectangle");
        assert_eq!(items[0]["z"], 7.0);
        assert_eq!(items[1]["type"], "ellipse");
        assert_eq!(items[1]["z"], 0.0);

        let loaded = Timeline::from_document(&doc, config());
        assert_eq!(
            loaded.export_frame_data(0, 1).unwrap(),
            tl.export_frame_data(0, 1).unwrap()
        );
    }

    #[test]
    fn invalid_frames_degrade_to_empty() {
        let doc: Document = serde_json::from_value(json!({
            "width": 640,
            "height": 480,
            "totalFrames": 10,
            "layers": [{
                "name": "Broken",
                "frames": {
                    "1": {"type": "keyframe", "items": [{"type": "rectangle", "width": 2, "height": 2}]},
                    "2": {"type": "hologram"},
                    "3": {"type": "extended"},
                    "4": {"type": "extended", "source": 9},
                    "5": {"type": "keyframe", "items": [
                        {"type": "rectangle", "width": 2, "height": 2},
                        {"type": "bogus"}
                    ]},
                    "6": {"type": "extended", "source": 5},
                    "7": {"type": "keyframe", "hasTween": true, "tweenEnd": 9,
                          "items": [{"type": "ellipse", "radius_x": 1, "radius_y": 1}]},
                    "x": {"type": "empty"}
                }
            }]
        }))
        .unwrap();
        let tl = Timeline::from_document(&doc, config());
        let layer = tl.layer(0).unwrap();
        assert_eq!(layer.frame_type(1), FrameType::Keyframe);
        assert_eq!(layer.persisted_items(1).len(), 1);
        for frame in 2..=7 {
            assert_eq!(layer.frame_type(frame), FrameType::Empty, "frame {frame}");
        }
        assert_eq!(tl.items().len(), 1);
        assert_eq!(tl.config().canvas_width, 640);
        assert_eq!(tl.total_frames(), 10);
    }

    #[test]
    fn broken_tween_empties_the_tween_ending_on_it() {
        let rect = json!({"type": "rectangle", "width": 2, "height": 2});
        let doc: Document = serde_json::from_value(json!({
            "width": 100,
            "height": 100,
            "totalFrames": 12,
            "layers": [{
                "name": "Chain",
                "frames": {
                    "1": {"type": "keyframe", "items": [rect]},
                    "2": {"type": "keyframe", "hasTween": true, "tweenEnd": 4, "items": [rect]},
                    "3": {"type": "extended", "source": 2},
                    "4": {"type": "keyframe", "hasTween": true, "tweenEnd": 8, "items": [rect]},
                    "6": {"type": "keyframe", "items": [rect]},
                    "8": {"type": "keyframe", "hasTween": true, "tweenEnd": 10, "items": [rect]},
                    "10": {"type": "keyframe", "items": [rect]}
                }
            }]
        }))
        .unwrap();
        let tl = Timeline::from_document(&doc, config());
        let layer = tl.layer(0).unwrap();
        assert_eq!(layer.frame_type(4), FrameType::Empty);
        assert_eq!(layer.frame_type(2), FrameType::Empty);
        assert_eq!(layer.frame_type(3), FrameType::Empty);
        assert!(layer.has_keyframe(6));
        assert_eq!(layer.record(8).unwrap().tween().map(|t| t.end), Some(10));
        assert_eq!(tl.items().len(), 4);
    }

    #[test]
    fn empty_document_gets_a_default_layer() {
        let doc: Document =
            serde_json::from_value(json!({"width": 100, "height": 100})).unwrap();
        let tl = Timeline::from_document(&doc, config());
        assert_eq!(tl.layer_count(), 1);
        assert_eq!(tl.total_frames(), 1);
        assert!(tl.has_keyframe(1));
    }

    #[test]
    fn frame_json_round_trips_tween_metadata() {
        let snapshot = FrameSnapshot {
            frame_type: FrameType::Keyframe,
            source: None,
            tween: Some(Tween {
                end: 8,
                easing: Easing::EaseInOut,
            }),
            items: vec![VisualItem::rectangle(1.0, 2.0)],
        };
        let json = frame_to_json(&snapshot);
        assert!(json.has_tween);
        assert_eq!(json.easing.as_deref(), Some("ease-in-out"));
        assert_eq!(frame_from_json(&json).unwrap(), snapshot);
    }
}
