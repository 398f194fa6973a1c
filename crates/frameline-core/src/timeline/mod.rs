//! # Timeline Engine
//!
//! Owns layers, the item arena and the playhead, and keeps the scene adapter
//! showing exactly the resolved content of the current frame.
//!
//! ## Responsibilities
//! - **Navigation**: `set_current_frame` clamps and refreshes the display.
//! - **Display** (`display.rs`): resolve each visible layer at the playhead,
//!   interpolate tween interiors, overlay onion-skin neighbours.
//! - **Layers** (`layers.rs`): add, remove, reorder and property setters.
//! - **Editing** (`editing.rs`): keyframe/extended/tween structure, the
//!   convert-on-edit rule for extended frames, item add/edit/remove.
//! - **History** (`history.rs`): by-value frame snapshots for undo stacks.
//!
//! Every mutating entry point finishes by reloading the current frame, so the
//! scene never holds an entry for a handle that no longer resolves.

mod display;
mod editing;
mod history;
mod layers;

pub use editing::CloneMap;

use crate::config::TimelineConfig;
use crate::errors::{Result, TimelineError};
use crate::events::{EventHub, TimelineEvent};
use crate::frame::FrameType;
use crate::layer::Layer;
use crate::onion::OnionSkin;
use crate::scene::{DisplayKey, MemoryScene, SceneAdapter};
use crate::store::ItemStore;
use crate::types::{FrameNumber, ItemId, LayerId};
use crossbeam_channel::Receiver;
use frameline_data::VisualItem;
use tracing::{debug, info};

pub struct Timeline<S: SceneAdapter = MemoryScene> {
    pub(crate) config: TimelineConfig,
    pub(crate) items: ItemStore,
    pub(crate) layers: Vec<Layer>,
    pub(crate) current_frame: FrameNumber,
    pub(crate) total_frames: FrameNumber,
    pub(crate) current_layer: usize,
    pub(crate) onion: OnionSkin,
    pub(crate) scene: S,
    /// Keys currently handed to the scene adapter.
    pub(crate) displayed: Vec<DisplayKey>,
    pub(crate) events: EventHub,
    next_layer_id: u64,
}

impl Timeline<MemoryScene> {
    pub fn new(config: TimelineConfig) -> Self {
        Self::with_scene(config, MemoryScene::new())
    }
}

impl<S: SceneAdapter> Timeline<S> {
    /// Creates a timeline with one empty layer, positioned on frame 1.
    pub fn with_scene(config: TimelineConfig, scene: S) -> Self {
        let mut timeline = Self::bare(config, scene);
        timeline.push_default_layer();
        timeline.load_frame();
        timeline
    }

    /// No layers, nothing displayed. Callers must add at least one layer.
    pub(crate) fn bare(config: TimelineConfig, scene: S) -> Self {
        let total_frames = config.total_frames.max(1);
        let mut onion = OnionSkin::from(&config.onion_skin);
        onion.clamp_window(total_frames);
        info!(total_frames, fps = config.fps, "timeline created");
        Self {
            config,
            items: ItemStore::new(),
            layers: Vec::new(),
            current_frame: 1,
            total_frames,
            current_layer: 0,
            onion,
            scene,
            displayed: Vec::new(),
            events: EventHub::new(),
            next_layer_id: 1,
        }
    }

    pub(crate) fn allocate_layer_id(&mut self) -> LayerId {
        let id = LayerId(self.next_layer_id);
        self.next_layer_id += 1;
        id
    }

    pub(crate) fn push_default_layer(&mut self) -> usize {
        let id = self.allocate_layer_id();
        let name = format!("Layer {}", self.layers.len() + 1);
        self.layers.push(Layer::new(id, name));
        self.layers.len() - 1
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    /// Receives every [`TimelineEvent`] emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<TimelineEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&mut self, event: TimelineEvent) {
        self.events.emit(event);
    }

    pub fn current_frame(&self) -> FrameNumber {
        self.current_frame
    }

    pub fn total_frames(&self) -> FrameNumber {
        self.total_frames
    }

    /// Moves the playhead, clamped into `1..=total_frames`, and redraws.
    /// Returns the frame actually shown.
    pub fn set_current_frame(&mut self, frame: FrameNumber) -> FrameNumber {
        let frame = frame.clamp(1, self.total_frames);
        if frame != self.current_frame {
            debug!(from = self.current_frame, to = frame, "playhead moved");
        }
        self.current_frame = frame;
        self.load_frame();
        self.emit(TimelineEvent::FrameChanged { frame });
        frame
    }

    /// Changes the timeline length. Records past the new end are kept but
    /// unreachable until the timeline grows again.
    pub fn set_total_frames(&mut self, total: FrameNumber) -> Result<()> {
        if total == 0 {
            return Err(TimelineError::EmptyTimeline);
        }
        info!(from = self.total_frames, to = total, "total frames changed");
        self.total_frames = total;
        self.config.total_frames = total;
        self.onion.clamp_window(total);
        self.emit(TimelineEvent::TotalFramesChanged { total });
        if self.current_frame > total {
            self.set_current_frame(total);
        } else {
            self.load_frame();
        }
        Ok(())
    }

    pub(crate) fn check_frame(&self, frame: FrameNumber) -> Result<()> {
        if frame == 0 || frame > self.total_frames {
            return Err(TimelineError::FrameOutOfRange {
                frame,
                total: self.total_frames,
            });
        }
        Ok(())
    }

    pub(crate) fn check_layer(&self, index: usize) -> Result<()> {
        if index >= self.layers.len() {
            return Err(TimelineError::LayerOutOfRange {
                index,
                count: self.layers.len(),
            });
        }
        Ok(())
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn layer_index(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }

    pub fn current_layer_index(&self) -> usize {
        self.current_layer
    }

    pub fn current_layer(&self) -> &Layer {
        &self.layers[self.current_layer]
    }

    pub fn item(&self, id: ItemId) -> Option<&VisualItem> {
        self.items.get(id)
    }

    pub fn items(&self) -> &ItemStore {
        &self.items
    }

    /// Keys currently shown by the scene adapter.
    pub fn displayed_items(&self) -> &[DisplayKey] {
        &self.displayed
    }

    pub fn frame_type(&self, frame: FrameNumber) -> FrameType {
        self.current_layer().frame_type(frame)
    }

    pub fn has_keyframe(&self, frame: FrameNumber) -> bool {
        self.current_layer().has_keyframe(frame)
    }

    pub fn has_content(&self, frame: FrameNumber) -> bool {
        self.current_layer().has_content(frame)
    }

    /// Keyframe an extended frame of the current layer repeats.
    pub fn source_keyframe(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.current_layer().source_keyframe(frame)
    }

    pub fn last_keyframe_before(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.current_layer().last_keyframe_before(frame)
    }

    pub fn next_keyframe_after(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.current_layer().next_keyframe_after(frame)
    }

    /// Persisted items of the current layer at the playhead, in stacking order.
    pub fn current_items(&self) -> Vec<(ItemId, &VisualItem)> {
        self.current_layer()
            .persisted_items(self.current_frame)
            .iter()
            .filter_map(|id| self.items.get(*id).map(|item| (*id, item)))
            .collect()
    }

    /// Every (layer, keyframe) whose record holds `id`.
    pub fn owners_of(&self, id: ItemId) -> Vec<(LayerId, FrameNumber)> {
        self.layers
            .iter()
            .flat_map(|layer| {
                layer
                    .records()
                    .filter(move |(_, record)| record.items().contains(&id))
                    .map(move |(frame, _)| (layer.id(), frame))
            })
            .collect()
    }

    pub fn onion_skin(&self) -> &OnionSkin {
        &self.onion
    }

    pub fn set_onion_skin_enabled(&mut self, enabled: bool) {
        self.onion.enabled = enabled;
        self.load_frame();
    }

    pub fn set_onion_skin_range(&mut self, before: u32, after: u32) {
        self.onion.before = before;
        self.onion.after = after;
        self.onion.clamp_window(self.total_frames);
        self.load_frame();
    }

    pub fn set_onion_skin_opacity(&mut self, base_opacity: f32) {
        self.onion.base_opacity = base_opacity.clamp(0.0, 1.0);
        self.load_frame();
    }

    /// Detaches everything from the scene and frees in-flight in-betweens.
    pub fn close(&mut self) {
        self.clear_display();
    }
}

impl<S: SceneAdapter> Drop for Timeline<S> {
    fn drop(&mut self) {
        self.close();
    }
}
