//! # Layers
//!
//! A layer owns every piece of per-layer state the timeline tracks: display
//! properties, the frame-number → [`FrameRecord`] map, and the set of item
//! handles its keyframes own. Keyframe numbers are the keyframe entries of the
//! ordered map, so there is no separate index to keep in sync when layers are
//! added, removed or reordered.

use crate::frame::{FrameRecord, FrameType, RecordKind, Tween};
use crate::types::{FrameNumber, ItemId, LayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    Add,
}

impl BlendMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Darken => "darken",
            BlendMode::Lighten => "lighten",
            BlendMode::Add => "add",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "normal" => Some(BlendMode::Normal),
            "multiply" => Some(BlendMode::Multiply),
            "screen" => Some(BlendMode::Screen),
            "overlay" => Some(BlendMode::Overlay),
            "darken" => Some(BlendMode::Darken),
            "lighten" => Some(BlendMode::Lighten),
            "add" | "plus" => Some(BlendMode::Add),
            _ => None,
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Layer {
    id: LayerId,
    pub(crate) name: String,
    pub(crate) visible: bool,
    pub(crate) locked: bool,
    pub(crate) opacity: f32,
    pub(crate) blend_mode: BlendMode,
    pub(crate) frames: BTreeMap<FrameNumber, FrameRecord>,
    /// Every handle owned by one of this layer's keyframes.
    pub(crate) owned: HashSet<ItemId>,
}

impl Layer {
    /// New layer with an empty keyframe at frame 1.
    pub(crate) fn new(id: LayerId, name: impl Into<String>) -> Self {
        let mut frames = BTreeMap::new();
        frames.insert(1, FrameRecord::keyframe(Vec::new()));
        Self {
            id,
            name: name.into(),
            visible: true,
            locked: false,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            frames,
            owned: HashSet::new(),
        }
    }

    pub fn id(&self) -> LayerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn record(&self, frame: FrameNumber) -> Option<&FrameRecord> {
        self.frames.get(&frame)
    }

    /// All records in frame order.
    pub fn records(&self) -> impl Iterator<Item = (FrameNumber, &FrameRecord)> + '_ {
        self.frames.iter().map(|(frame, record)| (*frame, record))
    }

    pub fn keyframes(&self) -> impl Iterator<Item = FrameNumber> + '_ {
        self.frames
            .iter()
            .filter(|(_, record)| record.is_keyframe())
            .map(|(frame, _)| *frame)
    }

    pub fn frame_type(&self, frame: FrameNumber) -> FrameType {
        self.frames
            .get(&frame)
            .map_or(FrameType::Empty, FrameRecord::frame_type)
    }

    pub fn has_keyframe(&self, frame: FrameNumber) -> bool {
        self.frames.get(&frame).is_some_and(FrameRecord::is_keyframe)
    }

    /// True when the frame holds a keyframe or extended-frame record.
    pub fn has_content(&self, frame: FrameNumber) -> bool {
        self.frames.contains_key(&frame)
    }

    pub fn source_keyframe(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.frames.get(&frame).and_then(FrameRecord::source_keyframe)
    }

    /// Nearest keyframe strictly before `frame`.
    pub fn last_keyframe_before(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.frames
            .range(..frame)
            .rev()
            .find(|(_, record)| record.is_keyframe())
            .map(|(frame, _)| *frame)
    }

    /// Nearest keyframe strictly after `frame`.
    pub fn next_keyframe_after(&self, frame: FrameNumber) -> Option<FrameNumber> {
        self.frames
            .range(frame.saturating_add(1)..)
            .find(|(_, record)| record.is_keyframe())
            .map(|(frame, _)| *frame)
    }

    /// Highest frame number holding any record.
    pub fn last_frame(&self) -> FrameNumber {
        self.frames.keys().next_back().copied().unwrap_or(1)
    }

    /// The tween whose interior (start and end excluded) contains `frame`.
    pub fn tween_covering(&self, frame: FrameNumber) -> Option<(FrameNumber, Tween)> {
        if self.has_keyframe(frame) {
            return None;
        }
        let start = self.last_keyframe_before(frame)?;
        let tween = *self.frames.get(&start)?.tween()?;
        (frame < tween.end).then_some((start, tween))
    }

    /// Whether a tween from `start` to `end` is well formed: `end` must be
    /// the first keyframe after `start`.
    pub fn tween_closes(&self, start: FrameNumber, end: FrameNumber) -> bool {
        end > start && self.next_keyframe_after(start) == Some(end)
    }

    /// Persisted handles shown at `frame`: the keyframe's own items, or the
    /// source keyframe's items for an extended frame. Tween interiors resolve to
    /// the start keyframe's items here; interpolation happens at display time.
    pub fn persisted_items(&self, frame: FrameNumber) -> &[ItemId] {
        match self.frames.get(&frame).map(|record| &record.kind) {
            Some(RecordKind::Keyframe { items, .. }) => items.as_slice(),
            Some(RecordKind::Extended { source }) => self
                .frames
                .get(source)
                .map(FrameRecord::items)
                .unwrap_or(&[]),
            None => &[],
        }
    }

    /// Frame number whose record owns the items displayed at `frame`.
    pub fn owner_frame(&self, frame: FrameNumber) -> Option<FrameNumber> {
        match self.frames.get(&frame).map(|record| &record.kind) {
            Some(RecordKind::Keyframe { .. }) => Some(frame),
            Some(RecordKind::Extended { source }) => Some(*source),
            None => None,
        }
    }

    pub fn owns(&self, id: ItemId) -> bool {
        self.owned.contains(&id)
    }

    pub fn owned_count(&self) -> usize {
        self.owned.len()
    }

    /// Pushes a handle onto a keyframe's item list. Returns false when `frame`
    /// is not a keyframe.
    pub(crate) fn push_item(&mut self, frame: FrameNumber, id: ItemId) -> bool {
        match self.frames.get_mut(&frame).and_then(FrameRecord::items_mut) {
            Some(items) => {
                items.push(id);
                self.owned.insert(id);
                true
            }
            None => false,
        }
    }

    /// Installs a record, releasing ownership of whatever it replaced. The
    /// replaced handles are returned for the caller to free.
    pub(crate) fn put_record(&mut self, frame: FrameNumber, record: FrameRecord) -> Vec<ItemId> {
        self.owned.extend(record.items().iter().copied());
        let replaced = self.frames.insert(frame, record);
        self.release(replaced)
    }

    /// Sets the tween of the keyframe at `frame`. Returns false when there is
    /// no keyframe there.
    pub(crate) fn set_tween(&mut self, frame: FrameNumber, tween: Option<Tween>) -> bool {
        self.frames
            .get_mut(&frame)
            .is_some_and(|record| record.set_tween(tween))
    }

    pub(crate) fn take_record(&mut self, frame: FrameNumber) -> Vec<ItemId> {
        let removed = self.frames.remove(&frame);
        self.release(removed)
    }

    fn release(&mut self, record: Option<FrameRecord>) -> Vec<ItemId> {
        let Some(mut record) = record else {
            return Vec::new();
        };
        let items = record.take_items();
        for id in &items {
            self.owned.remove(id);
        }
        items
    }

    /// Removes one handle from the keyframe at `frame`.
    pub(crate) fn detach_item(&mut self, frame: FrameNumber, id: ItemId) -> bool {
        let Some(items) = self.frames.get_mut(&frame).and_then(FrameRecord::items_mut) else {
            return false;
        };
        let before = items.len();
        items.retain(|item| *item != id);
        let removed = items.len() != before;
        if removed {
            self.owned.remove(&id);
        }
        removed
    }

    /// Drops handles that no longer resolve from the keyframe at `frame`.
    /// Returns how many were dropped.
    pub(crate) fn retain_items(
        &mut self,
        frame: FrameNumber,
        mut alive: impl FnMut(ItemId) -> bool,
    ) -> usize {
        let Some(items) = self.frames.get_mut(&frame).and_then(FrameRecord::items_mut) else {
            return 0;
        };
        let mut dropped = Vec::new();
        items.retain(|id| {
            let keep = alive(*id);
            if !keep {
                dropped.push(*id);
            }
            keep
        });
        for id in &dropped {
            self.owned.remove(id);
        }
        dropped.len()
    }

    /// Empties the keyframe at `frame` while keeping its tween.
    pub(crate) fn clear_items(&mut self, frame: FrameNumber) -> Vec<ItemId> {
        let items = self
            .frames
            .get_mut(&frame)
            .map(FrameRecord::take_items)
            .unwrap_or_default();
        for id in &items {
            self.owned.remove(id);
        }
        items
    }

    /// Re-points the run of extended frames directly after `frame` that repeat
    /// an earlier keyframe so they repeat `frame` instead. Returns how many
    /// were adopted.
    pub(crate) fn adopt_following_extensions(&mut self, frame: FrameNumber) -> usize {
        let mut adopted = 0;
        for (_, record) in self.frames.range_mut(frame.saturating_add(1)..) {
            match &mut record.kind {
                RecordKind::Extended { source } if *source < frame => {
                    *source = frame;
                    adopted += 1;
                }
                _ => break,
            }
        }
        adopted
    }

    /// Moves every extended frame repeating `from` over to `to`, or drops those
    /// frames when `to` is `None`.
    pub(crate) fn repoint_extensions(&mut self, from: FrameNumber, to: Option<FrameNumber>) {
        let repeating: Vec<FrameNumber> = self
            .frames
            .iter()
            .filter(|(_, record)| record.source_keyframe() == Some(from))
            .map(|(frame, _)| *frame)
            .collect();
        for frame in repeating {
            match to {
                Some(source) => {
                    self.frames.insert(frame, FrameRecord::extended(source));
                }
                None => {
                    self.frames.remove(&frame);
                }
            }
        }
    }

    /// Takes every owned handle, leaving no records behind.
    pub(crate) fn drain_items(&mut self) -> Vec<ItemId> {
        self.frames.clear();
        self.owned.drain().collect()
    }
}
