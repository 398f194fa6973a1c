//! # Scene Adapter
//!
//! The narrow interface between the timeline and whatever draws items on
//! screen.
//!
//! ## Responsibilities
//! - **SceneAdapter**: add/remove/list displayed entries. The adapter never owns
//!   timeline items; it receives a borrowed item to build its own display node.
//! - **DisplayKey**: identifies one displayed entry. The same persisted item can
//!   appear once live and again as an onion-skin overlay, so the key carries
//!   the role alongside the item handle.
//! - **MemoryScene**: in-memory adapter that records what is on screen, used by
//!   the CLI and by tests.

use crate::types::{ItemId, LayerId};
use frameline_data::VisualItem;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DisplayRole {
    Live,
    /// Overlay of the frame `offset` frames before the current one.
    OnionBefore(u32),
    /// Overlay of the frame `offset` frames after the current one.
    OnionAfter(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayKey {
    pub item: ItemId,
    pub role: DisplayRole,
}

impl DisplayKey {
    pub fn live(item: ItemId) -> Self {
        Self {
            item,
            role: DisplayRole::Live,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    /// A persisted item owned by a keyframe.
    Persisted,
    /// Ephemeral in-between pose computed for a tween span.
    Interpolated,
    /// Faded reference to a neighbouring frame's persisted item.
    OnionSkin,
}

/// Where and how an entry is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub layer: LayerId,
    pub z: f64,
    /// Item base opacity × layer opacity × onion-skin factor.
    pub opacity: f32,
    /// Interactive entries accept selection, moves and pointer input.
    pub interactive: bool,
    pub kind: DisplayKind,
}

pub trait SceneAdapter {
    fn add_item(&mut self, key: DisplayKey, item: &VisualItem, placement: Placement);

    fn remove_item(&mut self, key: DisplayKey);

    fn list_all(&self) -> Vec<DisplayKey>;
}

/// A displayed entry as recorded by [`MemoryScene`].
#[derive(Debug, Clone, PartialEq)]
pub struct SceneEntry {
    pub item: VisualItem,
    pub placement: Placement,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryScene {
    entries: BTreeMap<DisplayKey, SceneEntry>,
    duplicate_inserts: usize,
}

impl MemoryScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: DisplayKey) -> Option<&SceneEntry> {
        self.entries.get(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted back to front.
    pub fn in_z_order(&self) -> Vec<(DisplayKey, &SceneEntry)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, e)| (*k, e)).collect();
        entries.sort_by(|a, b| a.1.placement.z.total_cmp(&b.1.placement.z));
        entries
    }

    pub fn live_entries(&self) -> Vec<(DisplayKey, &SceneEntry)> {
        self.in_z_order()
            .into_iter()
            .filter(|(key, _)| key.role == DisplayRole::Live)
            .collect()
    }

    /// How many times an entry was added while its key was already present.
    pub fn duplicate_inserts(&self) -> usize {
        self.duplicate_inserts
    }
}

impl SceneAdapter for MemoryScene {
    fn add_item(&mut self, key: DisplayKey, item: &VisualItem, placement: Placement) {
        let previous = self.entries.insert(
            key,
            SceneEntry {
                item: item.clone(),
                placement,
            },
        );
        if previous.is_some() {
            self.duplicate_inserts += 1;
        }
    }

    fn remove_item(&mut self, key: DisplayKey) {
        self.entries.remove(&key);
    }

    fn list_all(&self) -> Vec<DisplayKey> {
        self.entries.keys().copied().collect()
    }
}
