//! Shared handle and index types.

use std::fmt;

/// 1-based frame number on the timeline.
pub type FrameNumber = u32;

/// Generation-checked handle into the [`ItemStore`](crate::store::ItemStore).
///
/// A handle stays valid until its slot is freed. Reusing the slot bumps the
/// generation, so a stale handle resolves to nothing instead of to the new item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ItemId {
    pub fn index(self) -> u32 {
        self.index
    }

    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Stable layer identity. Never reused, unlike layer indices which shift when
/// layers are added, removed or reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(pub(crate) u64);

impl LayerId {
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}
