//! # Frame Records
//!
//! One (layer, frame) cell of the timeline.
//!
//! A keyframe owns its item handles. An extended frame owns nothing and names
//! the keyframe it repeats, so sharing is a reference by frame number rather
//! than an alias of the same handles. Tween metadata only exists on the
//! keyframe variant, which makes "only a keyframe may start a tween"
//! unrepresentable to violate.

use crate::animation::Easing;
use crate::types::{FrameNumber, ItemId};
use frameline_data::VisualItem;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameType {
    Empty,
    Keyframe,
    #[serde(rename = "extended")]
    ExtendedFrame,
}

impl FrameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameType::Empty => "empty",
            FrameType::Keyframe => "keyframe",
            FrameType::ExtendedFrame => "extended",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "empty" => Some(FrameType::Empty),
            "keyframe" => Some(FrameType::Keyframe),
            "extended" | "extendedframe" => Some(FrameType::ExtendedFrame),
            _ => None,
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tween span started by a keyframe. `end` is the frame number of the closing
/// keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tween {
    pub end: FrameNumber,
    pub easing: Easing,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecordKind {
    Keyframe {
        items: Vec<ItemId>,
        tween: Option<Tween>,
    },
    Extended {
        source: FrameNumber,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub(crate) kind: RecordKind,
}

impl FrameRecord {
    pub(crate) fn keyframe(items: Vec<ItemId>) -> Self {
        Self {
            kind: RecordKind::Keyframe { items, tween: None },
        }
    }

    pub(crate) fn extended(source: FrameNumber) -> Self {
        Self {
            kind: RecordKind::Extended { source },
        }
    }

    pub fn frame_type(&self) -> FrameType {
        match self.kind {
            RecordKind::Keyframe { .. } => FrameType::Keyframe,
            RecordKind::Extended { .. } => FrameType::ExtendedFrame,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self.kind, RecordKind::Keyframe { .. })
    }

    pub fn source_keyframe(&self) -> Option<FrameNumber> {
        match self.kind {
            RecordKind::Extended { source } => Some(source),
            RecordKind::Keyframe { .. } => None,
        }
    }

    /// Handles owned by this record. Always empty for extended frames.
    pub fn items(&self) -> &[ItemId] {
        match &self.kind {
            RecordKind::Keyframe { items, .. } => items.as_slice(),
            RecordKind::Extended { .. } => &[],
        }
    }

    pub(crate) fn items_mut(&mut self) -> Option<&mut Vec<ItemId>> {
        match &mut self.kind {
            RecordKind::Keyframe { items, .. } => Some(items),
            RecordKind::Extended { .. } => None,
        }
    }

    pub fn tween(&self) -> Option<&Tween> {
        match &self.kind {
            RecordKind::Keyframe { tween, .. } => tween.as_ref(),
            RecordKind::Extended { .. } => None,
        }
    }

    pub(crate) fn set_tween(&mut self, value: Option<Tween>) -> bool {
        match &mut self.kind {
            RecordKind::Keyframe { tween, .. } => {
                *tween = value;
                true
            }
            RecordKind::Extended { .. } => false,
        }
    }

    /// Takes the owned handles out, leaving the record empty.
    pub(crate) fn take_items(&mut self) -> Vec<ItemId> {
        self.items_mut().map(std::mem::take).unwrap_or_default()
    }
}

/// By-value copy of a frame record, the unit an undo stack stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub frame_type: FrameType,
    #[serde(default)]
    pub source: Option<FrameNumber>,
    #[serde(default)]
    pub tween: Option<Tween>,
    #[serde(default)]
    pub items: Vec<VisualItem>,
}

impl FrameSnapshot {
    pub fn empty() -> Self {
        Self {
            frame_type: FrameType::Empty,
            source: None,
            tween: None,
            items: Vec::new(),
        }
    }

    pub fn keyframe(items: Vec<VisualItem>) -> Self {
        Self {
            frame_type: FrameType::Keyframe,
            source: None,
            tween: None,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extended_records_cannot_carry_tweens() {
        let mut record = FrameRecord::extended(3);
        let applied = record.set_tween(Some(Tween {
            end: 10,
            easing: Easing::Linear,
        }));
        assert!(!applied);
        assert!(record.tween().is_none());
        assert_eq!(record.source_keyframe(), Some(3));
        assert!(record.items().is_empty());
    }

    #[test]
    fn frame_type_names_round_trip() {
        for ty in [FrameType::Empty, FrameType::Keyframe, FrameType::ExtendedFrame] {
            assert_eq!(FrameType::parse(ty.as_str()), Some(ty));
        }
        assert_eq!(FrameType::parse("motion"), None);
    }
}
