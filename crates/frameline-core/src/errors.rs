use crate::types::{FrameNumber, ItemId};
use thiserror::Error;

/// Errors reported by timeline entry points. None of them leave the timeline
/// partially modified.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("frame {frame} is outside 1..={total}")]
    FrameOutOfRange { frame: FrameNumber, total: FrameNumber },

    #[error("layer index {index} is out of bounds ({count} layers)")]
    LayerOutOfRange { index: usize, count: usize },

    #[error("cannot remove the last remaining layer")]
    LastLayer,

    #[error("frame {frame} is inside the tween {start}..{end}; remove the tween to edit it")]
    DrawBlocked {
        frame: FrameNumber,
        start: FrameNumber,
        end: FrameNumber,
    },

    #[error("layer '{name}' is locked")]
    LayerLocked { name: String },

    #[error("frame {frame} is not a keyframe")]
    NotAKeyframe { frame: FrameNumber },

    #[error("frame 1 of a layer cannot be removed, only blanked")]
    FirstKeyframe,

    #[error("invalid tween span {start}..{end}")]
    InvalidTweenRange { start: FrameNumber, end: FrameNumber },

    #[error("tween span {start}..{end} already contains keyframe {frame}")]
    TweenSpanOccupied {
        start: FrameNumber,
        end: FrameNumber,
        frame: FrameNumber,
    },

    #[error("item {0} is not part of the current frame")]
    UnknownItem(ItemId),

    #[error("total frame count must be at least 1")]
    EmptyTimeline,

    #[error("document i/o failed")]
    Io(#[from] std::io::Error),

    #[error("document is not valid JSON")]
    Json(#[from] serde_json::Error),
}

impl TimelineError {
    /// True for the "cannot draw here" family the UI surfaces as a status hint.
    pub fn is_draw_blocked(&self) -> bool {
        matches!(
            self,
            TimelineError::DrawBlocked { .. } | TimelineError::LayerLocked { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TimelineError>;
