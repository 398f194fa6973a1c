//! Onion-skin window: which neighbouring frames are overlaid and how faded.

use crate::config::OnionSkinConfig;
use crate::scene::DisplayRole;
use crate::types::FrameNumber;

#[derive(Debug, Clone, PartialEq)]
pub struct OnionSkin {
    pub enabled: bool,
    pub before: u32,
    pub after: u32,
    pub base_opacity: f32,
}

impl From<&OnionSkinConfig> for OnionSkin {
    fn from(config: &OnionSkinConfig) -> Self {
        Self {
            enabled: config.enabled,
            before: config.before,
            after: config.after,
            base_opacity: config.base_opacity.clamp(0.0, 1.0),
        }
    }
}

/// One overlaid neighbour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OnionFrame {
    pub role: DisplayRole,
    pub frame: FrameNumber,
    pub offset: u32,
    pub opacity: f32,
}

impl OnionSkin {
    /// `base * (window - offset + 1) / window`: the nearest neighbour gets the
    /// full base opacity, the farthest `base / window`.
    pub fn fade(base: f32, window: u32, offset: u32) -> f32 {
        if window == 0 || offset == 0 || offset > window {
            return 0.0;
        }
        base * (window - offset + 1) as f32 / window as f32
    }

    /// Caps both windows at `total`; a wider window can never reach more
    /// frames.
    pub fn clamp_window(&mut self, total: FrameNumber) {
        self.before = self.before.min(total);
        self.after = self.after.min(total);
    }

    /// Neighbours of `current` that lie inside `1..=total`, nearest first.
    pub fn frames(&self, current: FrameNumber, total: FrameNumber) -> Vec<OnionFrame> {
        if !self.enabled {
            return Vec::new();
        }
        let capacity = self.before.saturating_add(self.after).min(total);
        let mut frames = Vec::with_capacity(capacity as usize);
        for offset in 1..=self.before {
            let Some(frame) = current.checked_sub(offset).filter(|f| *f >= 1) else {
                break;
            };
            frames.push(OnionFrame {
                role: DisplayRole::OnionBefore(offset),
                frame,
                offset,
                opacity: Self::fade(self.base_opacity, self.before, offset),
            });
        }
        for offset in 1..=self.after {
            let frame = current.saturating_add(offset);
            if frame > total {
                break;
            }
            frames.push(OnionFrame {
                role: DisplayRole::OnionAfter(offset),
                frame,
                offset,
                opacity: Self::fade(self.base_opacity, self.after, offset),
            });
        }
        frames
    }
}
