//! Timeline configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::errors::{Result, TimelineError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnionSkinConfig {
    pub enabled: bool,
    /// Frames shown before the current frame.
    pub before: u32,
    /// Frames shown after the current frame.
    pub after: u32,
    /// Opacity factor of the nearest neighbour; farther frames fade linearly.
    pub base_opacity: f32,
}

impl Default for OnionSkinConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            before: 2,
            after: 2,
            base_opacity: 0.3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    pub total_frames: u32,
    pub fps: u32,
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// Z range reserved per layer; layer `i` draws in `[i * band, (i + 1) * band)`.
    pub z_band_width: u32,
    pub onion_skin: OnionSkinConfig,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            total_frames: 24,
            fps: 12,
            canvas_width: 550,
            canvas_height: 400,
            z_band_width: 1000,
            onion_skin: OnionSkinConfig::default(),
        }
    }
}

impl TimelineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TimelineConfig = serde_json::from_str(json)?;
        config.validated()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Clamps values into their legal ranges.
    pub fn validated(mut self) -> Result<Self> {
        if self.total_frames == 0 {
            return Err(TimelineError::EmptyTimeline);
        }
        self.fps = self.fps.max(1);
        self.z_band_width = self.z_band_width.max(2);
        self.onion_skin.base_opacity = self.onion_skin.base_opacity.clamp(0.0, 1.0);
        Ok(self)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.fps.max(1) as f64)
    }
}
