//! # frameline-core
//!
//! Frame timeline engine for a 2D vector animation editor: layers of frames,
//! keyframes that own drawable items, extended frames that repeat a keyframe,
//! and tween spans whose in-betweens are interpolated on the fly.
//!
//! ## Modules
//! - `store`: generation-checked item arena.
//! - `frame` / `layer`: per-layer frame records and their queries.
//! - `timeline`: the engine (navigation, display, editing, layers, history).
//! - `interpolate` / `animation`: in-between poses and easing curves.
//! - `scene`: the adapter trait the engine draws through.
//! - `document`: JSON persistence.
//! - `playback`: fixed-rate frame stepping.

pub mod animation;
pub mod config;
pub mod document;
pub mod errors;
pub mod events;
pub mod frame;
pub mod interpolate;
pub mod layer;
pub mod onion;
pub mod playback;
pub mod scene;
pub mod store;
pub mod timeline;
pub mod types;

pub use animation::Easing;
pub use config::{OnionSkinConfig, TimelineConfig};
pub use errors::{Result, TimelineError};
pub use events::TimelineEvent;
pub use frame::{FrameRecord, FrameSnapshot, FrameType, Tween};
pub use layer::{BlendMode, Layer};
pub use onion::OnionSkin;
pub use playback::Playback;
pub use scene::{
    DisplayKey, DisplayKind, DisplayRole, MemoryScene, Placement, SceneAdapter, SceneEntry,
};
pub use store::ItemStore;
pub use timeline::{CloneMap, Timeline};
pub use types::{FrameNumber, ItemId, LayerId};
