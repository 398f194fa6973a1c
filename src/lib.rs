//! # frameline
//!
//! Frame timeline engine for 2D vector animation editors.
//!
//! This crate re-exports the engine (`frameline-core`) and the serde data
//! model (`frameline-data`) behind one dependency.
//!
//! ```no_run
//! use frameline::{Easing, Timeline, TimelineConfig, VisualItem};
//! use glam::Vec2;
//!
//! let mut timeline = Timeline::new(TimelineConfig::default());
//! timeline.add_item(VisualItem::rectangle(20.0, 20.0))?;
//! timeline.create_keyframe(12)?;
//! let id = timeline.current_items()[0].0;
//! timeline.edit_item(id, |item| item.transform.position = Vec2::new(100.0, 0.0))?;
//! timeline.apply_tweening(1, 12, Easing::Linear)?;
//! timeline.set_current_frame(6);
//! # Ok::<(), frameline::TimelineError>(())
//! ```

pub use frameline_core::*;
pub use frameline_data as data;
pub use frameline_data::{Color, Document, Shape, Style, Transform2D, VisualItem};
