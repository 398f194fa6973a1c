//! Serde data model shared by the frameline engine and its tools.
//!
//! `model` holds the visual item variants and the persisted document layout.

pub mod model;

pub use model::{
    Color, Document, FrameJson, LayerJson, Shape, Style, Transform2D, VisualItem,
    DOCUMENT_VERSION,
};
