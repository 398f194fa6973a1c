use glam::Vec2;
use kurbo::Shape as _;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default = "default_alpha")]
    pub a: u8,
}

fn default_alpha() -> u8 {
    255
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Stroke and fill of a shape item. Text and image items usually carry none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    #[serde(default)]
    pub stroke: Option<Color>,
    #[serde(default = "default_stroke_width")]
    pub stroke_width: f32,
    #[serde(default)]
    pub fill: Option<Color>,
}

fn default_stroke_width() -> f32 {
    1.0
}

impl Default for Style {
    fn default() -> Self {
        Self {
            stroke: Some(Color::BLACK),
            stroke_width: 1.0,
            fill: None,
        }
    }
}

/// Item transform. A local point `p` maps to world space as
/// `position + origin + R(rotation) * S(scale) * (p - origin)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform2D {
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub origin: Vec2,
    /// Degrees, clockwise in a y-down canvas.
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_scale")]
    pub scale: Vec2,
}

fn default_scale() -> Vec2 {
    Vec2::ONE
}

impl Default for Transform2D {
    fn default() -> Self {
        Self {
            position: Vec2::ZERO,
            origin: Vec2::ZERO,
            rotation: 0.0,
            scale: Vec2::ONE,
        }
    }
}

impl Transform2D {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    /// Rotation and scale applied around `origin`, without the translation.
    pub fn linear(&self, v: Vec2) -> Vec2 {
        let scaled = v * self.scale;
        Vec2::from_angle(self.rotation.to_radians()).rotate(scaled)
    }

    pub fn map_point(&self, p: Vec2) -> Vec2 {
        self.position + self.origin + self.linear(p - self.origin)
    }
}

/// Geometry of a visual item, in item-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Rectangle {
        width: f32,
        height: f32,
        #[serde(default)]
        corner_radius: f32,
    },
    Ellipse {
        radius_x: f32,
        radius_y: f32,
    },
    Line {
        from: Vec2,
        to: Vec2,
    },
    /// SVG path data.
    Path {
        d: String,
    },
    Text {
        content: String,
        #[serde(default = "default_font_family")]
        font_family: String,
        #[serde(default = "default_font_size")]
        font_size: f32,
    },
    Image {
        source: String,
        width: f32,
        height: f32,
    },
}

fn default_font_family() -> String {
    "sans-serif".to_string()
}

fn default_font_size() -> f32 {
    16.0
}

impl Shape {
    pub fn type_name(&self) -> &'static str {
        match self {
            Shape::Rectangle { .. } => "rectangle",
            Shape::Ellipse { .. } => "ellipse",
            Shape::Line { .. } => "line",
            Shape::Path { .. } => "path",
            Shape::Text { .. } => "text",
            Shape::Image { .. } => "image",
        }
    }

    /// Local bounding box. Text is measured with an average glyph advance of
    /// 0.6 em since no font backend is available here.
    pub fn local_bounds(&self) -> kurbo::Rect {
        match self {
            Shape::Rectangle { width, height, .. } => {
                kurbo::Rect::new(0.0, 0.0, *width as f64, *height as f64)
            }
            // Ellipse sits in [0, 0, 2rx, 2ry], matching the rectangle convention.
            Shape::Ellipse { radius_x, radius_y } => {
                kurbo::Rect::new(0.0, 0.0, *radius_x as f64 * 2.0, *radius_y as f64 * 2.0)
            }
            Shape::Line { from, to } => kurbo::Rect::from_points(
                (from.x as f64, from.y as f64),
                (to.x as f64, to.y as f64),
            ),
            Shape::Path { d } => match kurbo::BezPath::from_svg(d) {
                Ok(path) => path.bounding_box(),
                Err(_) => kurbo::Rect::ZERO,
            },
            Shape::Text {
                content, font_size, ..
            } => {
                let advance = *font_size as f64 * 0.6;
                kurbo::Rect::new(
                    0.0,
                    0.0,
                    advance * content.chars().count() as f64,
                    *font_size as f64,
                )
            }
            Shape::Image { width, height, .. } => {
                kurbo::Rect::new(0.0, 0.0, *width as f64, *height as f64)
            }
        }
    }
}

/// A drawable item as stored in a frame record.
///
/// `opacity` is the item's own base opacity. Layer opacity and onion-skin fading
/// are applied at display time and never written back here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualItem {
    #[serde(flatten)]
    pub shape: Shape,
    #[serde(default)]
    pub transform: Transform2D,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// Stored stacking hint. Display order follows the frame's item list.
    #[serde(default)]
    pub z: f32,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub blur: f32,
    #[serde(default)]
    pub style: Option<Style>,
}

fn default_opacity() -> f32 {
    1.0
}

fn default_visible() -> bool {
    true
}

impl VisualItem {
    pub fn new(shape: Shape) -> Self {
        let style = match shape {
            Shape::Text { .. } | Shape::Image { .. } => None,
            _ => Some(Style::default()),
        };
        Self {
            shape,
            transform: Transform2D::default(),
            opacity: 1.0,
            z: 0.0,
            visible: true,
            blur: 0.0,
            style,
        }
    }

    pub fn rectangle(width: f32, height: f32) -> Self {
        Self::new(Shape::Rectangle {
            width,
            height,
            corner_radius: 0.0,
        })
    }

    pub fn ellipse(radius_x: f32, radius_y: f32) -> Self {
        Self::new(Shape::Ellipse { radius_x, radius_y })
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = Some(style);
        self
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    pub fn local_center(&self) -> Vec2 {
        let center = self.shape.local_bounds().center();
        Vec2::new(center.x as f32, center.y as f32)
    }

    /// Center of the local bounding box mapped into world space.
    pub fn world_center(&self) -> Vec2 {
        self.transform.map_point(self.local_center())
    }

    /// Moves the item so its world center lands on `center` under the current
    /// rotation, scale and origin.
    pub fn set_world_center(&mut self, center: Vec2) {
        let t = &self.transform;
        let offset = t.origin + t.linear(self.local_center() - t.origin);
        self.transform.position = center - offset;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default = "default_version")]
    pub version: u32,
    pub width: u32,
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_total_frames", rename = "totalFrames")]
    pub total_frames: u32,
    #[serde(default)]
    pub layers: Vec<LayerJson>,
}

fn default_version() -> u32 {
    DOCUMENT_VERSION
}

fn default_fps() -> u32 {
    12
}

fn default_total_frames() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerJson {
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    #[serde(default = "default_blend_mode", rename = "blendMode")]
    pub blend_mode: String,
    /// Frame number (as a decimal string) to frame object.
    #[serde(default)]
    pub frames: BTreeMap<String, FrameJson>,
}

fn default_blend_mode() -> String {
    "normal".to_string()
}

/// Persisted frame object. Fields are kept loose (strings, raw item values) so a
/// single corrupt frame can be rejected without failing the whole document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameJson {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<u32>,
    #[serde(default, rename = "hasTween")]
    pub has_tween: bool,
    #[serde(default, rename = "tweenEnd", skip_serializing_if = "Option::is_none")]
    pub tween_end: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub easing: Option<String>,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}
