//! # Interpolator
//!
//! Stateless in-between computation for tween spans.
//!
//! Items are paired by position in the two keyframes' item lists. Each pair
//! yields a clone of the "from" item with a blended pose:
//! - world-space center (so rotation pivots stay put), not the raw position
//! - rotation along the shortest arc
//! - componentwise scale, opacity and blur
//!
//! Geometry and style always come from the "from" item.

use crate::animation::Easing;
use frameline_data::VisualItem;
use glam::Vec2;

pub trait Interpolatable: Sized + Clone {
    fn lerp(&self, other: &Self, t: f32) -> Self;
}

impl Interpolatable for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Interpolatable for Vec2 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Vec2::lerp(*self, *other, t)
    }
}

/// Signed rotation difference `to - from` normalized into (-180, 180].
pub fn shortest_arc(from: f32, to: f32) -> f32 {
    let mut delta = (to - from).rem_euclid(360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Eases `t` and interpolates every positionally paired item. Trailing items
/// without a partner are left out.
pub fn interpolate(
    from: &[&VisualItem],
    to: &[&VisualItem],
    t: f32,
    easing: Easing,
) -> Vec<VisualItem> {
    let eased = easing.eval(t.clamp(0.0, 1.0));
    from.iter()
        .zip(to.iter())
        .map(|(a, b)| interpolate_item(a, b, eased))
        .collect()
}

/// Blends one pair at an already eased `t`.
pub fn interpolate_item(from: &VisualItem, to: &VisualItem, t: f32) -> VisualItem {
    let mut out = from.clone();
    if t <= 0.0 {
        return out;
    }
    if t >= 1.0 {
        out.transform.rotation = to.transform.rotation;
        out.transform.scale = to.transform.scale;
        out.transform.position = to.transform.position;
        out.transform.origin = to.transform.origin;
        out.opacity = to.opacity;
        out.blur = to.blur;
        return out;
    }

    let center = from.world_center().lerp(to.world_center(), t);

    let delta = shortest_arc(from.transform.rotation, to.transform.rotation);
    out.transform.rotation = from.transform.rotation + delta * t;
    out.transform.scale = from.transform.scale.lerp(to.transform.scale, t);
    out.opacity = Interpolatable::lerp(&from.opacity, &to.opacity, t).clamp(0.0, 1.0);
    out.blur = Interpolatable::lerp(&from.blur, &to.blur, t).max(0.0);

    out.set_world_center(center);
    out
}
