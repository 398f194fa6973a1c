//! Display pass: what the scene adapter shows for the current frame.

use super::Timeline;
use crate::interpolate::interpolate;
use crate::scene::{DisplayKey, DisplayKind, DisplayRole, Placement, SceneAdapter};
use crate::types::{FrameNumber, ItemId};
use frameline_data::VisualItem;
use std::collections::HashSet;
use tracing::{trace, warn};

/// Content of one layer at one frame.
pub(crate) enum Resolved {
    Persisted(Vec<ItemId>),
    Interpolated(Vec<VisualItem>),
}

impl<S: SceneAdapter> Timeline<S> {
    /// Removes every displayed entry from the scene. In-between poses are
    /// freed here, so they never outlive the frame they were built for.
    pub(crate) fn clear_display(&mut self) {
        for key in std::mem::take(&mut self.displayed) {
            self.scene.remove_item(key);
            if key.role == DisplayRole::Live && self.items.is_ephemeral(key.item) {
                self.items.remove(key.item);
            }
        }
    }

    /// Detaches `ids` from the scene, then frees them.
    pub(crate) fn discard_items(&mut self, ids: Vec<ItemId>) {
        if ids.is_empty() {
            return;
        }
        let doomed: HashSet<ItemId> = ids.iter().copied().collect();
        let scene = &mut self.scene;
        self.displayed.retain(|key| {
            if doomed.contains(&key.item) {
                scene.remove_item(*key);
                false
            } else {
                true
            }
        });
        for id in ids {
            self.items.remove(id);
        }
    }

    /// Content of layer `index` at `frame`, independent of visibility.
    pub(crate) fn resolve(&self, index: usize, frame: FrameNumber) -> Resolved {
        let layer = &self.layers[index];
        if let Some((start, tween)) = layer.tween_covering(frame) {
            if layer.has_keyframe(tween.end) {
                let from: Vec<&VisualItem> = self.lookup(layer.persisted_items(start));
                let to: Vec<&VisualItem> = self.lookup(layer.persisted_items(tween.end));
                let t = (frame - start) as f32 / (tween.end - start) as f32;
                return Resolved::Interpolated(interpolate(&from, &to, t, tween.easing));
            }
            return Resolved::Persisted(layer.persisted_items(start).to_vec());
        }
        Resolved::Persisted(layer.persisted_items(frame).to_vec())
    }

    /// Resolved content of layer `index` at `frame`, by value.
    pub(crate) fn resolved_items(&self, index: usize, frame: FrameNumber) -> Vec<VisualItem> {
        match self.resolve(index, frame) {
            Resolved::Persisted(ids) => self.lookup(&ids).into_iter().cloned().collect(),
            Resolved::Interpolated(poses) => poses,
        }
    }

    fn lookup(&self, ids: &[ItemId]) -> Vec<&VisualItem> {
        ids.iter().filter_map(|id| self.items.get(*id)).collect()
    }

    /// Drops handles that no longer resolve from the records feeding `frame`.
    fn prune_dangling(&mut self, index: usize, frame: FrameNumber) {
        let layer = &self.layers[index];
        let mut owners: Vec<FrameNumber> = layer.owner_frame(frame).into_iter().collect();
        if let Some((start, tween)) = layer.tween_covering(frame) {
            owners.push(start);
            owners.push(tween.end);
        }
        let items = &self.items;
        let layer = &mut self.layers[index];
        for owner in owners {
            let dropped = layer.retain_items(owner, |id| items.contains(id));
            if dropped > 0 {
                warn!(
                    layer = %layer.id(),
                    frame = owner,
                    dropped,
                    "dropped item handles that no longer resolve"
                );
            }
        }
    }

    /// Rebuilds the scene for the current frame: clear, resolve every visible
    /// layer, then add onion-skin overlays.
    pub(crate) fn load_frame(&mut self) {
        self.clear_display();
        let frame = self.current_frame;
        let band = f64::from(self.config.z_band_width.max(2));

        for index in 0..self.layers.len() {
            self.prune_dangling(index, frame);
            if !self.layers[index].visible {
                continue;
            }
            let base = index as f64 * band;
            let (ids, kind) = match self.resolve(index, frame) {
                Resolved::Persisted(ids) => (ids, DisplayKind::Persisted),
                Resolved::Interpolated(poses) => {
                    let ids = poses
                        .into_iter()
                        .map(|pose| self.items.insert_ephemeral(pose))
                        .collect();
                    (ids, DisplayKind::Interpolated)
                }
            };
            let interactive = kind == DisplayKind::Persisted && !self.layers[index].locked;
            let mut shown = HashSet::with_capacity(ids.len());
            for (order, id) in ids.into_iter().enumerate() {
                let key = DisplayKey::live(id);
                if self.show(index, key, base + order as f64, 1.0, interactive, kind) {
                    shown.insert(id);
                }
            }
            self.show_onion_skin(index, frame, base, band, &shown);
        }
        trace!(frame, entries = self.displayed.len(), "frame loaded");
    }

    /// Overlays persisted items of neighbouring frames. Interpolated poses are
    /// never used as onion skin, and items already shown live on this layer
    /// are skipped.
    fn show_onion_skin(
        &mut self,
        index: usize,
        frame: FrameNumber,
        base: f64,
        band: f64,
        shown: &HashSet<ItemId>,
    ) {
        let neighbours = self.onion.frames(frame, self.total_frames);
        for neighbour in neighbours {
            let ids: Vec<ItemId> = self.layers[index]
                .persisted_items(neighbour.frame)
                .iter()
                .copied()
                .filter(|id| !shown.contains(id))
                .collect();
            let count = ids.len().max(1) as f64;
            for (order, id) in ids.into_iter().enumerate() {
                // Earlier frames sit just under the layer's live band, later
                // frames just under the next layer's band.
                let slot = order as f64 / (count * 2.0);
                let z = match neighbour.role {
                    DisplayRole::OnionBefore(offset) => {
                        let step = f64::from(self.onion.before) + 1.0;
                        base - (f64::from(offset) - slot) / step
                    }
                    _ => {
                        let step = f64::from(self.onion.after) + 1.0;
                        base + band - 1.0 - (f64::from(neighbour.offset) - slot) / step
                    }
                };
                let key = DisplayKey {
                    item: id,
                    role: neighbour.role,
                };
                self.show(index, key, z, neighbour.opacity, false, DisplayKind::OnionSkin);
            }
        }
    }

    fn show(
        &mut self,
        index: usize,
        key: DisplayKey,
        z: f64,
        factor: f32,
        interactive: bool,
        kind: DisplayKind,
    ) -> bool {
        let Some(item) = self.items.get(key.item) else {
            return false;
        };
        let layer = &self.layers[index];
        let placement = Placement {
            layer: layer.id(),
            z,
            opacity: (item.opacity * layer.opacity * factor).clamp(0.0, 1.0),
            interactive,
            kind,
        };
        self.scene.add_item(key, item, placement);
        self.displayed.push(key);
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::animation::Easing;
    use crate::config::{OnionSkinConfig, TimelineConfig};
    use crate::scene::{DisplayKind, DisplayRole};
    use crate::timeline::Timeline;
    use frameline_data::VisualItem;
    use glam::Vec2;

    fn timeline() -> Timeline {
        Timeline::new(TimelineConfig {
            total_frames: 24,
            ..TimelineConfig::default()
        })
    }

    #[test]
    fn ephemeral_poses_are_freed_on_navigation() {
        let mut tl = timeline();
        tl.add_item(VisualItem::rectangle(10.0, 10.0)).unwrap();
        tl.create_keyframe(12).unwrap();
        tl.apply_tweening(1, 12, Easing::Linear).unwrap();

        tl.set_current_frame(6);
        assert_eq!(tl.items().ephemeral_count(), 1);
        let live = tl.scene().live_entries();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].1.placement.kind, DisplayKind::Interpolated);
        assert!(!live[0].1.placement.interactive);

        tl.set_current_frame(12);
        assert_eq!(tl.items().ephemeral_count(), 0);
        assert_eq!(tl.scene().len(), 1);
        assert_eq!(tl.scene().duplicate_inserts(), 0);
    }

    #[test]
    fn layers_draw_in_separate_z_bands() {
        let mut tl = timeline();
        tl.add_item(VisualItem::rectangle(1.0, 1.0)).unwrap();
        tl.add_item(VisualItem::rectangle(2.0, 2.0)).unwrap();
        tl.add_layer(None);
        tl.add_item(VisualItem::ellipse(1.0, 1.0)).unwrap();

        let z: Vec<f64> = tl
            .scene()
            .in_z_order()
            .iter()
            .map(|(_, entry)| entry.placement.z)
            .collect();
        assert_eq!(z, vec![0.0, 1.0, 1000.0]);
    }

    #[test]
    fn hidden_layers_show_nothing() {
        let mut tl = timeline();
        tl.add_item(VisualItem::rectangle(1.0, 1.0)).unwrap();
        tl.set_layer_visible(0, false).unwrap();
        assert!(tl.scene().is_empty());
        tl.set_layer_visible(0, true).unwrap();
        assert_eq!(tl.scene().len(), 1);
    }

    #[test]
    fn layer_opacity_multiplies_item_opacity() {
        let mut tl = timeline();
        let mut item = VisualItem::rectangle(1.0, 1.0);
        item.opacity = 0.5;
        tl.add_item(item).unwrap();
        tl.set_layer_opacity(0, 0.5).unwrap();
        let live = tl.scene().live_entries();
        assert!((live[0].1.placement.opacity - 0.25).abs() < 1e-6);
    }

    #[test]
    fn onion_skin_fades_neighbours() {
        let mut tl = Timeline::new(TimelineConfig {
            onion_skin: OnionSkinConfig {
                enabled: true,
                before: 2,
                after: 1,
                base_opacity: 0.5,
            },
            ..TimelineConfig::default()
        });
        tl.add_item(VisualItem::rectangle(1.0, 1.0)).unwrap();
        tl.create_blank_keyframe(2).unwrap();
        tl.add_item(VisualItem::rectangle(2.0, 2.0).with_position(Vec2::new(5.0, 0.0)))
            .unwrap();
        tl.create_blank_keyframe(3).unwrap();
        tl.add_item(VisualItem::rectangle(3.0, 3.0)).unwrap();
        tl.create_blank_keyframe(4).unwrap();
        tl.add_item(VisualItem::rectangle(4.0, 4.0)).unwrap();
        tl.set_current_frame(3);

        let entries = tl.scene().in_z_order();
        let roles: Vec<DisplayRole> = entries.iter().map(|(key, _)| key.role).collect();
        assert_eq!(
            roles,
            vec![
                DisplayRole::OnionBefore(2),
                DisplayRole::OnionBefore(1),
                DisplayRole::Live,
                DisplayRole::OnionAfter(1),
            ]
        );
        let opacity: Vec<f32> = entries
            .iter()
            .map(|(_, entry)| entry.placement.opacity)
            .collect();
        assert!((opacity[0] - 0.25).abs() < 1e-6);
        assert!((opacity[1] - 0.5).abs() < 1e-6);
        assert!((opacity[3] - 0.5).abs() < 1e-6);
        assert!(entries.iter().all(|(key, entry)| {
            key.role == DisplayRole::Live || !entry.placement.interactive
        }));
    }

    #[test]
    fn onion_skin_skips_items_already_live() {
        let mut tl = Timeline::new(TimelineConfig {
            onion_skin: OnionSkinConfig {
                enabled: true,
                ..OnionSkinConfig::default()
            },
            ..TimelineConfig::default()
        });
        tl.add_item(VisualItem::rectangle(1.0, 1.0)).unwrap();
        tl.create_extended_frame(5).unwrap();
        tl.set_current_frame(3);
        // Frames 1..5 all show the same persisted item.
        assert_eq!(tl.scene().len(), 1);
    }
}
