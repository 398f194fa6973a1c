//! Structural edits (keyframes, extended frames, tweens) and item edits.
//!
//! An extended frame never owns items. Editing one first promotes it to a
//! keyframe holding deep copies of its source's items; the returned
//! [`CloneMap`] lets the caller retarget whatever handle it was about to
//! touch. Tween interiors cannot be edited at all: remove the tween first.

use super::Timeline;
use crate::animation::Easing;
use crate::errors::{Result, TimelineError};
use crate::events::TimelineEvent;
use crate::frame::{FrameRecord, FrameType, Tween};
use crate::scene::SceneAdapter;
use crate::types::{FrameNumber, ItemId};
use frameline_data::VisualItem;
use std::collections::HashMap;
use tracing::{debug, info};

/// Original handle → its fresh copy, produced when an extended frame is
/// promoted to a keyframe.
pub type CloneMap = HashMap<ItemId, ItemId>;

impl<S: SceneAdapter> Timeline<S> {
    fn check_unlocked(&self, index: usize) -> Result<()> {
        let layer = &self.layers[index];
        if layer.locked {
            return Err(TimelineError::LayerLocked {
                name: layer.name.clone(),
            });
        }
        Ok(())
    }

    fn check_not_tweened(&self, index: usize, frame: FrameNumber) -> Result<()> {
        match self.layers[index].tween_covering(frame) {
            Some((start, tween)) => Err(TimelineError::DrawBlocked {
                frame,
                start,
                end: tween.end,
            }),
            None => Ok(()),
        }
    }

    /// Why the current layer and frame cannot be drawn on, if they can't.
    pub fn draw_status(&self) -> Result<()> {
        self.check_unlocked(self.current_layer)?;
        self.check_not_tweened(self.current_layer, self.current_frame)
    }

    /// False on locked layers and inside tween interiors.
    pub fn can_draw_on_current_frame(&self) -> bool {
        self.draw_status().is_ok()
    }

    /// True when the next edit would have to promote the current extended
    /// frame to a keyframe first.
    pub fn should_convert_extended_frame(&self) -> bool {
        self.current_layer().frame_type(self.current_frame) == FrameType::ExtendedFrame
            && self.can_draw_on_current_frame()
    }

    /// Promotes the current extended frame to a keyframe owning deep copies of
    /// its source's items. Frames still extending the source keep showing the
    /// unmodified originals. Returns an empty map when the frame is not
    /// extended.
    pub fn convert_current_extended_frame_to_keyframe(&mut self) -> Result<CloneMap> {
        self.draw_status()?;
        let map = self.detach_extended(self.current_layer, self.current_frame);
        self.load_frame();
        Ok(map)
    }

    fn detach_extended(&mut self, index: usize, frame: FrameNumber) -> CloneMap {
        let layer = &self.layers[index];
        let Some(source) = layer.source_keyframe(frame) else {
            return CloneMap::new();
        };
        let originals = layer.persisted_items(frame).to_vec();

        let mut map = CloneMap::with_capacity(originals.len());
        let mut copies = Vec::with_capacity(originals.len());
        for id in originals {
            if let Some(copy) = self.items.duplicate(id) {
                map.insert(id, copy);
                copies.push(copy);
            }
        }

        let layer = &mut self.layers[index];
        layer.put_record(frame, FrameRecord::keyframe(copies));
        let id = layer.id();
        info!(layer = %id, frame, source, cloned = map.len(), "extended frame converted to keyframe");
        self.emit(TimelineEvent::KeyframeAdded { layer: id, frame });
        map
    }

    /// Makes the current frame editable: extended frames are promoted, empty
    /// frames get a blank keyframe.
    fn begin_edit(&mut self) -> Result<CloneMap> {
        self.draw_status()?;
        let (index, frame) = (self.current_layer, self.current_frame);
        match self.layers[index].frame_type(frame) {
            FrameType::Keyframe => Ok(CloneMap::new()),
            FrameType::ExtendedFrame => Ok(self.detach_extended(index, frame)),
            FrameType::Empty => {
                let layer = &mut self.layers[index];
                layer.put_record(frame, FrameRecord::keyframe(Vec::new()));
                let id = layer.id();
                self.emit(TimelineEvent::KeyframeAdded { layer: id, frame });
                Ok(CloneMap::new())
            }
        }
    }

    /// Checks that `id` is one of the current frame's persisted items.
    fn check_on_current_frame(&self, id: ItemId) -> Result<()> {
        if self
            .current_layer()
            .persisted_items(self.current_frame)
            .contains(&id)
        {
            Ok(())
        } else {
            Err(TimelineError::UnknownItem(id))
        }
    }

    /// Adds an item on top of the current frame of the current layer.
    pub fn add_item(&mut self, item: VisualItem) -> Result<ItemId> {
        self.begin_edit()?;
        let (index, frame) = (self.current_layer, self.current_frame);
        let id = self.items.insert(item);
        self.layers[index].push_item(frame, id);
        debug!(item = %id, frame, "item added");
        self.load_frame();
        Ok(id)
    }

    /// Applies `edit` to an item of the current frame. If the frame was
    /// extended, the edit lands on the fresh copy, whose handle is returned.
    pub fn edit_item(&mut self, id: ItemId, edit: impl FnOnce(&mut VisualItem)) -> Result<ItemId> {
        self.draw_status()?;
        self.check_on_current_frame(id)?;
        let map = self.begin_edit()?;
        let target = map.get(&id).copied().unwrap_or(id);
        let item = self
            .items
            .get_mut(target)
            .ok_or(TimelineError::UnknownItem(target))?;
        edit(item);
        self.load_frame();
        Ok(target)
    }

    pub fn remove_item(&mut self, id: ItemId) -> Result<()> {
        self.draw_status()?;
        self.check_on_current_frame(id)?;
        let map = self.begin_edit()?;
        let target = map.get(&id).copied().unwrap_or(id);
        self.layers[self.current_layer].detach_item(self.current_frame, target);
        self.discard_items(vec![target]);
        debug!(item = %target, frame = self.current_frame, "item removed");
        self.load_frame();
        Ok(())
    }

    /// Deletes every item of the current frame, keeping it a keyframe.
    pub fn clear_current_frame(&mut self) -> Result<()> {
        self.begin_edit()?;
        let freed = self.layers[self.current_layer].clear_items(self.current_frame);
        self.discard_items(freed);
        self.load_frame();
        Ok(())
    }

    /// Installs a keyframe with `items` at `frame` and lets the extended
    /// frames directly after it repeat the new keyframe.
    fn install_keyframe(&mut self, index: usize, frame: FrameNumber, items: Vec<VisualItem>) {
        let ids = items.into_iter().map(|item| self.items.insert(item)).collect();
        let layer = &mut self.layers[index];
        let replaced = layer.put_record(frame, FrameRecord::keyframe(ids));
        layer.adopt_following_extensions(frame);
        let id = layer.id();
        self.discard_items(replaced);
        self.emit(TimelineEvent::KeyframeAdded { layer: id, frame });
    }

    /// Turns `frame` into a keyframe holding copies of what the current layer
    /// shows at the playhead, then moves the playhead there. A frame that is
    /// already a keyframe is left alone.
    pub fn create_keyframe(&mut self, frame: FrameNumber) -> Result<()> {
        self.check_frame(frame)?;
        let index = self.current_layer;
        self.check_unlocked(index)?;
        self.check_not_tweened(index, frame)?;
        if !self.layers[index].has_keyframe(frame) {
            let content = self.resolved_items(index, self.current_frame);
            info!(layer = %self.layers[index].id(), frame, items = content.len(), "keyframe created");
            self.install_keyframe(index, frame, content);
        }
        self.set_current_frame(frame);
        Ok(())
    }

    /// Turns `frame` into an empty keyframe, freeing whatever it owned, then
    /// moves the playhead there. A tween starting at `frame` survives.
    pub fn create_blank_keyframe(&mut self, frame: FrameNumber) -> Result<()> {
        self.check_frame(frame)?;
        let index = self.current_layer;
        self.check_unlocked(index)?;
        self.check_not_tweened(index, frame)?;
        if self.layers[index].has_keyframe(frame) {
            let freed = self.layers[index].clear_items(frame);
            self.discard_items(freed);
            let id = self.layers[index].id();
            self.emit(TimelineEvent::KeyframeAdded { layer: id, frame });
        } else {
            self.install_keyframe(index, frame, Vec::new());
        }
        info!(layer = %self.layers[index].id(), frame, "blank keyframe created");
        self.set_current_frame(frame);
        Ok(())
    }

    /// Fills every record-less frame between the nearest earlier keyframe and
    /// `frame` with extended frames of that keyframe, then moves the playhead
    /// to `frame`. Without an earlier keyframe a blank keyframe is created.
    pub fn create_extended_frame(&mut self, frame: FrameNumber) -> Result<()> {
        self.check_frame(frame)?;
        let index = self.current_layer;
        self.check_unlocked(index)?;
        if self.layers[index].has_keyframe(frame) {
            self.set_current_frame(frame);
            return Ok(());
        }
        let Some(source) = self.layers[index].last_keyframe_before(frame) else {
            return self.create_blank_keyframe(frame);
        };

        let layer = &mut self.layers[index];
        let mut filled = 0;
        for f in source + 1..=frame {
            if !layer.has_content(f) {
                layer.put_record(f, FrameRecord::extended(source));
                filled += 1;
            }
        }
        let id = layer.id();
        if filled > 0 {
            debug!(layer = %id, source, to = frame, filled, "frames extended");
            self.emit(TimelineEvent::FrameExtended {
                layer: id,
                from: source + 1,
                to: frame,
            });
        }
        self.set_current_frame(frame);
        Ok(())
    }

    /// Starts a tween on the keyframe at `start` that ends on `end`. A missing
    /// end keyframe is created from the content shown at `end`; interior
    /// frames become extended frames of `start`.
    pub fn apply_tweening(&mut self, start: FrameNumber, end: FrameNumber, easing: Easing) -> Result<()> {
        self.check_frame(start)?;
        self.check_frame(end)?;
        if end <= start {
            return Err(TimelineError::InvalidTweenRange { start, end });
        }
        let index = self.current_layer;
        self.check_unlocked(index)?;
        let layer = &self.layers[index];
        if !layer.has_keyframe(start) {
            return Err(TimelineError::NotAKeyframe { frame: start });
        }
        if let Some(inner) = layer.next_keyframe_after(start).filter(|f| *f < end) {
            return Err(TimelineError::TweenSpanOccupied {
                start,
                end,
                frame: inner,
            });
        }

        if !layer.has_keyframe(end) {
            // No keyframe inside the span, so `end` shows the start's content.
            let content = self.resolved_items(index, start);
            self.install_keyframe(index, end, content);
        }
        let layer = &mut self.layers[index];
        for f in start + 1..end {
            layer.put_record(f, FrameRecord::extended(start));
        }
        if let Some(record) = layer.frames.get_mut(&start) {
            record.set_tween(Some(Tween { end, easing }));
        }
        let id = layer.id();
        info!(layer = %id, start, end, %easing, "tweening applied");
        self.emit(TimelineEvent::TweeningApplied {
            layer: id,
            start,
            end,
            easing,
        });
        self.load_frame();
        Ok(())
    }

    /// Removes the tween starting at `start`. The interior keeps repeating the
    /// start keyframe as plain extended frames. Returns false when there was
    /// no tween.
    pub fn remove_tweening(&mut self, start: FrameNumber) -> Result<bool> {
        self.check_frame(start)?;
        let index = self.current_layer;
        self.check_unlocked(index)?;
        let layer = &mut self.layers[index];
        let Some(record) = layer.frames.get_mut(&start).filter(|r| r.is_keyframe()) else {
            return Err(TimelineError::NotAKeyframe { frame: start });
        };
        if record.tween().is_none() {
            return Ok(false);
        }
        record.set_tween(None);
        let id = layer.id();
        info!(layer = %id, start, "tweening removed");
        self.emit(TimelineEvent::TweeningRemoved { layer: id, start });
        self.load_frame();
        Ok(true)
    }

    /// Deletes the keyframe at `frame` and its items. The frame and every
    /// extended frame that repeated it repeat the previous keyframe instead,
    /// and a tween ending on it is dropped. Frame 1 can only be blanked.
    pub fn remove_keyframe(&mut self, frame: FrameNumber) -> Result<()> {
        self.check_frame(frame)?;
        let index = self.current_layer;
        self.check_unlocked(index)?;
        if !self.layers[index].has_keyframe(frame) {
            return Err(TimelineError::NotAKeyframe { frame });
        }
        if frame == 1 {
            return Err(TimelineError::FirstKeyframe);
        }

        let layer = &mut self.layers[index];
        let previous = layer.last_keyframe_before(frame);
        if let Some(prev) = previous {
            if let Some(record) = layer.frames.get_mut(&prev) {
                if record.tween().is_some_and(|tween| tween.end == frame) {
                    record.set_tween(None);
                }
            }
        }
        let freed = match previous {
            Some(prev) => layer.put_record(frame, FrameRecord::extended(prev)),
            None => layer.take_record(frame),
        };
        layer.repoint_extensions(frame, previous);
        let id = layer.id();
        self.discard_items(freed);
        info!(layer = %id, frame, "keyframe removed");
        self.emit(TimelineEvent::KeyframeRemoved { layer: id, frame });
        self.load_frame();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimelineConfig;
    use glam::Vec2;

    fn timeline() -> Timeline {
        Timeline::new(TimelineConfig {
            total_frames: 24,
            ..TimelineConfig::default()
        })
    }

    fn rect_at(x: f32) -> VisualItem {
        VisualItem::rectangle(10.0, 10.0).with_position(Vec2::new(x, 0.0))
    }

    #[test]
    fn editing_an_extended_frame_promotes_it() {
        let mut tl = timeline();
        let original = tl.add_item(rect_at(0.0)).unwrap();
        tl.create_extended_frame(5).unwrap();
        tl.set_current_frame(3);
        assert!(tl.should_convert_extended_frame());

        let copy = tl
            .edit_item(original, |item| item.transform.position.x = 50.0)
            .unwrap();
        assert_ne!(copy, original);
        assert_eq!(tl.frame_type(3), FrameType::Keyframe);
        assert_eq!(tl.item(original).unwrap().position().x, 0.0);
        assert_eq!(tl.item(copy).unwrap().position().x, 50.0);
        // Frames 4 and 5 still repeat frame 1.
        assert_eq!(tl.current_layer().source_keyframe(4), Some(1));
        assert_eq!(tl.owners_of(original).len(), 1);
    }

    #[test]
    fn conversion_is_a_no_op_on_keyframes() {
        let mut tl = timeline();
        tl.add_item(rect_at(0.0)).unwrap();
        let map = tl.convert_current_extended_frame_to_keyframe().unwrap();
        assert!(map.is_empty());
        assert!(!tl.should_convert_extended_frame());
    }

    #[test]
    fn drawing_on_an_empty_frame_creates_a_keyframe() {
        let mut tl = timeline();
        tl.set_current_frame(7);
        assert_eq!(tl.frame_type(7), FrameType::Empty);
        tl.add_item(rect_at(0.0)).unwrap();
        assert_eq!(tl.frame_type(7), FrameType::Keyframe);
    }

    #[test]
    fn tween_interior_blocks_edits() {
        let mut tl = timeline();
        let id = tl.add_item(rect_at(0.0)).unwrap();
        tl.create_keyframe(10).unwrap();
        tl.apply_tweening(1, 10, Easing::Linear).unwrap();
        tl.set_current_frame(5);

        assert!(!tl.can_draw_on_current_frame());
        assert!(!tl.should_convert_extended_frame());
        let err = tl.add_item(rect_at(1.0)).unwrap_err();
        assert!(err.is_draw_blocked());
        assert!(matches!(
            tl.edit_item(id, |_| {}),
            Err(TimelineError::DrawBlocked {
                frame: 5,
                start: 1,
                end: 10
            })
        ));
        assert!(tl.create_keyframe(5).is_err());

        assert!(matches!(tl.remove_tweening(1), Ok(true)));
        assert!(tl.can_draw_on_current_frame());
        assert_eq!(tl.frame_type(5), FrameType::ExtendedFrame);
    }

    #[test]
    fn locked_layer_rejects_edits() {
        let mut tl = timeline();
        tl.set_layer_locked(0, true).unwrap();
        assert!(matches!(
            tl.add_item(rect_at(0.0)),
            Err(TimelineError::LayerLocked { .. })
        ));
        assert!(tl.create_blank_keyframe(3).is_err());
    }

    #[test]
    fn create_keyframe_copies_the_displayed_content() {
        let mut tl = timeline();
        let id = tl.add_item(rect_at(4.0)).unwrap();
        tl.create_keyframe(6).unwrap();
        assert_eq!(tl.current_frame(), 6);
        let items = tl.current_items();
        assert_eq!(items.len(), 1);
        assert_ne!(items[0].0, id);
        assert_eq!(items[0].1, tl.item(id).unwrap());
    }

    #[test]
    fn new_keyframe_adopts_the_rest_of_the_span() {
        let mut tl = timeline();
        tl.add_item(rect_at(0.0)).unwrap();
        tl.create_extended_frame(10).unwrap();
        tl.create_keyframe(5).unwrap();
        assert_eq!(tl.current_layer().source_keyframe(4), Some(1));
        assert_eq!(tl.current_layer().source_keyframe(6), Some(5));
        assert_eq!(tl.current_layer().source_keyframe(10), Some(5));
    }

    #[test]
    fn blank_keyframe_frees_previous_items() {
        let mut tl = timeline();
        let id = tl.add_item(rect_at(0.0)).unwrap();
        tl.create_blank_keyframe(1).unwrap();
        assert!(tl.item(id).is_none());
        assert!(tl.scene().is_empty());
        assert_eq!(tl.frame_type(1), FrameType::Keyframe);
    }

    #[test]
    fn extending_without_prior_keyframe_makes_a_blank_one() {
        let mut tl = timeline();
        tl.import_frame_data(0, 1, &crate::frame::FrameSnapshot::empty())
            .unwrap();
        assert_eq!(tl.frame_type(1), FrameType::Empty);

        tl.create_extended_frame(4).unwrap();
        assert_eq!(tl.frame_type(4), FrameType::Keyframe);
        assert_eq!(tl.frame_type(2), FrameType::Empty);
        assert_eq!(tl.current_frame(), 4);
    }

    #[test]
    fn extending_fills_only_gaps() {
        let mut tl = timeline();
        tl.add_item(rect_at(0.0)).unwrap();
        tl.create_blank_keyframe(3).unwrap();
        tl.create_extended_frame(6).unwrap();
        assert_eq!(tl.current_layer().source_keyframe(2), None);
        assert_eq!(tl.frame_type(2), FrameType::Empty);
        assert_eq!(tl.current_layer().source_keyframe(4), Some(3));
        assert_eq!(tl.current_layer().source_keyframe(6), Some(3));
        assert_eq!(tl.current_frame(), 6);
    }

    #[test]
    fn apply_tweening_validates_span() {
        let mut tl = timeline();
        tl.add_item(rect_at(0.0)).unwrap();
        assert!(matches!(
            tl.apply_tweening(5, 3, Easing::Linear),
            Err(TimelineError::InvalidTweenRange { start: 5, end: 3 })
        ));
        assert!(matches!(
            tl.apply_tweening(2, 8, Easing::Linear),
            Err(TimelineError::NotAKeyframe { frame: 2 })
        ));
        tl.create_keyframe(4).unwrap();
        assert!(matches!(
            tl.apply_tweening(1, 8, Easing::Linear),
            Err(TimelineError::TweenSpanOccupied {
                start: 1,
                end: 8,
                frame: 4
            })
        ));
        assert!(matches!(
            tl.apply_tweening(1, 99, Easing::Linear),
            Err(TimelineError::FrameOutOfRange { .. })
        ));
    }

    #[test]
    fn apply_tweening_creates_missing_end_keyframe() {
        let mut tl = timeline();
        tl.add_item(rect_at(0.0)).unwrap();
        tl.apply_tweening(1, 6, Easing::EaseOut).unwrap();
        assert_eq!(tl.frame_type(6), FrameType::Keyframe);
        for f in 2..6 {
            assert_eq!(tl.current_layer().source_keyframe(f), Some(1));
        }
        let tween = tl.current_layer().record(1).unwrap().tween().copied();
        assert_eq!(
            tween,
            Some(Tween {
                end: 6,
                easing: Easing::EaseOut
            })
        );
    }

    #[test]
    fn removing_a_keyframe_repoints_its_extensions() {
        let mut tl = timeline();
        tl.add_item(rect_at(0.0)).unwrap();
        tl.create_keyframe(5).unwrap();
        let id = tl.current_items()[0].0;
        tl.create_extended_frame(8).unwrap();
        tl.apply_tweening(1, 5, Easing::Linear).unwrap();

        tl.remove_keyframe(5).unwrap();
        assert!(tl.item(id).is_none());
        assert_eq!(tl.current_layer().source_keyframe(5), Some(1));
        assert_eq!(tl.current_layer().source_keyframe(8), Some(1));
        assert!(tl.current_layer().record(1).unwrap().tween().is_none());
        assert!(matches!(tl.remove_keyframe(1), Err(TimelineError::FirstKeyframe)));
        assert!(matches!(tl.remove_keyframe(3), Err(TimelineError::NotAKeyframe { frame: 3 })));
    }

    #[test]
    fn remove_item_detaches_from_scene() {
        let mut tl = timeline();
        let a = tl.add_item(rect_at(0.0)).unwrap();
        let b = tl.add_item(rect_at(1.0)).unwrap();
        tl.remove_item(a).unwrap();
        assert!(tl.item(a).is_none());
        assert_eq!(tl.scene().len(), 1);
        assert!(matches!(tl.remove_item(a), Err(TimelineError::UnknownItem(id)) if id == a));
        tl.clear_current_frame().unwrap();
        assert!(tl.item(b).is_none());
        assert!(tl.scene().is_empty());
    }
}
