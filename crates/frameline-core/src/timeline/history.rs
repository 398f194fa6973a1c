//! By-value frame snapshots. An undo stack stores [`FrameSnapshot`]s and
//! restores them through `import_frame_data`, so no handle ever escapes into
//! history.

use super::Timeline;
use crate::errors::Result;
use crate::events::TimelineEvent;
use crate::frame::{FrameRecord, FrameSnapshot, FrameType, RecordKind};
use crate::scene::SceneAdapter;
use crate::types::FrameNumber;
use tracing::{debug, warn};

impl<S: SceneAdapter> Timeline<S> {
    /// Copies the record at (`layer`, `frame`) out of the timeline.
    pub fn export_frame_data(&self, layer: usize, frame: FrameNumber) -> Result<FrameSnapshot> {
        self.check_layer(layer)?;
        self.check_frame(frame)?;
        Ok(self.snapshot(layer, frame))
    }

    /// Unchecked export; items are copied exactly.
    pub(crate) fn snapshot(&self, layer: usize, frame: FrameNumber) -> FrameSnapshot {
        let Some(record) = self.layers[layer].record(frame) else {
            return FrameSnapshot::empty();
        };
        match &record.kind {
            RecordKind::Keyframe { items, tween } => FrameSnapshot {
                frame_type: FrameType::Keyframe,
                source: None,
                tween: *tween,
                items: items
                    .iter()
                    .filter_map(|id| self.items.get(*id))
                    .cloned()
                    .collect(),
            },
            RecordKind::Extended { source } => FrameSnapshot {
                frame_type: FrameType::ExtendedFrame,
                source: Some(*source),
                tween: None,
                items: Vec::new(),
            },
        }
    }

    /// Replaces the record at (`layer`, `frame`) with `snapshot`, freeing what
    /// was there. Restored keyframes get fresh items. Lock state is ignored so
    /// undo always works; a tween that does not close on the next keyframe of
    /// the layer is dropped.
    pub fn import_frame_data(
        &mut self,
        layer: usize,
        frame: FrameNumber,
        snapshot: &FrameSnapshot,
    ) -> Result<()> {
        self.check_layer(layer)?;
        self.check_frame(frame)?;
        let freed = match snapshot.frame_type {
            FrameType::Empty => self.layers[layer].take_record(frame),
            FrameType::Keyframe => {
                let ids = snapshot
                    .items
                    .iter()
                    .map(|item| self.items.insert(item.clone()))
                    .collect();
                let mut record = FrameRecord::keyframe(ids);
                match snapshot.tween {
                    Some(tween) if self.layers[layer].tween_closes(frame, tween.end) => {
                        record.set_tween(Some(tween));
                    }
                    Some(tween) => {
                        warn!(frame, end = tween.end, "ignoring tween that does not close on the next keyframe");
                    }
                    None => {}
                }
                self.layers[layer].put_record(frame, record)
            }
            FrameType::ExtendedFrame => match snapshot.source.filter(|source| *source < frame) {
                Some(source) => self.layers[layer].put_record(frame, FrameRecord::extended(source)),
                None => {
                    warn!(frame, source = ?snapshot.source, "extended frame without an earlier source; clearing it");
                    self.layers[layer].take_record(frame)
                }
            },
        };
        self.discard_items(freed);
        let id = self.layers[layer].id();
        debug!(layer = %id, frame, kind = %snapshot.frame_type, "frame imported");
        self.emit(TimelineEvent::FrameImported { layer: id, frame });
        self.load_frame();
        Ok(())
    }
}
