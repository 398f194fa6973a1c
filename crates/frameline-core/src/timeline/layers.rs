//! Layer management. Layer indices are positions in the stack, bottom first;
//! they stay contiguous because removal and moves shift the vector.

use super::Timeline;
use crate::errors::{Result, TimelineError};
use crate::events::TimelineEvent;
use crate::layer::{BlendMode, Layer};
use crate::scene::SceneAdapter;
use crate::types::LayerId;
use tracing::info;

impl<S: SceneAdapter> Timeline<S> {
    /// Appends a layer on top of the stack and makes it current. Unnamed layers
    /// are called "Layer N".
    pub fn add_layer(&mut self, name: Option<&str>) -> LayerId {
        let index = self.layers.len();
        let id = self.allocate_layer_id();
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| format!("Layer {}", index + 1));
        info!(layer = %id, index, name = %name, "layer added");
        self.layers.push(Layer::new(id, name));
        self.emit(TimelineEvent::LayerAdded { layer: id, index });
        self.current_layer = index;
        self.emit(TimelineEvent::CurrentLayerChanged { layer: id, index });
        self.load_frame();
        id
    }

    /// Removes a layer and frees every item it owned. The last remaining
    /// layer cannot be removed.
    pub fn remove_layer(&mut self, index: usize) -> Result<LayerId> {
        self.check_layer(index)?;
        if self.layers.len() == 1 {
            return Err(TimelineError::LastLayer);
        }
        self.clear_display();
        let mut layer = self.layers.remove(index);
        let freed = layer.drain_items();
        let count = freed.len();
        for id in freed {
            self.items.remove(id);
        }
        info!(layer = %layer.id(), index, freed = count, "layer removed");
        self.emit(TimelineEvent::LayerRemoved {
            layer: layer.id(),
            index,
        });

        let previous = self.current_layer;
        if self.current_layer > index || self.current_layer >= self.layers.len() {
            self.current_layer -= 1;
        }
        if previous == index || previous != self.current_layer {
            let id = self.layers[self.current_layer].id();
            self.emit(TimelineEvent::CurrentLayerChanged {
                layer: id,
                index: self.current_layer,
            });
        }
        self.load_frame();
        Ok(layer.id())
    }

    /// Moves the layer at `from` to position `to`, shifting the ones between.
    /// The current layer stays the same layer.
    pub fn move_layer(&mut self, from: usize, to: usize) -> Result<()> {
        self.check_layer(from)?;
        self.check_layer(to)?;
        if from == to {
            return Ok(());
        }
        let current = self.layers[self.current_layer].id();
        let layer = self.layers.remove(from);
        let id = layer.id();
        self.layers.insert(to, layer);
        self.current_layer = self.layer_index(current).unwrap_or(0);
        info!(layer = %id, from, to, "layer moved");
        self.emit(TimelineEvent::LayerMoved { layer: id, from, to });
        self.load_frame();
        Ok(())
    }

    pub fn set_current_layer(&mut self, index: usize) -> Result<()> {
        self.check_layer(index)?;
        if index != self.current_layer {
            self.current_layer = index;
            let id = self.layers[index].id();
            self.emit(TimelineEvent::CurrentLayerChanged { layer: id, index });
        }
        Ok(())
    }

    fn update_layer(&mut self, index: usize, update: impl FnOnce(&mut Layer)) -> Result<()> {
        self.check_layer(index)?;
        let layer = &mut self.layers[index];
        update(layer);
        let id = layer.id();
        self.emit(TimelineEvent::LayerChanged { layer: id });
        self.load_frame();
        Ok(())
    }

    pub fn set_layer_visible(&mut self, index: usize, visible: bool) -> Result<()> {
        self.update_layer(index, |layer| layer.visible = visible)
    }

    /// Locked layers still display but reject edits, and their items are not
    /// interactive.
    pub fn set_layer_locked(&mut self, index: usize, locked: bool) -> Result<()> {
        self.update_layer(index, |layer| layer.locked = locked)
    }

    pub fn set_layer_opacity(&mut self, index: usize, opacity: f32) -> Result<()> {
        self.update_layer(index, |layer| layer.opacity = opacity.clamp(0.0, 1.0))
    }

    pub fn set_layer_name(&mut self, index: usize, name: &str) -> Result<()> {
        self.update_layer(index, |layer| layer.name = name.to_owned())
    }

    pub fn set_layer_blend_mode(&mut self, index: usize, mode: BlendMode) -> Result<()> {
        self.update_layer(index, |layer| layer.blend_mode = mode)
    }
}
