//! # Item Store
//!
//! Arena-based storage for every visual item the timeline knows about.
//!
//! ## Responsibilities
//! - **Item Storage**: `Vec<Slot>` arena addressed by [`ItemId`] handles.
//! - **Recycling**: freed slots go on a free list; reuse bumps the generation.
//! - **Ephemeral Items**: interpolated in-betweens are stored like any other item
//!   but flagged so the display pass frees them on the next refresh.
//!
//! Frame records own handles, not items. Whether an item is alive is always
//! answered here, so a handle that outlived its item is detected by lookup
//! instead of by touching freed memory.

use crate::types::ItemId;
use frameline_data::VisualItem;

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    item: Option<VisualItem>,
    ephemeral: bool,
}

/// The arena of visual items.
#[derive(Clone, Debug, Default)]
pub struct ItemStore {
    slots: Vec<Slot>,
    free_indices: Vec<u32>,
    live: usize,
}

impl ItemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every item and invalidates all handles handed out so far.
    pub fn clear(&mut self) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.item.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free_indices.push(index as u32);
            }
            slot.ephemeral = false;
        }
        self.live = 0;
    }

    /// Adds a persisted item and returns its handle.
    pub fn insert(&mut self, item: VisualItem) -> ItemId {
        self.alloc(item, false)
    }

    /// Adds a display-only item (interpolated pose). It must never be stored in a
    /// frame record.
    pub fn insert_ephemeral(&mut self, item: VisualItem) -> ItemId {
        self.alloc(item, true)
    }

    fn alloc(&mut self, item: VisualItem, ephemeral: bool) -> ItemId {
        self.live += 1;
        if let Some(index) = self.free_indices.pop() {
            let slot = &mut self.slots[index as usize];
            slot.item = Some(item);
            slot.ephemeral = ephemeral;
            ItemId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                item: Some(item),
                ephemeral,
            });
            ItemId {
                index,
                generation: 0,
            }
        }
    }

    fn slot(&self, id: ItemId) -> Option<&Slot> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.item.is_some())
    }

    pub fn get(&self, id: ItemId) -> Option<&VisualItem> {
        self.slot(id).and_then(|slot| slot.item.as_ref())
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut VisualItem> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.item.as_mut())
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.slot(id).is_some()
    }

    pub fn is_ephemeral(&self, id: ItemId) -> bool {
        self.slot(id).is_some_and(|slot| slot.ephemeral)
    }

    /// Frees the item behind `id`. Stale handles are ignored.
    pub fn remove(&mut self, id: ItemId) -> Option<VisualItem> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)?;
        let item = slot.item.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        slot.ephemeral = false;
        self.free_indices.push(id.index);
        self.live -= 1;
        Some(item)
    }

    /// Deep-copies an item into a fresh persisted slot.
    pub fn duplicate(&mut self, id: ItemId) -> Option<ItemId> {
        let copy = self.get(id)?.clone();
        Some(self.insert(copy))
    }

    /// Number of live items, ephemeral ones included.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn ephemeral_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| slot.ephemeral && slot.item.is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::ItemStore;
    use frameline_data::VisualItem;

    #[test]
    fn removed_handle_goes_stale_after_slot_reuse() {
        let mut store = ItemStore::new();
        let first = store.insert(VisualItem::rectangle(1.0, 1.0));
        assert!(store.remove(first).is_some());

        let second = store.insert(VisualItem::ellipse(2.0, 2.0));
        assert_eq!(first.index(), second.index(), "slot should be recycled");
        assert_ne!(first, second);
        assert!(store.get(first).is_none());
        assert!(store.get(second).is_some());
        assert!(store.remove(first).is_none(), "stale remove must be a no-op");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn duplicate_is_independent() {
        let mut store = ItemStore::new();
        let original = store.insert(VisualItem::rectangle(1.0, 1.0));
        let copy = store.duplicate(original).unwrap();

        store.get_mut(copy).unwrap().opacity = 0.25;
        assert_eq!(store.get(original).unwrap().opacity, 1.0);
        assert!(!store.is_ephemeral(copy));
    }

    #[test]
    fn ephemeral_flag_is_tracked_per_slot() {
        let mut store = ItemStore::new();
        let ghost = store.insert_ephemeral(VisualItem::rectangle(1.0, 1.0));
        assert!(store.is_ephemeral(ghost));
        assert_eq!(store.ephemeral_count(), 1);

        store.remove(ghost);
        let solid = store.insert(VisualItem::rectangle(1.0, 1.0));
        assert!(!store.is_ephemeral(solid));
        assert_eq!(store.ephemeral_count(), 0);
    }

    #[test]
    fn clear_invalidates_everything() {
        let mut store = ItemStore::new();
        let a = store.insert(VisualItem::rectangle(1.0, 1.0));
        let b = store.insert(VisualItem::rectangle(2.0, 2.0));
        store.clear();
        assert!(store.is_empty());
        assert!(!store.contains(a));
        assert!(!store.contains(b));
    }
}
