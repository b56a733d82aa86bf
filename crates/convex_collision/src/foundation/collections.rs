//! Specialized collection types

pub use slotmap::{SecondaryMap, SlotMap};

/// Free list for object pooling
///
/// Slots are addressed by stable indices. Removing an item returns its slot
/// to the free list, and the next insert reuses it, so once a pool has
/// reached its working size no further allocation happens.
#[derive(Debug, Clone)]
pub struct FreeList<T> {
    items: Vec<Option<T>>,
    free_indices: Vec<usize>,
}

impl<T> FreeList<T> {
    /// Create a new free list
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    /// Create a free list with room for `capacity` items before growing
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            free_indices: Vec::with_capacity(capacity),
        }
    }

    /// Insert an item and return its index
    pub fn insert(&mut self, item: T) -> usize {
        if let Some(index) = self.free_indices.pop() {
            debug_assert!(self.items[index].is_none(), "free slot {index} is occupied");
            self.items[index] = Some(item);
            index
        } else {
            let index = self.items.len();
            self.items.push(Some(item));
            index
        }
    }

    /// Remove an item by index
    pub fn remove(&mut self, index: usize) -> Option<T> {
        let item = self.items.get_mut(index)?.take()?;
        self.free_indices.push(index);
        Some(item)
    }

    /// Get an item by index
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)?.as_ref()
    }

    /// Get a mutable reference to an item by index
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)?.as_mut()
    }

    /// Whether `index` currently holds an item
    pub fn contains(&self, index: usize) -> bool {
        self.get(index).is_some()
    }

    /// Number of live items
    pub fn len(&self) -> usize {
        self.items.len() - self.free_indices.len()
    }

    /// True when no slot is occupied
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of slots ever created (live plus free)
    pub fn slot_count(&self) -> usize {
        self.items.len()
    }

    /// Number of slots waiting for reuse
    pub fn free_count(&self) -> usize {
        self.free_indices.len()
    }

    /// Iterate live items with their indices
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items
            .iter()
            .enumerate()
            .filter_map(|(index, item)| item.as_ref().map(|item| (index, item)))
    }
}

impl<T> Default for FreeList<T> {
    fn default() -> Self {
        Self::new()
    }
}
