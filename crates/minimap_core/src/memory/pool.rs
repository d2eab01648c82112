//! # Arena Allocator
//!
//! Fixed-capacity slot storage with generational, typed handles.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A fixed-capacity arena of `T`.
///
/// Slots are reused through a free list. Every reuse bumps the slot's
/// generation, so a handle kept after its object was freed never resolves
/// to the newcomer.
///
/// # Example
///
/// ```rust,ignore
/// let mut icons: Arena<MapIcon> = Arena::new(1024);
///
/// // O(1), no heap allocation
/// let handle = icons.allocate(MapIcon::new("player"))?;
///
/// icons.free(handle);
/// assert!(icons.get(handle).is_none());
/// ```
pub struct Arena<T> {
    /// The storage array.
    storage: Box<[Slot<T>]>,
    /// Free list - indices of available slots.
    free_list: Vec<usize>,
    /// Number of allocated objects.
    allocated_count: usize,
}

struct Slot<T> {
    value: Option<T>,
    generation: u32,
}

/// Typed handle to an object in an [`Arena`].
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    #[allow(clippy::cast_possible_truncation)]
    const fn new(index: usize, generation: u32) -> Self {
        Self {
            index: index as u32,
            generation,
            _marker: PhantomData,
        }
    }

    /// Slot index inside the arena.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }

    /// Generation of the slot when the handle was issued.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.index, self.generation).cmp(&(other.index, other.generation))
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

impl<T> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .field("len", &self.allocated_count)
            .finish()
    }
}

impl<T> Arena<T> {
    /// Creates a new arena with the specified capacity.
    ///
    /// All slots are pre-allocated upfront. A zero capacity arena is valid
    /// and rejects every allocation.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of live objects
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let storage: Vec<Slot<T>> = (0..capacity)
            .map(|_| Slot { value: None, generation: 0 })
            .collect();

        // Reversed so the lowest index is handed out first
        let free_list: Vec<usize> = (0..capacity).rev().collect();

        Self {
            storage: storage.into_boxed_slice(),
            free_list,
            allocated_count: 0,
        }
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.storage.len()
    }

    /// Returns the number of live objects.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.allocated_count
    }

    /// Returns true if no objects are live.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.allocated_count == 0
    }

    /// Returns the number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }

    /// Stores an object and returns its handle.
    ///
    /// This is a **O(1)** operation with **zero heap allocations**.
    ///
    /// # Returns
    ///
    /// A handle to the stored object, or None if the arena is full.
    pub fn allocate(&mut self, value: T) -> Option<Handle<T>> {
        let index = self.free_list.pop()?;
        let slot = &mut self.storage[index];
        slot.value = Some(value);
        self.allocated_count += 1;

        Some(Handle::new(index, slot.generation))
    }

    /// Removes an object.
    ///
    /// # Returns
    ///
    /// The removed object, or None if the handle was stale.
    pub fn free(&mut self, handle: Handle<T>) -> Option<T> {
        let slot = self.storage.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }

        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.index());
        self.allocated_count -= 1;

        Some(value)
    }

    /// Gets a reference to a live object.
    #[inline]
    #[must_use]
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        let slot = self.storage.get(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_ref()
    }

    /// Gets a mutable reference to a live object.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        let slot = self.storage.get_mut(handle.index())?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.value.as_mut()
    }

    /// Returns true if the handle refers to a live object.
    #[inline]
    #[must_use]
    pub fn contains(&self, handle: Handle<T>) -> bool {
        self.get(handle).is_some()
    }

    /// Iterates live objects in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle<T>, &T)> {
        self.storage.iter().enumerate().filter_map(|(index, slot)| {
            slot.value
                .as_ref()
                .map(|value| (Handle::new(index, slot.generation), value))
        })
    }

    /// Iterates live objects mutably in slot order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<T>, &mut T)> {
        self.storage.iter_mut().enumerate().filter_map(|(index, slot)| {
            let generation = slot.generation;
            slot.value
                .as_mut()
                .map(|value| (Handle::new(index, generation), value))
        })
    }

    /// Snapshot of every live handle.
    ///
    /// Iterate this instead of [`Arena::iter`] when the loop body registers
    /// or removes objects.
    #[must_use]
    pub fn handles(&self) -> Vec<Handle<T>> {
        self.iter().map(|(handle, _)| handle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_free() {
        let mut arena: Arena<u32> = Arena::new(4);

        let a = arena.allocate(10).expect("slot");
        let b = arena.allocate(20).expect("slot");
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(a), Some(&10));
        assert_eq!(arena.get(b), Some(&20));

        assert_eq!(arena.free(a), Some(10));
        assert_eq!(arena.len(), 1);
        assert_eq!(arena.free_count(), 3);
    }

    #[test]
    fn test_stale_handle_does_not_resolve() {
        let mut arena: Arena<&str> = Arena::new(1);

        let old = arena.allocate("old").expect("slot");
        arena.free(old);
        let new = arena.allocate("new").expect("slot");

        assert_eq!(old.index(), new.index());
        assert_ne!(old, new);
        assert!(arena.get(old).is_none());
        assert_eq!(arena.free(old), None);
        assert_eq!(arena.get(new), Some(&"new"));
    }

    #[test]
    fn test_full_arena_rejects() {
        let mut arena: Arena<u8> = Arena::new(1);
        assert!(arena.allocate(1).is_some());
        assert!(arena.allocate(2).is_none());

        let mut empty: Arena<u8> = Arena::new(0);
        assert!(empty.allocate(1).is_none());
    }

    #[test]
    fn test_handles_snapshot_survives_mutation() {
        let mut arena: Arena<u32> = Arena::new(8);
        for i in 0..4 {
            arena.allocate(i);
        }

        for handle in arena.handles() {
            if arena.get(handle) == Some(&1) {
                arena.free(handle);
                arena.allocate(99);
            }
        }

        let mut values: Vec<u32> = arena.iter().map(|(_, v)| *v).collect();
        values.sort_unstable();
        assert_eq!(values, vec![0, 2, 3, 99]);
    }

    #[test]
    fn test_iter_mut_updates_in_place() {
        let mut arena: Arena<u32> = Arena::new(3);
        arena.allocate(1);
        arena.allocate(2);

        for (_, value) in arena.iter_mut() {
            *value *= 10;
        }

        let values: Vec<u32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![10, 20]);
    }
}
