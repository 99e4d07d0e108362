// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Sorted component storage
//!
//! Every strategy keeps its entity ids in one ascending `Vec<Entity>`.
//! Lookups are a binary search over that slice and full scans walk it
//! front to back, which is what the merge-join in [`crate::ecs::query`]
//! relies on.
//!
//! # Strategies
//!
//! ```text
//! Tag:      ids: [1, 4, 9]      slots: [-, -, -]   (borrow flags only)
//! Inline:   ids: [1, 4, 9]      slots: [T, T, T]   (moves on insert/erase)
//! Indirect: ids: [1, 4, 9]      slots: [*, *, *]   (each * is a Box<T>)
//! ```
//!
//! Values are wrapped in `RefCell` so an iteration pass can hold a shared
//! borrow of the whole store while handing out `&mut T` one entry at a time.

use crate::ecs::{Component, Entity, StorageKind};
use std::cell::RefCell;
use std::marker::PhantomData;

/// Storage interface shared by all strategies
///
/// Implementations must keep `ids()` sorted ascending and free of
/// duplicates. Callers are responsible for passing positions obtained from
/// [`Storage::search`].
pub trait Storage<T>: 'static {
    /// Representation used by this storage
    fn kind(&self) -> StorageKind;

    /// Sorted entity ids
    fn ids(&self) -> &[Entity];

    /// Value cell at a position in the sorted sequence
    fn cell(&self, index: usize) -> Option<&RefCell<T>>;

    /// Insert a value at a position, shifting later entries
    fn insert(&mut self, index: usize, entity: Entity, value: T);

    /// Overwrite the value at a position
    fn replace(&mut self, index: usize, value: T);

    /// Erase the entry at a position, shifting later entries
    fn remove(&mut self, index: usize);

    /// Keep only the entries whose entity passes `keep`, preserving order
    fn retain(&mut self, keep: &mut dyn FnMut(Entity) -> bool);

    /// Merge entries sorted by entity and absent from the store
    fn merge(&mut self, sorted: Vec<(Entity, T)>);

    /// Reserve space for at least `additional` more entries
    fn reserve(&mut self, additional: usize);

    /// Drop every entry
    fn clear(&mut self);

    /// Number of stored entries
    fn len(&self) -> usize {
        self.ids().len()
    }

    /// Check if the storage is empty
    fn is_empty(&self) -> bool {
        self.ids().is_empty()
    }

    /// Binary search for an entity
    fn search(&self, entity: Entity) -> Result<usize, usize> {
        self.ids().binary_search(&entity)
    }

    /// Insert keeping the order; O(1) when `entity` follows every stored id
    fn insert_sorted(&mut self, entity: Entity, value: T) {
        match self.search(entity) {
            Ok(index) => self.replace(index, value),
            Err(index) => self.insert(index, entity, value),
        }
    }
}

/// Build the storage matching the component's capabilities
pub fn storage_for<T: Component>() -> Box<dyn Storage<T>> {
    match StorageKind::of::<T>() {
        StorageKind::Tag => Box::new(TagStorage::<T>::new()),
        StorageKind::Inline => Box::new(InlineStorage::<T>::new()),
        StorageKind::Indirect => Box::new(IndirectStorage::<T>::new()),
    }
}

/// How a dense storage holds each value
pub trait Slot<T>: 'static {
    /// Representation this slot type implements
    const KIND: StorageKind;

    /// Wrap a value for storage
    fn wrap(value: T) -> Self;

    /// Access the value cell
    fn cell(&self) -> &RefCell<T>;

    /// Access the value cell mutably
    fn cell_mut(&mut self) -> &mut RefCell<T>;
}

impl<T: 'static> Slot<T> for RefCell<T> {
    const KIND: StorageKind = StorageKind::Inline;

    fn wrap(value: T) -> Self {
        RefCell::new(value)
    }

    fn cell(&self) -> &RefCell<T> {
        self
    }

    fn cell_mut(&mut self) -> &mut RefCell<T> {
        self
    }
}

impl<T: 'static> Slot<T> for Box<RefCell<T>> {
    const KIND: StorageKind = StorageKind::Indirect;

    fn wrap(value: T) -> Self {
        Box::new(RefCell::new(value))
    }

    fn cell(&self) -> &RefCell<T> {
        self
    }

    fn cell_mut(&mut self) -> &mut RefCell<T> {
        self
    }
}

/// Slot for zero-sized marker types
///
/// Holds no data, only the borrow flag, so an iteration pass locks one
/// entity's marker at a time.
pub struct TagSlot<T>(RefCell<T>);

impl<T: 'static> Slot<T> for TagSlot<T> {
    const KIND: StorageKind = StorageKind::Tag;

    fn wrap(value: T) -> Self {
        TagSlot(RefCell::new(value))
    }

    fn cell(&self) -> &RefCell<T> {
        &self.0
    }

    fn cell_mut(&mut self) -> &mut RefCell<T> {
        &mut self.0
    }
}

/// Parallel id/value vectors sorted by entity
///
/// `ids[i]` owns `slots[i]`. The slot type decides whether values live in
/// the vector itself or behind a box.
pub struct DenseStorage<T, S> {
    ids: Vec<Entity>,
    slots: Vec<S>,
    _marker: PhantomData<fn() -> T>,
}

/// Ids-only storage for marker types
pub type TagStorage<T> = DenseStorage<T, TagSlot<T>>;

/// Values stored directly in the sorted sequence
pub type InlineStorage<T> = DenseStorage<T, RefCell<T>>;

/// Values stored in individual heap boxes with stable addresses
pub type IndirectStorage<T> = DenseStorage<T, Box<RefCell<T>>>;

impl<T, S> DenseStorage<T, S> {
    /// Create a new empty storage
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a new storage with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        DenseStorage {
            ids: Vec::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            _marker: PhantomData,
        }
    }
}

impl<T, S> Default for DenseStorage<T, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static, S: Slot<T>> Storage<T> for DenseStorage<T, S> {
    fn kind(&self) -> StorageKind {
        S::KIND
    }

    fn ids(&self) -> &[Entity] {
        &self.ids
    }

    fn cell(&self, index: usize) -> Option<&RefCell<T>> {
        self.slots.get(index).map(|slot| slot.cell())
    }

    fn insert(&mut self, index: usize, entity: Entity, value: T) {
        self.ids.insert(index, entity);
        self.slots.insert(index, S::wrap(value));

        debug_assert_eq!(self.ids.len(), self.slots.len());
    }

    fn replace(&mut self, index: usize, value: T) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot.cell_mut().get_mut() = value;
        }
    }

    fn remove(&mut self, index: usize) {
        if index < self.ids.len() {
            self.ids.remove(index);
            self.slots.remove(index);
        }
    }

    fn retain(&mut self, keep: &mut dyn FnMut(Entity) -> bool) {
        let verdicts: Vec<bool> = self.ids.iter().map(|&id| keep(id)).collect();
        let mut index = 0;
        self.slots.retain(|_| {
            index += 1;
            verdicts[index - 1]
        });
        let mut index = 0;
        self.ids.retain(|_| {
            index += 1;
            verdicts[index - 1]
        });

        debug_assert_eq!(self.ids.len(), self.slots.len());
    }

    fn merge(&mut self, sorted: Vec<(Entity, T)>) {
        let Some(&(first, _)) = sorted.first() else {
            return;
        };
        self.reserve(sorted.len());

        // Monotonic allocation makes this the usual case.
        if self.ids.last().map_or(true, |&last| first > last) {
            for (entity, value) in sorted {
                self.ids.push(entity);
                self.slots.push(S::wrap(value));
            }
            return;
        }

        let old_ids = std::mem::take(&mut self.ids);
        let old_slots = std::mem::take(&mut self.slots);
        self.ids.reserve(old_ids.len() + sorted.len());
        self.slots.reserve(old_slots.len() + sorted.len());

        let mut old = old_ids.into_iter().zip(old_slots).peekable();
        let mut new = sorted.into_iter().peekable();
        loop {
            let take_old = match (old.peek(), new.peek()) {
                (Some((a, _)), Some((b, _))) => a < b,
                (Some(_), None) => true,
                (None, Some(_)) => false,
                (None, None) => break,
            };
            if take_old {
                if let Some((entity, slot)) = old.next() {
                    self.ids.push(entity);
                    self.slots.push(slot);
                }
            } else if let Some((entity, value)) = new.next() {
                self.ids.push(entity);
                self.slots.push(S::wrap(value));
            }
        }

        debug_assert_eq!(self.ids.len(), self.slots.len());
    }

    fn reserve(&mut self, additional: usize) {
        self.ids.reserve(additional);
        self.slots.reserve(additional);
    }

    fn clear(&mut self) {
        self.ids.clear();
        self.slots.clear();
    }
}
