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
//! Per-type component containers
//!
//! A container owns the sorted store for one component type, the queues
//! that absorb mutation while a batch is open, and that type's add/remove
//! event channels.
//!
//! # Mutation rules
//!
//! Outside a batch, `add` and `remove` restructure the store immediately.
//! Inside a batch they only touch the queues, so every cursor and borrow
//! into the store stays valid. Lookups never consult the queues: a value
//! added during a batch is invisible until the batch resolves.
//!
//! Events and caller-supplied closures always run with a batch open.
//! Anything they mutate is queued and applied after they return, which is
//! why the store is never restructured while someone holds a borrow of it.

use crate::ecs::component::Hook;
use crate::ecs::event::{Bus, ComponentAdded, ComponentRemoved, Emitter};
use crate::ecs::storage::{storage_for, Storage};
use crate::ecs::{Component, Entity, StorageKind, World};
use crate::EcsError;
use std::any::TypeId;
use std::cell::{Ref, RefCell};
use std::rc::Rc;

/// Storage, pending queues and event channels for one component type
pub struct Container<T: Component> {
    store: RefCell<Box<dyn Storage<T>>>,
    pending_add: RefCell<Vec<(Entity, T)>>,
    pending_remove: RefCell<Vec<Entity>>,
    on_add: Rc<Emitter<ComponentAdded<T>>>,
    on_remove: Rc<Emitter<ComponentRemoved<T>>>,
    requirements: Rc<[Hook]>,
    dependencies: Box<[TypeId]>,
}

impl<T: Component> Container<T> {
    pub(crate) fn new(bus: &Bus, capacity: usize) -> Self {
        let mut requires = crate::ecs::Requirements::new();
        T::requirements(&mut requires);

        let (requirements, dependencies) = requires.into_parts();
        let mut store = storage_for::<T>();
        store.reserve(capacity);

        Container {
            store: RefCell::new(store),
            pending_add: RefCell::new(Vec::new()),
            pending_remove: RefCell::new(Vec::new()),
            on_add: bus.emitter::<ComponentAdded<T>>(),
            on_remove: bus.emitter::<ComponentRemoved<T>>(),
            requirements,
            dependencies,
        }
    }

    /// Storage representation chosen for `T`
    pub fn kind(&self) -> StorageKind {
        self.store.borrow().kind()
    }

    /// Attach `value` to `entity`
    ///
    /// Outside a batch the value is inserted at once (an O(1) append when
    /// `entity` is the newest id) and the add-event fires. Inside a batch
    /// the value is queued and the event fires on resolution. Attaching to
    /// an entity that already holds `T` replaces the value without an event.
    pub fn add(&self, world: &World, entity: Entity, value: T) {
        if world.is_batching() {
            self.queue_add(world, entity, value);
            return;
        }

        world.start_batch();
        let inserted = match self.store.try_borrow_mut() {
            Ok(mut store) => match store.search(entity) {
                Ok(index) => {
                    store.replace(index, value);
                    false
                }
                Err(index) => {
                    store.insert(index, entity, value);
                    true
                }
            },
            Err(_) => {
                self.queue_add(world, entity, value);
                false
            }
        };
        if inserted {
            self.on_add.emit(world, &ComponentAdded::new(entity));
        }
        world.finish_batch();
    }

    /// Detach `T` from `entity`; absent components are ignored
    ///
    /// The remove-event fires while the value is still readable.
    pub fn remove(&self, world: &World, entity: Entity) {
        if world.is_batching() {
            self.drop_queued_add(entity);
            if self.contains(entity) {
                self.pending_remove.borrow_mut().push(entity);
                world.mark_dirty(TypeId::of::<T>());
            }
            return;
        }
        if !self.contains(entity) {
            return;
        }

        world.start_batch();
        self.on_remove.emit(world, &ComponentRemoved::new(entity));
        match self.store.try_borrow_mut() {
            Ok(mut store) => {
                if let Ok(index) = store.search(entity) {
                    store.remove(index);
                }
            }
            Err(_) => {
                self.pending_remove.borrow_mut().push(entity);
                world.mark_dirty(TypeId::of::<T>());
            }
        }
        world.finish_batch();
    }

    /// Apply queued removals and additions, firing their events
    ///
    /// Called by the world when the outermost batch ends. Calling it while
    /// an iteration pass holds this container leaves the queues untouched.
    pub fn resolve_pending(&self, world: &World) {
        world.start_batch();
        self.resolve(world);
        world.finish_batch();
    }

    /// Number of entities in the sorted store
    ///
    /// Inside a batch this is the count as of the batch start.
    pub fn count(&self) -> usize {
        self.store.borrow().len()
    }

    /// Entity at position `index` of the sorted store
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.count()`.
    pub fn entity_at(&self, index: usize) -> Entity {
        self.store.borrow().ids()[index]
    }

    /// Checked variant of [`Container::entity_at`]
    pub fn try_entity_at(&self, index: usize) -> Result<Entity, EcsError> {
        if self.has_pending() {
            return Err(EcsError::BatchInProgress {
                component: std::any::type_name::<T>(),
            });
        }
        let store = self.store.borrow();
        store
            .ids()
            .get(index)
            .copied()
            .ok_or(EcsError::IndexOutOfRange {
                component: std::any::type_name::<T>(),
                index,
                count: store.len(),
            })
    }

    /// Check if `entity` holds `T` in the sorted store
    pub fn contains(&self, entity: Entity) -> bool {
        self.store
            .try_borrow()
            .map_or(false, |store| store.search(entity).is_ok())
    }

    /// Check if queued work is waiting for resolution
    pub fn has_pending(&self) -> bool {
        !self.pending_add.borrow().is_empty() || !self.pending_remove.borrow().is_empty()
    }

    /// Run `f` against the value attached to `entity`
    ///
    /// Returns `None` when the entity has no resolved value, or when that
    /// value is already mutably borrowed by an enclosing pass.
    pub fn with<R>(&self, world: &World, entity: Entity, f: impl FnOnce(&T) -> R) -> Option<R> {
        world.start_batch();
        let result = self.peek(entity, f);
        world.finish_batch();
        result
    }

    /// Run `f` against the value attached to `entity`, mutably
    pub fn with_mut<R>(
        &self,
        world: &World,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        world.start_batch();
        let result = self.poke(entity, f);
        world.finish_batch();
        result
    }

    /// Reserve room for `additional` more entities
    pub fn reserve(&self, additional: usize) {
        if let Ok(mut store) = self.store.try_borrow_mut() {
            store.reserve(additional);
        }
    }

    /// Channel for this type's add-events
    pub fn on_add(&self) -> &Rc<Emitter<ComponentAdded<T>>> {
        &self.on_add
    }

    /// Channel for this type's remove-events
    pub fn on_remove(&self) -> &Rc<Emitter<ComponentRemoved<T>>> {
        &self.on_remove
    }

    pub(crate) fn store(&self) -> Ref<'_, dyn Storage<T>> {
        Ref::map(self.store.borrow(), |store| &**store)
    }

    pub(crate) fn requirements(&self) -> Rc<[Hook]> {
        Rc::clone(&self.requirements)
    }

    /// Membership including queued work, used to attach dependencies once
    pub(crate) fn holds(&self, entity: Entity) -> bool {
        if self.pending_add.borrow().iter().any(|(id, _)| *id == entity) {
            return true;
        }
        self.contains(entity) && !self.pending_remove.borrow().contains(&entity)
    }

    fn peek<R>(&self, entity: Entity, f: impl FnOnce(&T) -> R) -> Option<R> {
        let store = self.store.try_borrow().ok()?;
        let index = store.search(entity).ok()?;
        let value = store.cell(index)?.try_borrow().ok()?;
        Some(f(&*value))
    }

    fn poke<R>(&self, entity: Entity, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let store = self.store.try_borrow().ok()?;
        let index = store.search(entity).ok()?;
        let mut value = store.cell(index)?.try_borrow_mut().ok()?;
        Some(f(&mut *value))
    }

    fn queue_add(&self, world: &World, entity: Entity, value: T) {
        self.pending_add.borrow_mut().push((entity, value));
        world.mark_dirty(TypeId::of::<T>());
    }

    fn drop_queued_add(&self, entity: Entity) {
        let dropped: Vec<(Entity, T)> = {
            let mut pending = self.pending_add.borrow_mut();
            let (dropped, kept) = std::mem::take(&mut *pending)
                .into_iter()
                .partition(|(id, _)| *id == entity);
            *pending = kept;
            dropped
        };
        drop(dropped);
    }

    /// One resolution round. Returns `false` if the store was busy.
    fn resolve(&self, world: &World) -> bool {
        if self.store.try_borrow_mut().is_err() {
            tracing::warn!(
                component = std::any::type_name::<T>(),
                "store still borrowed, deferring resolution"
            );
            world.mark_dirty(TypeId::of::<T>());
            return false;
        }

        let mut removals = std::mem::take(&mut *self.pending_remove.borrow_mut());
        let additions = latest_per_entity(std::mem::take(&mut *self.pending_add.borrow_mut()));
        if removals.is_empty() && additions.is_empty() {
            return true;
        }
        removals.sort_unstable();
        removals.dedup();

        let doomed: Vec<Entity> = {
            let store = self.store.borrow();
            removals
                .into_iter()
                .filter(|&entity| store.search(entity).is_ok())
                .collect()
        };
        for &entity in &doomed {
            self.on_remove.emit(world, &ComponentRemoved::new(entity));
        }

        let mut fresh = Vec::with_capacity(additions.len());
        let mut replaced = 0usize;
        {
            let mut store = self.store.borrow_mut();
            if !doomed.is_empty() {
                store.retain(&mut |entity: Entity| doomed.binary_search(&entity).is_err());
            }

            let mut inserts = Vec::with_capacity(additions.len());
            for (entity, value) in additions {
                match store.search(entity) {
                    Ok(index) => {
                        store.replace(index, value);
                        replaced += 1;
                    }
                    Err(_) => {
                        fresh.push(entity);
                        inserts.push((entity, value));
                    }
                }
            }
            store.merge(inserts);
        }

        if world.config().log_resolves {
            tracing::trace!(
                component = std::any::type_name::<T>(),
                removed = doomed.len(),
                added = fresh.len(),
                replaced,
                "resolved pending changes"
            );
        }

        for entity in fresh {
            self.on_add.emit(world, &ComponentAdded::new(entity));
        }
        true
    }

    fn remove_every(&self, world: &World) {
        if world.is_batching() {
            drop(std::mem::take(&mut *self.pending_add.borrow_mut()));
            let ids: Vec<Entity> = self.store.borrow().ids().to_vec();
            if !ids.is_empty() {
                self.pending_remove.borrow_mut().extend(ids);
                world.mark_dirty(TypeId::of::<T>());
            }
            return;
        }

        world.start_batch();
        let ids: Vec<Entity> = self.store.borrow().ids().to_vec();
        for &entity in &ids {
            self.on_remove.emit(world, &ComponentRemoved::new(entity));
        }
        match self.store.try_borrow_mut() {
            Ok(mut store) => store.clear(),
            Err(_) => {
                self.pending_remove.borrow_mut().extend(ids);
                world.mark_dirty(TypeId::of::<T>());
            }
        }
        world.finish_batch();
    }
}

/// Sort queued additions by entity, keeping the last value queued for each
fn latest_per_entity<T>(mut additions: Vec<(Entity, T)>) -> Vec<(Entity, T)> {
    if additions.len() < 2 {
        return additions;
    }
    additions.sort_by_key(|(entity, _)| *entity);
    let mut latest: Vec<(Entity, T)> = Vec::with_capacity(additions.len());
    for (entity, value) in additions {
        match latest.last_mut() {
            Some(last) if last.0 == entity => last.1 = value,
            _ => latest.push((entity, value)),
        }
    }
    latest
}

/// Type-erased view the world uses for whole-entity and whole-world work
pub(crate) trait AnyContainer {
    fn type_name(&self) -> &'static str;
    fn remove_entity(&self, world: &World, entity: Entity);
    fn remove_all(&self, world: &World);
    fn resolve(&self, world: &World) -> bool;
    fn dependencies(&self) -> &[TypeId];
}

impl<T: Component> AnyContainer for Container<T> {
    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn remove_entity(&self, world: &World, entity: Entity) {
        self.remove(world, entity);
    }

    fn remove_all(&self, world: &World) {
        self.remove_every(world);
    }

    fn resolve(&self, world: &World) -> bool {
        Container::resolve(self, world)
    }

    fn dependencies(&self) -> &[TypeId] {
        &self.dependencies
    }
}
