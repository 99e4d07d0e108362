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
//! World container for the ECS
//!
//! The world composes the entity allocator, one container per component
//! type, the event bus, the system registry and the batching state. All of
//! its methods take `&self`, so event handlers and iteration callbacks can
//! call back into the world they were invoked from.

use crate::config::WorldConfig;
use crate::ecs::batch::BatchState;
use crate::ecs::container::AnyContainer;
use crate::ecs::query::Each;
use crate::ecs::{
    Bundle, Bus, Component, Container, Emitter, Entity, EntityAllocator, Event, System,
    SystemRegistry,
};
use crate::EcsError;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// The world contains all entities, components and systems
pub struct World {
    config: WorldConfig,
    entities: EntityAllocator,
    batch: BatchState,
    bus: Bus,
    containers: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
    /// Same containers, type-erased, in creation order
    erased: RefCell<Vec<(TypeId, Rc<dyn AnyContainer>)>>,
    systems: SystemRegistry,
    /// (component, entity) pairs whose dependency hooks are running
    attaching: RefCell<Vec<(TypeId, Entity)>>,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self::with_config(WorldConfig::default())
    }

    /// Create a new empty world with the given configuration
    pub fn with_config(config: WorldConfig) -> Self {
        World {
            config,
            entities: EntityAllocator::new(),
            batch: BatchState::new(),
            bus: Bus::new(),
            containers: RefCell::new(HashMap::new()),
            erased: RefCell::new(Vec::new()),
            systems: SystemRegistry::new(),
            attaching: RefCell::new(Vec::new()),
        }
    }

    /// Configuration this world was built with
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Create a new entity
    ///
    /// No storage is touched until a component is attached.
    pub fn create_entity(&self) -> Entity {
        self.entities.allocate()
    }

    /// Create a new entity and attach `bundle` to it
    pub fn spawn<B: Bundle>(&self, bundle: B) -> Entity {
        let entity = self.create_entity();
        self.attach(entity, bundle);
        entity
    }

    /// Attach one component to `entity`
    ///
    /// Dependencies declared by `T` are attached first, so their add-events
    /// fire before the one for `T`. Attaching a type the entity already
    /// holds replaces the value without an event.
    pub fn add<T: Component>(&self, entity: Entity, component: T) {
        let container = self.container::<T>();
        let hooks = container.requirements();
        if hooks.is_empty() {
            container.add(self, entity, component);
            return;
        }

        let key = (TypeId::of::<T>(), entity);
        if self.attaching.borrow().contains(&key) {
            tracing::trace!(
                component = std::any::type_name::<T>(),
                %entity,
                "dependency cycle, attaching without hooks"
            );
            container.add(self, entity, component);
            return;
        }

        self.attaching.borrow_mut().push(key);
        self.start_batch();
        for hook in hooks.iter() {
            hook(self, entity);
        }
        container.add(self, entity, component);
        {
            let mut attaching = self.attaching.borrow_mut();
            if let Some(index) = attaching.iter().rposition(|k| *k == key) {
                attaching.remove(index);
            }
        }
        self.finish_batch();
    }

    /// Attach several components to `entity` in one batch
    pub fn attach<B: Bundle>(&self, entity: Entity, bundle: B) {
        self.start_batch();
        bundle.attach_to(self, entity);
        self.finish_batch();
    }

    /// Detach `T` from `entity`; a no-op if it is absent
    pub fn remove<T: Component>(&self, entity: Entity) {
        if let Some(container) = self.existing::<T>() {
            container.remove(self, entity);
        }
    }

    /// Detach every component from `entity`
    ///
    /// A remove-event fires for each type the entity held, while the value
    /// is still readable.
    pub fn remove_entity(&self, entity: Entity) {
        let containers = self.erased_containers();
        self.start_batch();
        for container in &containers {
            container.remove_entity(self, entity);
        }
        self.finish_batch();
    }

    /// Remove every component from every entity and reset the allocator
    ///
    /// Called inside an open batch, the removals resolve when that batch
    /// ends while the allocator restarts immediately.
    pub fn clear(&self) {
        let containers = self.erased_containers();
        tracing::debug!(containers = containers.len(), "clearing world");
        self.start_batch();
        for container in &containers {
            container.remove_all(self);
        }
        self.finish_batch();
        self.entities.reset();
    }

    /// Run `f` once for every entity matching its parameter list
    ///
    /// See [`crate::ecs::query`] for the accepted parameter shapes. The pass
    /// runs inside a batch: changes made by `f` apply once it returns.
    pub fn foreach<M, F: Each<M>>(&self, mut f: F) {
        f.run(self);
    }

    /// Number of entities holding `T`
    ///
    /// Inside a batch this is the count as of the batch start.
    pub fn count<T: Component>(&self) -> usize {
        self.existing::<T>().map_or(0, |c| c.count())
    }

    /// Check if `entity` holds `T`
    ///
    /// Components queued in an open batch are not visible yet.
    pub fn has<T: Component>(&self, entity: Entity) -> bool {
        self.existing::<T>().map_or(false, |c| c.contains(entity))
    }

    /// Run `f` against the `T` attached to `entity`
    ///
    /// # Returns
    ///
    /// `None` if the entity does not hold `T`, or if its value is already
    /// mutably borrowed by an enclosing iteration pass.
    pub fn with_component<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&T) -> R,
    ) -> Option<R> {
        self.existing::<T>()?.with(self, entity, f)
    }

    /// Run `f` against the `T` attached to `entity`, mutably
    pub fn with_component_mut<T: Component, R>(
        &self,
        entity: Entity,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        self.existing::<T>()?.with_mut(self, entity, f)
    }

    /// Clone the `T` attached to `entity`
    pub fn get<T: Component + Clone>(&self, entity: Entity) -> Option<T> {
        self.with_component(entity, T::clone)
    }

    /// Entity at position `index` among the holders of `T`
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.count::<T>()`.
    pub fn entity_at<T: Component>(&self, index: usize) -> Entity {
        match self.existing::<T>() {
            Some(container) => container.entity_at(index),
            None => panic!(
                "index {index} out of range for {} (count 0)",
                std::any::type_name::<T>()
            ),
        }
    }

    /// Checked variant of [`World::entity_at`]
    ///
    /// # Errors
    ///
    /// - [`EcsError::IndexOutOfRange`] if `index >= self.count::<T>()`
    /// - [`EcsError::BatchInProgress`] if `T` has unresolved changes
    pub fn try_entity_at<T: Component>(&self, index: usize) -> Result<Entity, EcsError> {
        match self.existing::<T>() {
            Some(container) => container.try_entity_at(index),
            None => Err(EcsError::IndexOutOfRange {
                component: std::any::type_name::<T>(),
                index,
                count: 0,
            }),
        }
    }

    /// Reserve room for `additional` more holders of `T`
    pub fn reserve<T: Component>(&self, additional: usize) {
        self.container::<T>().reserve(additional);
    }

    /// Container for `T`, created on first use
    pub fn container<T: Component>(&self) -> Rc<Container<T>> {
        if let Some(container) = self.existing::<T>() {
            return container;
        }

        let container = Rc::new(Container::<T>::new(&self.bus, self.config.initial_capacity));
        let type_id = TypeId::of::<T>();
        self.containers
            .borrow_mut()
            .insert(type_id, Rc::clone(&container) as Rc<dyn Any>);
        self.erased
            .borrow_mut()
            .push((type_id, Rc::clone(&container) as Rc<dyn AnyContainer>));
        container
    }

    /// Component types with a container, in creation order
    pub fn component_types(&self) -> Vec<&'static str> {
        self.erased
            .borrow()
            .iter()
            .map(|(_, c)| c.type_name())
            .collect()
    }

    /// Register `system` and wire its event channels
    ///
    /// Registering a type twice logs a warning and returns the instance
    /// already registered.
    pub fn add_system<S: System>(&self, system: S) -> Rc<S> {
        self.systems.register(&self.bus, system)
    }

    /// Get the instance of `S`, creating it if needed
    pub fn ensure_system<S: System + Default>(&self) -> Rc<S> {
        if let Some(system) = self.systems.get::<S>() {
            return system;
        }
        tracing::debug!(system = std::any::type_name::<S>(), "creating system on demand");
        self.add_system(S::default())
    }

    /// Get the instance of `S`, if registered
    pub fn system<S: System>(&self) -> Option<Rc<S>> {
        self.systems.get::<S>()
    }

    /// Check if `S` is registered
    pub fn has_system<S: System>(&self) -> bool {
        self.systems.contains::<S>()
    }

    /// Number of registered systems
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Drop every system, most recently registered first
    pub fn clear_systems(&self) {
        self.systems.clear();
    }

    /// Open a (possibly nested) batch
    pub fn start_batch(&self) {
        self.batch.begin();
    }

    /// Close one batch level, resolving pending changes at the outermost
    pub fn finish_batch(&self) {
        if self.batch.finish() {
            self.flush();
        }
    }

    /// Run `f` inside a batch
    pub fn batched<R>(&self, f: impl FnOnce() -> R) -> R {
        self.start_batch();
        let result = f();
        self.finish_batch();
        result
    }

    /// Check if a batch is open
    pub fn is_batching(&self) -> bool {
        self.batch.is_active()
    }

    /// Apply pending changes now; ignored while a batch is open
    pub fn resolve(&self) {
        if self.is_batching() {
            tracing::warn!(depth = self.batch.depth(), "resolve requested inside a batch");
            return;
        }
        self.start_batch();
        self.finish_batch();
    }

    /// Deliver `event` to every subscriber of the world bus
    pub fn emit<E: Event>(&self, event: &E) {
        self.bus.emitter::<E>().emit(self, event);
    }

    /// World bus emitter for `E`
    pub fn emitter<E: Event>(&self) -> Rc<Emitter<E>> {
        self.bus.emitter::<E>()
    }

    pub(crate) fn mark_dirty(&self, type_id: TypeId) {
        self.batch.mark_dirty(type_id);
    }

    /// Membership counting queued changes, for dependency injection
    pub(crate) fn holds<T: Component>(&self, entity: Entity) -> bool {
        self.existing::<T>().map_or(false, |c| c.holds(entity))
    }

    fn existing<T: Component>(&self) -> Option<Rc<Container<T>>> {
        let erased = Rc::clone(self.containers.borrow().get(&TypeId::of::<T>())?);
        match erased.downcast::<Container<T>>() {
            Ok(container) => Some(container),
            Err(_) => unreachable!("container registered under a foreign TypeId"),
        }
    }

    fn erased_containers(&self) -> Vec<Rc<dyn AnyContainer>> {
        self.erased
            .borrow()
            .iter()
            .map(|(_, c)| Rc::clone(c))
            .collect()
    }

    fn erased_container(&self, type_id: TypeId) -> Option<Rc<dyn AnyContainer>> {
        self.erased
            .borrow()
            .iter()
            .find(|(id, _)| *id == type_id)
            .map(|(_, c)| Rc::clone(c))
    }

    /// Order dirty containers so each resolves after the components it requires
    ///
    /// Unrelated containers keep their first-touch order. Requirement cycles
    /// are broken at the first type revisited.
    fn dependency_order(&self, dirty: Vec<TypeId>) -> Vec<TypeId> {
        fn visit(
            world: &World,
            type_id: TypeId,
            dirty: &[TypeId],
            seen: &mut HashSet<TypeId>,
            order: &mut Vec<TypeId>,
        ) {
            if !seen.insert(type_id) {
                return;
            }
            if let Some(container) = world.erased_container(type_id) {
                for &dependency in container.dependencies() {
                    visit(world, dependency, dirty, seen, order);
                }
            }
            if dirty.contains(&type_id) {
                order.push(type_id);
            }
        }

        let mut seen = HashSet::with_capacity(dirty.len());
        let mut order = Vec::with_capacity(dirty.len());
        for &type_id in &dirty {
            visit(self, type_id, &dirty, &mut seen, &mut order);
        }
        order
    }

    /// Resolve dirty containers in rounds until none has pending work
    fn flush(&self) {
        loop {
            let dirty = self.batch.take_dirty();
            if dirty.is_empty() {
                break;
            }

            self.batch.begin();
            let mut progressed = false;
            for type_id in self.dependency_order(dirty) {
                if let Some(container) = self.erased_container(type_id) {
                    progressed |= container.resolve(self);
                }
            }
            self.batch.finish();

            if !progressed {
                break;
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for World {
    fn drop(&mut self) {
        while self.batch.is_active() {
            self.batch.finish();
        }
        self.flush();

        let containers = self.erased_containers();
        if !containers.is_empty() || !self.systems.is_empty() {
            tracing::debug!(
                containers = containers.len(),
                systems = self.systems.len(),
                "tearing down world"
            );
        }
        for container in &containers {
            container.remove_all(self);
        }
        self.systems.clear();
    }
}
