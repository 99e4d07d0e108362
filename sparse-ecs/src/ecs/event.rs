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
//! Synchronous typed event bus
//!
//! Each event type `E` has an emitter role ([`Emitter<E>`]) and a receiver
//! role ([`Receive<E>`]), connected many-to-many. Delivery is synchronous:
//! `emit` returns only after every receiver has run, in subscription order.
//! A receiver that emits another event recurses into that delivery
//! immediately.
//!
//! Emitters hold receivers weakly. Dropping a receiver ends its
//! subscriptions at the next emit; dropping an emitter drops its whole
//! subscriber list.
//!
//! Receivers take `&self`. Stateful receivers keep their state in `Cell`
//! or `RefCell`, which is what lets a handler be re-entered by an event it
//! caused.

use crate::ecs::{Entity, World};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

/// Marker for types that can travel over the bus
pub trait Event: 'static {}

impl<T: 'static> Event for T {}

/// Receiver role for event type `E`
pub trait Receive<E>: 'static {
    /// Handle one event
    fn receive(&self, world: &World, event: &E);
}

/// Emitter role for event type `E`
pub struct Emitter<E> {
    receivers: RefCell<Vec<Weak<dyn Receive<E>>>>,
}

impl<E: Event> Emitter<E> {
    /// Create an emitter with no subscribers
    pub fn new() -> Self {
        Emitter {
            receivers: RefCell::new(Vec::new()),
        }
    }

    /// Subscribe a receiver; subscribing the same receiver twice is a no-op
    pub fn subscribe(&self, receiver: Weak<dyn Receive<E>>) {
        let mut receivers = self.receivers.borrow_mut();
        let address = receiver.as_ptr() as *const ();
        if receivers.iter().any(|r| r.as_ptr() as *const () == address) {
            return;
        }
        receivers.push(receiver);
    }

    /// Deliver an event to every live subscriber
    ///
    /// Receivers subscribed during delivery start with the next emit.
    pub fn emit(&self, world: &World, event: &E) {
        let snapshot: Vec<Weak<dyn Receive<E>>> = {
            let mut receivers = self.receivers.borrow_mut();
            receivers.retain(|r| r.strong_count() > 0);
            receivers.clone()
        };
        for receiver in snapshot {
            if let Some(receiver) = receiver.upgrade() {
                receiver.receive(world, event);
            }
        }
    }

    /// Number of live subscribers
    pub fn receiver_count(&self) -> usize {
        self.receivers
            .borrow()
            .iter()
            .filter(|r| r.strong_count() > 0)
            .count()
    }
}

impl<E: Event> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("event", &std::any::type_name::<E>())
            .field("receivers", &self.receivers.borrow().len())
            .finish()
    }
}

/// The world's own emitters, one per event type
///
/// Component containers publish their lifecycle events through the bus
/// emitter of that exact type, so a system subscribing to
/// `ComponentAdded<Light>` is linked before or after the first light exists.
#[derive(Default)]
pub struct Bus {
    emitters: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

impl Bus {
    /// Create an empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the emitter for `E`, creating it on first use
    pub fn emitter<E: Event>(&self) -> Rc<Emitter<E>> {
        let erased = self
            .emitters
            .borrow_mut()
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Rc::new(Emitter::<E>::new()) as Rc<dyn Any>)
            .clone();
        match erased.downcast::<Emitter<E>>() {
            Ok(emitter) => emitter,
            Err(_) => unreachable!("bus emitter registered under a foreign TypeId"),
        }
    }

    pub(crate) fn emitter_erased<E: Event>(bus: &Bus) -> Rc<dyn Any> {
        bus.emitter::<E>()
    }

    /// Number of event types with an emitter
    pub fn len(&self) -> usize {
        self.emitters.borrow().len()
    }

    /// Check if no emitter was created yet
    pub fn is_empty(&self) -> bool {
        self.emitters.borrow().is_empty()
    }
}

/// Fired once a component instance becomes visible on an entity
pub struct ComponentAdded<T> {
    entity: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ComponentAdded<T> {
    pub(crate) fn new(entity: Entity) -> Self {
        ComponentAdded {
            entity,
            _marker: PhantomData,
        }
    }

    /// Entity that received the component
    pub fn entity(&self) -> Entity {
        self.entity
    }
}

/// Fired before a component instance disappears from an entity
///
/// The value is still in its container while receivers run, so it can be
/// read through [`World::with_component`].
pub struct ComponentRemoved<T> {
    entity: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ComponentRemoved<T> {
    pub(crate) fn new(entity: Entity) -> Self {
        ComponentRemoved {
            entity,
            _marker: PhantomData,
        }
    }

    /// Entity losing the component
    pub fn entity(&self) -> Entity {
        self.entity
    }
}
