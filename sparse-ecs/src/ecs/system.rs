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
//! System registry
//!
//! Systems are stateful services with at most one live instance per type.
//! A system describes its event wiring through two capability records,
//! filled in by [`System::connect`]:
//!
//! - **published channels**: emitters the system owns and fires;
//! - **subscribed channels**: event types the system receives.
//!
//! Registration links the new system in both directions: its
//! subscriptions are attached to the world bus and to every registered
//! system publishing the same event type (itself included), and its
//! published emitters are handed to every registered subscriber.
//!
//! ```
//! use sparse_ecs::ecs::{Channels, Emitter, Receive, System, World};
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! struct Tick;
//!
//! #[derive(Default)]
//! struct Clock {
//!     ticks: Rc<Emitter<Tick>>,
//! }
//! impl System for Clock {
//!     fn connect(&self, channels: &mut Channels<Self>) {
//!         channels.publish(&self.ticks);
//!     }
//! }
//!
//! #[derive(Default)]
//! struct Frames {
//!     seen: Cell<u32>,
//! }
//! impl Receive<Tick> for Frames {
//!     fn receive(&self, _world: &World, _event: &Tick) {
//!         self.seen.set(self.seen.get() + 1);
//!     }
//! }
//! impl System for Frames {
//!     fn connect(&self, channels: &mut Channels<Self>) {
//!         channels.subscribe::<Tick>();
//!     }
//! }
//!
//! let world = World::new();
//! let clock = world.add_system(Clock::default());
//! let frames = world.add_system(Frames::default());
//! clock.ticks.emit(&world, &Tick);
//! assert_eq!(frames.seen.get(), 1);
//! ```

use crate::ecs::event::{Bus, Emitter, Event, Receive};
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Trait for stateful services registered with a world
///
/// Systems react to events through `&self`; mutable state lives in `Cell`
/// or `RefCell` fields.
pub trait System: Sized + 'static {
    /// Declare published and subscribed event channels
    fn connect(&self, _channels: &mut Channels<Self>) {}

    /// Get the name of this system for debugging
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

struct Published {
    event: TypeId,
    emitter: Rc<dyn Any>,
}

struct Subscription {
    event: TypeId,
    bus: fn(&Bus) -> Rc<dyn Any>,
    link: Rc<dyn Fn(&dyn Any) -> bool>,
}

/// Capability records a system fills in while connecting
pub struct Channels<S> {
    this: Weak<S>,
    published: Vec<Published>,
    subscribed: Vec<Subscription>,
}

impl<S: System> Channels<S> {
    fn new(this: Weak<S>) -> Self {
        Channels {
            this,
            published: Vec::new(),
            subscribed: Vec::new(),
        }
    }

    /// Announce an emitter the system fires
    pub fn publish<E: Event>(&mut self, emitter: &Rc<Emitter<E>>) -> &mut Self {
        self.published.push(Published {
            event: TypeId::of::<E>(),
            emitter: Rc::clone(emitter) as Rc<dyn Any>,
        });
        self
    }

    /// Receive every `E` emitted by the world or another system
    pub fn subscribe<E: Event>(&mut self) -> &mut Self
    where
        S: Receive<E>,
    {
        let this = self.this.clone();
        let link = move |emitter: &dyn Any| match emitter.downcast_ref::<Emitter<E>>() {
            Some(emitter) => {
                let receiver: Weak<dyn Receive<E>> = this.clone();
                emitter.subscribe(receiver);
                true
            }
            None => false,
        };
        self.subscribed.push(Subscription {
            event: TypeId::of::<E>(),
            bus: Bus::emitter_erased::<E>,
            link: Rc::new(link),
        });
        self
    }

    /// Number of published channels
    pub fn published_len(&self) -> usize {
        self.published.len()
    }

    /// Number of subscribed channels
    pub fn subscribed_len(&self) -> usize {
        self.subscribed.len()
    }
}

struct SystemEntry {
    type_id: TypeId,
    name: &'static str,
    instance: Rc<dyn Any>,
    published: Vec<Published>,
    subscribed: Vec<Subscription>,
}

/// Registered systems in registration order
#[derive(Default)]
pub struct SystemRegistry {
    entries: RefCell<Vec<SystemEntry>>,
}

impl SystemRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the instance of `S`, if registered
    pub fn get<S: System>(&self) -> Option<Rc<S>> {
        let entries = self.entries.borrow();
        let entry = entries.iter().find(|e| e.type_id == TypeId::of::<S>())?;
        Rc::clone(&entry.instance).downcast::<S>().ok()
    }

    /// Check if `S` is registered
    pub fn contains<S: System>(&self) -> bool {
        self.entries
            .borrow()
            .iter()
            .any(|e| e.type_id == TypeId::of::<S>())
    }

    /// Number of registered systems
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Check if no system is registered
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Names of the registered systems, in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.borrow().iter().map(|e| e.name).collect()
    }

    /// Register `system` and wire its channels
    ///
    /// # Returns
    ///
    /// The registered instance, or the existing one if `S` was already
    /// registered (the new value is dropped).
    pub(crate) fn register<S: System>(&self, bus: &Bus, system: S) -> Rc<S> {
        if let Some(existing) = self.get::<S>() {
            tracing::warn!(system = system.name(), "system already registered");
            return existing;
        }

        let instance = Rc::new(system);
        let mut channels = Channels::new(Rc::downgrade(&instance));
        instance.connect(&mut channels);
        let Channels {
            published,
            subscribed,
            ..
        } = channels;

        {
            let entries = self.entries.borrow();
            for subscription in &subscribed {
                (subscription.link)(&*(subscription.bus)(bus));
                let emitters = entries
                    .iter()
                    .flat_map(|e| e.published.iter())
                    .chain(published.iter())
                    .filter(|p| p.event == subscription.event);
                for publisher in emitters {
                    (subscription.link)(&*publisher.emitter);
                }
            }
            for publisher in &published {
                let subscribers = entries
                    .iter()
                    .flat_map(|e| e.subscribed.iter())
                    .filter(|s| s.event == publisher.event);
                for subscription in subscribers {
                    (subscription.link)(&*publisher.emitter);
                }
            }
        }

        tracing::debug!(
            system = instance.name(),
            publishes = published.len(),
            subscribes = subscribed.len(),
            "registered system"
        );
        self.entries.borrow_mut().push(SystemEntry {
            type_id: TypeId::of::<S>(),
            name: instance.name(),
            instance: Rc::clone(&instance) as Rc<dyn Any>,
            published,
            subscribed,
        });
        instance
    }

    /// Drop every system, most recently registered first
    pub(crate) fn clear(&self) {
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        if !entries.is_empty() {
            tracing::debug!(count = entries.len(), "clearing systems");
        }
        for entry in entries.into_iter().rev() {
            drop(entry);
        }
    }
}
