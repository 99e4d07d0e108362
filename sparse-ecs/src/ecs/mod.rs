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
//! Entity Component System (ECS) core implementation
//!
//! This module provides:
//! - Entity allocation
//! - Sorted sparse component storage with tag, inline and indirect strategies
//! - Deferred mutation through nested batches
//! - Merge-join iteration with required and optional parameters
//! - A synchronous typed event bus
//! - A system registry with event wiring and dependency injection

mod batch;
mod bundle;
mod component;
mod container;
mod entity;
mod event;
pub mod query;
pub mod storage;
mod system;
mod world;

pub use bundle::Bundle;
pub use component::{Component, Requirements, StorageKind};
pub use container::Container;
pub use entity::{Entity, EntityAllocator};
pub use event::{Bus, ComponentAdded, ComponentRemoved, Emitter, Event, Receive};
pub use query::{Each, Fetch, WithEntity};
pub use system::{Channels, System, SystemRegistry};
pub use world::World;
