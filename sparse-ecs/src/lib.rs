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
//! # Sparse ECS
//!
//! A single-threaded entity-component runtime built around sorted sparse
//! storage.
//!
//! ## Features
//!
//! - **Sorted Storage**: One ascending container per component type, with
//!   tag, inline or address-stable representation chosen per type
//! - **Deferred Mutation**: Nested batches queue adds and removes so
//!   iteration never sees its storage restructured
//! - **Merge-Join Iteration**: Closures declare required and optional
//!   components through their parameter types
//! - **Typed Events**: Synchronous publish/subscribe, including component
//!   lifecycle events
//! - **Systems**: One instance per type, wired to emitters on registration,
//!   with dependency injection from component declarations
//!
//! ## Example
//!
//! ```rust
//! use sparse_ecs::ecs::{Component, Entity, World};
//!
//! struct Position(f32, f32);
//! impl Component for Position {}
//!
//! struct Velocity(f32, f32);
//! impl Component for Velocity {}
//!
//! let world = World::new();
//! let moving = world.spawn((Position(0.0, 0.0), Velocity(1.0, 0.5)));
//! let parked = world.spawn((Position(5.0, 5.0),));
//!
//! world.foreach(|p: &mut Position, v: &Velocity| {
//!     p.0 += v.0;
//!     p.1 += v.1;
//! });
//!
//! assert_eq!(world.with_component(moving, |p: &Position| p.0), Some(1.0));
//! assert_eq!(world.with_component(parked, |p: &Position| p.0), Some(5.0));
//! ```

#![warn(missing_docs)]

/// Entity Component System implementation
pub mod ecs;

/// World configuration
pub mod config;

/// Error type for checked operations
pub mod error;

pub use config::WorldConfig;
pub use ecs::{Entity, World};
pub use error::EcsError;
