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
//! Entity identifiers
//!
//! Entities are opaque handles. They carry no data and are only meaningful
//! as keys into component containers. Allocation never touches storage.

use std::cell::Cell;
use std::fmt;

/// Unique identifier for an entity
///
/// Ordering follows allocation order, which is what keeps the common
/// "attach to the newest entity" path an O(1) append in every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity(u32);

impl Entity {
    /// Create an entity handle from a raw value
    pub const fn new(id: u32) -> Self {
        Entity(id)
    }

    /// Get the raw u32 value
    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Monotonic entity id allocator
#[derive(Debug, Default)]
pub struct EntityAllocator {
    next: Cell<u32>,
}

impl EntityAllocator {
    /// Create an allocator starting at id 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id
    pub fn allocate(&self) -> Entity {
        let id = self.next.get();
        match id.checked_add(1) {
            Some(next) => self.next.set(next),
            None => tracing::error!(id, "entity identifier space exhausted"),
        }
        Entity(id)
    }

    /// Number of ids handed out since the last reset
    pub fn allocated(&self) -> u32 {
        self.next.get()
    }

    /// Restart allocation at id 0
    pub fn reset(&self) {
        self.next.set(0);
    }
}
