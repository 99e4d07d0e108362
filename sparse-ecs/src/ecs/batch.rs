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
//! Deferred-mutation bookkeeping
//!
//! A nesting counter plus the list of containers that queued work while it
//! was non-zero. The world drains the list when the outermost batch ends.

use std::any::TypeId;
use std::cell::{Cell, RefCell};

/// Batch nesting depth and the containers touched inside it
#[derive(Debug, Default)]
pub struct BatchState {
    depth: Cell<u32>,
    dirty: RefCell<Vec<TypeId>>,
}

impl BatchState {
    /// Create an idle batch state
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if any batch is open
    pub fn is_active(&self) -> bool {
        self.depth.get() > 0
    }

    /// Current nesting depth
    pub fn depth(&self) -> u32 {
        self.depth.get()
    }

    /// Open a (possibly nested) batch
    pub fn begin(&self) {
        self.depth.set(self.depth.get() + 1);
    }

    /// Close one batch level
    ///
    /// Returns `true` when this closed the outermost batch. Closing with no
    /// open batch is ignored and returns `false`.
    pub fn finish(&self) -> bool {
        match self.depth.get() {
            0 => {
                tracing::warn!("finish_batch called without a matching start_batch");
                false
            }
            depth => {
                self.depth.set(depth - 1);
                depth == 1
            }
        }
    }

    /// Record that a container queued work, keeping first-touch order
    pub fn mark_dirty(&self, type_id: TypeId) {
        let mut dirty = self.dirty.borrow_mut();
        if !dirty.contains(&type_id) {
            dirty.push(type_id);
        }
    }

    /// Take the containers to resolve, in first-touch order
    pub fn take_dirty(&self) -> Vec<TypeId> {
        std::mem::take(&mut *self.dirty.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nesting_resolves_once() {
        let batch = BatchState::new();
        batch.begin();
        batch.begin();
        assert_eq!(batch.depth(), 2);
        assert!(!batch.finish());
        assert!(batch.is_active());
        assert!(batch.finish());
        assert!(!batch.is_active());
    }

    #[test]
    fn test_unbalanced_finish_is_ignored() {
        let batch = BatchState::new();
        assert!(!batch.finish());
        assert_eq!(batch.depth(), 0);
    }

    #[test]
    fn test_dirty_keeps_first_touch_order() {
        let batch = BatchState::new();
        batch.mark_dirty(TypeId::of::<u32>());
        batch.mark_dirty(TypeId::of::<u8>());
        batch.mark_dirty(TypeId::of::<u32>());
        assert_eq!(batch.take_dirty(), vec![TypeId::of::<u32>(), TypeId::of::<u8>()]);
        assert!(batch.take_dirty().is_empty());
    }
}
