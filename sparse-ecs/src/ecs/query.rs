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
//! Merge-join iteration over component containers
//!
//! [`World::foreach`] takes a closure and derives the query from its
//! parameter list:
//!
//! | Parameter          | Role     | Passed as                         |
//! |--------------------|----------|-----------------------------------|
//! | `&T`               | required | shared borrow                     |
//! | `&mut T`           | required | exclusive borrow                  |
//! | `Option<&T>`       | optional | `Some` when the entity holds `T`  |
//! | `Option<&mut T>`   | optional | `Some` when the entity holds `T`  |
//!
//! A leading `Entity` parameter selects the entity-receiving shape.
//! Parameter types must be spelled out on the closure:
//!
//! ```
//! use sparse_ecs::ecs::{Component, Entity, World};
//!
//! struct Position(f32);
//! impl Component for Position {}
//! struct Velocity(f32);
//! impl Component for Velocity {}
//!
//! let world = World::new();
//! let e = world.create_entity();
//! world.attach(e, (Position(0.0), Velocity(2.0)));
//!
//! world.foreach(|p: &mut Position, v: &Velocity| p.0 += v.0);
//! world.foreach(|entity: Entity, p: &Position, v: Option<&Velocity>| {
//!     assert_eq!(entity, e);
//!     assert_eq!(p.0, 2.0);
//!     assert!(v.is_some());
//! });
//! ```
//!
//! Required cursors leapfrog: each one seeks (binary search over its
//! remaining ids) to the largest id any other required cursor sits on,
//! until they agree or one runs out. Optional cursors only follow.

use crate::ecs::storage::Storage;
use crate::ecs::{Component, Entity, World};
use std::any::TypeId;
use std::cell::{Ref, RefMut};

/// A closure parameter that can be fetched from a container
pub trait Fetch {
    /// Component type the parameter reads
    type Component: Component;

    /// Borrow held for the duration of one callback
    type Guard<'s>;

    /// Value handed to the callback
    type Item<'g>;

    /// Whether entities lacking the component are skipped
    const REQUIRED: bool;

    /// Borrow the entry at `slot`, if the parameter can be served
    fn acquire<'s>(
        store: &'s dyn Storage<Self::Component>,
        slot: Option<usize>,
    ) -> Option<Self::Guard<'s>>;

    /// Project the borrow into the callback argument
    fn item<'g, 's>(guard: &'g mut Self::Guard<'s>) -> Self::Item<'g>;
}

/// Callback argument type of a [`Fetch`] parameter
pub type FetchItem<'g, P> = <P as Fetch>::Item<'g>;

impl<'x, T: Component> Fetch for &'x T {
    type Component = T;
    type Guard<'s> = Ref<'s, T>;
    type Item<'g> = &'g T;
    const REQUIRED: bool = true;

    fn acquire<'s>(store: &'s dyn Storage<T>, slot: Option<usize>) -> Option<Ref<'s, T>> {
        store.cell(slot?)?.try_borrow().ok()
    }

    fn item<'g, 's>(guard: &'g mut Ref<'s, T>) -> &'g T {
        &**guard
    }
}

impl<'x, T: Component> Fetch for &'x mut T {
    type Component = T;
    type Guard<'s> = RefMut<'s, T>;
    type Item<'g> = &'g mut T;
    const REQUIRED: bool = true;

    fn acquire<'s>(store: &'s dyn Storage<T>, slot: Option<usize>) -> Option<RefMut<'s, T>> {
        store.cell(slot?)?.try_borrow_mut().ok()
    }

    fn item<'g, 's>(guard: &'g mut RefMut<'s, T>) -> &'g mut T {
        &mut **guard
    }
}

impl<'x, T: Component> Fetch for Option<&'x T> {
    type Component = T;
    type Guard<'s> = Option<Ref<'s, T>>;
    type Item<'g> = Option<&'g T>;
    const REQUIRED: bool = false;

    fn acquire<'s>(store: &'s dyn Storage<T>, slot: Option<usize>) -> Option<Option<Ref<'s, T>>> {
        Some(slot.and_then(|slot| store.cell(slot)?.try_borrow().ok()))
    }

    fn item<'g, 's>(guard: &'g mut Option<Ref<'s, T>>) -> Option<&'g T> {
        guard.as_deref()
    }
}

impl<'x, T: Component> Fetch for Option<&'x mut T> {
    type Component = T;
    type Guard<'s> = Option<RefMut<'s, T>>;
    type Item<'g> = Option<&'g mut T>;
    const REQUIRED: bool = false;

    fn acquire<'s>(
        store: &'s dyn Storage<T>,
        slot: Option<usize>,
    ) -> Option<Option<RefMut<'s, T>>> {
        Some(slot.and_then(|slot| store.cell(slot)?.try_borrow_mut().ok()))
    }

    fn item<'g, 's>(guard: &'g mut Option<RefMut<'s, T>>) -> Option<&'g mut T> {
        guard.as_deref_mut()
    }
}

/// Forward-only position in one container's sorted ids
#[derive(Debug, Clone)]
pub struct Cursor<'s> {
    ids: &'s [Entity],
    pos: usize,
    required: bool,
}

impl<'s> Cursor<'s> {
    /// Open a cursor at the first id
    pub fn new(ids: &'s [Entity], required: bool) -> Self {
        Cursor {
            ids,
            pos: 0,
            required,
        }
    }

    /// Id under the cursor, `None` once exhausted
    pub fn current(&self) -> Option<Entity> {
        self.ids.get(self.pos).copied()
    }

    /// Advance to the first id not below `target`
    pub fn seek(&mut self, target: Entity) -> Option<Entity> {
        let rest = self.ids.get(self.pos..).unwrap_or(&[]);
        self.pos += rest.partition_point(|&id| id < target);
        self.current()
    }

    /// Position in the sorted store
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Whether this cursor gates membership
    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// Leapfrog join over `N` cursors
///
/// Yields each entity present under every required cursor, in ascending
/// order, with the store position of each parameter (`None` for an
/// optional parameter the entity lacks).
#[derive(Debug)]
pub struct Join<'s, const N: usize> {
    cursors: [Cursor<'s>; N],
    done: bool,
}

impl<'s, const N: usize> Join<'s, N> {
    /// Build a join; without a required cursor it yields nothing
    pub fn new(cursors: [Cursor<'s>; N]) -> Self {
        let done = !cursors.iter().any(Cursor::is_required);
        if done {
            tracing::warn!("iteration needs at least one required component type");
        }
        Join { cursors, done }
    }

    fn align(&mut self) -> Option<Entity> {
        let mut target = self
            .cursors
            .iter()
            .filter(|c| c.required)
            .map(Cursor::current)
            .try_fold(Entity::new(0), |max, id| id.map(|id| max.max(id)))?;

        loop {
            let mut agreed = true;
            for cursor in self.cursors.iter_mut().filter(|c| c.required) {
                let id = cursor.seek(target)?;
                if id > target {
                    target = id;
                    agreed = false;
                }
            }
            if agreed {
                return Some(target);
            }
        }
    }
}

impl<'s, const N: usize> Iterator for Join<'s, N> {
    type Item = (Entity, [Option<usize>; N]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(entity) = self.align() else {
            self.done = true;
            return None;
        };

        let mut slots = [None; N];
        for (slot, cursor) in slots.iter_mut().zip(self.cursors.iter_mut()) {
            if cursor.required {
                *slot = Some(cursor.pos);
                cursor.pos += 1;
            } else if cursor.seek(entity) == Some(entity) {
                *slot = Some(cursor.pos);
            }
        }
        Some((entity, slots))
    }
}

/// Marker selecting the entity-receiving callback shape
pub struct WithEntity;

/// A closure [`World::foreach`] can drive
///
/// `Marker` encodes the parameter list and is always inferred.
pub trait Each<Marker> {
    /// Run one full pass over the world
    fn run(&mut self, world: &World);
}

fn distinct(types: &[TypeId]) -> bool {
    types
        .iter()
        .enumerate()
        .all(|(i, t)| !types[i + 1..].contains(t))
}

macro_rules! impl_each {
    ($n:literal; $($param:ident $store:ident $slot:ident $guard:ident),+) => {
        impl<Func, $($param: Fetch),+> Each<fn($($param,)+)> for Func
        where
            for<'a> &'a mut Func: FnMut($($param),+) + FnMut($(FetchItem<$param>),+),
        {
            fn run(&mut self, world: &World) {
                #[allow(non_snake_case)]
                fn call_inner<$($param),+>(mut f: impl FnMut($($param),+), $($param: $param),+) {
                    f($($param),+)
                }

                debug_assert!(
                    distinct(&[$(TypeId::of::<$param::Component>()),+]),
                    "a component type appears twice in one foreach"
                );

                world.start_batch();
                {
                    $(let $store = world.container::<$param::Component>();)+
                    $(let $store = $store.store();)+
                    let join = Join::<$n>::new([$(Cursor::new($store.ids(), $param::REQUIRED)),+]);
                    for (_, [$($slot),+]) in join {
                        $(let Some(mut $guard) = $param::acquire(&*$store, $slot) else { continue };)+
                        call_inner(&mut *self, $($param::item(&mut $guard)),+);
                    }
                }
                world.finish_batch();
            }
        }

        impl<Func, $($param: Fetch),+> Each<(WithEntity, fn($($param,)+))> for Func
        where
            for<'a> &'a mut Func:
                FnMut(Entity, $($param),+) + FnMut(Entity, $(FetchItem<$param>),+),
        {
            fn run(&mut self, world: &World) {
                #[allow(non_snake_case)]
                fn call_inner<$($param),+>(
                    mut f: impl FnMut(Entity, $($param),+),
                    entity: Entity,
                    $($param: $param),+
                ) {
                    f(entity, $($param),+)
                }

                debug_assert!(
                    distinct(&[$(TypeId::of::<$param::Component>()),+]),
                    "a component type appears twice in one foreach"
                );

                world.start_batch();
                {
                    $(let $store = world.container::<$param::Component>();)+
                    $(let $store = $store.store();)+
                    let join = Join::<$n>::new([$(Cursor::new($store.ids(), $param::REQUIRED)),+]);
                    for (entity, [$($slot),+]) in join {
                        $(let Some(mut $guard) = $param::acquire(&*$store, $slot) else { continue };)+
                        call_inner(&mut *self, entity, $($param::item(&mut $guard)),+);
                    }
                }
                world.finish_batch();
            }
        }
    };
}

impl_each!(1; P0 s0 i0 g0);
impl_each!(2; P0 s0 i0 g0, P1 s1 i1 g1);
impl_each!(3; P0 s0 i0 g0, P1 s1 i1 g1, P2 s2 i2 g2);
impl_each!(4; P0 s0 i0 g0, P1 s1 i1 g1, P2 s2 i2 g2, P3 s3 i3 g3);
impl_each!(5; P0 s0 i0 g0, P1 s1 i1 g1, P2 s2 i2 g2, P3 s3 i3 g3, P4 s4 i4 g4);
impl_each!(6; P0 s0 i0 g0, P1 s1 i1 g1, P2 s2 i2 g2, P3 s3 i3 g3, P4 s4 i4 g4, P5 s5 i5 g5);
