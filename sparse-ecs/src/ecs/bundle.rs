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
//! Component bundles for attaching several components in one call

use crate::ecs::{Component, Entity, World};

/// A group of components attached together
///
/// Implemented for tuples of one to eight components. Components are
/// attached left to right.
pub trait Bundle: 'static {
    /// Number of components in the bundle
    const LEN: usize;

    /// Attach every component to `entity`
    fn attach_to(self, world: &World, entity: Entity);
}

macro_rules! impl_bundle {
    ($len:literal; $($name:ident),+) => {
        impl<$($name: Component),+> Bundle for ($($name,)+) {
            const LEN: usize = $len;

            #[allow(non_snake_case)]
            fn attach_to(self, world: &World, entity: Entity) {
                let ($($name,)+) = self;
                $(world.add(entity, $name);)+
            }
        }
    };
}

impl_bundle!(1; A);
impl_bundle!(2; A, B);
impl_bundle!(3; A, B, C);
impl_bundle!(4; A, B, C, D);
impl_bundle!(5; A, B, C, D, E);
impl_bundle!(6; A, B, C, D, E, F);
impl_bundle!(7; A, B, C, D, E, F, G);
impl_bundle!(8; A, B, C, D, E, F, G, H);
