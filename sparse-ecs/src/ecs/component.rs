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
//! Component definition and per-type capabilities
//!
//! Components are typed data units (or markers) attached to entities.
//! Each type answers two questions once, when its container is created:
//!
//! - **How is it stored?** [`StorageKind::of`] inspects the type: empty
//!   types become tags, types asking for [`Component::STABLE_ADDRESS`] are
//!   boxed, everything else is stored inline.
//! - **What must come with it?** [`Component::requirements`] registers
//!   hooks that the world runs whenever the component is attached, so a
//!   light can always count on its transform being there.

use crate::ecs::{Entity, System, World};
use std::any::TypeId;
use std::rc::Rc;

/// Trait that all components must implement
///
/// The defaults give an inline component with no dependencies:
///
/// ```
/// use sparse_ecs::ecs::Component;
///
/// struct Health(u32);
/// impl Component for Health {}
/// ```
pub trait Component: Sized + 'static {
    /// Keep every instance at a fixed address for as long as it is attached
    ///
    /// Costs one allocation per instance and an extra indirection on access.
    const STABLE_ADDRESS: bool = false;

    /// Declare the components and systems this type depends on
    fn requirements(_requires: &mut Requirements) {}
}

/// Storage representation chosen for a component type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// Only the entity id is stored
    Tag,
    /// Values live directly in the sorted sequence and move on mutation
    Inline,
    /// Each value is boxed and never moves while attached
    Indirect,
}

impl StorageKind {
    /// Capability query for a component type
    pub fn of<T: Component>() -> Self {
        if T::STABLE_ADDRESS {
            StorageKind::Indirect
        } else if std::mem::size_of::<T>() == 0 {
            StorageKind::Tag
        } else {
            StorageKind::Inline
        }
    }
}

pub(crate) type Hook = Rc<dyn Fn(&World, Entity)>;

/// Dependencies declared by a component type
///
/// Hooks run in declaration order, before the owning component's own
/// add-event fires.
#[derive(Default)]
pub struct Requirements {
    hooks: Vec<Hook>,
    names: Vec<&'static str>,
    components: Vec<TypeId>,
}

impl Requirements {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Require component `D`, default-constructed when missing
    pub fn component<D: Component + Default>(&mut self) -> &mut Self {
        self.component_with(D::default)
    }

    /// Require component `D`, built by `make` when missing
    pub fn component_with<D, F>(&mut self, make: F) -> &mut Self
    where
        D: Component,
        F: Fn() -> D + 'static,
    {
        self.names.push(std::any::type_name::<D>());
        self.components.push(TypeId::of::<D>());
        self.hooks.push(Rc::new(move |world: &World, entity: Entity| {
            if !world.holds::<D>(entity) {
                world.add(entity, make());
            }
        }));
        self
    }

    /// Require system `S` to exist
    pub fn system<S: System + Default>(&mut self) -> &mut Self {
        self.names.push(std::any::type_name::<S>());
        self.hooks.push(Rc::new(|world: &World, _: Entity| {
            world.ensure_system::<S>();
        }));
        self
    }

    /// Type names of everything declared, in declaration order
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    /// Number of declared dependencies
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Check if nothing was declared
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Required component types, in declaration order
    pub fn components(&self) -> &[TypeId] {
        &self.components
    }

    pub(crate) fn into_parts(self) -> (Rc<[Hook]>, Box<[TypeId]>) {
        (self.hooks.into(), self.components.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Transform {
        _x: f32,
    }
    impl Component for Transform {}

    struct Selected;
    impl Component for Selected {}

    struct Mesh {
        _vertices: Vec<f32>,
    }
    impl Component for Mesh {
        const STABLE_ADDRESS: bool = true;
    }

    struct Light;
    impl Component for Light {
        fn requirements(requires: &mut Requirements) {
            requires.component::<Transform>();
        }
    }

    #[test]
    fn test_storage_kind_selection() {
        assert_eq!(StorageKind::of::<Transform>(), StorageKind::Inline);
        assert_eq!(StorageKind::of::<Selected>(), StorageKind::Tag);
        assert_eq!(StorageKind::of::<Mesh>(), StorageKind::Indirect);
    }

    #[test]
    fn test_stable_address_wins_over_tag() {
        struct Anchor;
        impl Component for Anchor {
            const STABLE_ADDRESS: bool = true;
        }
        assert_eq!(StorageKind::of::<Anchor>(), StorageKind::Indirect);
    }

    #[test]
    fn test_requirements_are_collected() {
        let mut requires = Requirements::new();
        Light::requirements(&mut requires);
        assert_eq!(requires.len(), 1);
        assert!(requires.names()[0].ends_with("Transform"));
        assert_eq!(requires.components(), &[TypeId::of::<Transform>()]);

        let mut none = Requirements::new();
        Transform::requirements(&mut none);
        assert!(none.is_empty());
    }
}
