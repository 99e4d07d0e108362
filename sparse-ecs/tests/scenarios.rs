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
//! End-to-end iteration scenarios
//!
//! Membership, optional parameters and mutation from inside a pass.

use sparse_ecs::ecs::{Component, ComponentRemoved, Entity, Receive, World};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    x: f64,
    y: f64,
}
impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Velocity {
    dx: f64,
    dy: f64,
}
impl Component for Velocity {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Frozen;
impl Component for Frozen {}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Selected;
impl Component for Selected {}

fn pos(x: f64) -> Position {
    Position { x, y: 0.0 }
}

fn vel(dx: f64) -> Velocity {
    Velocity { dx, dy: 0.0 }
}

#[derive(Default)]
struct RemovedPositions {
    entities: std::cell::RefCell<Vec<Entity>>,
}

impl Receive<ComponentRemoved<Position>> for RemovedPositions {
    fn receive(&self, _world: &World, event: &ComponentRemoved<Position>) {
        self.entities.borrow_mut().push(event.entity());
    }
}

fn watch_removals(world: &World) -> Rc<RemovedPositions> {
    let watcher = Rc::new(RemovedPositions::default());
    let weak = Rc::downgrade(&watcher);
    world.emitter::<ComponentRemoved<Position>>().subscribe(weak);
    watcher
}

/// E1 holds both, E2 only velocity, E3 only position.
fn three_entities(world: &World) -> (Entity, Entity, Entity) {
    let e1 = world.create_entity();
    let e2 = world.create_entity();
    let e3 = world.create_entity();
    world.add(e1, pos(1.0));
    world.add(e3, pos(3.0));
    world.add(e1, vel(10.0));
    world.add(e2, vel(20.0));
    (e1, e2, e3)
}

#[test]
fn test_optional_velocity_scenario() {
    let world = World::new();
    let (e1, _e2, e3) = three_entities(&world);

    let mut visits = Vec::new();
    world.foreach(|entity: Entity, _: &Position, v: Option<&Velocity>| {
        visits.push((entity, v.copied()));
    });

    assert_eq!(visits, vec![(e1, Some(vel(10.0))), (e3, None)]);
}

#[test]
fn test_required_pair_visits_intersection_once() {
    let world = World::new();
    let (e1, _e2, _e3) = three_entities(&world);

    let mut visits = Vec::new();
    world.foreach(|entity: Entity, p: &mut Position, v: &Velocity| {
        p.x += v.dx;
        visits.push(entity);
    });

    assert_eq!(visits, vec![e1]);
    assert_eq!(world.get::<Position>(e1), Some(pos(11.0)));
}

#[test]
fn test_remove_driving_component_inside_pass() {
    let world = World::new();
    let watcher = watch_removals(&world);
    let (e1, _e2, e3) = three_entities(&world);

    let mut visits = 0;
    world.foreach(|entity: Entity, _: &Position| {
        visits += 1;
        if entity == e1 {
            world.remove::<Position>(e1);
            assert!(world.has::<Position>(e1), "removal applies after the pass");
        }
    });

    assert_eq!(visits, 2);
    assert!(!world.has::<Position>(e1));
    assert!(world.has::<Position>(e3));
    assert_eq!(*watcher.entities.borrow(), vec![e1]);
}

#[test]
fn test_added_required_component_not_visited_in_same_pass() {
    let world = World::new();
    let (_e1, e2, _e3) = three_entities(&world);

    let mut visits = Vec::new();
    world.foreach(|entity: Entity, _: &Velocity| {
        visits.push(entity);
        let spawned = world.create_entity();
        world.add(spawned, vel(0.0));
    });

    assert_eq!(visits.len(), 2);
    assert_eq!(world.count::<Velocity>(), 4);

    let mut visits = Vec::new();
    world.foreach(|entity: Entity, _: &Position, _: &Velocity| visits.push(entity));
    assert!(!visits.contains(&e2));
}

#[test]
fn test_mutating_other_components_does_not_disturb_pass() {
    let world = World::new();
    let entities: Vec<Entity> = (0..50)
        .map(|i| world.spawn((pos(i as f64), vel(1.0))))
        .collect();

    let mut visited = Vec::new();
    world.foreach(|entity: Entity, p: &Position| {
        visited.push(entity);
        if entity.raw() % 2 == 0 {
            world.remove::<Velocity>(entity);
            world.add(entity, Frozen);
        } else {
            world.add(entity, vel(p.x));
        }
    });

    assert_eq!(visited, entities);
    assert_eq!(world.count::<Velocity>(), 25);
    assert_eq!(world.count::<Frozen>(), 25);
    for &entity in &entities {
        let odd = entity.raw() % 2 == 1;
        assert_eq!(world.has::<Velocity>(entity), odd);
        assert_eq!(world.has::<Frozen>(entity), !odd);
    }
    assert_eq!(world.get::<Velocity>(entities[7]), Some(vel(7.0)));
}

#[test]
fn test_reading_other_entities_of_same_type_inside_pass() {
    let world = World::new();
    let a = world.spawn((pos(1.0),));
    let b = world.spawn((pos(2.0),));

    let mut seen = Vec::new();
    world.foreach(|entity: Entity, p: &mut Position| {
        p.y = 1.0;
        let other = if entity == a { b } else { a };
        seen.push((
            world.with_component(entity, |q: &Position| q.x),
            world.with_component(other, |q: &Position| q.x),
        ));
    });

    // The entity being visited is exclusively borrowed by the pass.
    assert_eq!(seen, vec![(None, Some(2.0)), (None, Some(1.0))]);
    assert_eq!(world.get::<Position>(a).map(|p| p.y), Some(1.0));
}

#[test]
fn test_tag_borrow_is_per_entity() {
    let world = World::new();
    let a = world.spawn((Selected, pos(1.0)));
    let b = world.spawn((Selected, pos(2.0)));

    let mut others_visible = 0;
    let mut inner_visits = 0;
    world.foreach(|entity: Entity, _: &mut Selected| {
        let other = if entity == a { b } else { a };
        if world.with_component(other, |_: &Selected| ()).is_some() {
            others_visible += 1;
        }
        assert!(world.with_component(entity, |_: &Selected| ()).is_none());
        world.foreach(|_: &Selected| inner_visits += 1);
    });

    assert_eq!(others_visible, 2);
    assert_eq!(inner_visits, 2);
}

#[test]
fn test_nested_pass() {
    let world = World::new();
    three_entities(&world);

    let mut pairs = 0;
    world.foreach(|_: &Position| {
        world.foreach(|_: &Velocity| pairs += 1);
    });
    assert_eq!(pairs, 4);
}

#[test]
fn test_lookup_matches_post_resolution_state() {
    let world = World::new();
    let entities: Vec<Entity> = (0..20).map(|_| world.create_entity()).collect();

    // Deterministic pseudo-random mutation sequence.
    let mut state: u32 = 0x2545_f491;
    let mut expected = vec![false; entities.len()];
    for _ in 0..400 {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let index = (state % entities.len() as u32) as usize;
        if state & 0x100 == 0 {
            world.add(entities[index], pos(index as f64));
            expected[index] = true;
        } else {
            world.remove::<Position>(entities[index]);
            expected[index] = false;
        }

        let container = world.container::<Position>();
        let ids: Vec<Entity> = (0..container.count()).map(|i| container.entity_at(i)).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]), "store must stay sorted");
    }

    for (index, &entity) in entities.iter().enumerate() {
        assert_eq!(world.has::<Position>(entity), expected[index]);
        assert_eq!(
            world.get::<Position>(entity).is_some(),
            expected[index],
            "lookup for {entity}"
        );
    }
}

#[test]
fn test_zero_required_parameters_visit_nothing() {
    let world = World::new();
    three_entities(&world);

    let calls = Cell::new(0);
    world.foreach(|_: Option<&Position>| calls.set(calls.get() + 1));
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_empty_required_container_ends_immediately() {
    let world = World::new();
    three_entities(&world);

    let calls = Cell::new(0);
    world.foreach(|_: &Position, _: &Frozen| calls.set(calls.get() + 1));
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_remove_entity_inside_pass() {
    let world = World::new();
    let watcher = watch_removals(&world);
    let (e1, e2, e3) = three_entities(&world);

    world.foreach(|entity: Entity, _: &Velocity| world.remove_entity(entity));

    assert_eq!(world.count::<Velocity>(), 0);
    assert!(!world.has::<Position>(e1));
    assert!(world.has::<Position>(e3));
    assert!(!world.has::<Velocity>(e2));
    assert_eq!(*watcher.entities.borrow(), vec![e1]);
}
