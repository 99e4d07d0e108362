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
//! Event bus and system wiring tests

use sparse_ecs::ecs::{
    Channels, Component, ComponentAdded, ComponentRemoved, Emitter, Entity, Receive, System, World,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
struct Mesh {
    vertices: Vec<f32>,
}
impl Component for Mesh {
    const STABLE_ADDRESS: bool = true;
}

#[derive(Debug, Clone, PartialEq)]
struct Label(&'static str);
impl Component for Label {}

/// Reads the doomed value from inside the remove-event
#[derive(Default)]
struct Undertaker {
    last_words: RefCell<Vec<(Entity, Option<usize>, Option<&'static str>)>>,
}

impl Receive<ComponentRemoved<Mesh>> for Undertaker {
    fn receive(&self, world: &World, event: &ComponentRemoved<Mesh>) {
        let e = event.entity();
        self.last_words.borrow_mut().push((
            e,
            world.with_component(e, |m: &Mesh| m.vertices.len()),
            world.with_component(e, |l: &Label| l.0),
        ));
    }
}

impl System for Undertaker {
    fn connect(&self, channels: &mut Channels<Self>) {
        channels.subscribe::<ComponentRemoved<Mesh>>();
    }
}

#[test]
fn test_remove_event_sees_live_data() {
    let world = World::new();
    let undertaker = world.add_system(Undertaker::default());
    let e = world.spawn((
        Label("cube"),
        Mesh {
            vertices: vec![0.0; 24],
        },
    ));

    world.remove::<Mesh>(e);
    assert_eq!(*undertaker.last_words.borrow(), vec![(e, Some(24), Some("cube"))]);
    assert!(!world.has::<Mesh>(e));
}

#[test]
fn test_remove_entity_fires_while_data_valid() {
    let world = World::new();
    let undertaker = world.add_system(Undertaker::default());
    let e = world.spawn((
        Label("sphere"),
        Mesh {
            vertices: vec![0.0; 3],
        },
    ));

    world.remove_entity(e);
    let last_words = undertaker.last_words.borrow();
    assert_eq!(last_words.len(), 1);
    assert_eq!((last_words[0].0, last_words[0].1), (e, Some(3)));
    assert!(!world.has::<Label>(e));
    assert!(!world.has::<Mesh>(e));
}

#[test]
fn test_batched_removal_sees_live_data() {
    let world = World::new();
    let undertaker = world.add_system(Undertaker::default());
    let a = world.spawn((Mesh { vertices: vec![1.0] },));
    let b = world.spawn((Mesh { vertices: vec![1.0, 2.0] },));

    world.batched(|| {
        world.remove::<Mesh>(b);
        world.remove::<Mesh>(a);
    });
    assert_eq!(
        *undertaker.last_words.borrow(),
        vec![(a, Some(1), None), (b, Some(2), None)]
    );
}

#[test]
fn test_world_drop_fires_before_systems_go() {
    let undertaker = {
        let world = World::new();
        let undertaker = world.add_system(Undertaker::default());
        world.spawn((Mesh { vertices: vec![] },));
        world.spawn((Mesh { vertices: vec![] },));
        undertaker
    };
    assert_eq!(undertaker.last_words.borrow().len(), 2);
}

#[test]
fn test_stable_address_survives_reshuffles() {
    let world = World::new();
    let anchor = world.create_entity();
    let others: Vec<Entity> = (0..64).map(|_| world.create_entity()).collect();

    world.add(anchor, Mesh { vertices: vec![1.0] });
    let before = world
        .with_component(anchor, |m: &Mesh| m as *const Mesh)
        .unwrap();

    for &e in others.iter().rev() {
        world.add(e, Mesh { vertices: vec![] });
    }
    for &e in others.iter().step_by(3) {
        world.remove::<Mesh>(e);
    }

    let after = world
        .with_component(anchor, |m: &Mesh| m as *const Mesh)
        .unwrap();
    assert_eq!(before, after);
}

struct Tick(u32);
struct Tock(u32);

#[derive(Default)]
struct Metronome {
    ticks: Rc<Emitter<Tick>>,
}

impl System for Metronome {
    fn connect(&self, channels: &mut Channels<Self>) {
        channels.publish(&self.ticks);
    }
}

/// Answers every tick with a tock, synchronously
#[derive(Default)]
struct Echo {
    tocks: Rc<Emitter<Tock>>,
}

impl Receive<Tick> for Echo {
    fn receive(&self, world: &World, event: &Tick) {
        self.tocks.emit(world, &Tock(event.0 * 10));
    }
}

impl System for Echo {
    fn connect(&self, channels: &mut Channels<Self>) {
        channels.publish(&self.tocks).subscribe::<Tick>();
    }
}

#[derive(Default)]
struct Listener {
    order: RefCell<Vec<String>>,
}

impl Receive<Tick> for Listener {
    fn receive(&self, _world: &World, event: &Tick) {
        self.order.borrow_mut().push(format!("tick {}", event.0));
    }
}

impl Receive<Tock> for Listener {
    fn receive(&self, _world: &World, event: &Tock) {
        self.order.borrow_mut().push(format!("tock {}", event.0));
    }
}

impl System for Listener {
    fn connect(&self, channels: &mut Channels<Self>) {
        channels.subscribe::<Tick>().subscribe::<Tock>();
    }
}

#[test]
fn test_delivery_is_synchronous_and_ordered() {
    let world = World::new();
    let listener = world.add_system(Listener::default());
    let metronome = world.add_system(Metronome::default());
    world.add_system(Echo::default());

    metronome.ticks.emit(&world, &Tick(1));

    // The listener subscribed to Tick before Echo did, so it hears the
    // tick first; the tock is delivered before emit returns.
    assert_eq!(*listener.order.borrow(), vec!["tick 1", "tock 10"]);
}

#[test]
fn test_registration_order_does_not_matter() {
    let world = World::new();
    world.add_system(Echo::default());
    let metronome = world.add_system(Metronome::default());
    let listener = world.add_system(Listener::default());

    metronome.ticks.emit(&world, &Tick(2));
    let order = listener.order.borrow();
    assert_eq!(order.len(), 2);
    assert!(order.contains(&"tick 2".to_string()));
    assert!(order.contains(&"tock 20".to_string()));
}

#[test]
fn test_world_bus_and_system_emitters_both_reach_receiver() {
    let world = World::new();
    let metronome = world.add_system(Metronome::default());
    let listener = world.add_system(Listener::default());

    world.emit(&Tick(1));
    metronome.ticks.emit(&world, &Tick(2));
    assert_eq!(*listener.order.borrow(), vec!["tick 1", "tick 2"]);
}

#[test]
fn test_dropped_receiver_stops_receiving() {
    let world = World::new();
    let metronome = world.add_system(Metronome::default());
    let listener = world.add_system(Listener::default());
    assert_eq!(metronome.ticks.receiver_count(), 1);

    world.clear_systems();
    drop(listener);
    assert_eq!(metronome.ticks.receiver_count(), 0);
    metronome.ticks.emit(&world, &Tick(1));
}

#[derive(Default)]
struct Janitor {
    swept: Cell<u32>,
}

impl Receive<ComponentAdded<Label>> for Janitor {
    fn receive(&self, world: &World, event: &ComponentAdded<Label>) {
        if world.with_component(event.entity(), |l: &Label| l.0 == "trash") == Some(true) {
            world.remove::<Label>(event.entity());
            self.swept.set(self.swept.get() + 1);
        }
    }
}

impl System for Janitor {
    fn connect(&self, channels: &mut Channels<Self>) {
        channels.subscribe::<ComponentAdded<Label>>();
    }
}

#[test]
fn test_handler_can_undo_the_add_it_observes() {
    let world = World::new();
    let janitor = world.add_system(Janitor::default());

    let keep = world.spawn((Label("keep"),));
    let trash = world.spawn((Label("trash"),));
    world.batched(|| {
        for _ in 0..3 {
            let e = world.create_entity();
            world.add(e, Label("trash"));
        }
    });

    assert!(world.has::<Label>(keep));
    assert!(!world.has::<Label>(trash));
    assert_eq!(world.count::<Label>(), 1);
    assert_eq!(janitor.swept.get(), 4);
}
