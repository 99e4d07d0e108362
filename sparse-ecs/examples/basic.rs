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
//! Basic example demonstrating the ECS structure
//!
//! This example shows how to create a world, spawn entities, iterate with
//! required and optional components, and react to lifecycle events from a
//! system.

use sparse_ecs::ecs::{
    Channels, Component, ComponentAdded, ComponentRemoved, Emitter, Entity, Receive, Requirements,
    System, World,
};
use sparse_ecs::WorldConfig;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Clone, Default)]
struct Position {
    x: f32,
    y: f32,
}

impl Component for Position {}

#[derive(Debug, Clone)]
struct Velocity {
    dx: f32,
    dy: f32,
}

impl Component for Velocity {}

#[derive(Debug, Clone)]
struct Light {
    intensity: f32,
}

impl Component for Light {
    fn requirements(requires: &mut Requirements) {
        requires.component::<Position>().system::<LightTracker>();
    }
}

struct Frame(u32);

#[derive(Default)]
struct Clock {
    frames: Rc<Emitter<Frame>>,
}

impl System for Clock {
    fn connect(&self, channels: &mut Channels<Self>) {
        channels.publish(&self.frames);
    }
}

#[derive(Default)]
struct LightTracker {
    lit: Cell<u32>,
}

impl Receive<ComponentAdded<Light>> for LightTracker {
    fn receive(&self, world: &World, event: &ComponentAdded<Light>) {
        let intensity = world.with_component(event.entity(), |l: &Light| l.intensity);
        println!("  [LightTracker] {} lit at {:?}", event.entity(), intensity);
        self.lit.set(self.lit.get() + 1);
    }
}

impl Receive<ComponentRemoved<Light>> for LightTracker {
    fn receive(&self, _world: &World, event: &ComponentRemoved<Light>) {
        println!("  [LightTracker] {} went dark", event.entity());
        self.lit.set(self.lit.get() - 1);
    }
}

impl Receive<Frame> for LightTracker {
    fn receive(&self, _world: &World, event: &Frame) {
        println!("  [LightTracker] frame {}: {} light(s)", event.0, self.lit.get());
    }
}

impl System for LightTracker {
    fn connect(&self, channels: &mut Channels<Self>) {
        channels
            .subscribe::<ComponentAdded<Light>>()
            .subscribe::<ComponentRemoved<Light>>()
            .subscribe::<Frame>();
    }
}

fn main() {
    println!("Sparse ECS - Basic Example");
    println!("==========================\n");

    let config = WorldConfig::from_env().unwrap_or_else(|err| {
        eprintln!("Ignoring environment: {}", err);
        WorldConfig::default()
    });
    let world = World::with_config(config);
    let clock = world.add_system(Clock::default());
    println!("Created world with {} system(s)", world.system_count());

    let movers: Vec<Entity> = (0..3)
        .map(|i| {
            world.spawn((
                Position::default(),
                Velocity {
                    dx: 1.0 + i as f32,
                    dy: 0.5,
                },
            ))
        })
        .collect();
    let lamp = world.create_entity();
    world.add(lamp, Light { intensity: 0.8 });
    println!(
        "Spawned {} movers and a lamp; {} positions total",
        movers.len(),
        world.count::<Position>()
    );

    for frame in 1..=3 {
        world.foreach(|p: &mut Position, v: &Velocity| {
            p.x += v.dx;
            p.y += v.dy;
        });
        clock.frames.emit(&world, &Frame(frame));
    }

    println!("\nFinal positions:");
    world.foreach(|entity: Entity, p: &Position, light: Option<&Light>| {
        let kind = if light.is_some() { "lamp" } else { "mover" };
        println!("  {} ({}): ({:.1}, {:.1})", entity, kind, p.x, p.y);
    });

    world.remove::<Light>(lamp);
    world.clear();
    println!("\nCleared world: {} positions left", world.count::<Position>());
}
