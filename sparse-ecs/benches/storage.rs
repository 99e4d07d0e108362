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
//! Benchmarks comparing inline vs indirect storage and batched inserts
//!
//! These benchmarks measure:
//! - Append-order and reverse-order insert cost per strategy
//! - Binary-search lookup throughput
//! - Batched vs unbatched attach through the world

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sparse_ecs::ecs::storage::{IndirectStorage, InlineStorage, Storage};
use sparse_ecs::ecs::{Component, Entity, World};

#[derive(Debug, Clone, Copy)]
struct Position {
    x: f64,
    y: f64,
    z: f64,
}

impl Position {
    fn new(x: f64, y: f64, z: f64) -> Self {
        Position { x, y, z }
    }
}

impl Component for Position {}

fn fill<S: Storage<Position>>(storage: &mut S, ids: impl Iterator<Item = u32>) {
    for i in ids {
        let f = i as f64;
        storage.insert_sorted(Entity::new(i), Position::new(f, f * 2.0, f * 3.0));
    }
}

/// Benchmark: Insert N entities into storage
fn bench_storage_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_insert");

    for entity_count in [100u32, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*entity_count as u64));

        group.bench_with_input(
            BenchmarkId::new("Inline/ascending", entity_count),
            entity_count,
            |b, &count| {
                b.iter(|| {
                    let mut storage = InlineStorage::<Position>::new();
                    fill(&mut storage, 0..count);
                    black_box(storage);
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("Indirect/ascending", entity_count),
            entity_count,
            |b, &count| {
                b.iter(|| {
                    let mut storage = IndirectStorage::<Position>::new();
                    fill(&mut storage, 0..count);
                    black_box(storage);
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("Inline/descending", entity_count),
            entity_count,
            |b, &count| {
                b.iter(|| {
                    let mut storage = InlineStorage::<Position>::new();
                    fill(&mut storage, (0..count).rev());
                    black_box(storage);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: Random access (search) performance
fn bench_storage_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_lookup");

    for entity_count in [100u32, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*entity_count as u64));

        let mut inline = InlineStorage::<Position>::new();
        fill(&mut inline, 0..*entity_count);
        let mut indirect = IndirectStorage::<Position>::new();
        fill(&mut indirect, 0..*entity_count);

        group.bench_with_input(
            BenchmarkId::new("Inline", entity_count),
            entity_count,
            |b, &count| {
                b.iter(|| {
                    let mut sum = 0.0;
                    for i in (0..count).step_by(7) {
                        if let Ok(index) = inline.search(Entity::new(i)) {
                            if let Some(cell) = inline.cell(index) {
                                sum += cell.borrow().x;
                            }
                        }
                    }
                    black_box(sum);
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("Indirect", entity_count),
            entity_count,
            |b, &count| {
                b.iter(|| {
                    let mut sum = 0.0;
                    for i in (0..count).step_by(7) {
                        if let Ok(index) = indirect.search(Entity::new(i)) {
                            if let Some(cell) = indirect.cell(index) {
                                sum += cell.borrow().x;
                            }
                        }
                    }
                    black_box(sum);
                });
            },
        );
    }

    group.finish();
}

/// Benchmark: Attaching through the world, with and without a batch
fn bench_world_attach(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_attach");

    for entity_count in [1000u32, 10000].iter() {
        group.throughput(Throughput::Elements(*entity_count as u64));

        // Reverse order defeats the append fast path when unbatched
        group.bench_with_input(
            BenchmarkId::new("unbatched", entity_count),
            entity_count,
            |b, &count| {
                b.iter(|| {
                    let world = World::new();
                    for i in (0..count).rev() {
                        world.add(Entity::new(i), Position::new(0.0, 0.0, 0.0));
                    }
                    black_box(world.count::<Position>());
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("batched", entity_count),
            entity_count,
            |b, &count| {
                b.iter(|| {
                    let world = World::new();
                    world.batched(|| {
                        for i in (0..count).rev() {
                            world.add(Entity::new(i), Position::new(0.0, 0.0, 0.0));
                        }
                    });
                    black_box(world.count::<Position>());
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_storage_insert,
    bench_storage_lookup,
    bench_world_attach
);
criterion_main!(benches);
