//! # World Benchmark
//!
//! Entity creation, query iteration and garbage collection on a world of plain data components.
//!
//! Run with: `cargo bench --bench world_benchmark`

#![allow(missing_docs)]

use std::sync::Arc;

use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::BenchmarkId;
use criterion::Criterion;
use pulse_ecs::queries;
use pulse_ecs::Component;
use pulse_ecs::ComponentTypeRegistry;
use pulse_ecs::World;
use pulse_ecs::WorldConfig;
use serde::Deserialize;
use serde::Serialize;

#[derive(Clone, Copy, Default, Serialize, Deserialize)]
struct Position {
    x: f32,
    y: f32,
    z: f32,
}

impl Component for Position {}

#[derive(Clone, Copy, Default, Serialize, Deserialize)]
struct Velocity {
    x: f32,
    y: f32,
    z: f32,
}

impl Component for Velocity {}

fn registry() -> Arc<ComponentTypeRegistry> {
    let mut registry = ComponentTypeRegistry::new();
    registry.register::<Position>("Position");
    registry.register::<Velocity>("Velocity");

    Arc::new(registry)
}

fn populated_world(registry: &Arc<ComponentTypeRegistry>, count: usize) -> World {
    let world = World::with_config(
        registry.clone(),
        WorldConfig {
            initial_entity_capacity: count,
            initial_component_capacity: count,
            ..WorldConfig::default()
        },
    );

    for i in 0..count {
        let entity = world.add_entity();
        world.add(entity, Position::default());
        if i % 2 == 0 {
            world.add(
                entity,
                Velocity {
                    x: 1.0,
                    y: 0.5,
                    z: 0.0,
                },
            );
        }
    }

    world
}

fn bench_add_entities(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("add_entities");

    for count in [1_000, 10_000, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| black_box(populated_world(&registry, count).entity_count()));
        });
    }

    group.finish();
}

fn bench_query_iteration(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("for_each2_position_velocity");

    for count in [10_000, 100_000] {
        let world = populated_world(&registry, count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &world, |b, world| {
            b.iter(|| {
                queries::for_each2::<Position, Velocity>(world, |_, position, velocity| {
                    position.x += velocity.x;
                    position.y += velocity.y;
                    position.z += velocity.z;
                    true
                });
            });
        });
    }

    group.finish();
}

fn bench_collect_garbage(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("collect_garbage_half");

    for count in [1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter_batched(
                || {
                    let world = populated_world(&registry, count);
                    for (i, entity) in world.live_entities().into_iter().enumerate() {
                        if i % 2 == 1 {
                            world.remove_entity(entity);
                        }
                    }
                    world
                },
                |world| black_box(world.collect_garbage()),
                criterion::BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_add_entities,
    bench_query_iteration,
    bench_collect_garbage
);
criterion_main!(benches);
