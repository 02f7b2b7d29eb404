//! Benchmark for host loot handling.
//!
//! Run with: cargo bench --package skirmish_economy --bench loot_benchmark

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use skirmish_economy::{nearest_loot, LootAuthority, LootSettings};
use skirmish_shared::{Catalog, PlayerId, PlayerState, RecordingSink, Vec2};
use std::collections::HashMap;
use std::sync::Arc;

fn authority(count: usize) -> LootAuthority {
    let mut loot = LootAuthority::new(
        PlayerId::new("host"),
        Arc::new(Catalog::bundled()),
        LootSettings::default(),
        42,
        Arc::new(RecordingSink::new()),
    );
    loot.spawn_random_loot(count);
    loot
}

fn bench_spawn(c: &mut Criterion) {
    let mut group = c.benchmark_group("loot_spawn");
    group.throughput(Throughput::Elements(100));
    group.bench_function("spawn_random_100", |b| {
        b.iter_batched(|| authority(0), |mut loot| black_box(loot.spawn_random_loot(100)), BatchSize::SmallInput);
    });
    group.finish();
}

fn bench_pickup(c: &mut Criterion) {
    c.bench_function("pickup_request_granted", |b| {
        b.iter_batched(
            || {
                let loot = authority(64);
                let target = loot.items()[32].clone();
                let player = PlayerState::new(PlayerId::new("bob"), "Bob", target.x, target.y);
                let players: HashMap<_, _> = [(player.id.clone(), player)].into_iter().collect();
                (loot, target.id, players)
            },
            |(mut loot, loot_id, players)| black_box(loot.handle_pickup_request(&PlayerId::new("bob"), &loot_id, &players)),
            BatchSize::SmallInput,
        );
    });
}

fn bench_nearest(c: &mut Criterion) {
    let loot = authority(256);
    c.bench_function("nearest_loot_256", |b| {
        b.iter(|| nearest_loot(black_box(loot.items()), black_box(Vec2::new(1000.0, 1000.0)), 120.0).is_some());
    });
}

criterion_group!(benches, bench_spawn, bench_pickup, bench_nearest);
criterion_main!(benches);
