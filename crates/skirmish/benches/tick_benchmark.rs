//! Benchmark for the per-peer simulation tick.
//!
//! Run with: cargo bench --package skirmish --bench tick_benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skirmish::combat::resolve_attack;
use skirmish::{Arena, InputFrame, Simulation};
use skirmish_networking::{InMemoryBackend, PlayerSnapshot, Transport};
use skirmish_shared::{Catalog, GameConfig, PlayerId, PlayerState, TransportConfig, Vec2, WorldConfig};
use std::sync::Arc;

const PEERS: usize = 8;

fn lobby(runtime: &tokio::runtime::Runtime) -> Vec<Simulation> {
    let backend = InMemoryBackend::shared();
    let mut config = GameConfig::default();
    config.loot.seed = Some(1);
    config.transport = TransportConfig {
        rng_seed: Some(1),
        ..TransportConfig::default()
    };
    let catalog = Arc::new(Catalog::bundled());

    let host = Transport::host_game(backend.clone(), PlayerId::new("p0"), "p0", &config.transport).unwrap();
    let code = host.session().join_code.to_string();
    let mut transports = vec![Arc::new(host)];
    for i in 1..PEERS {
        let id = format!("p{i}");
        let peer = Transport::join_game(backend.clone(), PlayerId::new(id.as_str()), &code, &id, &config.transport).unwrap();
        transports.push(Arc::new(peer));
    }

    transports
        .into_iter()
        .map(|transport| {
            let mut snapshot = PlayerSnapshot::new(&transport).unwrap();
            runtime.block_on(snapshot.ready()).unwrap();
            Simulation::new(transport, snapshot, config.clone(), Arc::clone(&catalog)).unwrap()
        })
        .collect()
}

fn bench_tick(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
    let mut peers = lobby(&runtime);
    peers[0].start_match().unwrap();

    let input = InputFrame {
        move_x: 1.0,
        move_y: 0.5,
        aim_x: 1.0,
        ..InputFrame::default()
    };
    c.bench_function("tick_8_peers", |b| {
        b.iter(|| {
            for peer in &mut peers {
                peer.push_input(input);
                black_box(peer.tick(1.0 / 60.0));
            }
        });
    });
}

fn bench_physics(c: &mut Criterion) {
    let mut arena = Arena::from_config(&WorldConfig::default());
    for i in 0..16 {
        let offset = i as f32 * 110.0;
        arena.add_obstacle(skirmish::Aabb::from_corner(100.0 + offset, 900.0, 60.0, 60.0));
    }
    c.bench_function("arena_step_16_obstacles", |b| {
        b.iter(|| arena.step(black_box(Vec2::new(1000.0, 930.0)), black_box(Vec2::new(200.0, 40.0)), 1.0 / 60.0));
    });
}

fn bench_melee(c: &mut Criterion) {
    let catalog = Catalog::bundled();
    let mut attacker = PlayerState::new(PlayerId::new("a"), "a", 500.0, 500.0);
    attacker.weapon_id = "spear".to_owned();
    let crowd: Vec<PlayerState> = (0..32)
        .map(|i| {
            let angle = i as f32 * 0.2;
            PlayerState::new(PlayerId::new(format!("d{i}")), "d", 500.0 + 80.0 * angle.cos(), 500.0 + 80.0 * angle.sin())
        })
        .collect();
    c.bench_function("resolve_attack_32_defenders", |b| {
        b.iter(|| {
            let mut defenders = crowd.clone();
            black_box(resolve_attack(&mut attacker, defenders.iter_mut(), &catalog))
        });
    });
}

criterion_group!(benches, bench_tick, bench_physics, bench_melee);
criterion_main!(benches);
