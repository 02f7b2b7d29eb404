//! Helpers shared by the integration tests.

#![allow(dead_code)]

use skirmish::{GameEvent, InputFrame, Simulation};
use skirmish_networking::{InMemoryBackend, Transport};
use skirmish_shared::{Catalog, GameConfig, PlayerId, TransportConfig, Vec2};
use std::sync::Arc;

/// Tick length used throughout, seconds.
pub const DT: f32 = 0.05;

/// Ticks per simulated second at [`DT`].
pub const TICKS_PER_SECOND: usize = 20;

pub fn config() -> GameConfig {
    let mut config = GameConfig::default();
    config.loot.seed = Some(7);
    config.transport = TransportConfig {
        rng_seed: Some(3),
        ..TransportConfig::default()
    };
    config
}

pub fn host(backend: &Arc<InMemoryBackend>, config: &GameConfig) -> Arc<Transport> {
    Arc::new(Transport::host_game(backend.clone(), PlayerId::new("host"), "Hana", &config.transport).unwrap())
}

pub fn guest(backend: &Arc<InMemoryBackend>, host: &Transport, id: &str, config: &GameConfig) -> Arc<Transport> {
    let code = host.session().join_code.to_string();
    Arc::new(Transport::join_game(backend.clone(), PlayerId::new(id), &code, id, &config.transport).unwrap())
}

/// Puts a player somewhere before its simulation starts.
pub fn place(transport: &Transport, position: Vec2, weapon_id: &str) {
    let mut state = transport.local_state();
    state.set_position(position);
    state.weapon_id = weapon_id.to_owned();
    transport.set_local_state(state);
}

pub async fn simulation(transport: Arc<Transport>, config: &GameConfig) -> Simulation {
    Simulation::connect(transport, config.clone(), Arc::new(Catalog::bundled()))
        .await
        .unwrap()
}

/// Ticks every peer `ticks` times, in order.
pub fn run(peers: &mut [&mut Simulation], ticks: usize) {
    for _ in 0..ticks {
        for peer in peers.iter_mut() {
            peer.tick(DT);
        }
    }
}

/// Ticks until `done` holds or `limit` ticks pass. Returns true if it held.
pub fn run_until(
    peers: &mut [&mut Simulation],
    limit: usize,
    mut done: impl FnMut(&[&mut Simulation]) -> bool,
) -> bool {
    for _ in 0..limit {
        if done(peers) {
            return true;
        }
        run(peers, 1);
    }
    done(peers)
}

/// A frame with only the attack button held or released.
pub fn attack(held: bool) -> InputFrame {
    InputFrame {
        attack: held,
        ..InputFrame::default()
    }
}

/// A frame with only the interact button held.
pub fn interact() -> InputFrame {
    InputFrame {
        interact: true,
        ..InputFrame::default()
    }
}

pub fn loot_ids(sim: &Simulation) -> Vec<String> {
    let mut ids: Vec<String> = sim.loot().items().iter().map(|item| item.id.to_string()).collect();
    ids.sort();
    ids
}

pub fn has_match_over(events: &[GameEvent], winner: Option<&PlayerId>) -> bool {
    events
        .iter()
        .any(|event| matches!(event, GameEvent::MatchOver { winner_id, .. } if winner_id.as_ref() == winner))
}
