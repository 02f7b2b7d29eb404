//! Match start, the closing zone and game over.

mod common;

use common::{config, guest, has_match_over, host, run, simulation};
use skirmish::GameEvent;
use skirmish_networking::{InMemoryBackend, NetworkConditions};
use skirmish_shared::{GameConfig, PlayerId, SessionPhase, ZoneConfig};
use std::sync::Arc;

/// The zone has already closed when the match starts.
fn deadly_zone() -> GameConfig {
    let mut config = config();
    config.zone = ZoneConfig {
        start_radius: 0.0,
        end_radius: 0.0,
        shrink_duration_ms: 0,
        damage_per_second: 10_000.0,
    };
    config
}

#[tokio::test]
async fn last_player_standing_wins() {
    let backend = InMemoryBackend::shared();
    let config = deadly_zone();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    let host_events = h.events();
    let guest_events = g.events();
    run(&mut [&mut h, &mut g], 2);

    h.start_match().unwrap();
    // The host ticks first and falls to the zone; the guest is still standing.
    h.tick(common::DT);
    assert!(!h.local_player().is_alive);
    assert_eq!(h.phase(), SessionPhase::Ended);
    assert_eq!(h.transport().session().phase, SessionPhase::Ended);

    let winner = PlayerId::new("gin");
    let events = host_events.drain();
    assert!(has_match_over(&events, Some(&winner)));
    let stats = events.iter().find_map(|event| match event {
        GameEvent::MatchOver { stats, .. } => Some(stats.clone()),
        _ => None,
    });
    assert_eq!(stats.map(|stats| stats.len()), Some(2));

    g.tick(common::DT);
    assert_eq!(g.phase(), SessionPhase::Ended);
    assert!(has_match_over(&guest_events.drain(), Some(&winner)));
    assert!(!g.world_state().conflict_zone.active);

    // Nobody respawns once the match is over.
    run(&mut [&mut h, &mut g], 200);
    assert!(!h.local_player().is_alive);
    assert_eq!(h.phase(), SessionPhase::Ended);
}

#[tokio::test]
async fn host_can_start_a_new_match() {
    let backend = InMemoryBackend::shared();
    let config = deadly_zone();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    run(&mut [&mut h, &mut g], 2);

    h.start_match().unwrap();
    run(&mut [&mut h, &mut g], 2);
    assert_eq!(g.phase(), SessionPhase::Ended);

    h.start_match().unwrap();
    assert_eq!(h.phase(), SessionPhase::Active);
    assert!(h.local_player().is_alive);
    assert_eq!(h.local_player().kills, 0);

    g.tick(common::DT);
    assert_eq!(g.phase(), SessionPhase::Active);
    assert!(g.local_player().is_alive);
}

#[tokio::test]
async fn repeated_match_announcements_fire_once() {
    let conditions = NetworkConditions {
        packet_loss_percent: 0,
        duplicate_percent: 100,
        reorder_percent: 0,
    };
    let backend = Arc::new(InMemoryBackend::with_conditions(conditions, 4));
    let config = deadly_zone();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    let guest_events = g.events();
    run(&mut [&mut h, &mut g], 2);

    h.start_match().unwrap();
    run(&mut [&mut h, &mut g], 4);
    assert_eq!(g.phase(), SessionPhase::Ended);

    let events = guest_events.drain();
    let started = events
        .iter()
        .filter(|event| matches!(event, GameEvent::MatchStarted))
        .count();
    let over = events
        .iter()
        .filter(|event| matches!(event, GameEvent::MatchOver { .. }))
        .count();
    assert_eq!(started, 1);
    assert_eq!(over, 1);
}
