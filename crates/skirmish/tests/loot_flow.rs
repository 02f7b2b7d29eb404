//! Loot replication between the host authority and guest replicas.

mod common;

use common::{attack, config, guest, host, interact, loot_ids, place, run, run_until, simulation, DT, TICKS_PER_SECOND};
use skirmish::{GameEvent, LootRole, Simulation};
use skirmish_networking::{InMemoryBackend, NetworkConditions};
use skirmish_shared::{LootKind, PlayerId, Vec2, UNARMED_WEAPON_ID};
use std::collections::BTreeSet;
use std::sync::Arc;

#[tokio::test]
async fn host_picks_up_and_drops_its_old_weapon() {
    let backend = InMemoryBackend::shared();
    let config = config();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    place(&host_transport, Vec2::new(300.0, 300.0), "bo");

    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    let katana = h
        .spawn_loot(LootKind::Weapon, "katana", Vec2::new(310.0, 300.0))
        .unwrap()
        .unwrap();
    run(&mut [&mut h, &mut g], 2);
    assert_eq!(loot_ids(&g), vec![katana.id.to_string()]);

    h.push_input(interact());
    run(&mut [&mut h, &mut g], 2);

    assert_eq!(h.local_player().weapon_id, "katana");
    let dropped = h.loot().items();
    assert_eq!(dropped.len(), 1);
    assert_eq!(dropped[0].item_id, "bo");
    assert_eq!(dropped[0].position(), Vec2::new(300.0, 300.0));
    assert_eq!(loot_ids(&g), loot_ids(&h));

    run(&mut [&mut h, &mut g], 1);
    let host_seen = g.world_state();
    assert_eq!(host_seen.player(&PlayerId::new("host")).unwrap().weapon_id, "katana");
}

#[tokio::test]
async fn guest_pickup_goes_through_the_host() {
    let backend = InMemoryBackend::shared();
    let config = config();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    place(&guest_transport, Vec2::new(800.0, 800.0), UNARMED_WEAPON_ID);

    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    let guest_events = g.events();
    h.spawn_loot(LootKind::Armor, "lamellar", Vec2::new(820.0, 800.0)).unwrap();
    run(&mut [&mut h, &mut g], 2);
    assert_eq!(g.loot().items().len(), 1);

    g.push_input(interact());
    run(&mut [&mut h, &mut g], 2);

    assert_eq!(g.local_player().armor_id, "lamellar");
    assert!(h.loot().items().is_empty());
    assert!(g.loot().items().is_empty());
    assert!(guest_events.drain().iter().any(|event| matches!(
        event,
        GameEvent::LootPickedUp { player_id, item: Some(item), .. }
            if player_id.as_str() == "gin" && item.item_id == "lamellar"
    )));

    // No unarmed placeholder ever lands on the ground.
    run(&mut [&mut h, &mut g], 2);
    assert!(h.loot().items().is_empty());
    assert_eq!(h.world_state().player(&PlayerId::new("gin")).unwrap().armor_id, "lamellar");
}

#[tokio::test]
async fn out_of_range_guest_is_not_granted() {
    let backend = InMemoryBackend::shared();
    let config = config();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    place(&guest_transport, Vec2::new(500.0, 500.0), UNARMED_WEAPON_ID);

    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    h.spawn_loot(LootKind::Weapon, "spear", Vec2::new(100.0, 100.0)).unwrap();
    run(&mut [&mut h, &mut g], 2);

    g.push_input(interact());
    run(&mut [&mut h, &mut g], 2);

    assert_eq!(g.local_player().weapon_id, UNARMED_WEAPON_ID);
    assert_eq!(h.loot().items().len(), 1);
    assert_eq!(loot_ids(&g), loot_ids(&h));
}

#[tokio::test]
async fn victim_drops_their_weapon() {
    let backend = InMemoryBackend::shared();
    let config = config();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    place(&host_transport, Vec2::new(600.0, 600.0), "katana");
    place(&guest_transport, Vec2::new(630.0, 600.0), "spear");

    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    run(&mut [&mut h, &mut g], 2);

    let mut held = false;
    for _ in 0..10 * TICKS_PER_SECOND {
        held = !held;
        h.push_input(attack(held));
        run(&mut [&mut h, &mut g], 1);
        if !g.local_player().is_alive {
            break;
        }
    }
    assert!(!g.local_player().is_alive);
    h.push_input(attack(false));
    run(&mut [&mut h, &mut g], 2);

    let drops = h.loot().items();
    assert_eq!(drops.len(), 1);
    assert_eq!(drops[0].item_id, "spear");
    assert_eq!(drops[0].position(), Vec2::new(630.0, 600.0));
    assert_eq!(loot_ids(&g), loot_ids(&h));
}

#[tokio::test]
async fn lost_grant_is_repaired_by_resync() {
    let backend = InMemoryBackend::shared();
    let config = config();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    place(&guest_transport, Vec2::new(800.0, 800.0), "bo");

    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    let guest_events = g.events();
    let sai = h
        .spawn_loot(LootKind::Weapon, "sai", Vec2::new(800.0, 800.0))
        .unwrap()
        .unwrap();
    run(&mut [&mut h, &mut g], 2);

    g.push_input(interact());
    g.tick(DT);
    let LootRole::Replica(replica) = g.loot() else {
        panic!("guest should hold a replica");
    };
    assert!(replica.has_pending_pickup());

    // The host grants while its broadcasts go nowhere.
    backend.set_online(false);
    h.tick(DT);
    backend.set_online(true);
    let on_ground = h.loot().items();
    assert_eq!(on_ground.len(), 1);
    assert_eq!(on_ground[0].item_id, "bo");
    assert_eq!(loot_ids(&g), vec![sai.id.to_string()]);
    assert_eq!(g.local_player().weapon_id, "bo");

    let repaired = run_until(&mut [&mut h, &mut g], 4 * TICKS_PER_SECOND, |peers| {
        peers[1].local_player().weapon_id == "sai"
    });
    assert!(repaired);
    let LootRole::Replica(replica) = g.loot() else {
        panic!("guest should hold a replica");
    };
    assert!(!replica.has_pending_pickup());
    assert_eq!(loot_ids(&g), loot_ids(&h));
    assert!(!loot_ids(&g).contains(&sai.id.to_string()));

    // The old weapon exists once: on the ground, not in a hand.
    let bo_count = h.loot().items().iter().filter(|item| item.item_id == "bo").count();
    assert_eq!(bo_count, 1);
    run(&mut [&mut h, &mut g], 2);
    assert_eq!(h.world_state().player(&PlayerId::new("gin")).unwrap().weapon_id, "sai");

    let granted = guest_events
        .drain()
        .iter()
        .filter(|event| matches!(event, GameEvent::LootPickedUp { loot_id, .. } if *loot_id == sai.id))
        .count();
    assert_eq!(granted, 1);
}

#[tokio::test]
async fn repeated_pickup_announcement_fires_once() {
    let conditions = NetworkConditions {
        packet_loss_percent: 0,
        duplicate_percent: 100,
        reorder_percent: 0,
    };
    let backend = Arc::new(InMemoryBackend::with_conditions(conditions, 21));
    let config = config();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    place(&guest_transport, Vec2::new(800.0, 800.0), UNARMED_WEAPON_ID);

    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    let guest_events = g.events();
    let sai = h
        .spawn_loot(LootKind::Weapon, "sai", Vec2::new(800.0, 800.0))
        .unwrap()
        .unwrap();
    run(&mut [&mut h, &mut g], 2);

    g.push_input(interact());
    run(&mut [&mut h, &mut g], 4);

    assert_eq!(g.local_player().weapon_id, "sai");
    assert!(backend.stats().duplicated > 0);
    let pickups = guest_events
        .drain()
        .iter()
        .filter(|event| matches!(event, GameEvent::LootPickedUp { loot_id, .. } if *loot_id == sai.id))
        .count();
    assert_eq!(pickups, 1);
}

#[tokio::test]
async fn picked_up_loot_stays_gone_under_reordering() {
    let conditions = NetworkConditions {
        packet_loss_percent: 0,
        duplicate_percent: 20,
        reorder_percent: 30,
    };
    let backend = Arc::new(InMemoryBackend::with_conditions(conditions, 11));
    let config = config();
    let host_transport = host(&backend, &config);
    let guest_transport = guest(&backend, &host_transport, "gin", &config);
    place(&guest_transport, Vec2::new(800.0, 800.0), UNARMED_WEAPON_ID);

    let mut h = simulation(host_transport, &config).await;
    let mut g = simulation(guest_transport, &config).await;
    h.spawn_loot(LootKind::Weapon, "sai", Vec2::new(800.0, 800.0)).unwrap();
    h.spawn_loot(LootKind::Armor, "lamellar", Vec2::new(800.0, 800.0)).unwrap();
    h.spawn_loot(LootKind::Weapon, "spear", Vec2::new(100.0, 100.0)).unwrap();

    fn settled(peers: &[&mut Simulation]) -> bool {
        let LootRole::Replica(replica) = peers[1].loot() else {
            return false;
        };
        replica.is_synced() && !replica.has_pending_pickup() && loot_ids(&peers[1]) == loot_ids(&peers[0])
    }
    assert!(run_until(&mut [&mut h, &mut g], 20 * TICKS_PER_SECOND, settled));

    let mut seen: BTreeSet<String> = loot_ids(&g).into_iter().collect();
    let mut gone = BTreeSet::new();
    for picked in 1..=2 {
        g.push_input(interact());
        let done = run_until(&mut [&mut h, &mut g], 20 * TICKS_PER_SECOND, |peers| {
            let listed: BTreeSet<String> = loot_ids(&peers[1]).into_iter().collect();
            assert!(listed.is_disjoint(&gone), "picked-up loot came back: {listed:?}");
            gone.extend(seen.difference(&listed).cloned());
            seen.extend(listed);
            gone.len() >= picked && settled(peers)
        });
        assert!(done);
    }

    assert_eq!(g.local_player().weapon_id, "sai");
    assert_eq!(g.local_player().armor_id, "lamellar");
    assert_eq!(gone.len(), 2);
    let left = h.loot().items();
    assert_eq!(left.len(), 1);
    assert_eq!(left[0].item_id, "spear");
    assert!(backend.stats().reordered > 0);
}

#[tokio::test]
async fn late_joiner_converges_on_a_lossy_network() {
    let conditions = NetworkConditions {
        packet_loss_percent: 40,
        duplicate_percent: 20,
        reorder_percent: 0,
    };
    let backend = Arc::new(InMemoryBackend::with_conditions(conditions, 99));
    let config = config();
    let host_transport = host(&backend, &config);
    let mut h = simulation(host_transport.clone(), &config).await;
    h.start_match().unwrap();
    run(&mut [&mut h], 2);

    let late = guest(&backend, &host_transport, "late", &config);
    let mut g = simulation(late, &config).await;

    let converged = run_until(&mut [&mut h, &mut g], 60 * TICKS_PER_SECOND, |peers| {
        let LootRole::Replica(replica) = peers[1].loot() else {
            return false;
        };
        replica.is_synced() && loot_ids(&peers[1]) == loot_ids(&peers[0])
    });
    assert!(converged);
    assert!(backend.stats().dropped > 0);
}
