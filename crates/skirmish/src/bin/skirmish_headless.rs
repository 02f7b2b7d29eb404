//! # Headless Match
//!
//! Runs a host and a handful of bots over the in-memory backend, with a
//! little packet loss, until the match ends or the time cap is hit.
//!
//! Usage: `skirmish_headless [config.toml]`

use skirmish::{InputFrame, Simulation, WorldState};
use skirmish_networking::{InMemoryBackend, NetworkConditions, Transport};
use skirmish_shared::{Catalog, GameConfig, PlayerId, SessionPhase, Vec2, UNARMED_WEAPON_ID};
use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

const BOTS: usize = 4;
const TICK_RATE: u32 = 60;
const MAX_SECONDS: u32 = 300;

fn main() -> Result<(), Box<dyn Error>> {
    let config = match std::env::args().nth(1) {
        Some(path) => GameConfig::load(path)?,
        None => {
            let mut config = GameConfig::default();
            config.zone.shrink_duration_ms = 60_000;
            config.zone.damage_per_second = 15.0;
            config
        }
    };
    let catalog = Arc::new(Catalog::bundled());
    let runtime = tokio::runtime::Builder::new_current_thread().enable_time().build()?;

    println!("╔══════════════════════════════════════════════════════════════════╗");
    println!("║                SKIRMISH - HEADLESS MATCH                         ║");
    println!("╚══════════════════════════════════════════════════════════════════╝");
    println!();

    let backend = Arc::new(InMemoryBackend::with_conditions(NetworkConditions::AVERAGE, 17));
    let host = Transport::host_game(backend.clone(), PlayerId::new("bot-0"), "Bot 0", &config.transport)?;
    let code = host.session().join_code.to_string();
    println!("Session {} (join code {code})", host.session_id());

    let mut transports = vec![Arc::new(host)];
    for i in 1..BOTS {
        let id = format!("bot-{i}");
        let peer = Transport::join_game(backend.clone(), PlayerId::new(id.as_str()), &code, &format!("Bot {i}"), &config.transport)?;
        transports.push(Arc::new(peer));
    }

    let mut peers = Vec::with_capacity(BOTS);
    for transport in transports {
        peers.push(runtime.block_on(Simulation::connect(transport, config.clone(), Arc::clone(&catalog)))?);
    }
    let results = peers[0].events();
    peers[0].start_match()?;

    let dt = 1.0 / TICK_RATE as f32;
    let total_ticks = u64::from(MAX_SECONDS * TICK_RATE);
    let start = Instant::now();
    let mut ticks = 0;
    while ticks < total_ticks && peers[0].phase() != SessionPhase::Ended {
        for peer in &mut peers {
            let world = peer.world_state();
            peer.push_input(bot_input(&world, &catalog, ticks));
            peer.tick(dt);
        }
        ticks += 1;
        if ticks % u64::from(TICK_RATE * 10) == 0 {
            let world = peers[0].world_state();
            println!(
                "[{:>4}s] alive {}/{}  loot {:>2}  zone radius {:.0}",
                ticks / u64::from(TICK_RATE),
                world.living().count(),
                world.players.len(),
                world.loot.len(),
                world.conflict_zone.radius,
            );
        }
    }
    let elapsed = start.elapsed();
    println!();

    println!("┌─ RESULT ─────────────────────────────────────────────────────────┐");
    let outcome = results.drain().into_iter().find_map(|event| match event {
        skirmish::GameEvent::MatchOver { winner_id, stats } => Some((winner_id, stats)),
        _ => None,
    });
    match outcome {
        Some((winner, stats)) => {
            println!("│ Winner:             {}", winner.map_or_else(|| "nobody".to_owned(), |id| id.to_string()));
            for stat in stats {
                println!("│   {:<16} {:>3} kills", stat.name, stat.kills);
            }
        }
        None => println!("│ No winner after {MAX_SECONDS} seconds"),
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let network = backend.stats();
    let host_stats = peers[0].transport().stats();
    println!("┌─ NETWORK ────────────────────────────────────────────────────────┐");
    println!("│ Broadcasts:         {} published, {} delivered", network.published, network.delivered);
    println!("│ Dropped:            {}", network.dropped);
    println!("│ Duplicated:         {}", network.duplicated);
    println!("│ Reordered:          {}", network.reordered);
    println!("│ Host events sent:   {}", host_stats.events_sent);
    println!("│ Host patches sent:  {}", host_stats.patches_sent);
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let simulated = ticks as f64 / f64::from(TICK_RATE);
    println!("┌─ TIMING ─────────────────────────────────────────────────────────┐");
    println!("│ Ticks:              {ticks}");
    println!("│ Simulated:          {simulated:.1} s");
    println!("│ Real time:          {:.2} s", elapsed.as_secs_f64());
    println!("│ Realtime factor:    {:.1}x", simulated / elapsed.as_secs_f64().max(1e-9));
    println!("└──────────────────────────────────────────────────────────────────┘");

    for peer in &mut peers {
        peer.leave();
    }
    Ok(())
}

/// Arm up, then chase the nearest opponent. Leave the zone first.
fn bot_input(world: &WorldState, catalog: &Catalog, tick: u64) -> InputFrame {
    let Some(me) = world.local_player.as_ref().filter(|me| me.is_alive) else {
        return InputFrame::default();
    };
    let here = me.position();
    let pulse = tick % 2 == 0;
    let toward = |target: Vec2| (target - here).normalize_or_zero();

    if !world.conflict_zone.is_safe(here) {
        let heading = toward(world.conflict_zone.center);
        return steer(heading, false, false);
    }

    if me.weapon_id == UNARMED_WEAPON_ID {
        let nearest = world.loot.iter().min_by(|a, b| {
            a.position()
                .distance_squared(here)
                .total_cmp(&b.position().distance_squared(here))
        });
        if let Some(item) = nearest {
            return steer(toward(item.position()), false, pulse);
        }
    }

    let target = world
        .living()
        .filter(|p| p.id != me.id)
        .min_by(|a, b| a.position().distance_squared(here).total_cmp(&b.position().distance_squared(here)));
    let Some(target) = target else {
        return InputFrame::default();
    };
    let reach = catalog.weapon_or_unarmed(&me.weapon_id).reach;
    let heading = toward(target.position());
    if here.distance(target.position()) <= reach * 0.8 {
        let mut frame = steer(Vec2::ZERO, pulse, false);
        frame.aim_x = heading.x;
        frame.aim_y = heading.y;
        frame
    } else {
        steer(heading, false, false)
    }
}

fn steer(heading: Vec2, attack: bool, interact: bool) -> InputFrame {
    InputFrame {
        move_x: heading.x,
        move_y: heading.y,
        aim_x: heading.x,
        aim_y: heading.y,
        attack,
        special_ability: false,
        interact,
    }
}
