//! # SKIRMISH Game Loop
//!
//! One [`Simulation`] per peer. The host and every client run the same
//! tick; only the loot role and the match bookkeeping differ.
//!
//! ```text
//! Tick N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. NETWORK                                                          │
//! │    ├─ Transport::pump        handlers stage events into the inbox   │
//! │    └─ PlayerSnapshot::sync   deltas, then durable rows              │
//! │                                                                     │
//! │ 2. LOCAL PLAYER                                                     │
//! │    ├─ Latest input frame     velocity, facing, interact             │
//! │    └─ Arena::step            integrate, clamp, resolve obstacles    │
//! │                                                                     │
//! │ 3. COMBAT                                                           │
//! │    ├─ Local swing            rising edge, window, cooldown          │
//! │    ├─ Remote swings          rising edge of is_attacking            │
//! │    └─ Conflict zone          damage outside the circle              │
//! │                                                                     │
//! │ 4. AUTHORITATIVE UPDATES                                            │
//! │    └─ Inbox::drain           loot, pickups, deaths, start, over     │
//! │                                                                     │
//! │ 5. OUTPUT                                                           │
//! │    ├─ Heartbeat              full local patch on the broadcast      │
//! │    └─ WorldState             read-only copy for the renderer        │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All timers run on simulation time, the sum of `dt` passed to
//! [`Simulation::tick`].

use crate::combat::{resolve_attack, strike, AttackTracker};
use crate::error::{SimulationError, SimulationResult};
use crate::events::{EventBus, EventReceiver, EventSender, GameEvent};
use crate::input::{InputBuffer, InputFrame, TickInput};
use crate::match_flow::{MatchFlow, MatchResult};
use crate::physics::Arena;
use crate::world_state::{CameraState, WorldState, ZoneState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use skirmish_economy::{
    nearest_loot, Loadout, LootAuthority, LootReplica, LootSettings, PickupOutcome, ReplicaChange,
};
use skirmish_networking::{Inbox, InterpolatedState, PlayerSnapshot, Transport, TransportError};
use skirmish_shared::clock::{clock_seed, unix_millis};
use skirmish_shared::{
    Catalog, EventKind, EventSink, GameConfig, LootItem, LootKind, PlayerId, PlayerStat, PlayerState,
    PlayerStatePatch, SessionPhase, Vec2, WireEvent,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Longest step a single tick may take, seconds.
pub const MAX_TICK_DT: f32 = 0.1;

/// Which side of the loot protocol this peer is on.
#[derive(Debug)]
pub enum LootRole {
    /// Host: owns the list.
    Authority(LootAuthority),
    /// Everyone else: mirrors it.
    Replica(LootReplica),
}

impl LootRole {
    /// Loot on the ground as this peer sees it.
    #[must_use]
    pub fn items(&self) -> &[LootItem] {
        match self {
            Self::Authority(authority) => authority.items(),
            Self::Replica(replica) => replica.items(),
        }
    }

    /// True on the host.
    #[must_use]
    pub fn is_authority(&self) -> bool {
        matches!(self, Self::Authority(_))
    }
}

/// An event received from a peer, waiting for the next tick.
#[derive(Clone, Debug)]
struct Staged {
    from: PlayerId,
    event: WireEvent,
}

/// The per-peer simulation.
pub struct Simulation {
    transport: Arc<Transport>,
    snapshot: PlayerSnapshot,
    config: GameConfig,
    catalog: Arc<Catalog>,
    arena: Arena,
    loot: LootRole,
    flow: MatchFlow,
    inbox: Inbox<Staged>,
    input: InputBuffer,
    bus: EventBus,
    events_out: EventSender,
    local: PlayerState,
    view: HashMap<PlayerId, PlayerState>,
    attack: AttackTracker,
    remote_attacking: HashMap<PlayerId, bool>,
    fallen: HashMap<PlayerId, f64>,
    kills_seen: u32,
    phase: SessionPhase,
    epoch: Instant,
    clock: f64,
    tick: u64,
    match_started_at: Option<f64>,
    respawn_at: Option<f64>,
    spectate: Option<PlayerId>,
    rng: ChaCha8Rng,
}

impl Simulation {
    /// Wires a simulation to a connected transport and a ready snapshot.
    ///
    /// # Errors
    ///
    /// - [`SimulationError::SnapshotNotReady`] if `snapshot.ready()` has not completed
    /// - [`TransportError::Disconnected`] if the transport is closed
    pub fn new(
        transport: Arc<Transport>,
        snapshot: PlayerSnapshot,
        config: GameConfig,
        catalog: Arc<Catalog>,
    ) -> SimulationResult<Self> {
        if !transport.is_connected() {
            return Err(TransportError::Disconnected.into());
        }
        if !snapshot.is_ready() {
            return Err(SimulationError::SnapshotNotReady);
        }

        let local_id = transport.local_player_id().clone();
        let epoch = Instant::now();
        let sink: Arc<dyn EventSink> = transport.clone();
        let settings = LootSettings::from_config(&config);
        let loot = if transport.is_host() {
            let seed = config.loot.seed.unwrap_or_else(|| clock_seed(local_id.as_str()));
            LootRole::Authority(LootAuthority::new(local_id.clone(), Arc::clone(&catalog), settings, seed, sink))
        } else {
            let mut replica = LootReplica::new(local_id.clone(), settings, config.loot.sync_timeout(), sink, epoch);
            replica.request_sync(epoch, "joined session");
            LootRole::Replica(replica)
        };

        let inbox = Inbox::new();
        for kind in EventKind::ALL {
            let staging = inbox.sender();
            transport.on(kind, move |from, event| {
                staging.stage(Staged {
                    from: from.clone(),
                    event: event.clone(),
                });
            });
        }

        let arena = Arena::from_config(&config.world);
        let mut rng = ChaCha8Rng::seed_from_u64(clock_seed(&format!("{local_id}/spawn")));
        let mut local = transport.local_state();
        if local.position() == Vec2::ZERO {
            local.set_position(arena.spawn_point(&mut rng));
            transport.set_local_state(local.clone());
        }

        let bus = EventBus::default();
        let mut simulation = Self {
            flow: MatchFlow::new(config.combat.death_cooldown().as_secs_f64()),
            kills_seen: snapshot.get(&local_id).map_or(0, |entry| entry.kills),
            phase: transport.session().phase,
            events_out: bus.sender(),
            bus,
            transport,
            snapshot,
            config,
            catalog,
            arena,
            loot,
            inbox,
            input: InputBuffer::new(),
            local,
            view: HashMap::new(),
            attack: AttackTracker::new(),
            remote_attacking: HashMap::new(),
            fallen: HashMap::new(),
            epoch,
            clock: 0.0,
            tick: 0,
            match_started_at: None,
            respawn_at: None,
            spectate: None,
            rng,
        };
        if simulation.phase == SessionPhase::Active {
            simulation.match_started_at = Some(0.0);
        }
        simulation.rebuild_view();
        tracing::info!(
            player = %simulation.local.id,
            host = simulation.is_host(),
            phase = ?simulation.phase,
            "simulation ready"
        );
        Ok(simulation)
    }

    /// Opens a player snapshot, waits for its initial read, then wires the
    /// simulation.
    ///
    /// # Errors
    ///
    /// See [`Simulation::new`] and [`PlayerSnapshot::ready`].
    pub async fn connect(
        transport: Arc<Transport>,
        config: GameConfig,
        catalog: Arc<Catalog>,
    ) -> SimulationResult<Self> {
        let mut snapshot = PlayerSnapshot::new(&transport)?;
        snapshot.ready().await?;
        Self::new(transport, snapshot, config, catalog)
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Records the latest input. Read once by the next tick.
    pub fn push_input(&mut self, frame: InputFrame) {
        self.input.push(frame);
    }

    /// Dispatches queued transport events into the staging inbox.
    ///
    /// [`Simulation::tick`] calls this itself; calling it more often only
    /// stages earlier.
    pub fn pump_network(&self) -> usize {
        self.transport.pump()
    }

    /// Starts (or restarts) the match. Host only.
    ///
    /// Moves the session to Active, scatters the initial loot and sends
    /// `game_start`.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotHost`] on a non-host peer, or a transport error.
    pub fn start_match(&mut self) -> SimulationResult<()> {
        if !self.is_host() {
            return Err(TransportError::NotHost("start the match").into());
        }
        self.transport.set_session_phase(SessionPhase::Active)?;
        self.flow.reset();
        if let LootRole::Authority(authority) = &mut self.loot {
            authority.spawn_random_loot(self.config.loot.initial_count);
        }
        self.transport.send(WireEvent::GameStart {})?;
        self.enter_active();
        tracing::info!(
            session = %self.transport.session_id(),
            players = self.view.len(),
            "match started"
        );
        Ok(())
    }

    /// Places one item on the ground and announces it. Host only.
    ///
    /// Returns `Ok(None)` for a non-finite position.
    ///
    /// # Errors
    ///
    /// [`TransportError::NotHost`] on a non-host peer.
    pub fn spawn_loot(&mut self, kind: LootKind, item_id: &str, position: Vec2) -> SimulationResult<Option<LootItem>> {
        match &mut self.loot {
            LootRole::Authority(authority) => Ok(authority.spawn_loot(kind, item_id, position.x, position.y)),
            LootRole::Replica(_) => Err(TransportError::NotHost("spawn loot").into()),
        }
    }

    /// Leaves the session. The simulation is inert afterwards.
    pub fn leave(&mut self) {
        self.snapshot.destroy();
        self.transport.disconnect();
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Advances the simulation by `dt` seconds and returns the new view.
    ///
    /// `dt` is clamped to [`MAX_TICK_DT`].
    pub fn tick(&mut self, dt: f32) -> WorldState {
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_TICK_DT) } else { 0.0 };
        self.clock += f64::from(dt);
        self.tick += 1;
        let now = self.sim_now();

        self.pump_network();
        self.snapshot.sync(now);
        self.rebuild_view();
        self.adopt_host_updates();

        let input = self.input.take();
        self.step_local(&input, dt, now);
        self.resolve_combat(&input);
        self.apply_zone(dt);

        self.apply_staged();
        self.update_respawn();
        if let LootRole::Replica(replica) = &mut self.loot {
            replica.check_drift(now);
        }
        self.update_spectate(input.special_pressed);
        self.heartbeat();

        self.world_state()
    }

    fn sim_now(&self) -> Instant {
        self.epoch + Duration::from_secs_f64(self.clock)
    }

    fn rebuild_view(&mut self) {
        self.view.clone_from(self.snapshot.players());
        self.refresh_local_in_view();
    }

    fn refresh_local_in_view(&mut self) {
        self.view.insert(self.local.id.clone(), self.local.clone());
    }

    /// Kill credit arrives as a host patch on our own snapshot entry.
    fn adopt_host_updates(&mut self) {
        let Some(entry) = self.snapshot.get(&self.local.id) else {
            return;
        };
        if entry.kills != self.kills_seen {
            self.kills_seen = entry.kills;
            self.local.kills = self.local.kills.max(entry.kills);
        }
    }

    fn step_local(&mut self, input: &TickInput, dt: f32, now: Instant) {
        if !self.local.is_alive {
            self.local.set_velocity(Vec2::ZERO);
            return;
        }
        let weapon = self.catalog.weapon_or_unarmed(&self.local.weapon_id);
        let velocity = input.frame.movement() * (self.config.combat.move_speed * weapon.speed_modifier);
        self.local.set_velocity(velocity);
        if let Some(angle) = input.frame.aim_angle() {
            self.local.rotation = angle;
        } else if velocity.length_squared() > 0.0 {
            self.local.rotation = velocity.angle();
        }
        let position = self.arena.step(self.local.position(), velocity, dt);
        self.local.set_position(position);

        if input.interact_pressed {
            self.try_pickup(now);
        }
    }

    fn try_pickup(&mut self, now: Instant) {
        let radius = self.config.loot.pickup_radius;
        let Some(loot_id) = nearest_loot(self.loot.items(), self.local.position(), radius).map(|item| item.id.clone())
        else {
            return;
        };
        self.refresh_local_in_view();
        match &mut self.loot {
            LootRole::Authority(authority) => {
                if let PickupOutcome::Granted(grant) = authority.handle_pickup_request(&self.local.id, &loot_id, &self.view) {
                    grant.patch.apply_to(&mut self.local);
                    self.events_out.send(GameEvent::LootPickedUp {
                        player_id: grant.player_id,
                        loot_id: grant.loot.id.clone(),
                        item: Some(grant.loot),
                    });
                }
            }
            LootRole::Replica(replica) => {
                replica.request_pickup(&self.local, &loot_id, now);
            }
        }
    }

    fn resolve_combat(&mut self, input: &TickInput) {
        let armed = self.phase != SessionPhase::Ended;
        let local_id = self.local.id.clone();

        if armed && self.local.is_alive && input.attack_pressed {
            let weapon = self.catalog.weapon_or_unarmed(&self.local.weapon_id);
            if self.attack.try_start(self.clock, weapon) {
                self.events_out.send(GameEvent::AttackStarted {
                    player_id: local_id.clone(),
                    weapon_id: weapon.id.clone(),
                });
                let defenders = self.view.values_mut().filter(|p| p.id != local_id);
                for hit in resolve_attack(&mut self.local, defenders, &self.catalog) {
                    self.events_out.send(GameEvent::Hit {
                        attacker_id: hit.attacker_id,
                        target_id: hit.target_id,
                        damage: hit.damage,
                        health_remaining: hit.health_remaining,
                    });
                }
            }
        }
        self.local.is_attacking = self.local.is_alive && self.attack.is_active(self.clock);

        // The victim's owner decides hits on itself.
        let mut killer = None;
        for (id, remote) in &self.view {
            if *id == local_id {
                continue;
            }
            let swinging = remote.is_alive && remote.is_attacking;
            let was_swinging = self.remote_attacking.insert(id.clone(), swinging).unwrap_or(false);
            if !swinging || was_swinging || !armed || !self.local.is_alive {
                continue;
            }
            if let Some(hit) = strike(remote, &mut self.local, &self.catalog) {
                self.events_out.send(GameEvent::Hit {
                    attacker_id: hit.attacker_id.clone(),
                    target_id: hit.target_id,
                    damage: hit.damage,
                    health_remaining: hit.health_remaining,
                });
                if hit.lethal {
                    killer = Some(hit.attacker_id);
                }
            }
        }
        let view = &self.view;
        self.remote_attacking.retain(|id, _| view.contains_key(id));

        if let Some(killer) = killer {
            self.on_local_death(Some(killer));
        }
        self.refresh_local_in_view();
    }

    fn zone(&self) -> ZoneState {
        match (self.phase, self.match_started_at) {
            (SessionPhase::Active, Some(started)) => ZoneState::at(
                &self.config.zone,
                self.arena.center(),
                Duration::from_secs_f64((self.clock - started).max(0.0)),
            ),
            _ => ZoneState {
                center: self.arena.center(),
                radius: self.config.zone.start_radius,
                active: false,
            },
        }
    }

    fn apply_zone(&mut self, dt: f32) {
        if !self.local.is_alive || self.zone().is_safe(self.local.position()) {
            return;
        }
        let damage = self.config.zone.damage_per_second * dt;
        if damage <= 0.0 {
            return;
        }
        self.events_out.send(GameEvent::ZoneDamage { damage });
        if self.local.apply_damage(damage) {
            self.on_local_death(None);
        }
        self.refresh_local_in_view();
    }

    // =========================================================================
    // Authoritative updates
    // =========================================================================

    fn apply_staged(&mut self) {
        let host_id = self.transport.session().host_id;
        for Staged { from, event } in self.inbox.drain() {
            match &event {
                WireEvent::LootSpawned(_) | WireEvent::LootPickedUp { .. } | WireEvent::LootSync { .. } => {
                    if from == host_id {
                        self.apply_loot_event(&event);
                    } else {
                        tracing::debug!(peer = %from, event = event.kind().as_str(), "loot event from non-host ignored");
                    }
                }
                WireEvent::LootPickupRequest { .. } | WireEvent::RequestLootSync {} => {
                    self.serve_loot_request(&from, &event);
                }
                WireEvent::PlayerDeath { victim_id, killer_id } => {
                    self.on_remote_death(victim_id, killer_id.as_ref());
                }
                WireEvent::GameStart {} => {
                    if from == host_id && !self.is_host() && !self.just_started() {
                        self.enter_active();
                    }
                }
                WireEvent::GameOver { winner_id, stats } => {
                    if from == host_id && !self.is_host() && self.phase != SessionPhase::Ended {
                        self.enter_ended(winner_id.clone(), stats.clone());
                    }
                }
            }
        }
    }

    /// A repeated `game_start` inside one death cooldown is the same start.
    fn just_started(&self) -> bool {
        self.phase == SessionPhase::Active
            && self
                .match_started_at
                .is_some_and(|at| self.clock - at < self.config.combat.death_cooldown().as_secs_f64())
    }

    fn apply_loot_event(&mut self, event: &WireEvent) {
        let LootRole::Replica(replica) = &mut self.loot else {
            return;
        };
        match replica.apply(event) {
            ReplicaChange::PickedUp { item, player_id } => {
                if player_id == self.local.id {
                    self.equip_local(item.as_ref());
                }
                if let WireEvent::LootPickedUp { loot_id, .. } = event {
                    self.events_out.send(GameEvent::LootPickedUp {
                        player_id,
                        loot_id: loot_id.clone(),
                        item,
                    });
                }
            }
            ReplicaChange::Synced {
                granted: Some(item), ..
            } => {
                tracing::debug!(player = %self.local.id, loot = %item.id, "pickup grant recovered from loot sync");
                self.equip_local(Some(&item));
                self.events_out.send(GameEvent::LootPickedUp {
                    player_id: self.local.id.clone(),
                    loot_id: item.id.clone(),
                    item: Some(item),
                });
            }
            _ => {}
        }
    }

    /// The host's patch normally lands first, so the snapshot entry is the
    /// fallback for an item this replica never saw.
    fn equip_local(&mut self, item: Option<&LootItem>) {
        match item {
            Some(item) => {
                let mut loadout = Loadout::of(&self.local);
                loadout.equip(item.kind, &item.item_id);
                loadout.apply_to(&mut self.local);
            }
            None => {
                if let Some(entry) = self.snapshot.get(&self.local.id) {
                    self.local.weapon_id.clone_from(&entry.weapon_id);
                    self.local.armor_id.clone_from(&entry.armor_id);
                }
            }
        }
        self.refresh_local_in_view();
    }

    fn serve_loot_request(&mut self, from: &PlayerId, event: &WireEvent) {
        let LootRole::Authority(authority) = &mut self.loot else {
            return;
        };
        if let Some(PickupOutcome::Granted(grant)) = authority.handle_event(from, event, &self.view) {
            self.events_out.send(GameEvent::LootPickedUp {
                player_id: grant.player_id,
                loot_id: grant.loot.id.clone(),
                item: Some(grant.loot),
            });
        }
    }

    fn on_local_death(&mut self, killer_id: Option<PlayerId>) {
        let victim_id = self.local.id.clone();
        tracing::info!(player = %victim_id, killer = ?killer_id, "local player died");
        self.attack.reset();
        self.local.is_attacking = false;
        self.spectate = None;
        if self.phase != SessionPhase::Ended {
            self.respawn_at = Some(self.clock + self.config.combat.death_cooldown().as_secs_f64());
        }
        self.events_out.send(GameEvent::Died {
            victim_id: victim_id.clone(),
            killer_id: killer_id.clone(),
            position: self.local.position(),
        });
        self.transport.broadcast_player_state_update(self.local.to_patch());
        self.persist_local();
        self.refresh_local_in_view();
        self.transport.send_event(WireEvent::PlayerDeath {
            victim_id: victim_id.clone(),
            killer_id: killer_id.clone(),
        });
        if self.is_host() {
            self.host_handle_death(&victim_id, killer_id.as_ref());
        }
    }

    fn on_remote_death(&mut self, victim_id: &PlayerId, killer_id: Option<&PlayerId>) {
        if *victim_id == self.local.id {
            return;
        }
        // Nobody respawns inside the death cooldown, so a report that close
        // to the last one is the same death.
        let cooldown = self.config.combat.death_cooldown().as_secs_f64();
        if self.fallen.get(victim_id).is_some_and(|at| self.clock - at < cooldown) {
            tracing::debug!(victim = %victim_id, "repeated death report ignored");
            return;
        }
        self.fallen.insert(victim_id.clone(), self.clock);
        let position = self.view.get(victim_id).map_or(Vec2::ZERO, PlayerState::position);
        if let Some(victim) = self.view.get_mut(victim_id) {
            victim.is_alive = false;
            victim.is_attacking = false;
            victim.health = 0.0;
        }
        self.events_out.send(GameEvent::Died {
            victim_id: victim_id.clone(),
            killer_id: killer_id.cloned(),
            position,
        });
        if self.is_host() {
            self.host_handle_death(victim_id, killer_id);
        }
    }

    /// Host: credit the killer, drop the victim's weapon, maybe end the match.
    fn host_handle_death(&mut self, victim_id: &PlayerId, killer_id: Option<&PlayerId>) {
        let Some(record) = self.flow.record_death(victim_id, killer_id, self.clock) else {
            tracing::debug!(victim = %victim_id, "duplicate death report ignored");
            return;
        };
        if let Some((killer, total)) = record.credit {
            if killer == self.local.id {
                self.local.kills = self.local.kills.max(total);
                self.refresh_local_in_view();
            } else {
                let patch = PlayerStatePatch {
                    kills: Some(total),
                    ..PlayerStatePatch::default()
                };
                self.transport.broadcast_player_state(&killer, patch);
            }
        }
        if let LootRole::Authority(authority) = &mut self.loot {
            if let Some(victim) = self.view.get(victim_id) {
                authority.drop_on_death(victim);
            }
        }
        if self.phase == SessionPhase::Active {
            if let Some(result) = self.flow.check_over(self.view.values(), self.clock) {
                self.finish_match(result);
            }
        }
    }

    fn finish_match(&mut self, result: MatchResult) {
        tracing::info!(winner = ?result.winner_id, players = result.stats.len(), "match over");
        self.transport.send_event(WireEvent::GameOver {
            winner_id: result.winner_id.clone(),
            stats: result.stats.clone(),
        });
        if let Err(err) = self.transport.set_session_phase(SessionPhase::Ended) {
            tracing::warn!(error = %err, "could not mark session ended");
        }
        self.enter_ended(result.winner_id, result.stats);
    }

    fn enter_active(&mut self) {
        self.phase = SessionPhase::Active;
        self.match_started_at = Some(self.clock);
        self.kills_seen = self.snapshot.get(&self.local.id).map_or(0, |entry| entry.kills);
        self.fallen.clear();
        self.local.kills = 0;
        self.local.damage_dealt = 0.0;
        self.remote_attacking.clear();
        self.respawn_local();
        self.events_out.send(GameEvent::MatchStarted);
    }

    fn enter_ended(&mut self, winner_id: Option<PlayerId>, stats: Vec<PlayerStat>) {
        self.phase = SessionPhase::Ended;
        self.respawn_at = None;
        self.attack.reset();
        self.local.is_attacking = false;
        self.refresh_local_in_view();
        self.events_out.send(GameEvent::MatchOver { winner_id, stats });
    }

    // =========================================================================
    // Respawn, camera, heartbeat
    // =========================================================================

    fn update_respawn(&mut self) {
        if self.local.is_alive || self.phase == SessionPhase::Ended {
            return;
        }
        match self.respawn_at {
            None => {
                self.respawn_at = Some(self.clock + self.config.combat.death_cooldown().as_secs_f64());
            }
            Some(at) if self.clock >= at => self.respawn_local(),
            Some(_) => {}
        }
    }

    fn respawn_local(&mut self) {
        let position = self.arena.spawn_point(&mut self.rng);
        self.local.respawn(position);
        self.attack.reset();
        self.respawn_at = None;
        self.spectate = None;
        self.events_out.send(GameEvent::Respawned {
            player_id: self.local.id.clone(),
            position,
        });
        self.transport.broadcast_player_state_update(self.local.to_patch());
        self.persist_local();
        self.refresh_local_in_view();
    }

    fn spectate_candidates(&self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .view
            .values()
            .filter(|p| p.id != self.local.id && p.is_alive && p.is_connected)
            .map(|p| p.id.clone())
            .collect();
        ids.sort();
        ids
    }

    fn update_spectate(&mut self, cycle: bool) {
        if self.local.is_alive {
            self.spectate = None;
            return;
        }
        let candidates = self.spectate_candidates();
        let current = self
            .spectate
            .as_ref()
            .and_then(|id| candidates.iter().position(|candidate| candidate == id));
        let next = match (current, cycle) {
            (Some(index), true) => Some((index + 1) % candidates.len()),
            (Some(index), false) => Some(index),
            (None, _) => (!candidates.is_empty()).then_some(0),
        };
        self.spectate = next.map(|index| candidates[index].clone());
    }

    fn camera(&self) -> CameraState {
        if self.local.is_alive {
            return CameraState {
                target: Some(self.local.id.clone()),
                focus: self.local.position(),
                spectating: false,
            };
        }
        let focus = self
            .spectate
            .as_ref()
            .and_then(|id| self.view.get(id))
            .map_or_else(|| self.local.position(), PlayerState::position);
        CameraState {
            target: self.spectate.clone(),
            focus,
            spectating: true,
        }
    }

    fn heartbeat(&mut self) {
        self.local.last_heartbeat_ms = unix_millis();
        self.transport.broadcast_player_state_update(self.local.to_patch());
        self.refresh_local_in_view();
    }

    fn persist_local(&self) {
        self.transport.set_local_state(self.local.clone());
        // Failures are already logged by the transport.
        let _ = self.transport.write_player_state_now();
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// A fresh read-only view of the current state.
    #[must_use]
    pub fn world_state(&self) -> WorldState {
        WorldState {
            players: self.view.clone(),
            loot: self.loot.items().to_vec(),
            local_player: Some(self.local.clone()),
            camera: self.camera(),
            conflict_zone: self.zone(),
            phase: self.phase,
            tick: self.tick,
        }
    }

    /// A receiver for local game events.
    #[must_use]
    pub fn events(&self) -> EventReceiver {
        self.bus.receiver()
    }

    /// The local player.
    #[must_use]
    pub fn local_player(&self) -> &PlayerState {
        &self.local
    }

    /// Current match phase as this peer sees it.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// True on the host.
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.transport.is_host()
    }

    /// This peer's loot role.
    #[must_use]
    pub fn loot(&self) -> &LootRole {
        &self.loot
    }

    /// The transport.
    #[must_use]
    pub fn transport(&self) -> &Arc<Transport> {
        &self.transport
    }

    /// The canonical player snapshot.
    #[must_use]
    pub fn snapshot(&self) -> &PlayerSnapshot {
        &self.snapshot
    }

    /// Simulation time, seconds.
    #[must_use]
    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Smoothed motion of a remote player for rendering.
    #[must_use]
    pub fn interpolated(&self, id: &PlayerId) -> Option<InterpolatedState> {
        self.snapshot.interpolated(id, self.sim_now())
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("local", &self.local.id)
            .field("phase", &self.phase)
            .field("tick", &self.tick)
            .field("players", &self.view.len())
            .field("loot", &self.loot.items().len())
            .finish_non_exhaustive()
    }
}
