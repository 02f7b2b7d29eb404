//! # Loot Authority
//!
//! The host owns the loot list. Every other peer holds a [`LootReplica`]
//! that mirrors it from events and asks for a full `loot_sync` when it
//! suspects it has drifted.
//!
//! ## Pickup Protocol
//!
//! ```text
//! peer                        host
//!  │ loot_pickup_request ───►  │ validate against the live list
//!  │                           │ remove item, equip, drop held item
//!  │ ◄─── loot_spawned         │ (only if something was displaced)
//!  │ ◄─── player patch         │ new weapon_id / armor_id
//!  │ ◄─── loot_picked_up       │
//! ```
//!
//! A request for an item that is already gone is a silent no-op. Whoever
//! the host processes first wins; nobody is told they lost.
//!
//! The host remembers each player's latest grant and repeats it in every
//! `loot_sync`. A requester whose `loot_picked_up` was lost learns about
//! its grant from the resync it asks for.

use crate::equipment::Loadout;
use crate::error::StaleReason;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_shared::{
    Catalog, EventSink, GameConfig, LootGrant, LootId, LootItem, LootKind, PlayerDirectory, PlayerId,
    PlayerState, PlayerStatePatch, Vec2, WireEvent, UNARMED_WEAPON_ID,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Geometry the loot rules need.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LootSettings {
    /// Maximum pickup distance, inclusive.
    pub pickup_radius: f32,
    /// Arena width.
    pub world_width: f32,
    /// Arena height.
    pub world_height: f32,
    /// Random spawns keep this far from the arena edge.
    pub margin: f32,
}

impl LootSettings {
    /// Settings from the game configuration.
    #[must_use]
    pub fn from_config(config: &GameConfig) -> Self {
        Self {
            pickup_radius: config.loot.pickup_radius,
            world_width: config.world.width,
            world_height: config.world.height,
            margin: config.world.loot_margin,
        }
    }

    fn random_position(&self, rng: &mut ChaCha8Rng) -> Vec2 {
        Vec2::new(
            random_axis(rng, self.world_width, self.margin),
            random_axis(rng, self.world_height, self.margin),
        )
    }
}

impl Default for LootSettings {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

fn random_axis(rng: &mut ChaCha8Rng, extent: f32, margin: f32) -> f32 {
    let (lo, hi) = (margin, extent - margin);
    if hi > lo {
        rng.gen_range(lo..=hi)
    } else {
        extent * 0.5
    }
}

/// Checks a pickup against a loot list.
///
/// Used by the host to grant requests and by replicas to decide whether a
/// request is worth sending at all.
///
/// # Errors
///
/// Returns the [`StaleReason`] the request would be ignored for.
pub fn check_pickup<'a>(
    items: &'a [LootItem],
    player: Option<&PlayerState>,
    player_id: &PlayerId,
    loot_id: &LootId,
    pickup_radius: f32,
) -> Result<&'a LootItem, StaleReason> {
    let loot = items
        .iter()
        .find(|item| &item.id == loot_id)
        .ok_or_else(|| StaleReason::LootGone(loot_id.clone()))?;
    let player = player.ok_or_else(|| StaleReason::UnknownPlayer(player_id.clone()))?;
    if !player.is_alive {
        return Err(StaleReason::PlayerDead(player_id.clone()));
    }
    let distance = player.position().distance(loot.position());
    if distance > pickup_radius {
        return Err(StaleReason::OutOfRange {
            player: player_id.clone(),
            loot: loot_id.clone(),
            distance,
            radius: pickup_radius,
        });
    }
    Ok(loot)
}

/// Closest item within `radius` of `position`.
#[must_use]
pub fn nearest_loot(items: &[LootItem], position: Vec2, radius: f32) -> Option<&LootItem> {
    let limit = radius * radius;
    items
        .iter()
        .map(|item| (item, item.position().distance_squared(position)))
        .filter(|(_, d2)| *d2 <= limit)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(item, _)| item)
}

/// A granted pickup.
#[derive(Clone, Debug, PartialEq)]
pub struct PickupGrant {
    /// The item removed from the ground.
    pub loot: LootItem,
    /// Who got it.
    pub player_id: PlayerId,
    /// What they were holding, now on the ground.
    pub dropped: Option<LootItem>,
    /// Equipment change broadcast for the player.
    pub patch: PlayerStatePatch,
}

/// Result of a pickup request.
#[derive(Clone, Debug, PartialEq)]
pub enum PickupOutcome {
    /// Granted and broadcast.
    Granted(PickupGrant),
    /// Ignored. Nothing was sent.
    Stale(StaleReason),
}

impl PickupOutcome {
    /// True if the request was granted.
    #[must_use]
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted(_))
    }
}

/// The host's loot list. The only writer.
pub struct LootAuthority {
    host_id: PlayerId,
    items: Vec<LootItem>,
    grants: BTreeMap<PlayerId, LootItem>,
    next_serial: u64,
    rng: ChaCha8Rng,
    catalog: Arc<Catalog>,
    settings: LootSettings,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for LootAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LootAuthority")
            .field("host_id", &self.host_id)
            .field("items", &self.items.len())
            .field("next_serial", &self.next_serial)
            .finish_non_exhaustive()
    }
}

impl LootAuthority {
    /// Creates an empty authority. Events leave through `sink`.
    #[must_use]
    pub fn new(
        host_id: PlayerId,
        catalog: Arc<Catalog>,
        settings: LootSettings,
        seed: u64,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            host_id,
            items: Vec::new(),
            grants: BTreeMap::new(),
            next_serial: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            catalog,
            settings,
            sink,
        }
    }

    /// Items on the ground, oldest first.
    #[must_use]
    pub fn items(&self) -> &[LootItem] {
        &self.items
    }

    /// One item by id.
    #[must_use]
    pub fn get(&self, loot_id: &LootId) -> Option<&LootItem> {
        self.items.iter().find(|item| &item.id == loot_id)
    }

    /// Number of items on the ground.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if the ground is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Pickup settings in force.
    #[must_use]
    pub fn settings(&self) -> &LootSettings {
        &self.settings
    }

    fn next_id(&mut self) -> LootId {
        self.next_serial += 1;
        LootId::new(format!("{}-{}", self.host_id, self.next_serial))
    }

    fn place(&mut self, kind: LootKind, item_id: String, x: f32, y: f32) -> LootItem {
        let item = LootItem {
            id: self.next_id(),
            kind,
            item_id,
            x,
            y,
        };
        self.items.push(item.clone());
        item
    }

    /// Places one item and broadcasts `loot_spawned`.
    ///
    /// Returns `None` for non-finite coordinates.
    pub fn spawn_loot(
        &mut self,
        kind: LootKind,
        item_id: impl Into<String>,
        x: f32,
        y: f32,
    ) -> Option<LootItem> {
        if !x.is_finite() || !y.is_finite() {
            tracing::debug!(x, y, "refusing loot at non-finite position");
            return None;
        }
        let item = self.place(kind, item_id.into(), x, y);
        self.sink.send_event(WireEvent::LootSpawned(item.clone()));
        Some(item)
    }

    /// Scatters `count` random catalog items and broadcasts one `loot_sync`.
    pub fn spawn_random_loot(&mut self, count: usize) -> Vec<LootItem> {
        let pool_len = self.catalog.spawnable().len();
        let mut spawned = Vec::with_capacity(count);
        if pool_len > 0 {
            for _ in 0..count {
                let pick = self.rng.gen_range(0..pool_len);
                let (kind, item_id) = self.catalog.spawnable()[pick].clone();
                let at = self.settings.random_position(&mut self.rng);
                spawned.push(self.place(kind, item_id, at.x, at.y));
            }
        } else {
            tracing::warn!("catalog has nothing spawnable");
        }
        tracing::info!(count = spawned.len(), total = self.items.len(), "loot scattered");
        self.handle_sync_request();
        spawned
    }

    /// Validates and applies a pickup request from `from`.
    ///
    /// `players` must reflect the latest known positions.
    pub fn handle_pickup_request<P>(&mut self, from: &PlayerId, loot_id: &LootId, players: &P) -> PickupOutcome
    where
        P: PlayerDirectory + ?Sized,
    {
        let player = players.player(from);
        let radius = self.settings.pickup_radius;
        let index = match check_pickup(&self.items, player, from, loot_id, radius) {
            Ok(loot) => self.items.iter().position(|item| item.id == loot.id),
            Err(reason) => {
                tracing::debug!(player = %from, loot = %loot_id, %reason, "stale pickup ignored");
                return PickupOutcome::Stale(reason);
            }
        };
        let (Some(index), Some(player)) = (index, player) else {
            return PickupOutcome::Stale(StaleReason::LootGone(loot_id.clone()));
        };

        let loot = self.items.remove(index);
        let mut loadout = Loadout::of(player);
        let displaced = loadout.equip(loot.kind, &loot.item_id);
        let dropped = displaced.and_then(|held| self.spawn_loot(loot.kind, held, player.x, player.y));
        let patch = loadout.patch(loot.kind);
        self.grants.insert(from.clone(), loot.clone());

        self.sink.broadcast_player_state(from, patch.clone());
        self.sink.send_event(WireEvent::LootPickedUp {
            loot_id: loot.id.clone(),
            player_id: from.clone(),
        });
        tracing::debug!(player = %from, loot = %loot.id, item = %loot.item_id, "pickup granted");

        PickupOutcome::Granted(PickupGrant {
            loot,
            player_id: from.clone(),
            dropped,
            patch,
        })
    }

    /// The latest item granted to `player`, if any.
    #[must_use]
    pub fn last_grant(&self, player: &PlayerId) -> Option<&LootItem> {
        self.grants.get(player)
    }

    /// Broadcasts the full list, with the latest grant per player, as
    /// `loot_sync`.
    pub fn handle_sync_request(&self) {
        let grants = self
            .grants
            .iter()
            .map(|(player_id, loot)| LootGrant {
                player_id: player_id.clone(),
                loot: loot.clone(),
            })
            .collect();
        self.sink.send_event(WireEvent::LootSync {
            loot: self.items.clone(),
            grants,
        });
    }

    /// Dispatches the loot events a host listens for.
    ///
    /// Returns the pickup outcome for pickup requests, `None` otherwise.
    pub fn handle_event<P>(&mut self, from: &PlayerId, event: &WireEvent, players: &P) -> Option<PickupOutcome>
    where
        P: PlayerDirectory + ?Sized,
    {
        match event {
            WireEvent::LootPickupRequest { loot_id } => Some(self.handle_pickup_request(from, loot_id, players)),
            WireEvent::RequestLootSync {} => {
                tracing::debug!(peer = %from, "loot sync requested");
                self.handle_sync_request();
                None
            }
            _ => None,
        }
    }

    /// Drops a dead player's weapon where they fell.
    pub fn drop_on_death(&mut self, victim: &PlayerState) -> Option<LootItem> {
        if victim.weapon_id == UNARMED_WEAPON_ID {
            return None;
        }
        self.spawn_loot(LootKind::Weapon, victim.weapon_id.clone(), victim.x, victim.y)
    }
}

/// What a replica did with an event.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplicaChange {
    /// A new item appeared.
    Spawned(LootItem),
    /// An item was picked up. `item` is `None` if this replica never had it.
    PickedUp {
        /// Removed item, if known.
        item: Option<LootItem>,
        /// Who picked it up.
        player_id: PlayerId,
    },
    /// The list was replaced.
    Synced {
        /// Items after the sync.
        count: usize,
        /// Our pending pickup, granted by the host but never announced to us.
        granted: Option<LootItem>,
    },
    /// Duplicate, unknown or unrelated event.
    Ignored,
}

#[derive(Clone, Debug)]
struct PendingPickup {
    loot_id: LootId,
    requested_at: Instant,
    expected_count: usize,
    resynced: bool,
}

/// A non-host peer's copy of the loot list.
pub struct LootReplica {
    local_id: PlayerId,
    items: Vec<LootItem>,
    removed: HashSet<LootId>,
    pending: Option<PendingPickup>,
    synced: bool,
    last_request_at: Instant,
    settings: LootSettings,
    sync_timeout: Duration,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for LootReplica {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LootReplica")
            .field("local_id", &self.local_id)
            .field("items", &self.items.len())
            .field("synced", &self.synced)
            .finish_non_exhaustive()
    }
}

impl LootReplica {
    /// Creates an empty replica. `now` starts the first-sync timer.
    #[must_use]
    pub fn new(
        local_id: PlayerId,
        settings: LootSettings,
        sync_timeout: Duration,
        sink: Arc<dyn EventSink>,
        now: Instant,
    ) -> Self {
        Self {
            local_id,
            items: Vec::new(),
            removed: HashSet::new(),
            pending: None,
            synced: false,
            last_request_at: now,
            settings,
            sync_timeout,
            sink,
        }
    }

    /// Items this peer believes are on the ground.
    #[must_use]
    pub fn items(&self) -> &[LootItem] {
        &self.items
    }

    /// One item by id.
    #[must_use]
    pub fn get(&self, loot_id: &LootId) -> Option<&LootItem> {
        self.items.iter().find(|item| &item.id == loot_id)
    }

    /// True once a `loot_sync` has arrived.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.synced
    }

    /// True while a pickup request is unanswered.
    #[must_use]
    pub fn has_pending_pickup(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies one loot event from the host.
    pub fn apply(&mut self, event: &WireEvent) -> ReplicaChange {
        match event {
            WireEvent::LootSpawned(item) => {
                if self.removed.contains(&item.id) || self.get(&item.id).is_some() {
                    return ReplicaChange::Ignored;
                }
                self.items.push(item.clone());
                ReplicaChange::Spawned(item.clone())
            }
            WireEvent::LootPickedUp { loot_id, player_id } => {
                if !self.removed.insert(loot_id.clone()) {
                    return ReplicaChange::Ignored;
                }
                let item = self
                    .items
                    .iter()
                    .position(|item| &item.id == loot_id)
                    .map(|index| self.items.remove(index));
                if self.pending.as_ref().is_some_and(|p| &p.loot_id == loot_id) {
                    self.pending = None;
                }
                ReplicaChange::PickedUp {
                    item,
                    player_id: player_id.clone(),
                }
            }
            WireEvent::LootSync { loot, grants } => {
                // A sync can arrive after a newer pickup; picked-up ids stay gone.
                self.items = loot
                    .iter()
                    .filter(|item| !self.removed.contains(&item.id))
                    .cloned()
                    .collect();
                self.synced = true;
                let granted = self.resolve_pending(grants);
                tracing::debug!(count = self.items.len(), granted = granted.is_some(), "loot list replaced");
                ReplicaChange::Synced {
                    count: self.items.len(),
                    granted,
                }
            }
            _ => ReplicaChange::Ignored,
        }
    }

    /// Settles the pending pickup against a fresh list.
    ///
    /// Gone from the list: it went to whoever `grants` names. Still listed
    /// after our own resync: the host turned the request down.
    fn resolve_pending(&mut self, grants: &[LootGrant]) -> Option<LootItem> {
        let pending = self.pending.as_ref()?;
        if self.get(&pending.loot_id).is_some() {
            if pending.resynced {
                self.pending = None;
            }
            return None;
        }
        let loot_id = pending.loot_id.clone();
        self.pending = None;
        self.removed.insert(loot_id.clone());
        grants
            .iter()
            .find(|grant| grant.player_id == self.local_id && grant.loot.id == loot_id)
            .map(|grant| grant.loot.clone())
    }

    /// True if `player` could pick up `loot_id` right now.
    #[must_use]
    pub fn can_pick_up(&self, player: &PlayerState, loot_id: &LootId) -> bool {
        check_pickup(&self.items, Some(player), &player.id, loot_id, self.settings.pickup_radius).is_ok()
    }

    /// Sends a pickup request if it looks valid locally.
    ///
    /// The host has the final say. Returns `true` if a request was sent.
    pub fn request_pickup(&mut self, player: &PlayerState, loot_id: &LootId, now: Instant) -> bool {
        let kind = match check_pickup(&self.items, Some(player), &self.local_id, loot_id, self.settings.pickup_radius) {
            Ok(loot) => loot.kind,
            Err(reason) => {
                tracing::trace!(%reason, "pickup not requested");
                return false;
            }
        };
        let displaces = usize::from(Loadout::of(player).would_displace(kind));
        self.pending = Some(PendingPickup {
            loot_id: loot_id.clone(),
            requested_at: now,
            expected_count: self.items.len() - 1 + displaces,
            resynced: false,
        });
        self.sink.send_event(WireEvent::LootPickupRequest {
            loot_id: loot_id.clone(),
        });
        true
    }

    /// Asks the host for a `loot_sync` if this replica looks out of date.
    ///
    /// Drift means an unanswered pickup past the timeout, or no sync at all
    /// within the timeout of joining. An unanswered pickup stays pending
    /// through one resync so the answer can settle it. Returns `true` if a
    /// request was sent.
    pub fn check_drift(&mut self, now: Instant) -> bool {
        if let Some(pending) = &mut self.pending {
            if now.saturating_duration_since(pending.requested_at) < self.sync_timeout {
                return false;
            }
            let still_there = self.items.iter().any(|item| item.id == pending.loot_id);
            let miscounted = self.items.len() != pending.expected_count;
            if pending.resynced || !(still_there || miscounted) {
                self.pending = None;
                return false;
            }
            pending.resynced = true;
            pending.requested_at = now;
            self.request_sync(now, "pickup unresolved");
            return true;
        }
        if !self.synced && now.saturating_duration_since(self.last_request_at) >= self.sync_timeout {
            self.request_sync(now, "no loot sync received");
            return true;
        }
        false
    }

    /// Asks the host for a `loot_sync` now.
    pub fn request_sync(&mut self, now: Instant, cause: &'static str) {
        tracing::debug!(player = %self.local_id, cause, "requesting loot sync");
        self.last_request_at = now;
        self.sink.send_event(WireEvent::RequestLootSync {});
    }
}
