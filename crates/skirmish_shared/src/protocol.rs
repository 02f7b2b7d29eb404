//! Wire protocol.
//!
//! Everything on the broadcast channel is an [`Envelope`]: the sender's id
//! plus either a player-state patch or a named [`WireEvent`]. Real backends
//! carry envelopes as JSON. The in-memory backend passes them as values.

use crate::ids::{LootId, PlayerId};
use crate::loot::LootItem;
use crate::player::PlayerStatePatch;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Final standing of one player, carried by `game_over`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStat {
    /// Player.
    pub player_id: PlayerId,
    /// Display name.
    pub name: String,
    /// Kills this match.
    pub kills: u32,
}

/// A pickup the host granted, repeated in every `loot_sync` so a peer that
/// missed the `loot_picked_up` can still equip what it was given.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootGrant {
    /// Who got the item.
    pub player_id: PlayerId,
    /// The item as it lay on the ground.
    pub loot: LootItem,
}

/// Named events on the broadcast channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum WireEvent {
    /// Host spawned one item.
    LootSpawned(LootItem),
    /// Host granted a pickup.
    LootPickedUp {
        /// Removed item.
        loot_id: LootId,
        /// Player who now holds it.
        player_id: PlayerId,
    },
    /// Host's full loot list. Replaces whatever the receiver had.
    LootSync {
        /// Every item on the ground.
        loot: Vec<LootItem>,
        /// Latest grant per player.
        #[serde(default)]
        grants: Vec<LootGrant>,
    },
    /// A replica asks the host for a [`WireEvent::LootSync`].
    RequestLootSync {},
    /// A peer asks the host to pick up an item.
    LootPickupRequest {
        /// Item to pick up.
        loot_id: LootId,
    },
    /// A player died. Sent by the victim's owner.
    PlayerDeath {
        /// Who died.
        victim_id: PlayerId,
        /// Who landed the last hit, if anyone.
        killer_id: Option<PlayerId>,
    },
    /// Host ended the match.
    GameOver {
        /// Last player standing, if any.
        winner_id: Option<PlayerId>,
        /// Standings, most kills first.
        stats: Vec<PlayerStat>,
    },
    /// Host started the match.
    GameStart {},
}

/// Event name, used to register handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `loot_spawned`
    LootSpawned,
    /// `loot_picked_up`
    LootPickedUp,
    /// `loot_sync`
    LootSync,
    /// `request_loot_sync`
    RequestLootSync,
    /// `loot_pickup_request`
    LootPickupRequest,
    /// `player_death`
    PlayerDeath,
    /// `game_over`
    GameOver,
    /// `game_start`
    GameStart,
}

impl EventKind {
    /// Every event kind.
    pub const ALL: [Self; 8] = [
        Self::LootSpawned,
        Self::LootPickedUp,
        Self::LootSync,
        Self::RequestLootSync,
        Self::LootPickupRequest,
        Self::PlayerDeath,
        Self::GameOver,
        Self::GameStart,
    ];

    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LootSpawned => "loot_spawned",
            Self::LootPickedUp => "loot_picked_up",
            Self::LootSync => "loot_sync",
            Self::RequestLootSync => "request_loot_sync",
            Self::LootPickupRequest => "loot_pickup_request",
            Self::PlayerDeath => "player_death",
            Self::GameOver => "game_over",
            Self::GameStart => "game_start",
        }
    }
}

impl WireEvent {
    /// Name this event is dispatched under.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::LootSpawned(_) => EventKind::LootSpawned,
            Self::LootPickedUp { .. } => EventKind::LootPickedUp,
            Self::LootSync { .. } => EventKind::LootSync,
            Self::RequestLootSync {} => EventKind::RequestLootSync,
            Self::LootPickupRequest { .. } => EventKind::LootPickupRequest,
            Self::PlayerDeath { .. } => EventKind::PlayerDeath,
            Self::GameOver { .. } => EventKind::GameOver,
            Self::GameStart {} => EventKind::GameStart,
        }
    }

    /// Encodes as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error. Only non-finite coordinates can cause one.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes from JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error for malformed or unknown events.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Payload of a broadcast message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BroadcastMessage {
    /// Partial update of one player.
    PlayerState {
        /// Player the patch applies to.
        player_id: PlayerId,
        /// Changed fields.
        patch: PlayerStatePatch,
    },
    /// A named event.
    Event {
        /// The event.
        event: WireEvent,
    },
}

/// One message on the broadcast channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Sender.
    pub from: PlayerId,
    /// Content.
    pub message: BroadcastMessage,
}

impl Envelope {
    /// Wraps a named event.
    #[must_use]
    pub fn event(from: PlayerId, event: WireEvent) -> Self {
        Self {
            from,
            message: BroadcastMessage::Event { event },
        }
    }

    /// Wraps a player-state patch.
    #[must_use]
    pub fn player_state(from: PlayerId, player_id: PlayerId, patch: PlayerStatePatch) -> Self {
        Self {
            from,
            message: BroadcastMessage::PlayerState { player_id, patch },
        }
    }

    /// Encodes as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serializer error.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Decodes from JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Where loot and match events leave a component.
///
/// Implemented by the transport. Sending is fire-and-forget: failures are
/// logged by the implementation, never returned.
pub trait EventSink: Send + Sync {
    /// Publishes a named event.
    fn send_event(&self, event: WireEvent);

    /// Publishes a partial update of `player_id`.
    fn broadcast_player_state(&self, player_id: &PlayerId, patch: PlayerStatePatch);
}

/// Sink that records everything. Used in tests and benches.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<WireEvent>>,
    patches: Mutex<Vec<(PlayerId, PlayerStatePatch)>>,
}

impl RecordingSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events sent so far.
    #[must_use]
    pub fn events(&self) -> Vec<WireEvent> {
        self.events.lock().clone()
    }

    /// Patches sent so far.
    #[must_use]
    pub fn patches(&self) -> Vec<(PlayerId, PlayerStatePatch)> {
        self.patches.lock().clone()
    }

    /// Number of events of `kind` sent so far.
    #[must_use]
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    /// Forgets everything recorded.
    pub fn clear(&self) {
        self.events.lock().clear();
        self.patches.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn send_event(&self, event: WireEvent) {
        self.events.lock().push(event);
    }

    fn broadcast_player_state(&self, player_id: &PlayerId, patch: PlayerStatePatch) {
        self.patches.lock().push((player_id.clone(), patch));
    }
}
