//! # SKIRMISH Event Bus
//!
//! Local, one-way notifications from the simulation to the renderer.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐      ┌─────────────┐      ┌─────────────┐
//! │ Simulation  │─────>│   Event     │─────>│  Renderer   │
//! │   (tick)    │      │   Channel   │      │ (particles, │
//! └─────────────┘      └─────────────┘      │  HUD, audio)│
//!                                           └─────────────┘
//! ```
//!
//! Nothing here crosses the network. Uses a bounded crossbeam channel so a
//! stalled consumer costs dropped effects, not memory.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use skirmish_shared::{LootId, LootItem, PlayerId, PlayerStat, Vec2};

/// Default channel capacity.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Something the renderer may want to show.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    // =========================================================================
    // Combat
    // =========================================================================
    /// A player started a swing.
    AttackStarted {
        /// Who swung.
        player_id: PlayerId,
        /// Weapon used.
        weapon_id: String,
    },

    /// A swing connected.
    Hit {
        /// Who swung.
        attacker_id: PlayerId,
        /// Who was struck.
        target_id: PlayerId,
        /// Damage after armor.
        damage: f32,
        /// Target health afterwards.
        health_remaining: f32,
    },

    /// The conflict zone hurt the local player.
    ZoneDamage {
        /// Damage this tick.
        damage: f32,
    },

    /// A player died.
    Died {
        /// Who died.
        victim_id: PlayerId,
        /// Last hitter, if any.
        killer_id: Option<PlayerId>,
        /// Where.
        position: Vec2,
    },

    /// The local player came back.
    Respawned {
        /// Who.
        player_id: PlayerId,
        /// Where.
        position: Vec2,
    },

    // =========================================================================
    // Loot
    // =========================================================================
    /// A player equipped a loot item.
    LootPickedUp {
        /// Who.
        player_id: PlayerId,
        /// Removed item.
        loot_id: LootId,
        /// The item, if this peer knew it.
        item: Option<LootItem>,
    },

    // =========================================================================
    // Match
    // =========================================================================
    /// The match started.
    MatchStarted,

    /// The match ended.
    MatchOver {
        /// Last player standing, if any.
        winner_id: Option<PlayerId>,
        /// Standings, most kills first.
        stats: Vec<PlayerStat>,
    },
}

/// Bounded event channel.
pub struct EventBus {
    sender: Sender<GameEvent>,
    receiver: Receiver<GameEvent>,
}

impl EventBus {
    /// Creates a bus holding at most `capacity` undelivered events.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle (clone for multiple producers).
    #[must_use]
    pub fn sender(&self) -> EventSender {
        EventSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle (clone for multiple consumers).
    #[must_use]
    pub fn receiver(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Convenience for a paired sender and receiver.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (EventSender, EventReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("pending", &self.receiver.len())
            .finish()
    }
}

/// Handle for sending events.
#[derive(Clone, Debug)]
pub struct EventSender {
    sender: Sender<GameEvent>,
}

impl EventSender {
    /// Sends an event without blocking.
    ///
    /// Returns `false` if the channel is full or every receiver is gone;
    /// the event is dropped.
    #[inline]
    pub fn send(&self, event: GameEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::trace!("game event dropped, channel full");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for receiving events.
#[derive(Clone, Debug)]
pub struct EventReceiver {
    receiver: Receiver<GameEvent>,
}

impl EventReceiver {
    /// Every pending event, oldest first.
    #[inline]
    pub fn drain(&self) -> Vec<GameEvent> {
        self.receiver.try_iter().collect()
    }

    /// One event, if any.
    #[inline]
    pub fn try_recv(&self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Number of pending events.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }

    /// True if events are waiting.
    #[inline]
    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.receiver.is_empty()
    }
}
