//! # Transport
//!
//! One [`Transport`] per session membership. It owns:
//!
//! - the session record and the local player's identity,
//! - the latest local [`PlayerState`], written durably on demand and by a
//!   periodic task,
//! - a broadcast subscription for named events, dispatched by [`Transport::pump`].
//!
//! ## Dispatch Model
//!
//! ```text
//! backend ──► subscription channel ──► pump() ──► on(kind) handlers ──► Inbox
//!                                                                      │
//!                                          Simulation::tick() drains ◄─┘
//! ```
//!
//! Handlers never touch simulation state directly. They stage.
//!
//! The transport never echoes a peer's own events back to it.

use crate::backend::{RowChange, Subscription, SubscriptionId, SyncBackend};
use crate::error::{TransportError, TransportResult};
use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand::Rng;
use skirmish_shared::clock::{clock_seed, unix_millis};
use skirmish_shared::{
    BroadcastMessage, Envelope, EventKind, EventSink, JoinCode, PlayerId, PlayerState,
    PlayerStatePatch, Session, SessionId, SessionPhase, TransportConfig, WireEvent,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Callback registered with [`Transport::on`]. Receives the sender and the event.
pub type EventHandler = Box<dyn FnMut(&PlayerId, &WireEvent) + Send>;

/// Subscriptions handed to a [`crate::PlayerSnapshot`].
#[derive(Debug)]
pub struct PlayerFeed {
    /// Durable row changes.
    pub rows: Subscription<RowChange>,
    /// Broadcast envelopes, for player-state deltas.
    pub broadcast: Subscription<Envelope>,
}

/// Transport statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Named events published.
    pub events_sent: u64,
    /// Player-state patches published.
    pub patches_sent: u64,
    /// Named events handed to handlers.
    pub events_dispatched: u64,
    /// Publish calls that failed.
    pub publish_errors: u64,
    /// Durable writes that succeeded.
    pub durable_writes: u64,
    /// Durable writes that failed.
    pub write_errors: u64,
}

/// A live session membership.
pub struct Transport {
    backend: Arc<dyn SyncBackend>,
    session: Mutex<Session>,
    local_id: PlayerId,
    is_host: bool,
    config: TransportConfig,
    latest_local: Arc<Mutex<PlayerState>>,
    events: Subscription<Envelope>,
    handlers: Mutex<HashMap<EventKind, Vec<EventHandler>>>,
    subscriptions: Mutex<Vec<SubscriptionId>>,
    writer: Mutex<Option<JoinHandle<()>>>,
    alive: Arc<AtomicBool>,
    stats: Arc<Mutex<TransportStats>>,
}

impl Transport {
    /// Creates a session and joins it as host.
    ///
    /// Join-code collisions are retried with a fresh code up to
    /// `config.join_code_attempts` times.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Connectivity`] if the backend is unreachable
    /// - [`TransportError::SessionCreate`] if no unique code was found or the
    ///   backend refused the session
    pub fn host_game(
        backend: Arc<dyn SyncBackend>,
        player_id: PlayerId,
        name: &str,
        config: &TransportConfig,
    ) -> TransportResult<Self> {
        let seed = config.rng_seed.unwrap_or_else(|| clock_seed(player_id.as_str()));
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let attempts = config.join_code_attempts.max(1);

        for attempt in 1..=attempts {
            let now = unix_millis();
            let session = Session {
                id: SessionId::new(format!("session-{:016x}", rng.gen::<u64>())),
                join_code: JoinCode::generate(&mut rng),
                phase: SessionPhase::Lobby,
                host_id: player_id.clone(),
                max_players: config.max_players,
                created_at_ms: now,
                expires_at_ms: now.saturating_add(config.session_ttl_ms),
            };

            match backend.create_session(session.clone()) {
                Ok(()) => {
                    let mut local = PlayerState::new(player_id, name, 0.0, 0.0);
                    local.last_heartbeat_ms = now;
                    if let Err(err) = backend.insert_player(&session.id, local.clone()) {
                        // Without a host row the session is dead; free its join code.
                        if let Err(cleanup) = backend.set_session_phase(&session.id, SessionPhase::Ended) {
                            tracing::warn!(session = %session.id, error = %cleanup, "could not retire session");
                        }
                        return Err(match err {
                            TransportError::Connectivity(detail) => TransportError::Connectivity(detail),
                            other => TransportError::SessionCreate(other.to_string()),
                        });
                    }
                    tracing::info!(
                        session = %session.id,
                        join_code = %session.join_code,
                        host = %local.id,
                        "hosting session"
                    );
                    return Self::open(backend, session, local, config.clone());
                }
                Err(TransportError::DuplicateConstraint(detail)) => {
                    tracing::debug!(attempt, %detail, "join code collision, regenerating");
                }
                Err(TransportError::Connectivity(detail)) => {
                    return Err(TransportError::Connectivity(detail));
                }
                Err(other) => return Err(TransportError::SessionCreate(other.to_string())),
            }
        }

        Err(TransportError::SessionCreate(format!(
            "no unique join code after {attempts} attempts"
        )))
    }

    /// Joins an existing session by join code.
    ///
    /// A player whose row already exists but is marked disconnected rejoins
    /// with their previous state.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidJoinCode`] for malformed codes
    /// - [`TransportError::SessionNotFound`] if no live session uses the code
    /// - [`TransportError::DuplicateConstraint`] if the player is already connected
    /// - [`TransportError::SessionFull`] if every slot is taken
    /// - [`TransportError::Connectivity`] if the backend is unreachable
    pub fn join_game(
        backend: Arc<dyn SyncBackend>,
        player_id: PlayerId,
        join_code: &str,
        name: &str,
        config: &TransportConfig,
    ) -> TransportResult<Self> {
        let code = JoinCode::parse(join_code)?;
        let now = unix_millis();
        let session = backend
            .find_session(&code)?
            .filter(|session| session.is_joinable(now))
            .ok_or_else(|| TransportError::SessionNotFound(code.to_string()))?;

        let rows = backend.list_players(&session.id)?;
        let local = if let Some(existing) = rows.iter().find(|row| row.id == player_id) {
            if existing.is_connected {
                return Err(TransportError::DuplicateConstraint(format!(
                    "player {player_id} is already in session {code}"
                )));
            }
            let mut state = existing.clone();
            state.is_connected = true;
            state.name = name.to_owned();
            state.last_heartbeat_ms = now;
            backend.upsert_player(&session.id, state.clone())?;
            tracing::info!(session = %session.id, player = %player_id, "rejoined session");
            state
        } else {
            let connected = rows.iter().filter(|row| row.is_connected).count();
            if connected >= session.max_players {
                return Err(TransportError::SessionFull(code.to_string()));
            }
            let mut state = PlayerState::new(player_id, name, 0.0, 0.0);
            state.last_heartbeat_ms = now;
            backend.insert_player(&session.id, state.clone())?;
            tracing::info!(session = %session.id, player = %state.id, "joined session");
            state
        };

        Self::open(backend, session, local, config.clone())
    }

    fn open(
        backend: Arc<dyn SyncBackend>,
        session: Session,
        local: PlayerState,
        config: TransportConfig,
    ) -> TransportResult<Self> {
        let events = backend.subscribe_broadcast(&session.id)?;
        let is_host = session.is_host(&local.id);
        Ok(Self {
            subscriptions: Mutex::new(vec![events.id()]),
            events,
            local_id: local.id.clone(),
            latest_local: Arc::new(Mutex::new(local)),
            backend,
            session: Mutex::new(session),
            is_host,
            config,
            handlers: Mutex::new(HashMap::new()),
            writer: Mutex::new(None),
            alive: Arc::new(AtomicBool::new(true)),
            stats: Arc::new(Mutex::new(TransportStats::default())),
        })
    }

    /// Opens a fresh pair of subscriptions for a player snapshot.
    ///
    /// They are released by [`Transport::disconnect`] as well.
    ///
    /// # Errors
    ///
    /// [`TransportError::Disconnected`] after disconnect, or a backend error.
    pub fn open_player_feed(&self) -> TransportResult<PlayerFeed> {
        self.ensure_alive()?;
        let session_id = self.session_id();
        let rows = self.backend.subscribe_rows(&session_id)?;
        let broadcast = match self.backend.subscribe_broadcast(&session_id) {
            Ok(broadcast) => broadcast,
            Err(err) => {
                self.backend.unsubscribe(rows.id());
                return Err(err);
            }
        };
        self.subscriptions.lock().extend([rows.id(), broadcast.id()]);
        Ok(PlayerFeed { rows, broadcast })
    }

    /// Replaces the cached local state that durable writes persist.
    pub fn set_local_state(&self, state: PlayerState) {
        *self.latest_local.lock() = state;
    }

    /// The cached local state.
    #[must_use]
    pub fn local_state(&self) -> PlayerState {
        self.latest_local.lock().clone()
    }

    /// Broadcasts a partial update of the local player.
    ///
    /// Fire-and-forget: delivery is at-most-once and unordered relative to
    /// other senders. The cached local state is updated first.
    pub fn broadcast_player_state_update(&self, patch: PlayerStatePatch) {
        patch.apply_to(&mut self.latest_local.lock());
        let local = self.local_id.clone();
        self.publish_patch(local, patch);
    }

    fn publish_patch(&self, player_id: PlayerId, patch: PlayerStatePatch) {
        if !self.is_connected() {
            return;
        }
        let envelope = Envelope::player_state(self.local_id.clone(), player_id, patch);
        match self.backend.publish(&self.session_id(), envelope) {
            Ok(()) => self.stats.lock().patches_sent += 1,
            Err(err) => {
                self.stats.lock().publish_errors += 1;
                tracing::warn!(error = %err, "player state broadcast failed");
            }
        }
    }

    /// Writes the cached local state to the durable row now.
    ///
    /// # Errors
    ///
    /// [`TransportError::Disconnected`] after disconnect, or a backend error.
    pub fn write_player_state_now(&self) -> TransportResult<()> {
        self.ensure_alive()?;
        let state = self.local_state();
        let result = self.backend.upsert_player(&self.session_id(), state);
        let mut stats = self.stats.lock();
        match &result {
            Ok(()) => stats.durable_writes += 1,
            Err(err) => {
                stats.write_errors += 1;
                tracing::warn!(error = %err, "durable player write failed");
            }
        }
        result
    }

    /// Starts writing the cached local state every `interval`.
    ///
    /// Calling again replaces the running task.
    ///
    /// # Errors
    ///
    /// - [`TransportError::Disconnected`] after disconnect
    /// - [`TransportError::NoRuntime`] outside a Tokio runtime
    pub fn start_periodic_player_state_write(&self, interval: Duration) -> TransportResult<()> {
        self.ensure_alive()?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|err| TransportError::NoRuntime(err.to_string()))?;

        let interval = interval.max(Duration::from_millis(1));
        let backend = Arc::clone(&self.backend);
        let session_id = self.session_id();
        let latest = Arc::clone(&self.latest_local);
        let alive = Arc::clone(&self.alive);
        let stats = Arc::clone(&self.stats);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !alive.load(Ordering::Acquire) {
                    break;
                }
                let state = latest.lock().clone();
                match backend.upsert_player(&session_id, state) {
                    Ok(()) => stats.lock().durable_writes += 1,
                    Err(err) => {
                        stats.lock().write_errors += 1;
                        tracing::warn!(error = %err, "periodic player write failed");
                    }
                }
            }
        });

        if let Some(previous) = self.writer.lock().replace(task) {
            previous.abort();
        }
        Ok(())
    }

    /// Starts the periodic writer at the configured interval.
    ///
    /// # Errors
    ///
    /// As [`Transport::start_periodic_player_state_write`].
    pub fn start_default_player_state_write(&self) -> TransportResult<()> {
        self.start_periodic_player_state_write(self.config.player_state_write_interval())
    }

    /// Publishes a named event to every other peer.
    ///
    /// # Errors
    ///
    /// [`TransportError::Disconnected`] after disconnect, or a backend error.
    pub fn send(&self, event: WireEvent) -> TransportResult<()> {
        self.ensure_alive()?;
        let kind = event.kind();
        let envelope = Envelope::event(self.local_id.clone(), event);
        match self.backend.publish(&self.session_id(), envelope) {
            Ok(()) => {
                self.stats.lock().events_sent += 1;
                Ok(())
            }
            Err(err) => {
                self.stats.lock().publish_errors += 1;
                tracing::warn!(event = kind.as_str(), error = %err, "event publish failed");
                Err(err)
            }
        }
    }

    /// Registers a handler for events of `kind`.
    ///
    /// Handlers run inside [`Transport::pump`] and must not call back into
    /// `on`.
    pub fn on(&self, kind: EventKind, handler: impl FnMut(&PlayerId, &WireEvent) + Send + 'static) {
        self.handlers
            .lock()
            .entry(kind)
            .or_default()
            .push(Box::new(handler));
    }

    /// Dispatches every queued event to its handlers.
    ///
    /// Returns the number of events dispatched. Does nothing after
    /// disconnect.
    pub fn pump(&self) -> usize {
        if !self.is_connected() {
            return 0;
        }
        let mut dispatched = 0;
        let mut handlers = self.handlers.lock();
        while let Some(envelope) = self.events.try_next() {
            if !self.is_connected() {
                break;
            }
            if envelope.from == self.local_id {
                continue;
            }
            let BroadcastMessage::Event { event } = envelope.message else {
                continue;
            };
            if let Some(registered) = handlers.get_mut(&event.kind()) {
                for handler in registered.iter_mut() {
                    handler(&envelope.from, &event);
                }
            }
            dispatched += 1;
        }
        drop(handlers);
        self.stats.lock().events_dispatched += dispatched as u64;
        dispatched
    }

    /// Moves the session to `phase`. Host only.
    ///
    /// # Errors
    ///
    /// - [`TransportError::NotHost`] on a non-host peer
    /// - [`TransportError::Disconnected`] after disconnect
    /// - a backend error
    pub fn set_session_phase(&self, phase: SessionPhase) -> TransportResult<()> {
        if !self.is_host {
            return Err(TransportError::NotHost("change the session phase"));
        }
        self.ensure_alive()?;
        let session_id = self.session_id();
        self.backend.set_session_phase(&session_id, phase)?;
        self.session.lock().phase = phase;
        tracing::info!(session = %session_id, ?phase, "session phase changed");
        Ok(())
    }

    /// Leaves the session.
    ///
    /// Unsubscribes every channel, stops the periodic writer and marks the
    /// local player disconnected. The row itself is kept so the player can
    /// rejoin. Calling again does nothing.
    pub fn disconnect(&self) {
        if !self.alive.swap(false, Ordering::AcqRel) {
            return;
        }
        if let Some(writer) = self.writer.lock().take() {
            writer.abort();
        }
        for id in self.subscriptions.lock().drain(..) {
            self.backend.unsubscribe(id);
        }

        let mut state = self.local_state();
        state.is_connected = false;
        state.is_attacking = false;
        let session_id = self.session_id();
        if let Err(err) = self.backend.upsert_player(&session_id, state.clone()) {
            tracing::warn!(error = %err, "could not mark player disconnected");
        }
        self.set_local_state(state);
        tracing::info!(session = %session_id, player = %self.local_id, "left session");
    }

    /// Snapshot of the session record.
    #[must_use]
    pub fn session(&self) -> Session {
        self.session.lock().clone()
    }

    /// Session id.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session.lock().id.clone()
    }

    /// Local player id.
    #[must_use]
    pub fn local_player_id(&self) -> &PlayerId {
        &self.local_id
    }

    /// True if this peer is the host.
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// True until [`Transport::disconnect`].
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    /// The backend.
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn SyncBackend> {
        &self.backend
    }

    /// Transport configuration.
    #[must_use]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> TransportStats {
        *self.stats.lock()
    }

    fn ensure_alive(&self) -> TransportResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(TransportError::Disconnected)
        }
    }
}

impl EventSink for Transport {
    fn send_event(&self, event: WireEvent) {
        // Failures are already logged by `send`.
        let _ = self.send(event);
    }

    fn broadcast_player_state(&self, player_id: &PlayerId, patch: PlayerStatePatch) {
        if player_id == &self.local_id {
            self.broadcast_player_state_update(patch);
        } else {
            self.publish_patch(player_id.clone(), patch);
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("session", &self.session_id())
            .field("local_id", &self.local_id)
            .field("is_host", &self.is_host)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
