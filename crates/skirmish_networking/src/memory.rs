//! # In-Memory Backend
//!
//! A complete [`SyncBackend`] living in one process. Local play and every
//! test in the workspace run against it.
//!
//! Broadcast delivery can be degraded with [`NetworkConditions`] to exercise
//! the self-healing paths (loot resync, durable writes). A reordered
//! broadcast is held back and delivered right after the next one to the same
//! subscriber. Durable rows are never lost or reordered. [`InMemoryBackend::set_online`] simulates losing the backend
//! entirely.

use crate::backend::{RowChange, Subscription, SubscriptionId, SyncBackend};
use crate::error::{TransportError, TransportResult};
use crossbeam_channel::{unbounded, Sender};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skirmish_shared::clock::unix_millis;
use skirmish_shared::{Envelope, JoinCode, PlayerId, PlayerState, Session, SessionId, SessionPhase};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Broadcast degradation for testing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkConditions {
    /// Broadcast loss percentage (0-100), rolled per subscriber.
    pub packet_loss_percent: u8,
    /// Broadcast duplication percentage (0-100), rolled per subscriber.
    pub duplicate_percent: u8,
    /// Broadcast reordering percentage (0-100), rolled per subscriber.
    pub reorder_percent: u8,
}

impl NetworkConditions {
    /// Every broadcast arrives exactly once.
    pub const PERFECT: Self = Self {
        packet_loss_percent: 0,
        duplicate_percent: 0,
        reorder_percent: 0,
    };

    /// Average home connection.
    pub const AVERAGE: Self = Self {
        packet_loss_percent: 1,
        duplicate_percent: 1,
        reorder_percent: 2,
    };

    /// Poor network conditions (mobile/wifi).
    pub const POOR: Self = Self {
        packet_loss_percent: 5,
        duplicate_percent: 2,
        reorder_percent: 10,
    };

    /// Returns true if the broadcast should be dropped.
    #[must_use]
    pub fn should_drop(&self, rng_value: u32) -> bool {
        (rng_value % 100) < u32::from(self.packet_loss_percent)
    }

    /// Returns true if the broadcast should be delivered twice.
    #[must_use]
    pub fn should_duplicate(&self, rng_value: u32) -> bool {
        (rng_value % 100) < u32::from(self.duplicate_percent)
    }

    /// Returns true if the broadcast should overtake the next one.
    #[must_use]
    pub fn should_reorder(&self, rng_value: u32) -> bool {
        (rng_value % 100) < u32::from(self.reorder_percent)
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::PERFECT
    }
}

/// Broadcast counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Envelopes published.
    pub published: u64,
    /// Copies handed to subscribers.
    pub delivered: u64,
    /// Copies dropped by [`NetworkConditions`].
    pub dropped: u64,
    /// Extra copies created by [`NetworkConditions`].
    pub duplicated: u64,
    /// Copies held back behind a later broadcast.
    pub reordered: u64,
}

#[derive(Default)]
struct Tables {
    sessions: HashMap<SessionId, Session>,
    codes: HashMap<JoinCode, SessionId>,
    players: HashMap<SessionId, BTreeMap<PlayerId, PlayerState>>,
    row_subscribers: Vec<(SubscriptionId, SessionId, Sender<RowChange>)>,
    broadcast_subscribers: Vec<(SubscriptionId, SessionId, Sender<Envelope>)>,
    held_back: HashMap<SubscriptionId, Vec<Envelope>>,
    stats: BackendStats,
}

impl Tables {
    fn notify_rows(&mut self, session: &SessionId, change: &RowChange) {
        self.row_subscribers
            .retain(|(_, target, tx)| target != session || tx.send(change.clone()).is_ok());
    }
}

/// Process-local session backend.
pub struct InMemoryBackend {
    tables: Mutex<Tables>,
    conditions: NetworkConditions,
    rng: Mutex<ChaCha8Rng>,
    next_subscription: AtomicU64,
    online: AtomicBool,
}

impl InMemoryBackend {
    /// A backend with perfect broadcast delivery.
    #[must_use]
    pub fn new() -> Self {
        Self::with_conditions(NetworkConditions::PERFECT, 0)
    }

    /// A backend whose broadcasts are degraded by `conditions`.
    ///
    /// `seed` makes the loss pattern reproducible.
    #[must_use]
    pub fn with_conditions(conditions: NetworkConditions, seed: u64) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            conditions,
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            next_subscription: AtomicU64::new(1),
            online: AtomicBool::new(true),
        }
    }

    /// Convenience for `Arc::new(Self::new())`.
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulates losing or regaining the backend.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Release);
        tracing::debug!(online, "in-memory backend connectivity changed");
    }

    /// True unless [`Self::set_online`] turned the backend off.
    #[must_use]
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::Acquire)
    }

    /// Broadcast counters so far.
    #[must_use]
    pub fn stats(&self) -> BackendStats {
        self.tables.lock().stats
    }

    /// Number of live subscriptions, rows and broadcasts together.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        let tables = self.tables.lock();
        tables.row_subscribers.len() + tables.broadcast_subscribers.len()
    }

    /// Current session record by id.
    #[must_use]
    pub fn session(&self, id: &SessionId) -> Option<Session> {
        self.tables.lock().sessions.get(id).cloned()
    }

    fn ensure_online(&self) -> TransportResult<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(TransportError::Connectivity("in-memory backend is offline".into()))
        }
    }

    fn next_id(&self) -> SubscriptionId {
        self.next_subscription.fetch_add(1, Ordering::Relaxed)
    }

    fn roll(&self) -> u32 {
        self.rng.lock().gen()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("conditions", &self.conditions)
            .field("online", &self.is_online())
            .finish_non_exhaustive()
    }
}

impl SyncBackend for InMemoryBackend {
    fn create_session(&self, session: Session) -> TransportResult<()> {
        self.ensure_online()?;
        let mut tables = self.tables.lock();
        let now = unix_millis();

        if let Some(existing) = tables.codes.get(&session.join_code) {
            let live = tables
                .sessions
                .get(existing)
                .is_some_and(|s| s.is_joinable(now));
            if live {
                return Err(TransportError::DuplicateConstraint(format!(
                    "join code {} is in use",
                    session.join_code
                )));
            }
        }
        if tables.sessions.contains_key(&session.id) {
            return Err(TransportError::DuplicateConstraint(format!(
                "session id {} is in use",
                session.id
            )));
        }

        tables.codes.insert(session.join_code.clone(), session.id.clone());
        tables.players.entry(session.id.clone()).or_default();
        tables.sessions.insert(session.id.clone(), session);
        Ok(())
    }

    fn find_session(&self, code: &JoinCode) -> TransportResult<Option<Session>> {
        self.ensure_online()?;
        let tables = self.tables.lock();
        Ok(tables
            .codes
            .get(code)
            .and_then(|id| tables.sessions.get(id))
            .cloned())
    }

    fn set_session_phase(&self, session: &SessionId, phase: SessionPhase) -> TransportResult<()> {
        self.ensure_online()?;
        let mut tables = self.tables.lock();
        let record = tables
            .sessions
            .get_mut(session)
            .ok_or_else(|| TransportError::SessionNotFound(session.to_string()))?;
        record.phase = phase;
        Ok(())
    }

    fn insert_player(&self, session: &SessionId, state: PlayerState) -> TransportResult<()> {
        self.ensure_online()?;
        let mut tables = self.tables.lock();
        let rows = tables
            .players
            .get_mut(session)
            .ok_or_else(|| TransportError::SessionNotFound(session.to_string()))?;
        if rows.contains_key(&state.id) {
            return Err(TransportError::DuplicateConstraint(format!(
                "player {} already joined",
                state.id
            )));
        }
        rows.insert(state.id.clone(), state.clone());
        tables.notify_rows(session, &RowChange::Upsert(state));
        Ok(())
    }

    fn upsert_player(&self, session: &SessionId, state: PlayerState) -> TransportResult<()> {
        self.ensure_online()?;
        let mut tables = self.tables.lock();
        let rows = tables
            .players
            .get_mut(session)
            .ok_or_else(|| TransportError::SessionNotFound(session.to_string()))?;
        rows.insert(state.id.clone(), state.clone());
        tables.notify_rows(session, &RowChange::Upsert(state));
        Ok(())
    }

    fn delete_player(&self, session: &SessionId, player: &PlayerId) -> TransportResult<()> {
        self.ensure_online()?;
        let mut tables = self.tables.lock();
        let removed = tables
            .players
            .get_mut(session)
            .and_then(|rows| rows.remove(player))
            .is_some();
        if removed {
            tables.notify_rows(session, &RowChange::Delete(player.clone()));
        }
        Ok(())
    }

    fn list_players(&self, session: &SessionId) -> TransportResult<Vec<PlayerState>> {
        self.ensure_online()?;
        let tables = self.tables.lock();
        Ok(tables
            .players
            .get(session)
            .map(|rows| rows.values().cloned().collect())
            .unwrap_or_default())
    }

    fn subscribe_rows(&self, session: &SessionId) -> TransportResult<Subscription<RowChange>> {
        self.ensure_online()?;
        let (tx, rx) = unbounded();
        let id = self.next_id();
        self.tables
            .lock()
            .row_subscribers
            .push((id, session.clone(), tx));
        Ok(Subscription::new(id, rx))
    }

    fn subscribe_broadcast(&self, session: &SessionId) -> TransportResult<Subscription<Envelope>> {
        self.ensure_online()?;
        let (tx, rx) = unbounded();
        let id = self.next_id();
        self.tables
            .lock()
            .broadcast_subscribers
            .push((id, session.clone(), tx));
        Ok(Subscription::new(id, rx))
    }

    fn publish(&self, session: &SessionId, envelope: Envelope) -> TransportResult<()> {
        self.ensure_online()?;
        let mut guard = self.tables.lock();
        let Tables {
            broadcast_subscribers,
            held_back,
            stats,
            ..
        } = &mut *guard;
        stats.published += 1;

        broadcast_subscribers.retain(|(id, target, tx)| {
            if target != session {
                return true;
            }
            if self.conditions.should_drop(self.roll()) {
                stats.dropped += 1;
                tracing::debug!(subscription = id, from = %envelope.from, "broadcast dropped");
                return true;
            }
            let copies = if self.conditions.should_duplicate(self.roll()) {
                stats.duplicated += 1;
                2
            } else {
                1
            };
            if self.conditions.should_reorder(self.roll()) {
                stats.reordered += 1;
                held_back
                    .entry(*id)
                    .or_default()
                    .extend(std::iter::repeat(envelope.clone()).take(copies));
                return true;
            }
            let overtaken = held_back.remove(id).unwrap_or_default();
            for copy in std::iter::repeat(&envelope).take(copies).chain(&overtaken) {
                if tx.send(copy.clone()).is_err() {
                    return false;
                }
                stats.delivered += 1;
            }
            true
        });
        let live: Vec<SubscriptionId> = broadcast_subscribers.iter().map(|(id, _, _)| *id).collect();
        held_back.retain(|id, _| live.contains(id));
        Ok(())
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        let mut tables = self.tables.lock();
        tables.row_subscribers.retain(|(sub, _, _)| *sub != id);
        tables.broadcast_subscribers.retain(|(sub, _, _)| *sub != id);
        tables.held_back.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_shared::WireEvent;

    fn session(code: &str, id: &str) -> Session {
        let now = unix_millis();
        Session {
            id: SessionId::new(id),
            join_code: JoinCode::parse(code).unwrap(),
            phase: SessionPhase::Lobby,
            host_id: PlayerId::new("host"),
            max_players: 4,
            created_at_ms: now,
            expires_at_ms: now + 60_000,
        }
    }

    #[test]
    fn live_join_codes_are_unique() {
        let backend = InMemoryBackend::new();
        backend.create_session(session("ABCDEF", "s1")).unwrap();
        let err = backend.create_session(session("ABCDEF", "s2")).unwrap_err();
        assert!(matches!(err, TransportError::DuplicateConstraint(_)));
    }

    #[test]
    fn ended_session_frees_its_code() {
        let backend = InMemoryBackend::new();
        backend.create_session(session("ABCDEF", "s1")).unwrap();
        backend
            .set_session_phase(&SessionId::new("s1"), SessionPhase::Ended)
            .unwrap();
        backend.create_session(session("ABCDEF", "s2")).unwrap();
    }

    #[test]
    fn row_changes_reach_subscribers() {
        let backend = InMemoryBackend::new();
        backend.create_session(session("ABCDEF", "s1")).unwrap();
        let id = SessionId::new("s1");
        let rows = backend.subscribe_rows(&id).unwrap();

        let state = PlayerState::new(PlayerId::new("p"), "P", 0.0, 0.0);
        backend.insert_player(&id, state.clone()).unwrap();
        assert!(backend.insert_player(&id, state.clone()).is_err());
        backend.delete_player(&id, &state.id).unwrap();

        let changes = rows.drain();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0], RowChange::Upsert(state.clone()));
        assert_eq!(changes[1], RowChange::Delete(state.id));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let backend = InMemoryBackend::new();
        backend.create_session(session("ABCDEF", "s1")).unwrap();
        let id = SessionId::new("s1");
        let feed = backend.subscribe_broadcast(&id).unwrap();
        backend.unsubscribe(feed.id());
        backend
            .publish(&id, Envelope::event(PlayerId::new("host"), WireEvent::GameStart {}))
            .unwrap();
        assert!(feed.try_next().is_none());
        assert_eq!(backend.subscription_count(), 0);
    }

    #[test]
    fn offline_backend_refuses_everything() {
        let backend = InMemoryBackend::new();
        backend.set_online(false);
        let err = backend.create_session(session("ABCDEF", "s1")).unwrap_err();
        assert!(matches!(err, TransportError::Connectivity(_)));
    }

    #[test]
    fn lossy_conditions_drop_some_broadcasts() {
        let conditions = NetworkConditions {
            packet_loss_percent: 50,
            duplicate_percent: 0,
            reorder_percent: 0,
        };
        let backend = InMemoryBackend::with_conditions(conditions, 11);
        backend.create_session(session("ABCDEF", "s1")).unwrap();
        let id = SessionId::new("s1");
        let feed = backend.subscribe_broadcast(&id).unwrap();
        for _ in 0..200 {
            backend
                .publish(&id, Envelope::event(PlayerId::new("host"), WireEvent::GameStart {}))
                .unwrap();
        }
        let received = feed.drain().len();
        let stats = backend.stats();
        assert_eq!(stats.published, 200);
        assert_eq!(received as u64, stats.delivered);
        assert!(stats.dropped > 50 && stats.dropped < 150);
    }

    #[test]
    fn reordered_broadcast_arrives_after_the_next_one() {
        let conditions = NetworkConditions {
            packet_loss_percent: 0,
            duplicate_percent: 0,
            reorder_percent: 50,
        };
        let backend = InMemoryBackend::with_conditions(conditions, 5);
        backend.create_session(session("ABCDEF", "s1")).unwrap();
        let id = SessionId::new("s1");
        let feed = backend.subscribe_broadcast(&id).unwrap();
        let sent: Vec<Envelope> = (0..100)
            .map(|i| {
                let event = WireEvent::LootPickupRequest {
                    loot_id: skirmish_shared::LootId::new(format!("l-{i}")),
                };
                Envelope::event(PlayerId::new("host"), event)
            })
            .collect();
        for envelope in &sent {
            backend.publish(&id, envelope.clone()).unwrap();
        }

        let received = feed.drain();
        let stats = backend.stats();
        assert!(stats.reordered > 0);
        assert_eq!(stats.dropped, 0);
        assert_eq!(received.len() as u64, stats.delivered);
        assert!(received.iter().all(|envelope| sent.contains(envelope)));
        assert_ne!(received, sent[..received.len()].to_vec());
    }
}
