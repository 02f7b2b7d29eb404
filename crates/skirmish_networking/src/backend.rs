//! # Backend Seam
//!
//! A session backend offers two channels:
//!
//! ```text
//!   DURABLE                       BROADCAST
//!   rows per (session, player)    envelopes per session
//!   insert/upsert/delete          publish
//!   change notifications          at-most-once, unordered
//!   ordered per row               lossy
//! ```
//!
//! [`crate::Transport`] and [`crate::PlayerSnapshot`] only talk to
//! [`SyncBackend`], so swapping the in-memory backend for a hosted one is a
//! constructor argument.

use crate::error::TransportResult;
use crossbeam_channel::{Receiver, TryRecvError};
use skirmish_shared::{Envelope, JoinCode, PlayerId, PlayerState, Session, SessionId, SessionPhase};

/// Identifies one subscription for [`SyncBackend::unsubscribe`].
pub type SubscriptionId = u64;

/// A change to a durable player row.
#[derive(Clone, Debug, PartialEq)]
pub enum RowChange {
    /// Row inserted or updated. Carries the full row.
    Upsert(PlayerState),
    /// Row removed.
    Delete(PlayerId),
}

/// Receiving end of a backend subscription.
///
/// Once unsubscribed, the backend drops its sender. Messages already queued
/// can still be drained, so consumers guard with their own alive flag.
#[derive(Debug)]
pub struct Subscription<T> {
    id: SubscriptionId,
    receiver: Receiver<T>,
}

impl<T> Subscription<T> {
    /// Wraps a receiver registered under `id`.
    #[must_use]
    pub fn new(id: SubscriptionId, receiver: Receiver<T>) -> Self {
        Self { id, receiver }
    }

    /// Subscription id.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next queued message, if any.
    pub fn try_next(&self) -> Option<T> {
        match self.receiver.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Everything queued right now.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }

    /// Number of queued messages.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// Storage and pub/sub for sessions.
///
/// Every call may fail with [`crate::TransportError::Connectivity`].
pub trait SyncBackend: Send + Sync {
    /// Stores a new session.
    ///
    /// Fails with `DuplicateConstraint` if a live session already uses the
    /// join code.
    fn create_session(&self, session: Session) -> TransportResult<()>;

    /// Looks up a session by join code. Expired sessions are still returned.
    fn find_session(&self, code: &JoinCode) -> TransportResult<Option<Session>>;

    /// Changes a session's phase.
    fn set_session_phase(&self, session: &SessionId, phase: SessionPhase) -> TransportResult<()>;

    /// Inserts a player row. Fails with `DuplicateConstraint` if one exists.
    fn insert_player(&self, session: &SessionId, state: PlayerState) -> TransportResult<()>;

    /// Inserts or replaces a player row.
    fn upsert_player(&self, session: &SessionId, state: PlayerState) -> TransportResult<()>;

    /// Removes a player row.
    fn delete_player(&self, session: &SessionId, player: &PlayerId) -> TransportResult<()>;

    /// Every player row of a session.
    fn list_players(&self, session: &SessionId) -> TransportResult<Vec<PlayerState>>;

    /// Subscribes to row changes of a session.
    fn subscribe_rows(&self, session: &SessionId) -> TransportResult<Subscription<RowChange>>;

    /// Subscribes to broadcasts of a session. The sender's own messages are
    /// delivered too. Filtering is up to the consumer.
    fn subscribe_broadcast(&self, session: &SessionId) -> TransportResult<Subscription<Envelope>>;

    /// Publishes to every broadcast subscriber of a session.
    fn publish(&self, session: &SessionId, envelope: Envelope) -> TransportResult<()>;

    /// Drops a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: SubscriptionId);
}
