//! # Canonical Player Snapshot
//!
//! One map of `player_id → PlayerState` per peer, reconciled from three
//! sources:
//!
//! ```text
//! bulk read ──────────┐
//! row notifications ──┼──► PlayerSnapshot ──► players() / interpolated()
//! broadcast deltas ───┘
//! ```
//!
//! ## Reconciliation Rules
//!
//! - Subscriptions open *before* the bulk read, so nothing committed between
//!   the two is lost.
//! - A delta updates only its present fields, never for the local player's
//!   own broadcasts, never for a player without a row yet.
//! - A row notification replaces the whole entry. A delete removes it.
//! - Within one [`PlayerSnapshot::sync`], deltas go first and rows second,
//!   so the durable row wins any field both touched.

use crate::backend::{RowChange, SyncBackend};
use crate::error::{TransportError, TransportResult};
use crate::interpolation::{InterpolatedState, InterpolationMode, Sample, SampleTrack};
use crate::transport::{PlayerFeed, Transport};
use skirmish_shared::{BroadcastMessage, PlayerDirectory, PlayerId, PlayerState, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// What one [`PlayerSnapshot::sync`] applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Broadcast deltas merged.
    pub deltas_applied: usize,
    /// Deltas skipped: own echo, unknown player, or not a player patch.
    pub deltas_ignored: usize,
    /// Row upserts applied.
    pub rows_applied: usize,
    /// Rows removed.
    pub rows_deleted: usize,
}

impl SyncStats {
    /// True if anything changed.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.deltas_applied + self.rows_applied + self.rows_deleted > 0
    }
}

/// Canonical view of every player in the session.
pub struct PlayerSnapshot {
    backend: Arc<dyn SyncBackend>,
    session_id: SessionId,
    local_id: PlayerId,
    feed: Option<PlayerFeed>,
    players: HashMap<PlayerId, PlayerState>,
    tracks: HashMap<PlayerId, SampleTrack>,
    mode: InterpolationMode,
    ready: bool,
}

impl PlayerSnapshot {
    /// Subscribes to the transport's session.
    ///
    /// The map stays empty until [`PlayerSnapshot::ready`] has run, apart
    /// from rows that change in the meantime.
    ///
    /// # Errors
    ///
    /// [`TransportError::Disconnected`] if the transport is closed, or a
    /// backend error.
    pub fn new(transport: &Transport) -> TransportResult<Self> {
        let feed = transport.open_player_feed()?;
        Ok(Self {
            backend: Arc::clone(transport.backend()),
            session_id: transport.session_id(),
            local_id: transport.local_player_id().clone(),
            feed: Some(feed),
            players: HashMap::new(),
            tracks: HashMap::new(),
            mode: InterpolationMode::default(),
            ready: false,
        })
    }

    /// Changes the easing used by [`PlayerSnapshot::interpolated`].
    pub fn set_interpolation_mode(&mut self, mode: InterpolationMode) {
        self.mode = mode;
        for track in self.tracks.values_mut() {
            *track = track.clone().with_mode(mode);
        }
    }

    /// Performs the initial bulk read. Later calls do nothing.
    ///
    /// # Errors
    ///
    /// [`TransportError::Disconnected`] after [`PlayerSnapshot::destroy`], or
    /// the backend error of the bulk read.
    pub async fn ready(&mut self) -> TransportResult<()> {
        if self.ready {
            return Ok(());
        }
        if self.feed.is_none() {
            return Err(TransportError::Disconnected);
        }

        let backend = Arc::clone(&self.backend);
        let session_id = self.session_id.clone();
        let rows = tokio::task::spawn_blocking(move || backend.list_players(&session_id))
            .await
            .map_err(|err| TransportError::Connectivity(format!("bulk read task failed: {err}")))??;

        // A destroy while the read was in flight wins.
        if self.feed.is_none() {
            return Err(TransportError::Disconnected);
        }
        let now = Instant::now();
        for row in rows {
            self.replace(row, now);
        }
        self.ready = true;
        tracing::debug!(session = %self.session_id, players = self.players.len(), "player snapshot ready");
        Ok(())
    }

    /// Applies everything received since the last call.
    ///
    /// Call once per tick, at the tick boundary. Does nothing after
    /// [`PlayerSnapshot::destroy`].
    pub fn sync(&mut self, now: Instant) -> SyncStats {
        let mut stats = SyncStats::default();
        let Some(feed) = self.feed.as_ref() else {
            return stats;
        };
        let deltas = feed.broadcast.drain();
        let rows = feed.rows.drain();

        for envelope in deltas {
            let BroadcastMessage::PlayerState { player_id, patch } = envelope.message else {
                stats.deltas_ignored += 1;
                continue;
            };
            if envelope.from == self.local_id {
                stats.deltas_ignored += 1;
                continue;
            }
            let Some(state) = self.players.get_mut(&player_id) else {
                stats.deltas_ignored += 1;
                continue;
            };
            patch.apply_to(state);
            if patch.touches_motion() {
                let sample = Sample::from_state(state, now);
                push_sample(&mut self.tracks, self.mode, &player_id, sample);
            }
            stats.deltas_applied += 1;
        }

        for change in rows {
            match change {
                RowChange::Upsert(row) => {
                    self.replace(row, now);
                    stats.rows_applied += 1;
                }
                RowChange::Delete(id) => {
                    self.players.remove(&id);
                    self.tracks.remove(&id);
                    stats.rows_deleted += 1;
                }
            }
        }

        stats
    }

    fn replace(&mut self, row: PlayerState, now: Instant) {
        let sample = Sample::from_state(&row, now);
        push_sample(&mut self.tracks, self.mode, &row.id, sample);
        self.players.insert(row.id.clone(), row);
    }

    /// Every known player.
    #[must_use]
    pub fn players(&self) -> &HashMap<PlayerId, PlayerState> {
        &self.players
    }

    /// One player.
    #[must_use]
    pub fn get(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    /// Number of known players.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// True if no player is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// True once the bulk read completed.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// True until [`PlayerSnapshot::destroy`].
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.feed.is_some()
    }

    /// Motion of `id` to render at `now`. `None` for unknown players.
    #[must_use]
    pub fn interpolated(&self, id: &PlayerId, now: Instant) -> Option<InterpolatedState> {
        self.tracks.get(id).map(|track| track.interpolate(now))
    }

    /// Releases the subscriptions. Calling again does nothing.
    pub fn destroy(&mut self) {
        if let Some(feed) = self.feed.take() {
            self.backend.unsubscribe(feed.rows.id());
            self.backend.unsubscribe(feed.broadcast.id());
        }
    }
}

fn push_sample(
    tracks: &mut HashMap<PlayerId, SampleTrack>,
    mode: InterpolationMode,
    id: &PlayerId,
    sample: Sample,
) {
    match tracks.get_mut(id) {
        Some(track) => track.push(sample),
        None => {
            tracks.insert(id.clone(), SampleTrack::new(sample).with_mode(mode));
        }
    }
}

impl PlayerDirectory for PlayerSnapshot {
    fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(id)
    }
}

impl Drop for PlayerSnapshot {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for PlayerSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerSnapshot")
            .field("session", &self.session_id)
            .field("players", &self.players.len())
            .field("ready", &self.ready)
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryBackend;
    use skirmish_shared::{EventSink, PlayerStatePatch, TransportConfig};

    fn config() -> TransportConfig {
        TransportConfig {
            rng_seed: Some(3),
            ..TransportConfig::default()
        }
    }

    fn pair(backend: &Arc<InMemoryBackend>) -> (Transport, Transport) {
        let host = Transport::host_game(backend.clone(), PlayerId::new("h"), "Host", &config()).unwrap();
        let code = host.session().join_code.to_string();
        let guest = Transport::join_game(backend.clone(), PlayerId::new("g"), &code, "Guest", &config()).unwrap();
        (host, guest)
    }

    #[tokio::test]
    async fn bulk_read_sees_everyone_already_joined() {
        let backend = InMemoryBackend::shared();
        let (host, _guest) = pair(&backend);
        let mut snapshot = PlayerSnapshot::new(&host).unwrap();
        assert!(!snapshot.is_ready());
        snapshot.ready().await.unwrap();
        snapshot.ready().await.unwrap();
        assert!(snapshot.is_ready());
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn late_joiner_row_arrives_by_notification() {
        let backend = InMemoryBackend::shared();
        let host = Transport::host_game(backend.clone(), PlayerId::new("h"), "Host", &config()).unwrap();
        let mut snapshot = PlayerSnapshot::new(&host).unwrap();
        snapshot.ready().await.unwrap();
        assert_eq!(snapshot.len(), 1);

        let code = host.session().join_code.to_string();
        let _late = Transport::join_game(backend.clone(), PlayerId::new("late"), &code, "Late", &config()).unwrap();
        let stats = snapshot.sync(Instant::now());
        assert_eq!(stats.rows_applied, 1);
        assert!(snapshot.get(&PlayerId::new("late")).is_some());
    }

    #[tokio::test]
    async fn deltas_merge_present_fields_only() {
        let backend = InMemoryBackend::shared();
        let (host, guest) = pair(&backend);
        let mut snapshot = PlayerSnapshot::new(&host).unwrap();
        snapshot.ready().await.unwrap();

        guest.broadcast_player_state_update(PlayerStatePatch {
            x: Some(42.0),
            ..PlayerStatePatch::default()
        });
        let stats = snapshot.sync(Instant::now());
        assert_eq!(stats.deltas_applied, 1);
        let entry = snapshot.get(&PlayerId::new("g")).unwrap();
        assert_eq!(entry.x, 42.0);
        assert_eq!(entry.name, "Guest");
    }

    #[tokio::test]
    async fn own_echo_and_unknown_players_are_ignored() {
        let backend = InMemoryBackend::shared();
        let (host, guest) = pair(&backend);
        let mut snapshot = PlayerSnapshot::new(&host).unwrap();
        snapshot.ready().await.unwrap();

        host.broadcast_player_state_update(PlayerStatePatch {
            x: Some(999.0),
            ..PlayerStatePatch::default()
        });
        guest.broadcast_player_state(
            &PlayerId::new("ghost"),
            PlayerStatePatch {
                x: Some(1.0),
                ..PlayerStatePatch::default()
            },
        );
        let stats = snapshot.sync(Instant::now());
        assert_eq!(stats.deltas_applied, 0);
        assert_eq!(stats.deltas_ignored, 2);
        assert_eq!(snapshot.get(&PlayerId::new("h")).unwrap().x, 0.0);
        assert!(snapshot.get(&PlayerId::new("ghost")).is_none());
    }

    #[tokio::test]
    async fn durable_row_wins_within_one_sync() {
        let backend = InMemoryBackend::shared();
        let (host, guest) = pair(&backend);
        let mut snapshot = PlayerSnapshot::new(&host).unwrap();
        snapshot.ready().await.unwrap();

        let mut row = guest.local_state();
        row.x = 10.0;
        guest.set_local_state(row);
        guest.write_player_state_now().unwrap();
        guest.broadcast_player_state_update(PlayerStatePatch {
            x: Some(77.0),
            ..PlayerStatePatch::default()
        });
        // The broadcast also moved guest's cached state; the row already
        // committed still says 10.
        snapshot.sync(Instant::now());
        assert_eq!(snapshot.get(&PlayerId::new("g")).unwrap().x, 10.0);
    }

    #[tokio::test]
    async fn destroy_stops_updates() {
        let backend = InMemoryBackend::shared();
        let (host, guest) = pair(&backend);
        let before = backend.subscription_count();
        let mut snapshot = PlayerSnapshot::new(&host).unwrap();
        snapshot.ready().await.unwrap();
        guest.broadcast_player_state_update(PlayerStatePatch {
            x: Some(5.0),
            ..PlayerStatePatch::default()
        });
        snapshot.destroy();
        snapshot.destroy();
        assert_eq!(backend.subscription_count(), before);
        assert_eq!(snapshot.sync(Instant::now()), SyncStats::default());
        assert_eq!(snapshot.get(&PlayerId::new("g")).unwrap().x, 0.0);
    }

    #[tokio::test]
    async fn row_delete_removes_player() {
        let backend = InMemoryBackend::shared();
        let (host, _guest) = pair(&backend);
        let mut snapshot = PlayerSnapshot::new(&host).unwrap();
        snapshot.ready().await.unwrap();
        backend.delete_player(&host.session_id(), &PlayerId::new("g")).unwrap();
        snapshot.sync(Instant::now());
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.interpolated(&PlayerId::new("g"), Instant::now()).is_none());
    }
}
