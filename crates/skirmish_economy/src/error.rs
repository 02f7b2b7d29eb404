//! # Stale Request Reasons
//!
//! A pickup request that loses a race is not an error: the loser simply
//! gets nothing. [`StaleReason`] says why, for logs and tests.

use skirmish_shared::{LootId, PlayerId};
use thiserror::Error;

/// Why a pickup request was turned into a no-op.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StaleReason {
    /// Someone else got it first, or it never existed.
    #[error("loot {0} is no longer on the ground")]
    LootGone(LootId),

    /// The requester has no row in the snapshot yet.
    #[error("player {0} is not in the session")]
    UnknownPlayer(PlayerId),

    /// The requester is dead.
    #[error("player {0} is dead")]
    PlayerDead(PlayerId),

    /// The requester is too far away.
    #[error("player {player} is {distance:.1} away from loot {loot}, radius is {radius:.1}")]
    OutOfRange {
        /// Requester.
        player: PlayerId,
        /// Requested item.
        loot: LootId,
        /// Distance between them.
        distance: f32,
        /// Pickup radius.
        radius: f32,
    },
}
