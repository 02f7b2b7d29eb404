//! # SKIRMISH Shared
//!
//! Common types used by the host and every peer.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - `tokio`
//! - any backend client
//! - anything that opens a socket
//!
//! Transport lives in `skirmish_networking`. This crate only describes what
//! travels over it.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod loot;
pub mod math;
pub mod player;
pub mod protocol;
pub mod session;

pub use catalog::{ArmorSpec, Catalog, DamageMultipliers, DamageType, Stance, WeaponSpec};
pub use config::{
    CombatConfig, GameConfig, LootConfig, ObstacleConfig, TransportConfig, WorldConfig,
    ZoneConfig,
};
pub use constants::{MAX_HEALTH, NO_ARMOR_ID, UNARMED_WEAPON_ID};
pub use error::{ConfigError, InvalidJoinCode};
pub use ids::{LootId, PlayerId, SessionId};
pub use loot::{LootItem, LootKind};
pub use math::Vec2;
pub use player::{PlayerDirectory, PlayerState, PlayerStatePatch};
pub use protocol::{
    BroadcastMessage, Envelope, EventKind, EventSink, LootGrant, PlayerStat, RecordingSink, WireEvent,
};
pub use session::{JoinCode, Session, SessionPhase};
