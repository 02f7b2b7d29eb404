//! # SKIRMISH Economy
//!
//! Loot and equipment rules for the arena.
//!
//! ## Design Principles
//!
//! 1. **One writer** - Only the host's [`LootAuthority`] adds or removes loot
//! 2. **First come, first served** - Racing pickups resolve in host arrival order
//! 3. **Silent losers** - A stale request produces no events at all
//! 4. **Self-healing replicas** - A [`LootReplica`] that drifts asks for a full sync
//!
//! ## Example
//!
//! ```rust,ignore
//! use skirmish_economy::{LootAuthority, LootSettings};
//!
//! let mut loot = LootAuthority::new(host_id, catalog, LootSettings::from_config(&config), seed, sink);
//! loot.spawn_random_loot(config.loot.initial_count);
//!
//! // On loot_pickup_request from a peer:
//! let outcome = loot.handle_pickup_request(&from, &loot_id, &players);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod equipment;
pub mod error;
pub mod loot;

pub use equipment::{placeholder, Loadout};
pub use error::StaleReason;
pub use loot::{
    check_pickup, nearest_loot, LootAuthority, LootReplica, LootSettings, PickupGrant, PickupOutcome,
    ReplicaChange,
};
