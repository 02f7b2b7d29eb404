//! # SKIRMISH
//!
//! The per-peer simulation of a host-authoritative arena game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              SKIRMISH PEER                              │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐   │
//! │  │   Input         │────>│   Simulation    │────>│   WorldState    │   │
//! │  │  InputFrame     │     │   tick(dt)      │     │   + GameEvents  │   │
//! │  └─────────────────┘     └────────┬────────┘     └─────────────────┘   │
//! │                                   │                                     │
//! │           ┌───────────────────────┼───────────────────────┐             │
//! │           │                       │                       │             │
//! │  ┌────────┴────────┐     ┌────────┴────────┐     ┌────────┴────────┐   │
//! │  │ skirmish_       │     │ skirmish_       │     │ skirmish_       │   │
//! │  │ networking      │     │ economy         │     │ shared          │   │
//! │  │  • Transport    │     │  • Authority    │     │  • PlayerState  │   │
//! │  │  • Snapshot     │     │  • Replica      │     │  • Catalog      │   │
//! │  │  • Inbox        │     │  • Loadout      │     │  • Config       │   │
//! │  └─────────────────┘     └─────────────────┘     └─────────────────┘   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `game_loop`: the [`Simulation`] and its tick
//! - `physics`: arena bounds, obstacles, minimum translation vectors
//! - `combat`: swing timing, reach and armor-scaled damage
//! - `input`: latest-wins input with latched presses
//! - `match_flow`: host kill ledger and end-of-match check
//! - `world_state`: the read-only view handed to renderers
//! - `events`: local notifications for renderers

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod combat;
pub mod error;
pub mod events;
pub mod game_loop;
pub mod input;
pub mod match_flow;
pub mod physics;
pub mod world_state;

// Re-export the lower layers
pub use skirmish_economy as economy;
pub use skirmish_networking as networking;
pub use skirmish_shared as shared;

// Re-export commonly used types
pub use combat::{AttackTracker, Hit};
pub use error::{SimulationError, SimulationResult};
pub use events::{EventBus, EventReceiver, EventSender, GameEvent};
pub use game_loop::{LootRole, Simulation, MAX_TICK_DT};
pub use input::{InputBuffer, InputFrame, TickInput};
pub use match_flow::{DeathRecord, MatchFlow, MatchResult};
pub use physics::{Aabb, Arena};
pub use world_state::{CameraState, WorldState, ZoneState};
