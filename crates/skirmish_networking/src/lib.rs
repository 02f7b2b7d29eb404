//! # SKIRMISH Networking
//!
//! Session transport and the canonical player view for a host-authoritative
//! arena game.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │         SyncBackend          │
//!                 │  durable rows  │  broadcast  │
//!                 └───────┬────────┴──────┬──────┘
//!                         │               │
//!        ┌────────────────┴──┐     ┌──────┴────────────┐
//!        │  PlayerSnapshot   │     │     Transport     │
//!        │ rows + deltas     │     │ events, sessions, │
//!        │ → canonical map   │     │ durable writes    │
//!        └───────────────────┘     └───────────────────┘
//! ```
//!
//! - **Durable channel**: one row per (session, player), change
//!   notifications ordered per row. Source of truth for late joiners and
//!   reconnects.
//! - **Broadcast channel**: per-tick player deltas and named events.
//!   At-most-once, unordered across senders, lossy.
//!
//! Consistency is eventual. The host breaks ties for loot and match flow.
//!
//! ## Example
//!
//! ```rust,ignore
//! use skirmish_networking::{InMemoryBackend, PlayerSnapshot, Transport};
//!
//! let backend = InMemoryBackend::shared();
//! let host = Transport::host_game(backend.clone(), "alice".into(), "Alice", &config)?;
//! let mut snapshot = PlayerSnapshot::new(&host)?;
//! snapshot.ready().await?;
//!
//! // Each tick:
//! host.pump();
//! snapshot.sync(Instant::now());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod error;
pub mod inbox;
pub mod interpolation;
pub mod memory;
pub mod snapshot;
pub mod transport;

pub use backend::{RowChange, Subscription, SubscriptionId, SyncBackend};
pub use error::{TransportError, TransportResult};
pub use inbox::{Inbox, InboxSender};
pub use interpolation::{InterpolatedState, InterpolationMode, Sample, SampleTrack};
pub use memory::{BackendStats, InMemoryBackend, NetworkConditions};
pub use snapshot::{PlayerSnapshot, SyncStats};
pub use transport::{EventHandler, PlayerFeed, Transport, TransportStats};
