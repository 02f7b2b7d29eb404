//! Wall clock helpers.
//!
//! Session expiry and heartbeats are stored as unix milliseconds so every
//! peer can compare them. Simulation timing never uses this clock.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the unix epoch. Returns 0 if the clock is before 1970.
#[must_use]
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as u64)
}

/// Seed for an RNG when no fixed seed was configured.
///
/// Mixes the current time with `salt` so two peers starting in the same
/// millisecond still diverge.
#[must_use]
pub fn clock_seed(salt: &str) -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_nanos() as u64);
    let mut hasher = DefaultHasher::new();
    salt.hash(&mut hasher);
    nanos.hash(&mut hasher);
    hasher.finish()
}
