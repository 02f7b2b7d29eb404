//! Read-only view produced by every tick.
//!
//! Renderers take a [`WorldState`] and never write back. Everything in it
//! is a copy; holding one does not block the simulation.

use skirmish_shared::{LootItem, PlayerId, PlayerState, SessionPhase, Vec2, ZoneConfig};
use std::collections::HashMap;
use std::time::Duration;

/// What the camera follows.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraState {
    /// Followed player. The local player while alive.
    pub target: Option<PlayerId>,
    /// Focus point.
    pub focus: Vec2,
    /// True while the local player is dead and watching someone else.
    pub spectating: bool,
}

/// The shrinking safe circle.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ZoneState {
    /// Centre of the circle.
    pub center: Vec2,
    /// Current radius.
    pub radius: f32,
    /// False outside an active match. An inactive zone hurts nobody.
    pub active: bool,
}

impl ZoneState {
    /// Zone `elapsed` into a match.
    #[must_use]
    pub fn at(config: &ZoneConfig, center: Vec2, elapsed: Duration) -> Self {
        Self {
            center,
            radius: config.radius_at(elapsed),
            active: true,
        }
    }

    /// True if `position` is inside the circle, or the zone is inactive.
    #[must_use]
    pub fn is_safe(&self, position: Vec2) -> bool {
        !self.active || position.distance_squared(self.center) <= self.radius * self.radius
    }
}

/// Everything a renderer needs for one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WorldState {
    /// Every known player, the local one included.
    pub players: HashMap<PlayerId, PlayerState>,
    /// Loot on the ground as this peer sees it.
    pub loot: Vec<LootItem>,
    /// The local player.
    pub local_player: Option<PlayerState>,
    /// Camera target.
    pub camera: CameraState,
    /// Conflict zone.
    pub conflict_zone: ZoneState,
    /// Match phase.
    pub phase: SessionPhase,
    /// Ticks since the simulation started.
    pub tick: u64,
}

impl WorldState {
    /// One player.
    #[must_use]
    pub fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.players.get(id)
    }

    /// Players alive and connected.
    pub fn living(&self) -> impl Iterator<Item = &PlayerState> {
        self.players.values().filter(|p| p.is_alive && p.is_connected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inactive_zone_is_safe_everywhere() {
        let zone = ZoneState::default();
        assert!(zone.is_safe(Vec2::new(1e6, 1e6)));
    }

    #[test]
    fn zone_boundary() {
        let zone = ZoneState {
            center: Vec2::new(100.0, 100.0),
            radius: 50.0,
            active: true,
        };
        assert!(zone.is_safe(Vec2::new(150.0, 100.0)));
        assert!(!zone.is_safe(Vec2::new(151.0, 100.0)));
    }
}
