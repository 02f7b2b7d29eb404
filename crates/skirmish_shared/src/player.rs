//! Player state: the durable row, the partial patch, and lookups.

use crate::constants::{MAX_HEALTH, NO_ARMOR_ID, UNARMED_WEAPON_ID};
use crate::ids::PlayerId;
use crate::math::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Full state of one player.
///
/// This is the durable row. Each field is written by the owning peer except
/// equipment, which the host may change on a granted pickup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    /// Stable identity.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Position X.
    pub x: f32,
    /// Position Y.
    pub y: f32,
    /// Velocity X, units per second.
    pub vx: f32,
    /// Velocity Y, units per second.
    pub vy: f32,
    /// Facing, radians.
    pub rotation: f32,
    /// Current health, `0..=MAX_HEALTH`.
    pub health: f32,
    /// Equipped weapon catalog id.
    pub weapon_id: String,
    /// Equipped armor catalog id.
    pub armor_id: String,
    /// True while an attack window is open.
    pub is_attacking: bool,
    /// False between death and respawn.
    pub is_alive: bool,
    /// False once the player left or timed out. The row is kept.
    pub is_connected: bool,
    /// Kills this match.
    pub kills: u32,
    /// Damage dealt this match.
    pub damage_dealt: f32,
    /// Last heartbeat, unix ms.
    pub last_heartbeat_ms: u64,
}

impl PlayerState {
    /// A fresh, alive, unequipped player at `(x, y)`.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            id,
            name: name.into(),
            x,
            y,
            vx: 0.0,
            vy: 0.0,
            rotation: 0.0,
            health: MAX_HEALTH,
            weapon_id: UNARMED_WEAPON_ID.to_owned(),
            armor_id: NO_ARMOR_ID.to_owned(),
            is_attacking: false,
            is_alive: true,
            is_connected: true,
            kills: 0,
            damage_dealt: 0.0,
            last_heartbeat_ms: 0,
        }
    }

    /// Position as a vector.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    /// Moves the player.
    pub fn set_position(&mut self, position: Vec2) {
        self.x = position.x;
        self.y = position.y;
    }

    /// Velocity as a vector.
    #[must_use]
    pub fn velocity(&self) -> Vec2 {
        Vec2::new(self.vx, self.vy)
    }

    /// Sets velocity.
    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.vx = velocity.x;
        self.vy = velocity.y;
    }

    /// Sets health, clamped to `0..=MAX_HEALTH`.
    pub fn set_health(&mut self, health: f32) {
        self.health = health.clamp(0.0, MAX_HEALTH);
    }

    /// Subtracts `amount` from health.
    ///
    /// Returns `true` only on the call that takes a living player to zero,
    /// which also clears `is_alive` and `is_attacking`. Damage to a dead
    /// player is ignored.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive {
            return false;
        }
        self.set_health(self.health - amount.max(0.0));
        if self.health <= 0.0 {
            self.is_alive = false;
            self.is_attacking = false;
            self.set_velocity(Vec2::ZERO);
            return true;
        }
        false
    }

    /// Brings the player back at `position` with full health and no gear.
    pub fn respawn(&mut self, position: Vec2) {
        self.set_position(position);
        self.set_velocity(Vec2::ZERO);
        self.health = MAX_HEALTH;
        self.is_alive = true;
        self.is_attacking = false;
        self.weapon_id = UNARMED_WEAPON_ID.to_owned();
        self.armor_id = NO_ARMOR_ID.to_owned();
    }

    /// Patch carrying every mutable field, used for the per-tick broadcast.
    #[must_use]
    pub fn to_patch(&self) -> PlayerStatePatch {
        PlayerStatePatch {
            x: Some(self.x),
            y: Some(self.y),
            vx: Some(self.vx),
            vy: Some(self.vy),
            rotation: Some(self.rotation),
            health: Some(self.health),
            weapon_id: Some(self.weapon_id.clone()),
            armor_id: Some(self.armor_id.clone()),
            is_attacking: Some(self.is_attacking),
            is_alive: Some(self.is_alive),
            is_connected: Some(self.is_connected),
            kills: Some(self.kills),
            damage_dealt: Some(self.damage_dealt),
            last_heartbeat_ms: Some(self.last_heartbeat_ms),
        }
    }
}

/// A partial update to a [`PlayerState`]. Absent fields are left alone.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStatePatch {
    /// Position X.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// Position Y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Velocity X.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vx: Option<f32>,
    /// Velocity Y.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vy: Option<f32>,
    /// Facing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    /// Health. Clamped when applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<f32>,
    /// Weapon id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_id: Option<String>,
    /// Armor id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_id: Option<String>,
    /// Attack window open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_attacking: Option<bool>,
    /// Alive flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_alive: Option<bool>,
    /// Connected flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_connected: Option<bool>,
    /// Kill count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kills: Option<u32>,
    /// Damage dealt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage_dealt: Option<f32>,
    /// Heartbeat, unix ms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_heartbeat_ms: Option<u64>,
}

impl PlayerStatePatch {
    /// Patch that only changes equipment.
    #[must_use]
    pub fn equipment(weapon_id: Option<String>, armor_id: Option<String>) -> Self {
        Self {
            weapon_id,
            armor_id,
            ..Self::default()
        }
    }

    /// True if the patch moves the player or turns them.
    #[must_use]
    pub fn touches_motion(&self) -> bool {
        self.x.is_some()
            || self.y.is_some()
            || self.vx.is_some()
            || self.vy.is_some()
            || self.rotation.is_some()
    }

    /// Merges the present fields into `state`.
    pub fn apply_to(&self, state: &mut PlayerState) {
        if let Some(x) = self.x {
            state.x = x;
        }
        if let Some(y) = self.y {
            state.y = y;
        }
        if let Some(vx) = self.vx {
            state.vx = vx;
        }
        if let Some(vy) = self.vy {
            state.vy = vy;
        }
        if let Some(rotation) = self.rotation {
            state.rotation = rotation;
        }
        if let Some(health) = self.health {
            state.set_health(health);
        }
        if let Some(weapon_id) = &self.weapon_id {
            state.weapon_id.clone_from(weapon_id);
        }
        if let Some(armor_id) = &self.armor_id {
            state.armor_id.clone_from(armor_id);
        }
        if let Some(is_attacking) = self.is_attacking {
            state.is_attacking = is_attacking;
        }
        if let Some(is_alive) = self.is_alive {
            state.is_alive = is_alive;
        }
        if let Some(is_connected) = self.is_connected {
            state.is_connected = is_connected;
        }
        if let Some(kills) = self.kills {
            state.kills = kills;
        }
        if let Some(damage_dealt) = self.damage_dealt {
            state.damage_dealt = damage_dealt;
        }
        if let Some(heartbeat) = self.last_heartbeat_ms {
            state.last_heartbeat_ms = heartbeat;
        }
    }
}

/// Read access to the current set of players.
///
/// Implemented by the canonical snapshot and by plain maps, so loot
/// validation can run against either.
pub trait PlayerDirectory {
    /// Looks up one player.
    fn player(&self, id: &PlayerId) -> Option<&PlayerState>;
}

impl PlayerDirectory for HashMap<PlayerId, PlayerState> {
    fn player(&self, id: &PlayerId) -> Option<&PlayerState> {
        self.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> PlayerState {
        PlayerState::new(PlayerId::new("p1"), "Ayame", 10.0, 20.0)
    }

    #[test]
    fn lethal_damage_reports_death_once() {
        let mut state = player();
        assert!(!state.apply_damage(60.0));
        assert!(state.apply_damage(60.0));
        assert_eq!(state.health, 0.0);
        assert!(!state.is_alive);
        assert!(!state.apply_damage(10.0));
    }

    #[test]
    fn patch_leaves_absent_fields_alone() {
        let mut state = player();
        state.kills = 3;
        let patch = PlayerStatePatch {
            x: Some(50.0),
            health: Some(250.0),
            ..PlayerStatePatch::default()
        };
        patch.apply_to(&mut state);
        assert_eq!(state.x, 50.0);
        assert_eq!(state.y, 20.0);
        assert_eq!(state.health, MAX_HEALTH);
        assert_eq!(state.kills, 3);
    }

    #[test]
    fn empty_patch_serializes_to_empty_object() {
        let json = serde_json::to_string(&PlayerStatePatch::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn respawn_resets_gear_and_health() {
        let mut state = player();
        state.weapon_id = "katana".into();
        state.apply_damage(200.0);
        state.respawn(Vec2::new(5.0, 5.0));
        assert!(state.is_alive);
        assert_eq!(state.health, MAX_HEALTH);
        assert_eq!(state.weapon_id, UNARMED_WEAPON_ID);
        assert_eq!(state.position(), Vec2::new(5.0, 5.0));
    }
}
