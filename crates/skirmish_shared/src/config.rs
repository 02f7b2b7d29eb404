//! # Game Configuration
//!
//! Every tunable the simulation, loot authority and transport read.
//! Each section defaults independently, so a config file only needs the
//! values it changes:
//!
//! ```toml
//! [world]
//! width = 1200.0
//! height = 900.0
//!
//! [[world.obstacles]]
//! x = 400.0
//! y = 300.0
//! width = 120.0
//! height = 60.0
//!
//! [loot]
//! seed = 42
//! ```

use crate::constants::MAX_HEALTH;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Root configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Arena geometry.
    pub world: WorldConfig,
    /// Health, movement and death.
    pub combat: CombatConfig,
    /// Loot population and replication.
    pub loot: LootConfig,
    /// Sessions and durable writes.
    pub transport: TransportConfig,
    /// Shrinking conflict zone.
    pub zone: ZoneConfig,
}

impl GameConfig {
    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on malformed TOML or out of range values.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a config file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`GameConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> ConfigResult<()> {
        let world = &self.world;
        if !(world.width > 0.0 && world.height > 0.0) {
            return Err(ConfigError::Invalid("world must have positive size".into()));
        }
        if world.player_width <= 0.0 || world.player_height <= 0.0 {
            return Err(ConfigError::Invalid("player hitbox must have positive size".into()));
        }
        if world.loot_margin < 0.0 {
            return Err(ConfigError::Invalid("loot margin cannot be negative".into()));
        }
        if !(self.combat.max_health > 0.0 && self.combat.max_health <= MAX_HEALTH) {
            return Err(ConfigError::Invalid(format!(
                "max health must be in (0, {MAX_HEALTH}]"
            )));
        }
        if self.loot.pickup_radius < 0.0 {
            return Err(ConfigError::Invalid("pickup radius cannot be negative".into()));
        }
        if self.transport.join_code_attempts == 0 {
            return Err(ConfigError::Invalid("join code attempts must be at least 1".into()));
        }
        if self.transport.max_players == 0 {
            return Err(ConfigError::Invalid("max players must be at least 1".into()));
        }
        if self.zone.end_radius > self.zone.start_radius {
            return Err(ConfigError::Invalid("zone end radius exceeds start radius".into()));
        }
        Ok(())
    }
}

/// A static rectangular obstacle, given by its top-left corner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObstacleConfig {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

/// Arena geometry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Arena width.
    pub width: f32,
    /// Arena height.
    pub height: f32,
    /// Loot never spawns closer than this to an edge.
    pub loot_margin: f32,
    /// Player hitbox width.
    pub player_width: f32,
    /// Player hitbox height.
    pub player_height: f32,
    /// Static obstacles, resolved in this order.
    pub obstacles: Vec<ObstacleConfig>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 2000.0,
            height: 2000.0,
            loot_margin: 50.0,
            player_width: 32.0,
            player_height: 32.0,
            obstacles: Vec::new(),
        }
    }
}

/// Health, movement and death.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Health players respawn with.
    pub max_health: f32,
    /// Time spent spectating before respawn.
    pub death_cooldown_ms: u64,
    /// Base movement speed, units per second.
    pub move_speed: f32,
}

impl CombatConfig {
    /// Death cooldown as a duration.
    #[must_use]
    pub fn death_cooldown(&self) -> Duration {
        Duration::from_millis(self.death_cooldown_ms)
    }
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            max_health: MAX_HEALTH,
            death_cooldown_ms: 5_000,
            move_speed: 200.0,
        }
    }
}

/// Loot population and replication.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    /// Maximum pickup distance.
    pub pickup_radius: f32,
    /// Items spawned when a match starts.
    pub initial_count: usize,
    /// How long a replica waits before asking for a full resync.
    pub sync_timeout_ms: u64,
    /// Fixed RNG seed for spawns. Random when absent.
    pub seed: Option<u64>,
}

impl LootConfig {
    /// Sync timeout as a duration.
    #[must_use]
    pub fn sync_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_timeout_ms)
    }
}

impl Default for LootConfig {
    fn default() -> Self {
        Self {
            pickup_radius: 40.0,
            initial_count: 12,
            sync_timeout_ms: 2_000,
            seed: None,
        }
    }
}

/// Sessions and durable writes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Interval of the periodic durable player write.
    pub player_state_write_interval_ms: u64,
    /// Join codes tried before giving up on creating a session.
    pub join_code_attempts: u32,
    /// Connected players a session accepts.
    pub max_players: usize,
    /// Session lifetime.
    pub session_ttl_ms: u64,
    /// Fixed RNG seed for join codes. Random when absent.
    pub rng_seed: Option<u64>,
}

impl TransportConfig {
    /// Write interval as a duration.
    #[must_use]
    pub fn player_state_write_interval(&self) -> Duration {
        Duration::from_millis(self.player_state_write_interval_ms)
    }

    /// Session TTL as a duration.
    #[must_use]
    pub fn session_ttl(&self) -> Duration {
        Duration::from_millis(self.session_ttl_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            player_state_write_interval_ms: 3_000,
            join_code_attempts: 5,
            max_players: 8,
            session_ttl_ms: 2 * 60 * 60 * 1_000,
            rng_seed: None,
        }
    }
}

/// Shrinking conflict zone, centred on the arena.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoneConfig {
    /// Radius when the match starts.
    pub start_radius: f32,
    /// Radius once fully shrunk.
    pub end_radius: f32,
    /// Time to shrink from start to end radius.
    pub shrink_duration_ms: u64,
    /// Damage per second to living players outside.
    pub damage_per_second: f32,
}

impl ZoneConfig {
    /// Radius `elapsed` after match start.
    #[must_use]
    pub fn radius_at(&self, elapsed: Duration) -> f32 {
        if self.shrink_duration_ms == 0 {
            return self.end_radius;
        }
        let progress =
            (elapsed.as_millis() as f32 / self.shrink_duration_ms as f32).clamp(0.0, 1.0);
        self.start_radius + (self.end_radius - self.start_radius) * progress
    }
}

impl Default for ZoneConfig {
    fn default() -> Self {
        Self {
            start_radius: 1_400.0,
            end_radius: 250.0,
            shrink_duration_ms: 180_000,
            damage_per_second: 5.0,
        }
    }
}
