//! # Weapon & Armor Catalog
//!
//! Read-only balance data, loaded once at startup.
//!
//! ## Config Format (TOML)
//!
//! ```toml
//! [[weapon]]
//! id = "spear"
//! name = "Yari"
//! faction = "samurai"
//! damage_type = "piercing"
//! stance = "double"
//! speed_modifier = 0.9
//! base_damage = 20.0
//! reach = 85.0
//! attack_window_ms = 350
//! cooldown_ms = 550
//!
//! [[armor]]
//! id = "lamellar"
//! name = "Lamellar"
//! resistances = { slashing = 0.7, piercing = 0.85 }
//! weaknesses = { blunt = 1.25 }
//! ```
//!
//! The unarmed weapon and the unarmored armor (both id `"none"`) are always
//! present. A file that omits them gets the defaults.

use crate::constants::{NO_ARMOR_ID, UNARMED_WEAPON_ID};
use crate::error::{ConfigError, ConfigResult};
use crate::loot::LootKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// How a weapon hurts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageType {
    /// Edges: katana, kama.
    Slashing,
    /// Points: spear, sai.
    Piercing,
    /// Impact: bo, nunchaku, fists.
    Blunt,
}

/// One-handed or two-handed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// One hand.
    Single,
    /// Both hands.
    Double,
}

/// A weapon definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Faction the weapon belongs to. Cosmetic.
    pub faction: String,
    /// Damage type, matched against armor multipliers.
    pub damage_type: DamageType,
    /// Grip.
    pub stance: Stance,
    /// Multiplies movement speed while equipped.
    pub speed_modifier: f32,
    /// Damage per hit before armor.
    pub base_damage: f32,
    /// Maximum distance to a target, world units.
    pub reach: f32,
    /// How long one attack stays active.
    pub attack_window_ms: u32,
    /// Minimum time between attack starts.
    pub cooldown_ms: u32,
}

impl WeaponSpec {
    fn unarmed() -> Self {
        Self {
            id: UNARMED_WEAPON_ID.to_owned(),
            name: "Fists".to_owned(),
            faction: "none".to_owned(),
            damage_type: DamageType::Blunt,
            stance: Stance::Double,
            speed_modifier: 1.0,
            base_damage: 5.0,
            reach: 40.0,
            attack_window_ms: 200,
            cooldown_ms: 300,
        }
    }
}

/// Per-damage-type multipliers. A missing entry means `1.0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DamageMultipliers {
    /// Multiplier against slashing damage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slashing: Option<f32>,
    /// Multiplier against piercing damage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub piercing: Option<f32>,
    /// Multiplier against blunt damage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blunt: Option<f32>,
}

impl DamageMultipliers {
    /// Multiplier for `damage_type`, `1.0` if absent.
    #[must_use]
    pub fn get(&self, damage_type: DamageType) -> f32 {
        let entry = match damage_type {
            DamageType::Slashing => self.slashing,
            DamageType::Piercing => self.piercing,
            DamageType::Blunt => self.blunt,
        };
        entry.unwrap_or(1.0)
    }

    fn entries(&self) -> impl Iterator<Item = f32> {
        [self.slashing, self.piercing, self.blunt].into_iter().flatten()
    }
}

/// An armor definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArmorSpec {
    /// Catalog id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Multipliers below 1.0.
    #[serde(default)]
    pub resistances: DamageMultipliers,
    /// Multipliers above 1.0.
    #[serde(default)]
    pub weaknesses: DamageMultipliers,
}

impl ArmorSpec {
    fn unarmored() -> Self {
        Self {
            id: NO_ARMOR_ID.to_owned(),
            name: "Unarmored".to_owned(),
            resistances: DamageMultipliers::default(),
            weaknesses: DamageMultipliers::default(),
        }
    }

    /// Combined multiplier for an incoming hit of `damage_type`.
    #[must_use]
    pub fn multiplier(&self, damage_type: DamageType) -> f32 {
        self.resistances.get(damage_type) * self.weaknesses.get(damage_type)
    }
}

#[derive(Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "weapon")]
    weapons: Vec<WeaponSpec>,
    #[serde(default, rename = "armor")]
    armors: Vec<ArmorSpec>,
}

/// Every weapon and armor the game knows about.
#[derive(Clone, Debug)]
pub struct Catalog {
    weapons: HashMap<String, WeaponSpec>,
    armors: HashMap<String, ArmorSpec>,
    unarmed: WeaponSpec,
    /// Spawnable entries in file order, so seeded spawns are reproducible.
    spawnable: Vec<(LootKind, String)>,
}

impl Catalog {
    /// Parses a catalog from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the text is not valid TOML, an id is
    /// duplicated, or a value is out of range.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let file: CatalogFile = toml::from_str(text)?;
        Self::from_specs(file.weapons, file.armors)
    }

    /// Loads a catalog file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`Catalog::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Builds a catalog from already-parsed specs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] on duplicate ids or out of range
    /// values.
    pub fn from_specs(weapons: Vec<WeaponSpec>, armors: Vec<ArmorSpec>) -> ConfigResult<Self> {
        let mut seen = std::collections::HashSet::new();
        for weapon in &weapons {
            validate_weapon(weapon)?;
            if !seen.insert(weapon.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate weapon id {:?}", weapon.id)));
            }
        }
        seen.clear();
        for armor in &armors {
            validate_armor(armor)?;
            if !seen.insert(armor.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate armor id {:?}", armor.id)));
            }
        }
        Ok(Self::assemble(weapons, armors))
    }

    fn assemble(weapons: Vec<WeaponSpec>, armors: Vec<ArmorSpec>) -> Self {
        let mut spawnable = Vec::with_capacity(weapons.len() + armors.len());
        let mut weapon_map = HashMap::with_capacity(weapons.len() + 1);
        for weapon in weapons {
            if weapon.id != UNARMED_WEAPON_ID {
                spawnable.push((LootKind::Weapon, weapon.id.clone()));
            }
            weapon_map.insert(weapon.id.clone(), weapon);
        }
        let mut armor_map = HashMap::with_capacity(armors.len() + 1);
        for armor in armors {
            if armor.id != NO_ARMOR_ID {
                spawnable.push((LootKind::Armor, armor.id.clone()));
            }
            armor_map.insert(armor.id.clone(), armor);
        }

        let unarmed = weapon_map
            .entry(UNARMED_WEAPON_ID.to_owned())
            .or_insert_with(WeaponSpec::unarmed)
            .clone();
        armor_map
            .entry(NO_ARMOR_ID.to_owned())
            .or_insert_with(ArmorSpec::unarmored);

        Self {
            weapons: weapon_map,
            armors: armor_map,
            unarmed,
            spawnable,
        }
    }

    /// The catalog shipped with the game.
    #[must_use]
    pub fn bundled() -> Self {
        let weapons = vec![
            WeaponSpec::unarmed(),
            weapon("bo", "Bo Staff", "monk", DamageType::Blunt, Stance::Double, 0.95, 15.0, 70.0, 300, 450),
            weapon("spear", "Yari", "samurai", DamageType::Piercing, Stance::Double, 0.9, 20.0, 85.0, 350, 550),
            weapon("katana", "Katana", "samurai", DamageType::Slashing, Stance::Single, 1.0, 18.0, 60.0, 250, 400),
            weapon("sai", "Sai", "ninja", DamageType::Piercing, Stance::Double, 1.1, 10.0, 45.0, 180, 280),
            weapon("nunchaku", "Nunchaku", "monk", DamageType::Blunt, Stance::Double, 1.05, 12.0, 50.0, 200, 320),
            weapon("kama", "Kama", "ninja", DamageType::Slashing, Stance::Single, 1.05, 13.0, 50.0, 220, 350),
        ];
        let armors = vec![
            ArmorSpec::unarmored(),
            armor("gi", "Training Gi", &[(DamageType::Blunt, 0.9)], &[(DamageType::Slashing, 1.2)]),
            armor(
                "lamellar",
                "Lamellar",
                &[(DamageType::Slashing, 0.7), (DamageType::Piercing, 0.85)],
                &[(DamageType::Blunt, 1.25)],
            ),
            armor("chainmail", "Kusari", &[(DamageType::Slashing, 0.6)], &[(DamageType::Piercing, 1.3)]),
            armor(
                "o_yoroi",
                "O-Yoroi",
                &[(DamageType::Slashing, 0.6), (DamageType::Piercing, 0.6)],
                &[(DamageType::Blunt, 1.4)],
            ),
        ];

        Self::assemble(weapons, armors)
    }

    /// Looks up a weapon.
    #[must_use]
    pub fn weapon(&self, id: &str) -> Option<&WeaponSpec> {
        self.weapons.get(id)
    }

    /// Looks up a weapon, falling back to fists for unknown ids.
    #[must_use]
    pub fn weapon_or_unarmed(&self, id: &str) -> &WeaponSpec {
        self.weapons.get(id).unwrap_or(&self.unarmed)
    }

    /// Looks up an armor.
    #[must_use]
    pub fn armor(&self, id: &str) -> Option<&ArmorSpec> {
        self.armors.get(id)
    }

    /// Damage multiplier of armor `armor_id` against `damage_type`.
    ///
    /// Unknown armor counts as unarmored.
    #[must_use]
    pub fn damage_multiplier(&self, armor_id: &str, damage_type: DamageType) -> f32 {
        self.armors
            .get(armor_id)
            .map_or(1.0, |armor| armor.multiplier(damage_type))
    }

    /// Damage one hit of `weapon_id` deals to a defender wearing `armor_id`.
    #[must_use]
    pub fn hit_damage(&self, weapon_id: &str, armor_id: &str) -> f32 {
        let weapon = self.weapon_or_unarmed(weapon_id);
        weapon.base_damage * self.damage_multiplier(armor_id, weapon.damage_type)
    }

    /// Items that may be spawned as loot. Never contains the placeholders.
    #[must_use]
    pub fn spawnable(&self) -> &[(LootKind, String)] {
        &self.spawnable
    }

    /// True if `item_id` names a known item of `kind`.
    #[must_use]
    pub fn contains(&self, kind: LootKind, item_id: &str) -> bool {
        match kind {
            LootKind::Weapon => self.weapons.contains_key(item_id),
            LootKind::Armor => self.armors.contains_key(item_id),
        }
    }

    /// Number of weapons, placeholder included.
    #[must_use]
    pub fn weapon_count(&self) -> usize {
        self.weapons.len()
    }

    /// Number of armors, placeholder included.
    #[must_use]
    pub fn armor_count(&self) -> usize {
        self.armors.len()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::bundled()
    }
}

#[allow(clippy::too_many_arguments)]
fn weapon(
    id: &str,
    name: &str,
    faction: &str,
    damage_type: DamageType,
    stance: Stance,
    speed_modifier: f32,
    base_damage: f32,
    reach: f32,
    attack_window_ms: u32,
    cooldown_ms: u32,
) -> WeaponSpec {
    WeaponSpec {
        id: id.to_owned(),
        name: name.to_owned(),
        faction: faction.to_owned(),
        damage_type,
        stance,
        speed_modifier,
        base_damage,
        reach,
        attack_window_ms,
        cooldown_ms,
    }
}

fn armor(id: &str, name: &str, resist: &[(DamageType, f32)], weak: &[(DamageType, f32)]) -> ArmorSpec {
    fn table(entries: &[(DamageType, f32)]) -> DamageMultipliers {
        let mut table = DamageMultipliers::default();
        for &(damage_type, value) in entries {
            match damage_type {
                DamageType::Slashing => table.slashing = Some(value),
                DamageType::Piercing => table.piercing = Some(value),
                DamageType::Blunt => table.blunt = Some(value),
            }
        }
        table
    }

    ArmorSpec {
        id: id.to_owned(),
        name: name.to_owned(),
        resistances: table(resist),
        weaknesses: table(weak),
    }
}

fn validate_weapon(weapon: &WeaponSpec) -> ConfigResult<()> {
    let finite = [weapon.speed_modifier, weapon.base_damage, weapon.reach]
        .iter()
        .all(|value| value.is_finite() && *value >= 0.0);
    if !finite || weapon.id.is_empty() {
        return Err(ConfigError::Invalid(format!(
            "weapon {:?} needs a non-empty id and non-negative finite stats",
            weapon.id
        )));
    }
    Ok(())
}

fn validate_armor(armor: &ArmorSpec) -> ConfigResult<()> {
    if armor.id.is_empty() {
        return Err(ConfigError::Invalid("armor with empty id".to_owned()));
    }
    if armor.resistances.entries().any(|r| !(r > 0.0 && r <= 1.0)) {
        return Err(ConfigError::Invalid(format!(
            "armor {:?}: resistances must be in (0, 1]",
            armor.id
        )));
    }
    if armor.weaknesses.entries().any(|w| !(w >= 1.0 && w.is_finite())) {
        return Err(ConfigError::Invalid(format!(
            "armor {:?}: weaknesses must be finite and >= 1",
            armor.id
        )));
    }
    Ok(())
}
