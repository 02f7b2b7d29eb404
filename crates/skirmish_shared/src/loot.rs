//! Loot items lying on the arena floor.

use crate::ids::LootId;
use crate::math::Vec2;
use serde::{Deserialize, Serialize};

/// What equipping a loot item changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LootKind {
    /// Replaces the weapon.
    Weapon,
    /// Replaces the armor.
    Armor,
}

/// A pickup-able item on the ground.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LootItem {
    /// Unique, never reused.
    pub id: LootId,
    /// Weapon or armor.
    #[serde(rename = "type")]
    pub kind: LootKind,
    /// Catalog id of the weapon or armor.
    pub item_id: String,
    /// Position X.
    pub x: f32,
    /// Position Y.
    pub y: f32,
}

impl LootItem {
    /// Position as a vector.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_under_type_key() {
        let item = LootItem {
            id: LootId::new("host-1"),
            kind: LootKind::Armor,
            item_id: "gi".into(),
            x: 1.0,
            y: 2.0,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "armor");
        assert_eq!(value["item_id"], "gi");
    }
}
