//! # Equipment
//!
//! Each player holds exactly one weapon slot and one armor slot. Equipping
//! an item displaces whatever the slot held; the displaced item drops to the
//! ground unless it was the built-in placeholder.

use skirmish_shared::{LootKind, PlayerState, PlayerStatePatch, NO_ARMOR_ID, UNARMED_WEAPON_ID};

/// The placeholder id of a slot: fists or no armor.
#[inline]
#[must_use]
pub const fn placeholder(kind: LootKind) -> &'static str {
    match kind {
        LootKind::Weapon => UNARMED_WEAPON_ID,
        LootKind::Armor => NO_ARMOR_ID,
    }
}

/// A player's two equipment slots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Loadout {
    /// Weapon catalog id.
    pub weapon_id: String,
    /// Armor catalog id.
    pub armor_id: String,
}

impl Loadout {
    /// Reads the slots of `state`.
    #[must_use]
    pub fn of(state: &PlayerState) -> Self {
        Self {
            weapon_id: state.weapon_id.clone(),
            armor_id: state.armor_id.clone(),
        }
    }

    /// Current item in the slot for `kind`.
    #[must_use]
    pub fn slot(&self, kind: LootKind) -> &str {
        match kind {
            LootKind::Weapon => &self.weapon_id,
            LootKind::Armor => &self.armor_id,
        }
    }

    /// True if equipping an item of `kind` would drop something.
    #[must_use]
    pub fn would_displace(&self, kind: LootKind) -> bool {
        self.slot(kind) != placeholder(kind)
    }

    /// Puts `item_id` in the slot for `kind`.
    ///
    /// Returns the previous item unless it was the placeholder.
    pub fn equip(&mut self, kind: LootKind, item_id: &str) -> Option<String> {
        let slot = match kind {
            LootKind::Weapon => &mut self.weapon_id,
            LootKind::Armor => &mut self.armor_id,
        };
        let previous = std::mem::replace(slot, item_id.to_owned());
        (previous != placeholder(kind)).then_some(previous)
    }

    /// Empties the slot for `kind`, returning what it held.
    pub fn unequip(&mut self, kind: LootKind) -> Option<String> {
        self.equip(kind, placeholder(kind))
    }

    /// Writes both slots into `state`.
    pub fn apply_to(&self, state: &mut PlayerState) {
        state.weapon_id.clone_from(&self.weapon_id);
        state.armor_id.clone_from(&self.armor_id);
    }

    /// Patch carrying the slot for `kind`.
    #[must_use]
    pub fn patch(&self, kind: LootKind) -> PlayerStatePatch {
        match kind {
            LootKind::Weapon => PlayerStatePatch::equipment(Some(self.weapon_id.clone()), None),
            LootKind::Armor => PlayerStatePatch::equipment(None, Some(self.armor_id.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirmish_shared::PlayerId;

    fn fresh() -> Loadout {
        Loadout::of(&PlayerState::new(PlayerId::new("p"), "P", 0.0, 0.0))
    }

    #[test]
    fn equipping_over_placeholder_drops_nothing() {
        let mut loadout = fresh();
        assert!(!loadout.would_displace(LootKind::Weapon));
        assert_eq!(loadout.equip(LootKind::Weapon, "bo"), None);
        assert_eq!(loadout.weapon_id, "bo");
    }

    #[test]
    fn swapping_returns_held_item() {
        let mut loadout = fresh();
        loadout.equip(LootKind::Armor, "gi");
        assert_eq!(loadout.equip(LootKind::Armor, "lamellar"), Some("gi".to_owned()));
        assert_eq!(loadout.weapon_id, UNARMED_WEAPON_ID);
    }

    #[test]
    fn patch_only_touches_one_slot() {
        let mut loadout = fresh();
        loadout.equip(LootKind::Weapon, "spear");
        let patch = loadout.patch(LootKind::Weapon);
        assert_eq!(patch.weapon_id.as_deref(), Some("spear"));
        assert!(patch.armor_id.is_none());
        assert!(!patch.touches_motion());
    }
}
