//! # Combat
//!
//! Melee resolution shared by every peer. The same inputs give the same
//! hits on host and clients, so only deaths need to travel the wire.
//!
//! ```text
//! attack pressed ─► AttackTracker::try_start ─► resolve_attack ─► Hit[]
//!                    (window + cooldown)         (reach, armor)
//! ```

use skirmish_shared::{Catalog, PlayerId, PlayerState, WeaponSpec};

/// Attack timing for one player, in simulation seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AttackTracker {
    active_until: f64,
    ready_at: f64,
}

impl AttackTracker {
    /// A tracker that can attack immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts an attack at `now` if none is active and the cooldown is over.
    pub fn try_start(&mut self, now: f64, weapon: &WeaponSpec) -> bool {
        if self.is_active(now) || now < self.ready_at {
            return false;
        }
        let window = f64::from(weapon.attack_window_ms) / 1000.0;
        let cooldown = f64::from(weapon.cooldown_ms) / 1000.0;
        self.active_until = now + window;
        self.ready_at = now + window.max(cooldown);
        true
    }

    /// True while the last attack is in its active window.
    #[must_use]
    pub fn is_active(&self, now: f64) -> bool {
        now < self.active_until
    }

    /// Forgets any attack in progress.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One landed hit.
#[derive(Clone, Debug, PartialEq)]
pub struct Hit {
    /// Who swung.
    pub attacker_id: PlayerId,
    /// Who was struck.
    pub target_id: PlayerId,
    /// Damage after armor.
    pub damage: f32,
    /// Target health afterwards.
    pub health_remaining: f32,
    /// This hit killed the target.
    pub lethal: bool,
}

/// True if `defender` can be struck by `attacker` wielding `weapon`.
#[must_use]
pub fn in_reach(attacker: &PlayerState, defender: &PlayerState, weapon: &WeaponSpec) -> bool {
    attacker.id != defender.id
        && defender.is_alive
        && attacker.position().distance(defender.position()) <= weapon.reach
}

/// Applies one swing of `attacker` to `defender`, if it connects.
pub fn strike(attacker: &PlayerState, defender: &mut PlayerState, catalog: &Catalog) -> Option<Hit> {
    let weapon = catalog.weapon_or_unarmed(&attacker.weapon_id);
    if !in_reach(attacker, defender, weapon) {
        return None;
    }
    let damage = catalog.hit_damage(&weapon.id, &defender.armor_id);
    let lethal = defender.apply_damage(damage);
    Some(Hit {
        attacker_id: attacker.id.clone(),
        target_id: defender.id.clone(),
        damage,
        health_remaining: defender.health,
        lethal,
    })
}

/// Applies one swing of `attacker` to every defender in reach.
///
/// The attacker is credited with the damage dealt.
pub fn resolve_attack<'a>(
    attacker: &mut PlayerState,
    defenders: impl IntoIterator<Item = &'a mut PlayerState>,
    catalog: &Catalog,
) -> Vec<Hit> {
    let hits: Vec<Hit> = defenders
        .into_iter()
        .filter_map(|defender| strike(attacker, defender, catalog))
        .collect();
    attacker.damage_dealt += hits.iter().map(|hit| hit.damage).sum::<f32>();
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(id: &str, x: f32, y: f32) -> PlayerState {
        PlayerState::new(PlayerId::new(id), id, x, y)
    }

    #[test]
    fn attack_window_and_cooldown() {
        let catalog = Catalog::bundled();
        let katana = catalog.weapon("katana").unwrap();
        let mut tracker = AttackTracker::new();

        assert!(tracker.try_start(0.0, katana));
        assert!(tracker.is_active(0.1));
        assert!(!tracker.try_start(0.1, katana));
        // Window over, cooldown not.
        assert!(!tracker.is_active(0.3));
        assert!(!tracker.try_start(0.3, katana));
        assert!(tracker.try_start(0.5, katana));
    }

    #[test]
    fn armor_scales_damage_exactly() {
        let catalog = Catalog::bundled();
        let mut attacker = at("a", 0.0, 0.0);
        attacker.weapon_id = "spear".into();
        let mut defender = at("d", 10.0, 0.0);
        defender.armor_id = "lamellar".into();

        let hit = strike(&attacker, &mut defender, &catalog).unwrap();

        let expected = 20.0 * 0.85;
        assert!((hit.damage - expected).abs() < 1e-5);
        assert!((defender.health - (100.0 - expected)).abs() < 1e-4);
        assert!(!hit.lethal);
    }

    #[test]
    fn out_of_reach_or_dead_is_missed() {
        let catalog = Catalog::bundled();
        let attacker = at("a", 0.0, 0.0);
        let mut far = at("far", 500.0, 0.0);
        assert!(strike(&attacker, &mut far, &catalog).is_none());

        let mut dead = at("dead", 1.0, 0.0);
        dead.apply_damage(1000.0);
        assert!(strike(&attacker, &mut dead, &catalog).is_none());

        let mut me = attacker.clone();
        assert!(strike(&attacker, &mut me, &catalog).is_none());
    }

    #[test]
    fn lethal_hit_clamps_and_reports_once() {
        let catalog = Catalog::bundled();
        let mut attacker = at("a", 0.0, 0.0);
        attacker.weapon_id = "bo".into();
        let mut victim = at("v", 5.0, 0.0);
        victim.set_health(3.0);

        let hit = strike(&attacker, &mut victim, &catalog).unwrap();
        assert!(hit.lethal);
        assert_eq!(victim.health, 0.0);
        assert!(!victim.is_alive);
        assert!(strike(&attacker, &mut victim, &catalog).is_none());
    }

    #[test]
    fn resolve_credits_damage_dealt() {
        let catalog = Catalog::bundled();
        let mut attacker = at("a", 0.0, 0.0);
        let mut near = at("near", 10.0, 0.0);
        let mut also_near = at("also", 0.0, 10.0);
        let mut far = at("far", 300.0, 0.0);

        let hits = resolve_attack(&mut attacker, [&mut near, &mut also_near, &mut far], &catalog);

        assert_eq!(hits.len(), 2);
        assert!((attacker.damage_dealt - 10.0).abs() < 1e-5);
    }
}
