//! # Match Flow
//!
//! Host-side bookkeeping for one match: who killed whom and when the match
//! is over. Non-hosts never touch this; they only apply `game_start` and
//! `game_over`.

use skirmish_shared::{PlayerId, PlayerStat, PlayerState};
use std::collections::HashMap;

/// A death the host accepted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeathRecord {
    /// Who died.
    pub victim_id: PlayerId,
    /// Credited killer and their new kill total.
    pub credit: Option<(PlayerId, u32)>,
}

/// The host's decision to end the match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchResult {
    /// Last player standing, if any.
    pub winner_id: Option<PlayerId>,
    /// Standings, most kills first.
    pub stats: Vec<PlayerStat>,
}

/// Host kill ledger and end-of-match check.
#[derive(Clone, Debug)]
pub struct MatchFlow {
    kills: HashMap<PlayerId, u32>,
    last_death: HashMap<PlayerId, f64>,
    death_gap: f64,
    over: bool,
}

impl MatchFlow {
    /// `death_gap` is the number of seconds a player stays dead. Reports of
    /// the same death closer together than this are duplicates.
    #[must_use]
    pub fn new(death_gap: f64) -> Self {
        Self {
            kills: HashMap::new(),
            last_death: HashMap::new(),
            death_gap,
            over: false,
        }
    }

    /// Clears the ledger for a new match.
    pub fn reset(&mut self) {
        self.kills.clear();
        self.last_death.clear();
        self.over = false;
    }

    /// True once [`MatchFlow::check_over`] ended the match.
    #[must_use]
    pub fn is_over(&self) -> bool {
        self.over
    }

    /// Kills credited to `id`.
    #[must_use]
    pub fn kills(&self, id: &PlayerId) -> u32 {
        self.kills.get(id).copied().unwrap_or(0)
    }

    fn recently_dead(&self, id: &PlayerId, now: f64) -> bool {
        self.last_death
            .get(id)
            .is_some_and(|at| now - at < self.death_gap)
    }

    /// Records a death at `now` (simulation seconds).
    ///
    /// Returns `None` for a duplicate report or once the match is over.
    /// Suicides and unattributed deaths credit nobody.
    pub fn record_death(&mut self, victim_id: &PlayerId, killer_id: Option<&PlayerId>, now: f64) -> Option<DeathRecord> {
        if self.over || self.recently_dead(victim_id, now) {
            return None;
        }
        self.last_death.insert(victim_id.clone(), now);
        let credit = killer_id.filter(|killer| *killer != victim_id).map(|killer| {
            let total = self.kills.entry(killer.clone()).or_insert(0);
            *total += 1;
            (killer.clone(), *total)
        });
        Some(DeathRecord {
            victim_id: victim_id.clone(),
            credit,
        })
    }

    /// Ends the match if at most one living, connected player remains.
    ///
    /// Players who died within the death gap count as dead even if `players`
    /// has not caught up yet.
    pub fn check_over<'a>(&mut self, players: impl IntoIterator<Item = &'a PlayerState> + Clone, now: f64) -> Option<MatchResult> {
        if self.over {
            return None;
        }
        let mut living = players
            .clone()
            .into_iter()
            .filter(|p| p.is_alive && p.is_connected && !self.recently_dead(&p.id, now));
        let first = living.next();
        if living.next().is_some() {
            return None;
        }
        self.over = true;
        Some(MatchResult {
            winner_id: first.map(|p| p.id.clone()),
            stats: self.standings(players),
        })
    }

    /// Standings, most kills first, ties by name.
    pub fn standings<'a>(&self, players: impl IntoIterator<Item = &'a PlayerState>) -> Vec<PlayerStat> {
        let mut stats: Vec<PlayerStat> = players
            .into_iter()
            .map(|p| PlayerStat {
                player_id: p.id.clone(),
                name: p.name.clone(),
                kills: self.kills(&p.id).max(p.kills),
            })
            .collect();
        stats.sort_by(|a, b| {
            b.kills
                .cmp(&a.kills)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.player_id.cmp(&b.player_id))
        });
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str) -> PlayerState {
        PlayerState::new(PlayerId::new(id), id.to_uppercase(), 0.0, 0.0)
    }

    #[test]
    fn kills_are_credited_once_per_death() {
        let mut flow = MatchFlow::new(5.0);
        let (a, b) = (PlayerId::new("a"), PlayerId::new("b"));

        let record = flow.record_death(&b, Some(&a), 1.0).unwrap();
        assert_eq!(record.credit, Some((a.clone(), 1)));
        assert!(flow.record_death(&b, Some(&a), 1.5).is_none());
        assert_eq!(flow.kills(&a), 1);

        // Respawned and died again.
        assert!(flow.record_death(&b, Some(&a), 7.0).is_some());
        assert_eq!(flow.kills(&a), 2);
    }

    #[test]
    fn suicide_credits_nobody() {
        let mut flow = MatchFlow::new(5.0);
        let a = PlayerId::new("a");
        let record = flow.record_death(&a, Some(&a), 0.0).unwrap();
        assert_eq!(record.credit, None);
        assert_eq!(flow.kills(&a), 0);
    }

    #[test]
    fn last_player_standing_wins() {
        let mut flow = MatchFlow::new(5.0);
        let players = vec![player("a"), player("b"), player("c")];
        flow.record_death(&players[1].id, Some(&players[0].id), 1.0);
        assert!(flow.check_over(&players, 1.0).is_none());

        flow.record_death(&players[2].id, Some(&players[0].id), 2.0);
        let result = flow.check_over(&players, 2.0).unwrap();

        assert_eq!(result.winner_id, Some(players[0].id.clone()));
        assert_eq!(result.stats[0].player_id, players[0].id);
        assert_eq!(result.stats[0].kills, 2);
        assert!(flow.is_over());
        assert!(flow.check_over(&players, 3.0).is_none());
        assert!(flow.record_death(&players[0].id, None, 3.0).is_none());
    }

    #[test]
    fn disconnected_players_do_not_count() {
        let mut flow = MatchFlow::new(5.0);
        let mut players = vec![player("a"), player("b")];
        players[1].is_connected = false;
        let result = flow.check_over(&players, 0.0).unwrap();
        assert_eq!(result.winner_id, Some(PlayerId::new("a")));
    }

    #[test]
    fn standings_sorted_by_kills_then_name() {
        let mut flow = MatchFlow::new(5.0);
        let players = vec![player("zed"), player("amy"), player("bob")];
        flow.record_death(&players[1].id, Some(&players[0].id), 0.0);
        let stats = flow.standings(&players);
        let order: Vec<_> = stats.iter().map(|s| s.player_id.as_str()).collect();
        assert_eq!(order, ["zed", "amy", "bob"]);
    }

    #[test]
    fn reset_starts_a_new_match() {
        let mut flow = MatchFlow::new(5.0);
        let players = vec![player("a")];
        assert!(flow.check_over(&players, 0.0).is_some());
        flow.reset();
        assert!(!flow.is_over());
        assert_eq!(flow.kills(&PlayerId::new("a")), 0);
    }
}
