//! Concurrent registry of active rounds, one per chat group.
//!
//! Every operation on a group goes through a single `DashMap` entry: starts
//! use the vacant-entry insert, turn actions mutate under the held `get_mut`
//! guard, and every way out of the registry is a `remove`/`remove_if`.
//! Only the caller whose removal succeeds gets to score the round.

use crate::errors::RoundError;
use crate::games::dice::DiceRoller;
use crate::games::round::{PlayerTurn, Round};
use crate::games::scoring;
use crate::games::types::{Dice, GroupId, PlayerId, RoundResult, DICE_COUNT, UNKNOWN_ID};
use chrono::{DateTime, Duration, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// A round that has left the registry with its final results
#[derive(Debug, Clone, Serialize)]
pub struct FinalizedRound {
    pub group_id: GroupId,
    pub round_id: Uuid,
    pub initiator_id: PlayerId,
    pub started_at: DateTime<Utc>,
    pub players: HashMap<PlayerId, PlayerTurn>,
    pub results: HashMap<PlayerId, RoundResult>,
    /// Only set when more than one player joined
    pub winner: Option<PlayerId>,
    /// Display names of players who never rerolled or passed
    pub auto_passed: Vec<String>,
}

impl FinalizedRound {
    /// Results strongest first, paired with the player's display name
    pub fn standings(&self) -> Vec<(PlayerId, String, RoundResult)> {
        scoring::standings(&self.results)
            .into_iter()
            .map(|(id, result)| {
                let name = self
                    .players
                    .get(&id)
                    .map(|turn| turn.display_name.clone())
                    .unwrap_or_default();
                (id, name, result)
            })
            .collect()
    }

    pub fn winner_name(&self) -> Option<&str> {
        self.winner
            .and_then(|id| self.players.get(&id))
            .map(|turn| turn.display_name.as_str())
    }
}

/// Registry of open rounds keyed by group
pub struct RoundRegistry {
    rounds: DashMap<GroupId, Round>,
    roller: Arc<DiceRoller>,
    round_duration: Duration,
}

impl RoundRegistry {
    pub fn new(roller: Arc<DiceRoller>, round_duration: Duration) -> Self {
        Self {
            rounds: DashMap::new(),
            roller,
            round_duration,
        }
    }

    pub fn round_duration(&self) -> Duration {
        self.round_duration
    }

    /// Open a round for `group_id`, returning its round id
    pub fn start_round(&self, group_id: GroupId, initiator_id: PlayerId) -> Result<Uuid, RoundError> {
        self.start_round_at(group_id, initiator_id, Utc::now())
    }

    /// `start_round` with an explicit start time
    pub fn start_round_at(
        &self,
        group_id: GroupId,
        initiator_id: PlayerId,
        started_at: DateTime<Utc>,
    ) -> Result<Uuid, RoundError> {
        if group_id == UNKNOWN_ID || initiator_id == UNKNOWN_ID {
            return Err(RoundError::InvalidGroupOrPlayer {
                group_id,
                player_id: initiator_id,
            });
        }

        match self.rounds.entry(group_id) {
            Entry::Occupied(_) => Err(RoundError::AlreadyActive { group_id }),
            Entry::Vacant(slot) => {
                let round = Round::new(group_id, initiator_id, started_at);
                let round_id = round.round_id;
                slot.insert(round);
                info!("🎲 Round {} started in group {} by {}", round_id, group_id, initiator_id);
                Ok(round_id)
            }
        }
    }

    /// Join the round with a first roll. `None` if there is no open round or
    /// the player already rolled.
    pub fn roll_dice(&self, group_id: GroupId, player_id: PlayerId, display_name: &str) -> Option<Dice> {
        let mut round = self.rounds.get_mut(&group_id)?;
        let dice = round.join(player_id, display_name, || self.roller.roll_five())?;
        debug!(
            "Player {} rolled {:?} in group {} (pending {})",
            player_id, dice, group_id, round.pending_actions
        );
        Some(dice)
    }

    /// Replace the requested faces. Returns the hand before and after.
    ///
    /// An empty or malformed request is a no-op and keeps the player's
    /// reroll-or-pass decision open.
    pub fn reroll_dice(
        &self,
        group_id: GroupId,
        player_id: PlayerId,
        requested: &[u8],
    ) -> Option<(Dice, Dice)> {
        if requested.is_empty()
            || requested.len() > DICE_COUNT
            || requested.iter().any(|face| !(1..=6).contains(face))
        {
            return None;
        }

        let mut round = self.rounds.get_mut(&group_id)?;
        let (before, after) =
            round.reroll(player_id, |current| self.roller.reroll(current, requested))?;
        debug!(
            "Player {} rerolled {:?} in group {}: {:?} -> {:?}",
            player_id, requested, group_id, before, after
        );
        Some((before, after))
    }

    pub fn pass_turn(&self, group_id: GroupId, player_id: PlayerId) -> bool {
        let Some(mut round) = self.rounds.get_mut(&group_id) else {
            return false;
        };
        let passed = round.pass(player_id);
        if passed {
            debug!(
                "Player {} passed in group {} (pending {})",
                player_id, group_id, round.pending_actions
            );
        }
        passed
    }

    pub fn check_complete(&self, group_id: GroupId) -> bool {
        self.rounds
            .get(&group_id)
            .map(|round| round.is_complete())
            .unwrap_or(false)
    }

    /// End the round without scoring. Only the initiator may do this.
    pub fn finish_round(&self, group_id: GroupId, requester_id: PlayerId) -> bool {
        let removed = self
            .rounds
            .remove_if(&group_id, |_, round| round.initiator_id == requester_id);
        match removed {
            Some((_, round)) => {
                info!("🛑 Round {} in group {} finished by initiator", round.round_id, group_id);
                true
            }
            None => false,
        }
    }

    /// Score and remove the round. A second caller gets `AlreadyFinalized`.
    pub fn finalize(&self, group_id: GroupId) -> Result<FinalizedRound, RoundError> {
        self.rounds
            .remove(&group_id)
            .map(|(_, round)| Self::resolve(round))
            .ok_or(RoundError::AlreadyFinalized { group_id })
    }

    /// Finalize only if every player has acted and there are at least two
    pub fn finalize_if_complete(&self, group_id: GroupId) -> Option<FinalizedRound> {
        self.rounds
            .remove_if(&group_id, |_, round| round.is_complete())
            .map(|(_, round)| Self::resolve(round))
    }

    /// Finalize `round_id` if it is still registered and past its deadline
    pub fn finalize_if_expired(
        &self,
        group_id: GroupId,
        round_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<FinalizedRound> {
        let limit = self.round_duration;
        self.rounds
            .remove_if(&group_id, |_, round| {
                round.round_id == round_id && round.is_expired(now, limit)
            })
            .map(|(_, round)| Self::resolve(round))
    }

    /// Snapshot of the rounds past their deadline at `now`
    pub fn expired_rounds(&self, now: DateTime<Utc>) -> Vec<(GroupId, Uuid)> {
        self.rounds
            .iter()
            .filter(|entry| entry.value().is_expired(now, self.round_duration))
            .map(|entry| (*entry.key(), entry.value().round_id))
            .collect()
    }

    /// Copy of the current state of a group's round
    pub fn snapshot(&self, group_id: GroupId) -> Option<Round> {
        self.rounds.get(&group_id).map(|round| round.clone())
    }

    pub fn contains(&self, group_id: GroupId) -> bool {
        self.rounds.contains_key(&group_id)
    }

    pub fn active_count(&self) -> usize {
        self.rounds.len()
    }

    fn resolve(mut round: Round) -> FinalizedRound {
        let auto_passed = round.mid_turn_players();
        let results = round.resolve();
        let winner = if round.players.len() > 1 {
            scoring::winner(&results)
        } else {
            None
        };

        info!(
            "🏁 Round {} in group {} resolved: {} players, winner {:?}",
            round.round_id,
            round.group_id,
            round.players.len(),
            winner
        );

        FinalizedRound {
            group_id: round.group_id,
            round_id: round.round_id,
            initiator_id: round.initiator_id,
            started_at: round.started_at,
            players: round.players,
            results,
            winner,
            auto_passed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::round::TurnStage;
    use crate::games::types::Combination;

    const GROUP: GroupId = -1001;

    fn registry() -> RoundRegistry {
        RoundRegistry::new(Arc::new(DiceRoller::seeded(99)), Duration::minutes(5))
    }

    #[test]
    fn test_start_round_twice() {
        let registry = registry();

        assert!(registry.start_round(GROUP, 1).is_ok());
        assert_eq!(
            registry.start_round(GROUP, 2),
            Err(RoundError::AlreadyActive { group_id: GROUP })
        );
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_start_round_rejects_unknown_ids() {
        let registry = registry();

        assert_eq!(
            registry.start_round(UNKNOWN_ID, 1),
            Err(RoundError::InvalidGroupOrPlayer {
                group_id: UNKNOWN_ID,
                player_id: 1
            })
        );
        assert!(matches!(
            registry.start_round(GROUP, UNKNOWN_ID),
            Err(RoundError::InvalidGroupOrPlayer { .. })
        ));
        assert!(!registry.contains(GROUP));
    }

    #[test]
    fn test_actions_without_round_are_noops() {
        let registry = registry();

        assert!(registry.roll_dice(GROUP, 1, "Ann").is_none());
        assert!(registry.reroll_dice(GROUP, 1, &[1]).is_none());
        assert!(!registry.pass_turn(GROUP, 1));
        assert!(!registry.check_complete(GROUP));
        assert!(!registry.finish_round(GROUP, 1));
        assert!(registry.finalize_if_complete(GROUP).is_none());
    }

    #[test]
    fn test_roll_once_per_round() {
        let registry = registry();
        registry.start_round(GROUP, 1).unwrap();

        let dice = registry.roll_dice(GROUP, 1, "Ann").unwrap();
        assert!(dice.windows(2).all(|w| w[0] <= w[1]));
        assert!(registry.roll_dice(GROUP, 1, "Ann").is_none());

        let round = registry.snapshot(GROUP).unwrap();
        assert_eq!(round.pending_actions, 1);
        assert_eq!(round.players[&1].dice, dice);
    }

    #[test]
    fn test_malformed_reroll_keeps_decision_open() {
        let registry = registry();
        registry.start_round(GROUP, 1).unwrap();
        registry.roll_dice(GROUP, 1, "Ann").unwrap();

        assert!(registry.reroll_dice(GROUP, 1, &[]).is_none());
        assert!(registry.reroll_dice(GROUP, 1, &[0]).is_none());
        assert!(registry.reroll_dice(GROUP, 1, &[7]).is_none());
        assert!(registry.reroll_dice(GROUP, 1, &[1, 1, 1, 1, 1, 1]).is_none());

        let round = registry.snapshot(GROUP).unwrap();
        assert_eq!(round.stage_of(1), TurnStage::Rolled);
        assert!(registry.pass_turn(GROUP, 1));
    }

    #[test]
    fn test_reroll_consumes_turn() {
        let registry = registry();
        registry.start_round(GROUP, 1).unwrap();
        let dice = registry.roll_dice(GROUP, 1, "Ann").unwrap();

        let (before, after) = registry.reroll_dice(GROUP, 1, &[dice[0]]).unwrap();
        assert_eq!(before, dice);
        assert_eq!(registry.snapshot(GROUP).unwrap().players[&1].dice, after);
        assert!(registry.reroll_dice(GROUP, 1, &[after[0]]).is_none());
        assert!(!registry.pass_turn(GROUP, 1));
    }

    #[test]
    fn test_finish_round_only_by_initiator() {
        let registry = registry();
        registry.start_round(GROUP, 1).unwrap();
        registry.roll_dice(GROUP, 2, "Bob").unwrap();

        assert!(!registry.finish_round(GROUP, 2));
        assert!(registry.contains(GROUP));
        assert!(registry.finish_round(GROUP, 1));
        assert!(!registry.contains(GROUP));
        assert!(registry.start_round(GROUP, 2).is_ok());
    }

    #[test]
    fn test_finalize_once() {
        let registry = registry();
        registry.start_round(GROUP, 1).unwrap();
        registry.roll_dice(GROUP, 1, "Ann").unwrap();
        registry.roll_dice(GROUP, 2, "Bob").unwrap();

        let finalized = registry.finalize(GROUP).unwrap();
        assert_eq!(finalized.results.len(), 2);
        assert!(finalized.winner.is_some());
        assert_eq!(finalized.auto_passed, vec!["Ann".to_string(), "Bob".to_string()]);
        assert_eq!(
            registry.finalize(GROUP).unwrap_err(),
            RoundError::AlreadyFinalized { group_id: GROUP }
        );
    }

    #[test]
    fn test_single_player_has_no_winner() {
        let registry = registry();
        registry.start_round(GROUP, 1).unwrap();
        registry.roll_dice(GROUP, 1, "Ann").unwrap();
        assert!(registry.pass_turn(GROUP, 1));
        assert!(!registry.check_complete(GROUP));
        assert!(registry.finalize_if_complete(GROUP).is_none());

        let finalized = registry.finalize(GROUP).unwrap();
        assert_eq!(finalized.results.len(), 1);
        assert_eq!(finalized.winner, None);
        assert!(finalized.auto_passed.is_empty());
    }

    #[test]
    fn test_finalize_if_complete() {
        let registry = registry();
        registry.start_round(GROUP, 1).unwrap();
        registry.roll_dice(GROUP, 1, "Ann").unwrap();
        registry.roll_dice(GROUP, 2, "Bob").unwrap();
        registry.pass_turn(GROUP, 1);
        assert!(registry.finalize_if_complete(GROUP).is_none());

        registry.pass_turn(GROUP, 2);
        assert!(registry.check_complete(GROUP));
        let finalized = registry.finalize_if_complete(GROUP).unwrap();
        assert!(finalized.auto_passed.is_empty());
        assert!(!registry.contains(GROUP));
    }

    #[test]
    fn test_expiry_scan_and_guarded_finalize() {
        let registry = registry();
        let start = Utc::now();
        let round_id = registry.start_round_at(GROUP, 1, start).unwrap();
        registry.start_round_at(-2002, 1, start + Duration::minutes(4)).unwrap();

        let now = start + Duration::minutes(6);
        assert_eq!(registry.expired_rounds(now), vec![(GROUP, round_id)]);

        // A stale round id must not remove a newer round of the same group.
        assert!(registry.finalize_if_expired(GROUP, Uuid::new_v4(), now).is_none());
        assert!(registry.finalize_if_expired(GROUP, round_id, start).is_none());
        assert!(registry.finalize_if_expired(GROUP, round_id, now).is_some());
        assert!(registry.finalize_if_expired(GROUP, round_id, now).is_none());
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_standings_carry_names() {
        let registry = registry();
        registry.start_round(GROUP, 1).unwrap();
        registry.roll_dice(GROUP, 1, "Ann").unwrap();
        registry.roll_dice(GROUP, 2, "Bob").unwrap();

        let finalized = registry.finalize(GROUP).unwrap();
        let standings = finalized.standings();
        assert_eq!(standings.len(), 2);
        assert_eq!(Some(standings[0].0), finalized.winner);
        assert_eq!(finalized.winner_name(), Some(standings[0].1.as_str()));
        for (_, _, result) in &standings {
            assert!(Combination::ALL.contains(&result.combination));
        }
    }
}
