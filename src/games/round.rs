//! Per-group round state and its transitions.
//!
//! A `Round` is only ever mutated through `&mut self` while the registry
//! holds the entry lock for its group, so every method here runs serialized
//! with respect to the other operations on the same group.

use crate::games::scoring;
use crate::games::types::{Dice, GroupId, PlayerId, RoundResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

/// Pending units booked when a player joins; the roll takes one of them
pub const NEW_PLAYER_ACTIONS: i32 = 2;

/// Where a player is within the current round
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TurnStage {
    NotJoined,
    Rolled,
    Rerolled,
    Passed,
    Resolved,
}

/// Lifecycle of the round itself
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Open,
    Resolved,
}

/// A player's state inside one round
#[derive(Debug, Clone, Serialize)]
pub struct PlayerTurn {
    pub display_name: String,
    pub stage: TurnStage,
    pub dice: Dice,
    /// Set when the round resolves
    pub score: u32,
}

impl PlayerTurn {
    fn rolled(display_name: String, dice: Dice) -> Self {
        Self {
            display_name,
            stage: TurnStage::Rolled,
            dice,
            score: 0,
        }
    }

    /// Reroll and pass share one slot: using either closes the other.
    pub fn can_reroll_or_pass(&self) -> bool {
        self.stage == TurnStage::Rolled
    }
}

/// One game of poker dice in a chat group
#[derive(Debug, Clone, Serialize)]
pub struct Round {
    pub group_id: GroupId,
    /// Distinguishes successive rounds of the same group
    pub round_id: Uuid,
    pub initiator_id: PlayerId,
    pub started_at: DateTime<Utc>,
    pub status: RoundStatus,
    pub players: HashMap<PlayerId, PlayerTurn>,
    /// Outstanding reroll-or-pass decisions across joined players
    pub pending_actions: i32,
}

impl Round {
    pub fn new(group_id: GroupId, initiator_id: PlayerId, started_at: DateTime<Utc>) -> Self {
        Self {
            group_id,
            round_id: Uuid::new_v4(),
            initiator_id,
            started_at,
            status: RoundStatus::Open,
            players: HashMap::new(),
            pending_actions: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == RoundStatus::Open
    }

    pub fn stage_of(&self, player_id: PlayerId) -> TurnStage {
        self.players
            .get(&player_id)
            .map(|turn| turn.stage)
            .unwrap_or(TurnStage::NotJoined)
    }

    /// Add a player with their first roll.
    ///
    /// Joining books `NEW_PLAYER_ACTIONS` pending units and the roll itself
    /// consumes one of them. `roll` is only called when the join happens.
    pub fn join<F>(&mut self, player_id: PlayerId, display_name: &str, roll: F) -> Option<Dice>
    where
        F: FnOnce() -> Dice,
    {
        if !self.is_open() || self.players.contains_key(&player_id) {
            return None;
        }

        self.pending_actions += NEW_PLAYER_ACTIONS;
        let dice = roll();
        self.players
            .insert(player_id, PlayerTurn::rolled(display_name.to_string(), dice));
        self.pending_actions -= 1;
        Some(dice)
    }

    fn eligible_turn(&mut self, player_id: PlayerId) -> Option<&mut PlayerTurn> {
        if !self.is_open() {
            return None;
        }
        self.players
            .get_mut(&player_id)
            .filter(|turn| turn.can_reroll_or_pass())
    }

    /// Replace dice through `reroll`; returns the hand before and after
    pub fn reroll<F>(&mut self, player_id: PlayerId, reroll: F) -> Option<(Dice, Dice)>
    where
        F: FnOnce(&Dice) -> Dice,
    {
        let turn = self.eligible_turn(player_id)?;
        let before = turn.dice;
        turn.dice = reroll(&before);
        turn.stage = TurnStage::Rerolled;
        let after = turn.dice;
        self.pending_actions -= 1;
        Some((before, after))
    }

    pub fn pass(&mut self, player_id: PlayerId) -> bool {
        match self.eligible_turn(player_id) {
            Some(turn) => {
                turn.stage = TurnStage::Passed;
                self.pending_actions -= 1;
                true
            }
            None => false,
        }
    }

    /// Everyone has acted and there is someone to beat
    pub fn is_complete(&self) -> bool {
        self.pending_actions == 0 && self.players.len() > 1
    }

    pub fn is_expired(&self, now: DateTime<Utc>, limit: Duration) -> bool {
        self.started_at + limit < now
    }

    /// Players still holding their reroll-or-pass decision, ordered by id
    pub fn mid_turn_players(&self) -> Vec<String> {
        let mut waiting: Vec<(PlayerId, &PlayerTurn)> = self
            .players
            .iter()
            .filter(|(_, turn)| turn.can_reroll_or_pass())
            .map(|(id, turn)| (*id, turn))
            .collect();
        waiting.sort_by_key(|(id, _)| *id);
        waiting
            .into_iter()
            .map(|(_, turn)| turn.display_name.clone())
            .collect()
    }

    /// Score every hand and move the round to its terminal state
    pub fn resolve(&mut self) -> HashMap<PlayerId, RoundResult> {
        let results =
            scoring::score_hands(self.players.iter().map(|(id, turn)| (*id, &turn.dice)));
        for (id, turn) in self.players.iter_mut() {
            turn.stage = TurnStage::Resolved;
            if let Some(result) = results.get(id) {
                turn.score = result.score;
            }
        }
        self.status = RoundStatus::Resolved;
        results
    }
}
