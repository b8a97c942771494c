use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Chat group identifier (negative for supergroups on most platforms)
pub type GroupId = i64;

/// Chat user identifier
pub type PlayerId = i64;

/// Sentinel for "platform did not tell us who this is"
pub const UNKNOWN_ID: i64 = 0;

/// Number of dice in a hand
pub const DICE_COUNT: usize = 5;

/// A hand of five dice, each in 1..=6, kept sorted ascending
pub type Dice = [u8; DICE_COUNT];

/// Ranked dice combinations, strongest first
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Combination {
    FiveOfAKind,
    FourOfAKind,
    FullHouse,
    LargeStraight,
    SmallStraight,
    ThreeOfAKind,
    TwoPair,
    Pair,
    Nothing,
}

impl Combination {
    /// Every combination, highest priority first
    pub const ALL: [Combination; 9] = [
        Combination::FiveOfAKind,
        Combination::FourOfAKind,
        Combination::FullHouse,
        Combination::LargeStraight,
        Combination::SmallStraight,
        Combination::ThreeOfAKind,
        Combination::TwoPair,
        Combination::Pair,
        Combination::Nothing,
    ];

    /// Fixed rank used as the primary sort key (9 = best, 1 = nothing)
    pub fn priority(&self) -> u8 {
        match self {
            Combination::FiveOfAKind => 9,
            Combination::FourOfAKind => 8,
            Combination::FullHouse => 7,
            Combination::LargeStraight => 6,
            Combination::SmallStraight => 5,
            Combination::ThreeOfAKind => 4,
            Combination::TwoPair => 3,
            Combination::Pair => 2,
            Combination::Nothing => 1,
        }
    }

    /// Human-readable name
    pub fn description(&self) -> &'static str {
        match self {
            Combination::FiveOfAKind => "Five of a kind",
            Combination::FourOfAKind => "Four of a kind",
            Combination::FullHouse => "Full house",
            Combination::LargeStraight => "Large straight",
            Combination::SmallStraight => "Small straight",
            Combination::ThreeOfAKind => "Three of a kind",
            Combination::TwoPair => "Two pair",
            Combination::Pair => "Pair",
            Combination::Nothing => "Nothing",
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Outcome of scoring one player's hand
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoundResult {
    pub score: u32,
    pub combination: Combination,
    pub priority: u8,
}

impl RoundResult {
    pub fn new(combination: Combination, score: u32) -> Self {
        Self {
            score,
            combination,
            priority: combination.priority(),
        }
    }

    /// Ranking order where the stronger result sorts first.
    ///
    /// Higher priority wins, then higher score. Equal pairs compare `Equal`,
    /// so a stable sort keeps their incoming order.
    pub fn ranking(&self, other: &RoundResult) -> Ordering {
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.score.cmp(&self.score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priorities_are_strictly_descending() {
        let priorities: Vec<u8> = Combination::ALL.iter().map(|c| c.priority()).collect();
        assert_eq!(priorities, vec![9, 8, 7, 6, 5, 4, 3, 2, 1]);
    }

    #[test]
    fn test_ranking_prefers_priority_over_score() {
        let pair_of_sixes = RoundResult::new(Combination::Pair, 12);
        let two_pair_low = RoundResult::new(Combination::TwoPair, 3);

        assert_eq!(two_pair_low.ranking(&pair_of_sixes), Ordering::Less);
        assert_eq!(pair_of_sixes.ranking(&two_pair_low), Ordering::Greater);
    }

    #[test]
    fn test_ranking_breaks_ties_by_score() {
        let low = RoundResult::new(Combination::ThreeOfAKind, 6);
        let high = RoundResult::new(Combination::ThreeOfAKind, 15);

        assert_eq!(high.ranking(&low), Ordering::Less);
        assert_eq!(low.ranking(&low), Ordering::Equal);
    }

    #[test]
    fn test_combination_serde_names() {
        let json = serde_json::to_string(&Combination::FullHouse).unwrap();
        assert_eq!(json, "\"full_house\"");
        assert_eq!(Combination::FullHouse.to_string(), "Full house");
    }
}
