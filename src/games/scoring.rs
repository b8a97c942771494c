//! Hand classification and result ranking.
//!
//! Pure functions over sorted hands. First match wins, strongest first:
//! five of a kind, four of a kind, full house, large straight, small
//! straight, three of a kind, two pair, pair, nothing.

use crate::games::types::{Combination, Dice, PlayerId, RoundResult};
use std::collections::HashMap;

const LARGE_STRAIGHT: Dice = [2, 3, 4, 5, 6];
const SMALL_STRAIGHT: Dice = [1, 2, 3, 4, 5];

/// Occurrences of each face, indexed by `face - 1`
fn face_counts(dice: &Dice) -> [u8; 6] {
    let mut counts = [0u8; 6];
    for &d in dice {
        if (1..=6).contains(&d) {
            counts[(d - 1) as usize] += 1;
        }
    }
    counts
}

/// Longest run of equal adjacent dice and the face of the first such run
fn longest_run(dice: &Dice) -> (usize, u8) {
    let mut best = (1, dice[0]);
    let mut run = 1;
    for pair in dice.windows(2) {
        if pair[0] == pair[1] {
            run += 1;
            if run > best.0 {
                best = (run, pair[1]);
            }
        } else {
            run = 1;
        }
    }
    best
}

fn hand_sum(dice: &Dice) -> u32 {
    dice.iter().map(|&d| u32::from(d)).sum()
}

/// Classify a sorted hand.
pub fn evaluate(dice: &Dice) -> RoundResult {
    let counts = face_counts(dice);
    let distinct = counts.iter().filter(|&&c| c > 0).count();
    let (run, face) = longest_run(dice);
    let face = u32::from(face);

    if run == 5 {
        return RoundResult::new(Combination::FiveOfAKind, face * 5);
    }
    if run == 4 {
        return RoundResult::new(Combination::FourOfAKind, face * 4);
    }
    if distinct == 2 && counts.iter().any(|&c| c > 1) {
        return RoundResult::new(Combination::FullHouse, hand_sum(dice));
    }
    if *dice == LARGE_STRAIGHT {
        return RoundResult::new(Combination::LargeStraight, hand_sum(dice));
    }
    if *dice == SMALL_STRAIGHT {
        return RoundResult::new(Combination::SmallStraight, hand_sum(dice));
    }
    if run == 3 {
        return RoundResult::new(Combination::ThreeOfAKind, face * 3);
    }

    let pairs: Vec<u32> = counts
        .iter()
        .enumerate()
        .filter(|&(_, &c)| c == 2)
        .map(|(i, _)| i as u32 + 1)
        .collect();
    if pairs.len() == 2 {
        // The two paired faces, not the four dice.
        return RoundResult::new(Combination::TwoPair, pairs.iter().sum());
    }
    if run == 2 {
        return RoundResult::new(Combination::Pair, face * 2);
    }

    RoundResult::new(Combination::Nothing, 0)
}

/// Score every hand of a round
pub fn score_hands<'a, I>(hands: I) -> HashMap<PlayerId, RoundResult>
where
    I: IntoIterator<Item = (PlayerId, &'a Dice)>,
{
    hands
        .into_iter()
        .map(|(player_id, dice)| (player_id, evaluate(dice)))
        .collect()
}

/// Results ordered strongest first.
///
/// Players tied on (priority, score) are ordered by id so the outcome does
/// not depend on map iteration order.
pub fn standings(results: &HashMap<PlayerId, RoundResult>) -> Vec<(PlayerId, RoundResult)> {
    let mut ordered: Vec<(PlayerId, RoundResult)> =
        results.iter().map(|(id, r)| (*id, *r)).collect();
    ordered.sort_by_key(|(id, _)| *id);
    ordered.sort_by(|a, b| a.1.ranking(&b.1));
    ordered
}

/// Winner of a round, if anyone played
pub fn winner(results: &HashMap<PlayerId, RoundResult>) -> Option<PlayerId> {
    standings(results).first().map(|(id, _)| *id)
}
