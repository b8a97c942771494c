//! Dice roller backed by a shared, cryptographically strong generator.

use crate::games::types::{Dice, DICE_COUNT};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Produces five-die rolls and selective rerolls.
///
/// `StdRng` is ChaCha-based; the default constructor seeds it from the OS.
/// The generator sits behind a mutex so one roller can serve every group.
pub struct DiceRoller {
    rng: Mutex<StdRng>,
}

impl DiceRoller {
    /// Roller seeded from operating system entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic roller for tests and simulations
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn roll_die(&self) -> u8 {
        // A panic while holding the lock cannot leave the generator half-updated.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen_range(1..=6)
    }

    /// Five independent uniform draws from 1..=6, sorted ascending
    pub fn roll_five(&self) -> Dice {
        let mut dice = [0u8; DICE_COUNT];
        for die in dice.iter_mut() {
            *die = self.roll_die();
        }
        dice.sort_unstable();
        dice
    }

    /// Replace the dice showing the requested faces.
    ///
    /// Requests are handled in ascending order. Each one takes the first die
    /// with that face to the right of the previous replacement; a request
    /// with no such die is skipped. The result is re-sorted.
    pub fn reroll(&self, current: &Dice, requested: &[u8]) -> Dice {
        let mut requested = requested.to_vec();
        requested.sort_unstable();

        let mut dice = *current;
        let mut cursor = 0;
        for face in requested {
            if let Some(offset) = dice[cursor..].iter().position(|&d| d == face) {
                let index = cursor + offset;
                dice[index] = self.roll_die();
                cursor = index + 1;
            }
        }

        dice.sort_unstable();
        dice
    }
}

impl Default for DiceRoller {
    fn default() -> Self {
        Self::new()
    }
}
