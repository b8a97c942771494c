pub mod command;
pub mod dice;
pub mod registry;
pub mod round;
pub mod scoring;
pub mod types;

pub use command::{parse_reroll_faces, Command};
pub use dice::DiceRoller;
pub use registry::{FinalizedRound, RoundRegistry};
pub use round::{PlayerTurn, Round, RoundStatus, TurnStage};
pub use types::*;
