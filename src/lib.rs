//! Pokerdice - round engine for a chat-group dice game
//!
//! Each chat group runs at most one round at a time. Players join by rolling
//! five dice, may then reroll some of them or pass once, and the round
//! resolves into a ranking of poker-style combinations. Abandoned rounds are
//! closed by a background expiry sweep.

pub mod config;
pub mod errors;
pub mod games;
pub mod repository;
pub mod services;
pub mod sweeper;

pub use config::{ConfigLoader, PokerDiceConfig};
pub use errors::{PokerDiceError, PokerDiceResult, RoundError};
pub use games::{
    Combination, Command, Dice, DiceRoller, FinalizedRound, GroupId, PlayerId, RoundRegistry,
    RoundResult,
};
pub use repository::{
    InMemoryPlayerRepository, InMemoryResultRepository, PlayerProfile, PlayerRepository,
    ResultRepository,
};
pub use services::{PokerDiceService, ServiceBuilder};
pub use sweeper::{ExpirySweeper, SweepReport};
