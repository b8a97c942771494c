//! Service layer wiring the round registry to its collaborators
//!
//! `PokerDiceService` is the context object handed to every command handler
//! and to the expiry sweeper. It owns no global state; build one per process
//! (or per test) through `ServiceBuilder`.

use crate::config::{ConfigLoader, PokerDiceConfig};
use crate::errors::{PokerDiceResult, RoundError};
use crate::games::command::parse_reroll_faces;
use crate::games::dice::DiceRoller;
use crate::games::registry::{FinalizedRound, RoundRegistry};
use crate::games::types::{Dice, GroupId, PlayerId};
use crate::repository::{
    InMemoryPlayerRepository, InMemoryResultRepository, PlayerProfile, PlayerRepository,
    ResultRepository,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// A successful reroll
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RerollOutcome {
    pub before: Dice,
    pub requested: Vec<u8>,
    pub after: Dice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub name: String,
    pub wins: usize,
}

/// Wins per player in a group over the configured window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Leaderboard {
    pub total_rounds: usize,
    /// Most wins first
    pub entries: Vec<LeaderboardEntry>,
}

/// Poker dice engine context
pub struct PokerDiceService {
    config: PokerDiceConfig,
    registry: Arc<RoundRegistry>,
    roller: Arc<DiceRoller>,
    players: Arc<dyn PlayerRepository>,
    results: Arc<dyn ResultRepository>,
}

impl PokerDiceService {
    pub fn new(
        config: PokerDiceConfig,
        roller: Arc<DiceRoller>,
        players: Arc<dyn PlayerRepository>,
        results: Arc<dyn ResultRepository>,
    ) -> Self {
        let registry = Arc::new(RoundRegistry::new(Arc::clone(&roller), config.round_duration()));
        Self {
            config,
            registry,
            roller,
            players,
            results,
        }
    }

    pub fn config(&self) -> &PokerDiceConfig {
        &self.config
    }

    pub fn registry(&self) -> Arc<RoundRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn roller(&self) -> Arc<DiceRoller> {
        Arc::clone(&self.roller)
    }

    pub fn players(&self) -> Arc<dyn PlayerRepository> {
        Arc::clone(&self.players)
    }

    pub fn results(&self) -> Arc<dyn ResultRepository> {
        Arc::clone(&self.results)
    }

    pub fn start_round(&self, group_id: GroupId, initiator_id: PlayerId) -> Result<Uuid, RoundError> {
        self.registry.start_round(group_id, initiator_id)
    }

    /// Join the group's round with a first roll.
    ///
    /// The player record is created, or its first name refreshed, only when
    /// the roll actually happened. The player is already in the round at that
    /// point, so a storage failure is logged and the dice are still returned.
    pub async fn roll_dice(&self, group_id: GroupId, player: &PlayerProfile) -> PokerDiceResult<Option<Dice>> {
        let Some(dice) = self
            .registry
            .roll_dice(group_id, player.id, player.display_name())
        else {
            return Ok(None);
        };

        if let Err(e) = self.sync_player(player).await {
            warn!("Failed to store player {} in group {}: {}", player.id, group_id, e);
        }

        Ok(Some(dice))
    }

    async fn sync_player(&self, player: &PlayerProfile) -> PokerDiceResult<()> {
        if self.players.exists(player.id).await? {
            if self.players.rename_if_changed(player.id, &player.first_name).await? {
                debug!("Player {} renamed to {}", player.id, player.first_name);
            }
        } else {
            self.players.upsert(player).await?;
            debug!("Registered player {} ({})", player.id, player.display_name());
        }
        Ok(())
    }

    /// Reroll from the raw `/reroll ...` message text
    pub fn reroll_dice(&self, group_id: GroupId, player_id: PlayerId, text: &str) -> Option<RerollOutcome> {
        let requested = parse_reroll_faces(text);
        let (before, after) = self.registry.reroll_dice(group_id, player_id, &requested)?;
        Some(RerollOutcome {
            before,
            requested,
            after,
        })
    }

    pub fn pass_turn(&self, group_id: GroupId, player_id: PlayerId) -> bool {
        self.registry.pass_turn(group_id, player_id)
    }

    pub fn finish_round(&self, group_id: GroupId, requester_id: PlayerId) -> bool {
        self.registry.finish_round(group_id, requester_id)
    }

    pub fn check_complete(&self, group_id: GroupId) -> bool {
        self.registry.check_complete(group_id)
    }

    /// Score and remove the round, then record its winner
    pub async fn finalize(&self, group_id: GroupId) -> Result<FinalizedRound, RoundError> {
        let round = self.registry.finalize(group_id)?;
        self.record_outcome(&round, Utc::now()).await;
        Ok(round)
    }

    /// Finalize the round if every player has acted. Called after each
    /// reroll or pass.
    pub async fn complete_if_ready(&self, group_id: GroupId) -> Option<FinalizedRound> {
        let round = self.registry.finalize_if_complete(group_id)?;
        self.record_outcome(&round, Utc::now()).await;
        Some(round)
    }

    /// Finalize `round_id` if it is still the group's round and past its deadline
    pub async fn finalize_expired(
        &self,
        group_id: GroupId,
        round_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<FinalizedRound> {
        let round = self.registry.finalize_if_expired(group_id, round_id, now)?;
        self.record_outcome(&round, now).await;
        Some(round)
    }

    /// Persist the winner of a multi-player round.
    ///
    /// The round has already left the registry, so a storage failure only
    /// loses the statistics entry.
    async fn record_outcome(&self, round: &FinalizedRound, at: DateTime<Utc>) {
        let Some(winner_id) = round.winner else {
            return;
        };
        if let Err(e) = self.results.record(round.group_id, winner_id, at).await {
            warn!(
                "Failed to record winner {} of round {} in group {}: {}",
                winner_id, round.round_id, round.group_id, e
            );
        }
    }

    /// Wins per player over the last `leaderboard.window_days`
    pub async fn leaderboard(&self, group_id: GroupId, now: DateTime<Utc>) -> PokerDiceResult<Leaderboard> {
        let start = now - self.config.leaderboard_window();
        let records = self.results.find_between(group_id, start, now).await?;

        let mut names: HashMap<PlayerId, String> = HashMap::new();
        let mut wins: HashMap<String, usize> = HashMap::new();
        for record in &records {
            if !names.contains_key(&record.winner_id) {
                let name = self
                    .players
                    .display_name(record.winner_id)
                    .await?
                    .unwrap_or_else(|| record.winner_id.to_string());
                names.insert(record.winner_id, name);
            }
            if let Some(name) = names.get(&record.winner_id) {
                *wins.entry(name.clone()).or_insert(0) += 1;
            }
        }

        let mut entries: Vec<LeaderboardEntry> = wins
            .into_iter()
            .map(|(name, wins)| LeaderboardEntry { name, wins })
            .collect();
        entries.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.name.cmp(&b.name)));

        Ok(Leaderboard {
            total_rounds: records.len(),
            entries,
        })
    }
}

/// Builder for `PokerDiceService`
pub struct ServiceBuilder {
    config_path: Option<String>,
    config: Option<PokerDiceConfig>,
    roller: Option<Arc<DiceRoller>>,
    players: Option<Arc<dyn PlayerRepository>>,
    results: Option<Arc<dyn ResultRepository>>,
}

impl ServiceBuilder {
    pub fn new() -> Self {
        Self {
            config_path: None,
            config: None,
            roller: None,
            players: None,
            results: None,
        }
    }

    /// Load configuration from this file instead of the defaults
    pub fn with_config_path(mut self, path: String) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn with_config(mut self, config: PokerDiceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Override the dice roller (seeded rollers make tests repeatable)
    pub fn with_roller(mut self, roller: Arc<DiceRoller>) -> Self {
        self.roller = Some(roller);
        self
    }

    pub fn with_players(mut self, players: Arc<dyn PlayerRepository>) -> Self {
        self.players = Some(players);
        self
    }

    pub fn with_results(mut self, results: Arc<dyn ResultRepository>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn build(self) -> PokerDiceResult<PokerDiceService> {
        let config = match (self.config, self.config_path) {
            (Some(config), _) => {
                config.validate()?;
                config
            }
            (None, Some(path)) => ConfigLoader::new().with_path(path).load()?,
            (None, None) => ConfigLoader::new().load()?,
        };

        let roller = self.roller.unwrap_or_else(|| Arc::new(DiceRoller::new()));
        let players = self
            .players
            .unwrap_or_else(|| Arc::new(InMemoryPlayerRepository::new()));
        let results = self
            .results
            .unwrap_or_else(|| Arc::new(InMemoryResultRepository::new()));

        Ok(PokerDiceService::new(config, roller, players, results))
    }
}

impl Default for ServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
