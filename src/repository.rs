//! Player and result persistence seams
//!
//! The engine only talks to storage through these traits. The in-memory
//! implementations back the tests and the simulator binary.

use crate::errors::{PokerDiceResult, RepositoryError};
use crate::games::types::{GroupId, PlayerId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Identity of a chat user as reported by the platform
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerProfile {
    pub id: PlayerId,
    pub username: String,
    pub first_name: String,
    pub last_name: Option<String>,
}

impl PlayerProfile {
    pub fn new(id: PlayerId, username: &str, first_name: &str) -> Self {
        Self {
            id,
            username: username.to_string(),
            first_name: first_name.to_string(),
            last_name: None,
        }
    }

    /// First name, or the username when the first name is blank
    pub fn display_name(&self) -> &str {
        if self.first_name.trim().is_empty() {
            &self.username
        } else {
            &self.first_name
        }
    }
}

/// A won round, as stored for statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameRecord {
    pub group_id: GroupId,
    pub winner_id: PlayerId,
    pub played_at: DateTime<Utc>,
}

/// Player storage interface
#[async_trait]
pub trait PlayerRepository: Send + Sync {
    async fn exists(&self, player_id: PlayerId) -> PokerDiceResult<bool>;

    /// Insert or replace a player
    async fn upsert(&self, player: &PlayerProfile) -> PokerDiceResult<()>;

    /// Update the stored first name if it differs. Returns whether it changed.
    async fn rename_if_changed(&self, player_id: PlayerId, first_name: &str) -> PokerDiceResult<bool>;

    async fn display_name(&self, player_id: PlayerId) -> PokerDiceResult<Option<String>>;
}

/// Round result storage interface
#[async_trait]
pub trait ResultRepository: Send + Sync {
    async fn record(&self, group_id: GroupId, winner_id: PlayerId, at: DateTime<Utc>) -> PokerDiceResult<()>;

    /// Records of a group played within `[start, end]`
    async fn find_between(
        &self,
        group_id: GroupId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PokerDiceResult<Vec<GameRecord>>;
}

/// In-memory player store
#[derive(Default)]
pub struct InMemoryPlayerRepository {
    players: DashMap<PlayerId, PlayerProfile>,
}

impl InMemoryPlayerRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, player_id: PlayerId) -> Option<PlayerProfile> {
        self.players.get(&player_id).map(|p| p.clone())
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

#[async_trait]
impl PlayerRepository for InMemoryPlayerRepository {
    async fn exists(&self, player_id: PlayerId) -> PokerDiceResult<bool> {
        Ok(self.players.contains_key(&player_id))
    }

    async fn upsert(&self, player: &PlayerProfile) -> PokerDiceResult<()> {
        self.players.insert(player.id, player.clone());
        Ok(())
    }

    async fn rename_if_changed(&self, player_id: PlayerId, first_name: &str) -> PokerDiceResult<bool> {
        let mut player = self
            .players
            .get_mut(&player_id)
            .ok_or(RepositoryError::NotFound { player_id })?;
        if player.first_name == first_name {
            return Ok(false);
        }
        player.first_name = first_name.to_string();
        Ok(true)
    }

    async fn display_name(&self, player_id: PlayerId) -> PokerDiceResult<Option<String>> {
        Ok(self
            .players
            .get(&player_id)
            .map(|p| p.display_name().to_string()))
    }
}

/// In-memory result store, one list per group
#[derive(Default)]
pub struct InMemoryResultRepository {
    records: DashMap<GroupId, Vec<GameRecord>>,
}

impl InMemoryResultRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records across every group
    pub fn total(&self) -> usize {
        self.records.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl ResultRepository for InMemoryResultRepository {
    async fn record(&self, group_id: GroupId, winner_id: PlayerId, at: DateTime<Utc>) -> PokerDiceResult<()> {
        self.records.entry(group_id).or_default().push(GameRecord {
            group_id,
            winner_id,
            played_at: at,
        });
        Ok(())
    }

    async fn find_between(
        &self,
        group_id: GroupId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PokerDiceResult<Vec<GameRecord>> {
        Ok(self
            .records
            .get(&group_id)
            .map(|records| {
                records
                    .iter()
                    .filter(|r| r.played_at >= start && r.played_at <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
