//! Error types for the poker dice engine
//!
//! Expected control flow (acting out of turn, rolling twice, unknown round)
//! is never an error here: those paths return empty values. The types below
//! cover the outcomes callers must tell apart plus the ambient failures of
//! configuration and repository collaborators.

use crate::games::types::{GroupId, PlayerId};

/// Root error type for all poker dice operations
#[derive(Debug, thiserror::Error)]
pub enum PokerDiceError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Round lifecycle outcomes
    #[error("Round error: {0}")]
    Round(#[from] RoundError),

    /// Player/result repository failures
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Outcomes of the round lifecycle that callers map to user-facing replies
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundError {
    #[error("Round already active in group {group_id}")]
    AlreadyActive { group_id: GroupId },

    #[error("Invalid group {group_id} or player {player_id}")]
    InvalidGroupOrPlayer { group_id: GroupId, player_id: PlayerId },

    /// Another caller already finalized (or finished) the round
    #[error("Round in group {group_id} already finalized")]
    AlreadyFinalized { group_id: GroupId },
}

/// Configuration and validation errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue { field: String, value: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Failures reported by the persistence collaborators
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    #[error("Player {player_id} not found")]
    NotFound { player_id: PlayerId },
}

// Convenience type alias for Results
pub type PokerDiceResult<T> = Result<T, PokerDiceError>;
