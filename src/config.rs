//! Configuration management with validation and defaults
//!
//! Values come from built-in defaults, an optional TOML file and
//! `POKERDICE_*` environment variables, in that order.

use crate::errors::{ConfigurationError, PokerDiceResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PokerDiceConfig {
    #[serde(default)]
    pub round: RoundConfig,
    #[serde(default)]
    pub sweeper: SweeperConfig,
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

/// Longest accepted round (one day)
pub const MAX_ROUND_DURATION_SECS: u64 = 86_400;
/// Longest accepted leaderboard window (ten years)
pub const MAX_LEADERBOARD_DAYS: i64 = 3_650;

/// Round rules
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundConfig {
    /// A round older than this is closed by the sweeper
    pub duration_secs: u64,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self { duration_secs: 300 }
    }
}

/// Expiry sweep scheduling
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweeperConfig {
    pub interval_secs: u64,
    pub initial_delay_secs: u64,
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval_secs: 15,
            initial_delay_secs: 10,
            enabled: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardConfig {
    /// How far back the statistics command looks
    pub window_days: i64,
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self { window_days: 7 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    fn parse(value: &str) -> Option<LogLevel> {
        match value.trim().to_ascii_lowercase().as_str() {
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
        }
    }
}

impl PokerDiceConfig {
    /// Short timings for tests and local simulations
    pub fn testing() -> Self {
        Self {
            round: RoundConfig { duration_secs: 2 },
            sweeper: SweeperConfig {
                interval_secs: 1,
                initial_delay_secs: 0,
                enabled: true,
            },
            monitoring: MonitoringConfig {
                log_level: LogLevel::Debug,
            },
            ..Default::default()
        }
    }

    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.round.duration_secs == 0 {
            return Err(invalid("round.duration_secs", "0", "Round duration must be > 0"));
        }
        if self.round.duration_secs > MAX_ROUND_DURATION_SECS {
            return Err(invalid(
                "round.duration_secs",
                &self.round.duration_secs.to_string(),
                "Round duration must not exceed one day",
            ));
        }
        if self.sweeper.interval_secs == 0 {
            return Err(invalid("sweeper.interval_secs", "0", "Sweep interval must be > 0"));
        }
        if self.leaderboard.window_days < 1 {
            return Err(invalid(
                "leaderboard.window_days",
                &self.leaderboard.window_days.to_string(),
                "Leaderboard window must be at least one day",
            ));
        }
        if self.leaderboard.window_days > MAX_LEADERBOARD_DAYS {
            return Err(invalid(
                "leaderboard.window_days",
                &self.leaderboard.window_days.to_string(),
                "Leaderboard window must not exceed ten years",
            ));
        }
        Ok(())
    }

    pub fn round_duration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.round.duration_secs as i64)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweeper.interval_secs)
    }

    pub fn sweep_initial_delay(&self) -> Duration {
        Duration::from_secs(self.sweeper.initial_delay_secs)
    }

    pub fn leaderboard_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.leaderboard.window_days)
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_var<T: std::str::FromStr>(field: &str, value: String, reason: &str) -> Result<T, ConfigurationError> {
    value.trim().parse().map_err(|_| invalid(field, &value, reason))
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> PokerDiceResult<PokerDiceConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => PokerDiceConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> PokerDiceResult<PokerDiceConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into())
    }

    fn apply_env_overrides(&self, config: &mut PokerDiceConfig) -> Result<(), ConfigurationError> {
        apply_overrides(config, |key| env::var(key).ok())
    }

    /// Save configuration to file
    pub fn save(&self, config: &PokerDiceConfig, path: &str) -> PokerDiceResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into())
    }
}

/// Apply `POKERDICE_*` overrides read through `lookup`
fn apply_overrides<F>(config: &mut PokerDiceConfig, lookup: F) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("POKERDICE_ROUND_DURATION_SECS") {
        config.round.duration_secs =
            parse_var("POKERDICE_ROUND_DURATION_SECS", value, "Invalid number of seconds")?;
    }
    if let Some(value) = lookup("POKERDICE_SWEEP_INTERVAL_SECS") {
        config.sweeper.interval_secs =
            parse_var("POKERDICE_SWEEP_INTERVAL_SECS", value, "Invalid number of seconds")?;
    }
    if let Some(value) = lookup("POKERDICE_LEADERBOARD_DAYS") {
        config.leaderboard.window_days =
            parse_var("POKERDICE_LEADERBOARD_DAYS", value, "Invalid number of days")?;
    }
    if let Some(value) = lookup("POKERDICE_LOG_LEVEL") {
        config.monitoring.log_level = LogLevel::parse(&value)
            .ok_or_else(|| invalid("POKERDICE_LOG_LEVEL", &value, "Unknown log level"))?;
    }
    Ok(())
}

/// Write the default configuration to `path`
pub fn generate_sample_config(path: &str) -> PokerDiceResult<()> {
    ConfigLoader::new().save(&PokerDiceConfig::default(), path)
}
