//! Global configuration parsing and validation.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Delivery timing configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DeliveryConfig {
    /// How late a due schedule may be requested before it is ignored.
    #[serde(default = "default_expiration_threshold")]
    pub expiration_threshold_seconds: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            expiration_threshold_seconds: default_expiration_threshold(),
        }
    }
}

/// Delay timer configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DelayConfig {
    /// Bound of the channel carrying fired delays back into scheduling.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Message action configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ActionConfig {
    /// Suppression window written when the user hides a message.
    #[serde(default = "default_hidden_duration")]
    pub hidden_duration_seconds: u64,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            hidden_duration_seconds: default_hidden_duration(),
        }
    }
}

/// Impression history configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ImpressionConfig {
    /// Most recent impressions kept per message.
    #[serde(default = "default_max_records")]
    pub max_records_per_message: usize,
    /// Impressions per device after which a message stops being eligible.
    #[serde(default)]
    pub frequency_cap: Option<usize>,
}

impl Default for ImpressionConfig {
    fn default() -> Self {
        Self {
            max_records_per_message: default_max_records(),
            frequency_cap: None,
        }
    }
}

fn default_expiration_threshold() -> u64 {
    60
}

fn default_channel_capacity() -> usize {
    64
}

fn default_hidden_duration() -> u64 {
    86_400
}

fn default_max_records() -> usize {
    100
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// JSON workspace snapshot loaded by the replay runner.
    #[serde(default)]
    pub workspace_path: Option<PathBuf>,
    /// Delivery timing settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Delay timer settings.
    #[serde(default)]
    pub delay: DelayConfig,
    /// Message action settings.
    #[serde(default)]
    pub action: ActionConfig,
    /// Impression history settings.
    #[serde(default)]
    pub impression: ImpressionConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Grace period after a schedule's deliver time.
    #[must_use]
    pub fn expiration_threshold(&self) -> Duration {
        Duration::from_secs(self.delivery.expiration_threshold_seconds)
    }

    /// Suppression window applied by the hidden action.
    #[must_use]
    pub fn hidden_duration(&self) -> Duration {
        Duration::from_secs(self.action.hidden_duration_seconds)
    }

    fn validate(&self) -> Result<()> {
        if self.delay.channel_capacity == 0 {
            return Err(AppError::Config(
                "delay.channel_capacity must be greater than zero".into(),
            ));
        }

        if self.impression.max_records_per_message == 0 {
            return Err(AppError::Config(
                "impression.max_records_per_message must be greater than zero".into(),
            ));
        }

        match self.impression.frequency_cap {
            Some(0) => {
                return Err(AppError::Config(
                    "impression.frequency_cap must be greater than zero".into(),
                ));
            }
            Some(cap) if cap > self.impression.max_records_per_message => {
                return Err(AppError::Config(format!(
                    "impression.frequency_cap {cap} exceeds max_records_per_message {}",
                    self.impression.max_records_per_message
                )));
            }
            _ => {}
        }

        Ok(())
    }
}
