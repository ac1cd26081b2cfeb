//! Serializable simulation configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for a single simulation run.
///
/// Captures everything needed to reproduce the run: the session's clock
/// parameters, the trading window, and the securities with their bar
/// files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimConfig {
    pub session: SessionConfig,
    pub securities: Vec<SecurityConfig>,
}

/// Clock and trading-window parameters shared by the whole session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionConfig {
    /// Short periodic-timer period, seconds.
    pub short_period_secs: i64,
    /// Long periodic-timer period, seconds.
    pub long_period_secs: i64,
    /// Market open, seconds past the trading day's reference time.
    pub open_offset_secs: i64,
    /// Market close, seconds past the trading day's reference time.
    pub close_offset_secs: i64,
    /// Optional pre-roll point: sources skip everything at or before this
    /// instant before the run starts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seek_to: Option<DateTime<Utc>>,
}

/// One security and where its bars come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityConfig {
    pub id: u32,
    pub bars: PathBuf,
}

impl SimConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session.short_period_secs <= 0 || self.session.long_period_secs <= 0 {
            return Err(ConfigError::Invalid("periodic timer periods must be positive".into()));
        }
        if self.session.open_offset_secs >= self.session.close_offset_secs {
            return Err(ConfigError::Invalid(format!(
                "open offset {} is not before close offset {}",
                self.session.open_offset_secs, self.session.close_offset_secs
            )));
        }
        if self.securities.is_empty() {
            return Err(ConfigError::Invalid("at least one security is required".into()));
        }
        let mut seen = BTreeSet::new();
        for security in &self.securities {
            if !seen.insert(security.id) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate security id {}",
                    security.id
                )));
            }
        }
        Ok(())
    }
}
