//! Session configuration loaded from TOML.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use colony_defence_rendering::LayoutConfig;
use colony_defence_system_animation::DEFAULT_FRAME_INTERVAL;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

/// Errors raised while loading a session configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read configuration at {}", path.display())]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid TOML or does not match the schema.
    #[error("failed to parse configuration")]
    Parse(#[from] toml::de::Error),
    /// A value parsed but cannot be used.
    #[error("invalid configuration value `{field}`: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
}

/// Timing of the interaction loop and of its turn-end effects. Durations are
/// written in seconds.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Wall-clock window the player gets every turn.
    #[serde(deserialize_with = "seconds")]
    pub turn_budget: Duration,
    /// Time between two animation frames.
    #[serde(deserialize_with = "seconds")]
    pub frame_interval: Duration,
    /// Time an expired insect stays visible on its way to the crypt.
    #[serde(deserialize_with = "seconds")]
    pub retire_grace: Duration,
    /// Flight time of a thrown leaf.
    #[serde(deserialize_with = "seconds")]
    pub leaf_duration: Duration,
    /// Flight time of a ninja dart.
    #[serde(deserialize_with = "seconds")]
    pub dart_duration: Duration,
    /// Length of a leaf.
    pub leaf_length: f32,
    /// Length of a dart's spikes.
    pub dart_length: f32,
    /// Seed used to scatter bees inside the hive.
    pub jitter_seed: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            turn_budget: Duration::from_secs(3),
            frame_interval: DEFAULT_FRAME_INTERVAL,
            retire_grace: Duration::from_secs(3),
            leaf_duration: Duration::from_millis(300),
            dart_duration: Duration::from_millis(500),
            leaf_length: 40.0,
            dart_length: 40.0,
            jitter_seed: 0,
        }
    }
}

impl LoopConfig {
    /// Rejects values the loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.turn_budget.is_zero() {
            return Err(ConfigError::Invalid {
                field: "turn_budget",
                reason: "must be positive",
            });
        }
        if self.frame_interval.is_zero() {
            return Err(ConfigError::Invalid {
                field: "frame_interval",
                reason: "must be positive",
            });
        }
        for (field, length) in [
            ("leaf_length", self.leaf_length),
            ("dart_length", self.dart_length),
        ] {
            if !length.is_finite() || length <= 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be a positive number",
                });
            }
        }
        Ok(())
    }
}

fn seconds<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Duration::try_from_secs_f64(value).map_err(serde::de::Error::custom)
}

/// Everything a session reads from its configuration file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Play-area geometry and assets.
    pub layout: LayoutConfig,
    /// Loop timing.
    #[serde(rename = "loop")]
    pub interaction: LoopConfig,
}

impl SessionConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.interaction.validate()?;
        Ok(config)
    }

    /// Reads a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }
}
