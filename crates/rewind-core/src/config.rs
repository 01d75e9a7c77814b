//! Configuration loading and typed config structures for Rewind.
//!
//! The canonical configuration lives in a YAML file (by convention
//! `rewind.yaml`). This module defines strongly-typed structs that mirror the
//! YAML structure and a loader that reads the file. Semantic validation of
//! the checkpoint section happens when the controller is constructed.
//!
//! ```yaml
//! checkpoint:
//!   base_interval: 100
//!   decay_factor: 0.9
//!   max_levels: 5
//! storage:
//!   layers:
//!     - threshold: 10000
//!       backend: { kind: memory }
//!     - threshold: 18446744073709551615
//!       backend: { kind: disk, path: checkpoints }
//! codec:
//!   compression: zstd
//! ```

use std::path::Path;

use rewind_codec::CodecConfig;
use rewind_storage::StorageConfig;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
///
/// All fields have defaults, so an empty document is a valid configuration
/// (memory-only storage, zstd codec, default scheduling).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RewindConfig {
    /// Checkpoint scheduling and adaptation parameters.
    #[serde(default)]
    pub checkpoint: CheckpointConfig,

    /// Storage tiers.
    #[serde(default)]
    pub storage: StorageConfig,

    /// State codec settings.
    #[serde(default)]
    pub codec: CodecConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Simulation harness parameters.
    #[serde(default)]
    pub harness: HarnessConfig,
}

impl RewindConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override backend locations (see
    /// [`StorageConfig::apply_env_overrides`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.storage.apply_env_overrides();
        Ok(config)
    }
}

/// Checkpoint scheduling and adaptation parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CheckpointConfig {
    /// Base checkpoint interval in events.
    #[serde(default = "default_base_interval")]
    pub base_interval: u64,

    /// Multiplier applied to the mean rollback depth, in (0, 1].
    #[serde(default = "default_decay_factor")]
    pub decay_factor: f64,

    /// Number of exponentially spaced levels.
    #[serde(default = "default_max_levels")]
    pub max_levels: u32,

    /// Capacity of the rollback-depth history.
    #[serde(default = "default_adaptation_window")]
    pub adaptation_window: usize,

    /// Events between level refreshes. Defaults to
    /// `adaptation_trigger_multiplier * base_interval` when unset.
    #[serde(default)]
    pub adaptation_trigger: Option<u64>,

    /// Multiplier used to derive the adaptation trigger.
    #[serde(default = "default_adaptation_trigger_multiplier")]
    pub adaptation_trigger_multiplier: u64,

    /// Retention window, as a multiple of the largest current level.
    #[serde(default = "default_retention_multiplier")]
    pub retention_multiplier: u64,
}

impl CheckpointConfig {
    /// Default parameters with a different base interval.
    pub fn with_base_interval(base_interval: u64) -> Self {
        Self {
            base_interval,
            ..Self::default()
        }
    }

    /// The adaptation trigger actually in force.
    pub fn effective_adaptation_trigger(&self) -> u64 {
        self.adaptation_trigger.unwrap_or_else(|| {
            self.base_interval
                .saturating_mul(self.adaptation_trigger_multiplier)
        })
    }

    /// Check that every parameter is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };
        if self.base_interval == 0 {
            return invalid("checkpoint.base_interval must be at least 1");
        }
        if !(self.decay_factor > 0.0 && self.decay_factor <= 1.0) {
            return invalid("checkpoint.decay_factor must be in (0, 1]");
        }
        if self.max_levels == 0 {
            return invalid("checkpoint.max_levels must be at least 1");
        }
        if self.adaptation_window == 0 {
            return invalid("checkpoint.adaptation_window must be at least 1");
        }
        if self.effective_adaptation_trigger() == 0 {
            return invalid("checkpoint.adaptation_trigger must be at least 1");
        }
        if self.retention_multiplier == 0 {
            return invalid("checkpoint.retention_multiplier must be at least 1");
        }
        Ok(())
    }
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            base_interval: default_base_interval(),
            decay_factor: default_decay_factor(),
            max_levels: default_max_levels(),
            adaptation_window: default_adaptation_window(),
            adaptation_trigger: None,
            adaptation_trigger_multiplier: default_adaptation_trigger_multiplier(),
            retention_multiplier: default_retention_multiplier(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Which harness routine to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HarnessMode {
    /// A toy message-passing simulation with random rollbacks.
    #[default]
    Simulate,
    /// Compare fixed, static and adaptive checkpoint strategies.
    Benchmark,
}

/// Simulation harness parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HarnessConfig {
    /// Routine to run.
    #[serde(default)]
    pub mode: HarnessMode,

    /// Number of events to process.
    #[serde(default = "default_events")]
    pub events: u64,

    /// Per-event probability of a rollback.
    #[serde(default = "default_rollback_probability")]
    pub rollback_probability: f64,

    /// Smallest rollback distance in events.
    #[serde(default = "default_min_rollback")]
    pub min_rollback: u64,

    /// Largest rollback distance in events.
    #[serde(default = "default_max_rollback")]
    pub max_rollback: u64,

    /// Number of simulated nodes.
    #[serde(default = "default_nodes")]
    pub nodes: u32,

    /// Prune old checkpoints every N events (0 disables pruning).
    #[serde(default = "default_prune_every")]
    pub prune_every: u64,

    /// Random seed for reproducibility.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            mode: HarnessMode::default(),
            events: default_events(),
            rollback_probability: default_rollback_probability(),
            min_rollback: default_min_rollback(),
            max_rollback: default_max_rollback(),
            nodes: default_nodes(),
            prune_every: default_prune_every(),
            seed: default_seed(),
        }
    }
}

// =============================================================================
// Defaults
// =============================================================================

const fn default_base_interval() -> u64 {
    100
}

const fn default_decay_factor() -> f64 {
    0.9
}

const fn default_max_levels() -> u32 {
    5
}

const fn default_adaptation_window() -> usize {
    1000
}

const fn default_adaptation_trigger_multiplier() -> u64 {
    10
}

const fn default_retention_multiplier() -> u64 {
    2
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_events() -> u64 {
    1000
}

const fn default_rollback_probability() -> f64 {
    0.01
}

const fn default_min_rollback() -> u64 {
    10
}

const fn default_max_rollback() -> u64 {
    100
}

const fn default_nodes() -> u32 {
    5
}

const fn default_prune_every() -> u64 {
    500
}

const fn default_seed() -> u64 {
    42
}
