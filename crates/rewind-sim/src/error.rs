//! Error types for the simulation harness binary.
//!
//! [`SimError`] is the top-level error type that wraps every failure mode
//! during startup and while driving the checkpointer.

use rewind_core::{CheckpointError, ConfigError};

/// Top-level error for the harness binary.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },

    /// A checkpoint operation failed.
    #[error("checkpoint error: {source}")]
    Checkpoint {
        /// The underlying checkpointer error.
        #[from]
        source: CheckpointError,
    },

    /// Harness parameters are out of range.
    #[error("invalid harness configuration: {reason}")]
    InvalidHarness {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}
