//! Error types for the state codec.

/// Errors raised while encoding or decoding checkpoint state.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The state could not be serialized (e.g. a map with non-string keys).
    #[error("encode failed: {reason}")]
    Encode {
        /// Description of the failure.
        reason: String,
    },

    /// The bytes are not a valid checkpoint frame or its body is corrupt.
    #[error("decode failed: {reason}")]
    Decode {
        /// Description of the failure.
        reason: String,
    },
}

impl CodecError {
    /// Build a [`CodecError::Encode`] from any displayable cause.
    pub fn encode(cause: impl std::fmt::Display) -> Self {
        Self::Encode {
            reason: cause.to_string(),
        }
    }

    /// Build a [`CodecError::Decode`] from any displayable cause.
    pub fn decode(cause: impl std::fmt::Display) -> Self {
        Self::Decode {
            reason: cause.to_string(),
        }
    }
}
