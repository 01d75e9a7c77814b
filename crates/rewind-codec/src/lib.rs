//! State encoding for Rewind checkpoints.
//!
//! Any `serde` type can be checkpointed. The state is serialized as JSON,
//! optionally compressed with zstd, and wrapped in a versioned frame (see
//! [`frame`]). The compression choice is written into the header, so decode
//! is a deterministic dispatch on the tag and never a trial-and-error guess.
//!
//! # Usage
//!
//! ```
//! use std::collections::BTreeMap;
//! use rewind_codec::{CodecConfig, SnapshotCodec};
//!
//! let codec = SnapshotCodec::new(CodecConfig::default());
//! let mut state = BTreeMap::new();
//! state.insert("node1".to_owned(), 3_u32);
//!
//! let bytes = codec.encode(&state).ok();
//! let restored: Option<BTreeMap<String, u32>> =
//!     bytes.and_then(|b| codec.decode(&b).ok());
//! assert_eq!(restored, Some(state));
//! ```

pub mod error;
pub mod frame;

use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub use error::CodecError;
pub use frame::{Compression, FrameHeader};

/// Codec settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CodecConfig {
    /// Preferred body compression.
    #[serde(default)]
    pub compression: Compression,

    /// zstd compression level.
    #[serde(default = "default_level")]
    pub level: i32,

    /// Bodies shorter than this are stored uncompressed.
    #[serde(default = "default_min_compress_bytes")]
    pub min_compress_bytes: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            level: default_level(),
            min_compress_bytes: default_min_compress_bytes(),
        }
    }
}

const fn default_level() -> i32 {
    3
}

const fn default_min_compress_bytes() -> usize {
    64
}

/// Encodes and decodes checkpoint state into framed bytes.
#[derive(Debug, Clone, Default)]
pub struct SnapshotCodec {
    config: CodecConfig,
}

impl SnapshotCodec {
    /// Create a codec with the given settings.
    pub const fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    /// The active settings.
    pub const fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Serialize `state` into a framed checkpoint payload.
    ///
    /// Compression is skipped for small bodies and whenever it would not
    /// shrink the body; the chosen strategy is recorded in the header.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if `state` cannot be serialized.
    pub fn encode<T: Serialize + ?Sized>(&self, state: &T) -> Result<Vec<u8>, CodecError> {
        let json = serde_json::to_vec(state).map_err(CodecError::encode)?;

        let wants_zstd = self.config.compression == Compression::Zstd
            && json.len() >= self.config.min_compress_bytes;
        if wants_zstd {
            let compressed =
                zstd::encode_all(json.as_slice(), self.config.level).map_err(CodecError::encode)?;
            if compressed.len() < json.len() {
                tracing::trace!(
                    raw = json.len(),
                    compressed = compressed.len(),
                    "Encoded checkpoint with zstd"
                );
                return Ok(FrameHeader::current(Compression::Zstd).write(&compressed));
            }
            tracing::debug!(
                raw = json.len(),
                compressed = compressed.len(),
                "zstd did not shrink checkpoint, storing uncompressed"
            );
        }
        Ok(FrameHeader::current(Compression::None).write(&json))
    }

    /// Decode a framed checkpoint payload back into state.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the frame header is invalid, the
    /// body fails to decompress, or the JSON does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, CodecError> {
        let (header, body) = FrameHeader::split(bytes)?;
        match header.compression {
            Compression::None => serde_json::from_slice(body).map_err(CodecError::decode),
            Compression::Zstd => {
                let json = zstd::decode_all(body).map_err(CodecError::decode)?;
                serde_json::from_slice(&json).map_err(CodecError::decode)
            }
        }
    }
}
