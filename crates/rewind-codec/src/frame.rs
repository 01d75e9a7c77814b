//! Checkpoint frame header.
//!
//! Every encoded checkpoint starts with a fixed six-byte header so decoding
//! never has to guess the body format:
//!
//! | offset | size | field |
//! |-------:|-----:|-------|
//! | 0 | 4 | magic `RWND` |
//! | 4 | 1 | format version |
//! | 5 | 1 | compression tag |
//! | 6 | n | body |

use serde::Deserialize;

use crate::error::CodecError;

/// Leading bytes of every frame.
pub const MAGIC: [u8; 4] = *b"RWND";

/// The only frame version this crate writes and reads.
pub const FORMAT_VERSION: u8 = 1;

/// Total header length in bytes.
pub const HEADER_LEN: usize = 6;

/// Body compression, recorded in the frame header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    /// Body is the raw JSON document.
    None,
    /// Body is a zstd frame wrapping the JSON document.
    #[default]
    Zstd,
}

impl Compression {
    /// The on-disk tag for this compression.
    pub const fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Zstd => 1,
        }
    }

    /// Parse an on-disk tag.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::Zstd),
            _ => None,
        }
    }
}

/// A parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Frame format version.
    pub version: u8,
    /// How the body is compressed.
    pub compression: Compression,
}

impl FrameHeader {
    /// Header for a frame written by this crate version.
    pub const fn current(compression: Compression) -> Self {
        Self {
            version: FORMAT_VERSION,
            compression,
        }
    }

    /// Serialize the header followed by `body`.
    pub fn write(self, body: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN.saturating_add(body.len()));
        out.extend_from_slice(&MAGIC);
        out.push(self.version);
        out.push(self.compression.tag());
        out.extend_from_slice(body);
        out
    }

    /// Split `bytes` into a validated header and the body that follows.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if the input is too short, the magic
    /// does not match, or the version/compression tag is unknown.
    pub fn split(bytes: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        let Some((magic, rest)) = bytes.split_first_chunk::<4>() else {
            return Err(CodecError::decode(format!(
                "frame too short: {} bytes",
                bytes.len()
            )));
        };
        if *magic != MAGIC {
            return Err(CodecError::decode("unrecognized frame magic"));
        }
        let Some(([version, tag], body)) = rest.split_first_chunk::<2>() else {
            return Err(CodecError::decode("truncated frame header"));
        };
        if *version != FORMAT_VERSION {
            return Err(CodecError::decode(format!(
                "unsupported frame version {version}"
            )));
        }
        let compression = Compression::from_tag(*tag)
            .ok_or_else(|| CodecError::decode(format!("unknown compression tag {tag}")))?;
        Ok((
            Self {
                version: *version,
                compression,
            },
            body,
        ))
    }
}
