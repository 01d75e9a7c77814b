//! `Redis`/`Dragonfly` remote key-value backend.
//!
//! Payloads are stored as raw byte strings under `{prefix}:{event_id}`.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `{prefix}:{event_id}` | Bytes | Encoded checkpoint payload |

use bytes::Bytes;
use fred::prelude::*;
use tokio::runtime::Runtime;

use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::runtime::private_runtime;

/// Default key prefix for checkpoint payloads.
pub const DEFAULT_PREFIX: &str = "ckpt";

/// Connection handle to a `Redis`-compatible instance.
///
/// Wraps a [`fred::prelude::Client`] driven by a private runtime.
pub struct RedisStorage {
    client: Client,
    runtime: Runtime,
    prefix: String,
}

impl RedisStorage {
    /// Connect to the instance at `url` and namespace keys under `prefix`.
    ///
    /// The URL follows the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the URL cannot be parsed or the
    /// connection cannot be established.
    pub fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StorageError> {
        let runtime = private_runtime("rewind-redis")?;
        let config = Config::from_url(url)
            .map_err(|e| StorageError::Config(format!("Invalid Redis URL: {e}")))?;

        let client = runtime.block_on(async {
            let client = Builder::from_config(config).build()?;
            client.init().await?;
            Ok::<Client, fred::error::Error>(client)
        });
        let client =
            client.map_err(|e| StorageError::Config(format!("Redis connection failed: {e}")))?;

        tracing::info!("Connected to Redis checkpoint store");
        Ok(Self {
            client,
            runtime,
            prefix: prefix.into(),
        })
    }

    /// The key a checkpoint for `event_id` is stored under.
    pub fn key_for(&self, event_id: u64) -> String {
        format!("{}:{event_id}", self.prefix)
    }
}

impl StorageBackend for RedisStorage {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn put(&self, event_id: u64, payload: &[u8]) -> Result<(), StorageError> {
        let key = self.key_for(event_id);
        let value = Bytes::copy_from_slice(payload);
        self.runtime
            .block_on(async {
                let _: () = self.client.set(key.as_str(), value, None, None, false).await?;
                Ok::<(), fred::error::Error>(())
            })
            .map_err(|e| StorageError::write(event_id, e))
    }

    fn get(&self, event_id: u64) -> Result<Option<Vec<u8>>, StorageError> {
        let key = self.key_for(event_id);
        self.runtime
            .block_on(async {
                let value: Option<Vec<u8>> = self.client.get(key.as_str()).await?;
                Ok::<Option<Vec<u8>>, fred::error::Error>(value)
            })
            .map_err(|e| StorageError::read(event_id, e))
    }

    fn remove(&self, event_id: u64) -> Result<(), StorageError> {
        let key = self.key_for(event_id);
        self.runtime
            .block_on(async {
                let _: u32 = self.client.del(key.as_str()).await?;
                Ok::<(), fred::error::Error>(())
            })
            .map_err(|e| StorageError::write(event_id, e))
    }
}
