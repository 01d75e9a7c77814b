//! Typed configuration for storage layers.
//!
//! Each backend variant has an explicit config struct; the tiered router is
//! described as an ordered list of `(threshold, backend)` layers:
//!
//! ```yaml
//! layers:
//!   - threshold: 10000
//!     backend: { kind: memory }
//!   - threshold: 100000
//!     backend: { kind: disk, path: /var/lib/rewind }
//!   - threshold: 18446744073709551615
//!     backend: { kind: redis, url: "redis://localhost:6379" }
//! ```

use std::path::PathBuf;

use serde::Deserialize;

use crate::backend::StorageBackend;
use crate::disk::DiskStorage;
use crate::error::StorageError;
use crate::memory::MemoryStorage;
use crate::object::ObjectStorage;
use crate::redis::{self, RedisStorage};
use crate::tiered::{StorageLayer, TieredRouter};

/// Storage configuration: the tiers a checkpoint can be routed to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Layers in ascending threshold order.
    #[serde(default = "default_layers")]
    pub layers: Vec<LayerConfig>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            layers: default_layers(),
        }
    }
}

impl StorageConfig {
    /// Override backend locations with environment variables when set.
    ///
    /// - `REWIND_DISK_PATH` overrides `path` of every disk layer
    /// - `REWIND_REDIS_URL` overrides `url` of every redis layer
    /// - `REWIND_S3_BUCKET` overrides `bucket` of every s3 layer
    pub fn apply_env_overrides(&mut self) {
        let disk_path = std::env::var("REWIND_DISK_PATH").ok();
        let redis_url = std::env::var("REWIND_REDIS_URL").ok();
        let s3_bucket = std::env::var("REWIND_S3_BUCKET").ok();

        for layer in &mut self.layers {
            match &mut layer.backend {
                BackendConfig::Memory => {}
                BackendConfig::Disk(disk) => {
                    if let Some(path) = &disk_path {
                        disk.path = PathBuf::from(path);
                    }
                }
                BackendConfig::Redis(redis) => {
                    if let Some(url) = &redis_url {
                        redis.url.clone_from(url);
                    }
                }
                BackendConfig::S3(s3) => {
                    if let Some(bucket) = &s3_bucket {
                        s3.bucket.clone_from(bucket);
                    }
                }
            }
        }
    }

    /// Construct every backend and assemble the router.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if there are no layers or a backend
    /// cannot be constructed.
    pub fn build(&self) -> Result<TieredRouter, StorageError> {
        let layers = self
            .layers
            .iter()
            .map(|layer| {
                let backend = layer.backend.build()?;
                tracing::info!(
                    threshold = layer.threshold,
                    backend = backend.name(),
                    "Storage layer configured"
                );
                Ok(StorageLayer::from_boxed(layer.threshold, backend))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        TieredRouter::new(layers)
    }
}

/// One `(threshold, backend)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LayerConfig {
    /// Largest event id routed to this layer on write.
    pub threshold: u64,

    /// The medium behind this layer.
    pub backend: BackendConfig,
}

/// Backend selection, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// In-process memory map.
    Memory,
    /// Files in a local directory.
    Disk(DiskConfig),
    /// Remote `Redis`-compatible key-value store.
    Redis(RedisConfig),
    /// Remote S3-compatible object store.
    S3(S3Config),
}

impl BackendConfig {
    /// Construct the backend this config describes.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the backend cannot be opened or
    /// connected.
    pub fn build(&self) -> Result<Box<dyn StorageBackend>, StorageError> {
        Ok(match self {
            Self::Memory => Box::new(MemoryStorage::new()),
            Self::Disk(disk) => Box::new(DiskStorage::open(&disk.path)?),
            Self::Redis(redis) => Box::new(RedisStorage::connect(&redis.url, &*redis.prefix)?),
            Self::S3(s3) => Box::new(ObjectStorage::connect(
                &*s3.bucket,
                &*s3.prefix,
                &*s3.region,
            )?),
        })
    }
}

/// Local filesystem backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiskConfig {
    /// Directory holding `ckpt_{id}.bin` files.
    #[serde(default = "default_disk_path")]
    pub path: PathBuf,
}

/// `Redis` backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RedisConfig {
    /// Connection URL, e.g. `redis://localhost:6379/0`.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Key namespace.
    #[serde(default = "default_redis_prefix")]
    pub prefix: String,
}

/// S3 backend settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct S3Config {
    /// Bucket name.
    pub bucket: String,

    /// Object key prefix.
    #[serde(default = "default_s3_prefix")]
    pub prefix: String,

    /// AWS region.
    #[serde(default = "default_s3_region")]
    pub region: String,
}

// =============================================================================
// Defaults
// =============================================================================

fn default_layers() -> Vec<LayerConfig> {
    vec![LayerConfig {
        threshold: u64::MAX,
        backend: BackendConfig::Memory,
    }]
}

fn default_disk_path() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_owned()
}

fn default_redis_prefix() -> String {
    redis::DEFAULT_PREFIX.to_owned()
}

fn default_s3_prefix() -> String {
    "checkpoints".to_owned()
}

fn default_s3_region() -> String {
    "us-east-1".to_owned()
}
