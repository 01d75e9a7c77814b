//! Storage layer for Rewind checkpoints.
//!
//! Checkpoint payloads are opaque bytes keyed by event id. This crate gives
//! every medium the same small synchronous contract ([`StorageBackend`]) and
//! spreads payloads across media with a [`TieredRouter`].
//!
//! # Architecture
//!
//! ```text
//! CheckpointIndex
//!     |
//!     +-- put/get/remove --> TieredRouter
//!         |-- MemoryStorage   (hot, small)
//!         |-- DiskStorage     (local files)
//!         |-- RedisStorage    (remote key-value)
//!         +-- ObjectStorage   (S3, overflow)
//! ```
//!
//! # Modules
//!
//! - [`backend`] -- The [`StorageBackend`] trait
//! - [`memory`] -- In-process map
//! - [`disk`] -- One file per checkpoint
//! - [`redis`] -- `Redis`/`Dragonfly` via `fred`
//! - [`object`] -- S3 via `aws-sdk-s3`
//! - [`tiered`] -- Threshold routing across layers
//! - [`config`] -- Typed backend and layer configuration
//! - [`error`] -- Shared error types

pub mod backend;
pub mod config;
pub mod disk;
pub mod error;
pub mod memory;
pub mod object;
pub mod redis;
mod runtime;
pub mod tiered;

// Re-export primary types for convenience.
pub use backend::StorageBackend;
pub use config::{BackendConfig, DiskConfig, LayerConfig, RedisConfig, S3Config, StorageConfig};
pub use disk::DiskStorage;
pub use error::StorageError;
pub use memory::MemoryStorage;
pub use object::ObjectStorage;
pub use redis::RedisStorage;
pub use tiered::{StorageLayer, TieredRouter};
