//! Adaptive checkpointing for speculative simulation.
//!
//! A speculative simulation runs ahead optimistically and must be able to
//! roll back to an earlier event. This crate decides which events get a
//! state snapshot, adapts that decision to the rollback depths it observes,
//! and keeps an index of stored snapshots so a rollback finds the nearest
//! one in `O(log n)`.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `rewind.yaml` into
//!   strongly-typed structs.
//! - [`levels`] -- Exponentially spaced checkpoint levels.
//! - [`controller`] -- Rollback-depth history and smoothed target interval.
//! - [`scheduler`] -- Per-event checkpoint decision and adaptation cadence.
//! - [`index`] -- Sorted checkpoint index with floor lookup and pruning.
//! - [`checkpointer`] -- The [`Checkpointer`] facade tying it all together.
//! - [`shared`] -- [`SharedCheckpointer`], a `Mutex`-guarded handle.
//! - [`report`] -- Counters and adaptive state for reporting.
//!
//! Storage tiers come from `rewind-storage`, state encoding from
//! `rewind-codec`.

pub mod checkpointer;
pub mod config;
pub mod controller;
pub mod index;
pub mod levels;
pub mod report;
pub mod scheduler;
pub mod shared;

pub use checkpointer::{CheckpointError, Checkpointer, Restored};
pub use config::{
    CheckpointConfig, ConfigError, HarnessConfig, HarnessMode, LoggingConfig, RewindConfig,
};
pub use controller::{AdaptiveController, ControllerError};
pub use index::{Checkpoint, CheckpointIndex, IndexError};
pub use levels::LevelSet;
pub use report::{CheckpointReport, RollbackStats};
pub use scheduler::CheckpointScheduler;
pub use shared::SharedCheckpointer;
