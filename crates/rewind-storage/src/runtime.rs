//! Private tokio runtime for the remote backends.
//!
//! The Redis and S3 clients are async, but the storage contract is
//! synchronous. Each remote backend owns one small runtime and blocks on it.
//! Calling a remote backend from inside another runtime's async context
//! panics inside tokio, so async callers must go through `spawn_blocking`.

use tokio::runtime::{Builder, Runtime};

use crate::error::StorageError;

/// Build a single-worker multi-thread runtime so client background tasks
/// (reconnects, pings) keep running between blocking calls.
pub(crate) fn private_runtime(thread_name: &str) -> Result<Runtime, StorageError> {
    Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name(thread_name)
        .enable_all()
        .build()
        .map_err(|e| StorageError::Config(format!("cannot start {thread_name} runtime: {e}")))
}
