//! Integration tests for the `rewind-storage` layer.
//!
//! The tiered tests run against memory and disk backends. The `Redis` and S3
//! tests require live services and are marked `#[ignore]`. Run them with:
//!
//! ```bash
//! docker compose up -d
//! cargo test -p rewind-storage -- --ignored
//! docker compose down
//! ```

// Integration tests use expect/unwrap extensively for clarity -- panicking
// on failure is the correct behavior in test code.
#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use rewind_storage::{
    DiskStorage, MemoryStorage, ObjectStorage, RedisStorage, StorageBackend, StorageLayer,
    TieredRouter,
};

/// `Redis` connection URL for the local Docker instance.
const REDIS_URL: &str = "redis://localhost:6379";

/// Bucket used by the S3 tests (`MinIO` or a real account).
const S3_BUCKET: &str = "rewind-test";

// =============================================================================
// Tiered routing over local media
// =============================================================================

#[test]
fn memory_then_disk_spill() {
    let dir = tempfile::tempdir().expect("tempdir");
    let hot = Arc::new(MemoryStorage::new());
    let cold = DiskStorage::open(dir.path()).expect("open disk store");

    let router = TieredRouter::new(vec![
        StorageLayer::new(1000, Arc::clone(&hot)),
        StorageLayer::new(5000, cold),
    ])
    .expect("router");

    for id in [0_u64, 500, 1000, 1500, 4000, 9000] {
        router.put(id, format!("state@{id}").as_bytes()).expect("put");
    }

    // Ids up to 1000 stay hot; everything else lands on disk.
    assert_eq!(hot.len(), 3);
    assert!(dir.path().join("ckpt_1500.bin").exists());
    assert!(dir.path().join("ckpt_9000.bin").exists());

    for id in [0_u64, 500, 1000, 1500, 4000, 9000] {
        let payload = router.get(id).expect("get").expect("present");
        assert_eq!(payload, format!("state@{id}").into_bytes());
    }
    assert_eq!(router.get(42).expect("get"), None);
}

#[test]
fn reconfigured_thresholds_still_find_old_data() {
    let dir = tempfile::tempdir().expect("tempdir");
    let disk = DiskStorage::open(dir.path()).expect("open disk store");
    disk.put(200, b"written-by-old-layout").expect("put");

    // New layout would route 200 to memory, but reads probe every layer.
    let router = TieredRouter::new(vec![
        StorageLayer::new(1000, MemoryStorage::new()),
        StorageLayer::new(u64::MAX, DiskStorage::open(dir.path()).expect("reopen")),
    ])
    .expect("router");

    assert_eq!(
        router.get(200).expect("get").as_deref(),
        Some(&b"written-by-old-layout"[..])
    );
}

// =============================================================================
// Redis Tests
// =============================================================================

#[test]
#[ignore = "requires live Redis instance (docker compose up -d)"]
fn redis_put_get_remove() {
    let store = RedisStorage::connect(REDIS_URL, "rewind-test").expect("connect to Redis");

    store.put(42, b"\x00\x01binary\xff").expect("put");
    assert_eq!(
        store.get(42).expect("get").as_deref(),
        Some(&b"\x00\x01binary\xff"[..])
    );

    store.remove(42).expect("remove");
    store.remove(42).expect("second remove is a no-op");
    assert_eq!(store.get(42).expect("get after remove"), None);
}

#[test]
#[ignore = "requires live Redis instance (docker compose up -d)"]
fn redis_key_layout() {
    let store = RedisStorage::connect(REDIS_URL, "sim7").expect("connect to Redis");
    assert_eq!(store.key_for(1200), "sim7:1200");
}

// =============================================================================
// S3 Tests
// =============================================================================

#[test]
#[ignore = "requires S3 credentials and an existing bucket"]
fn s3_put_get_remove() {
    let store =
        ObjectStorage::connect(S3_BUCKET, "it", "us-east-1").expect("configure S3 client");
    assert_eq!(store.key_for(7), "it/ckpt_7.bin");

    store.put(7, b"object payload").expect("put");
    assert_eq!(
        store.get(7).expect("get").as_deref(),
        Some(&b"object payload"[..])
    );

    store.remove(7).expect("remove");
    assert_eq!(store.get(7).expect("get after remove"), None);
}
