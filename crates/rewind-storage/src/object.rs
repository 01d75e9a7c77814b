//! S3-compatible object store backend.
//!
//! The slowest, largest tier. Each checkpoint is one object at
//! `{prefix}/ckpt_{event_id}.bin` in a configured bucket. A `NoSuchKey`
//! response maps to a miss; every other SDK failure is a medium error.

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use tokio::runtime::Runtime;

use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::runtime::private_runtime;

/// Checkpoint payloads stored as objects in an S3 bucket.
pub struct ObjectStorage {
    client: Client,
    runtime: Runtime,
    bucket: String,
    prefix: String,
}

impl ObjectStorage {
    /// Build a client for `bucket` in `region` from the ambient AWS
    /// credential chain.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Config`] if the private runtime cannot start.
    pub fn connect(
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        region: impl Into<String>,
    ) -> Result<Self, StorageError> {
        let runtime = private_runtime("rewind-s3")?;
        let region = aws_config::Region::new(region.into());
        let sdk_config = runtime.block_on(
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(region)
                .load(),
        );
        let bucket = bucket.into();
        tracing::info!(bucket = %bucket, "Configured S3 checkpoint store");
        Ok(Self {
            client: Client::new(&sdk_config),
            runtime,
            bucket,
            prefix: prefix.into(),
        })
    }

    /// The object key a checkpoint for `event_id` is stored under.
    pub fn key_for(&self, event_id: u64) -> String {
        format!("{}/ckpt_{event_id}.bin", self.prefix)
    }
}

impl StorageBackend for ObjectStorage {
    fn name(&self) -> &'static str {
        "s3"
    }

    fn put(&self, event_id: u64, payload: &[u8]) -> Result<(), StorageError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(self.key_for(event_id))
            .body(ByteStream::from(payload.to_vec()));
        self.runtime
            .block_on(request.send())
            .map_err(|e| StorageError::write(event_id, e))?;
        Ok(())
    }

    fn get(&self, event_id: u64) -> Result<Option<Vec<u8>>, StorageError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(self.key_for(event_id));
        self.runtime.block_on(async {
            let output = match request.send().await {
                Ok(output) => output,
                Err(e) => {
                    if e.as_service_error().is_some_and(|se| se.is_no_such_key()) {
                        return Ok(None);
                    }
                    return Err(StorageError::read(event_id, e));
                }
            };
            let body = output
                .body
                .collect()
                .await
                .map_err(|e| StorageError::read(event_id, e))?;
            Ok(Some(body.into_bytes().to_vec()))
        })
    }

    fn remove(&self, event_id: u64) -> Result<(), StorageError> {
        // DeleteObject succeeds for absent keys.
        let request = self
            .client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.key_for(event_id));
        self.runtime
            .block_on(request.send())
            .map_err(|e| StorageError::write(event_id, e))?;
        Ok(())
    }
}
