//! Operation executor
//!
//! Runs one filesystem operation on one path and always produces an
//! [`ItemResult`]. Errors, including panics inside the operation, are turned
//! into `Failure` values here and never escape.
//!
//! The same primitives (`stat`, `checksum`, `delete`) back the single-file
//! endpoints, which map the `FsError` to an HTTP status instead.

use crate::batch::types::{ItemData, ItemResult, Operation};
use crate::content::checksum::sha256_file;
use crate::error::{FsError, FsResult};
use crate::localfs::StatRecord;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, warn};

/// Executes filesystem operations for the batch and single-file handlers
#[derive(Debug, Clone)]
pub struct OperationExecutor {
    read_chunk_size: usize,
}

impl OperationExecutor {
    /// Create an executor reading files in `read_chunk_size` pieces
    pub fn new(read_chunk_size: usize) -> Self {
        Self { read_chunk_size }
    }

    /// Read chunk size for checksums
    pub fn read_chunk_size(&self) -> usize {
        self.read_chunk_size
    }

    /// Run `op` on `path`, converting every failure into an item result
    pub async fn execute(&self, path: String, op: Operation) -> ItemResult {
        let outcome = AssertUnwindSafe(self.run(&path, op)).catch_unwind().await;

        match outcome {
            Ok(Ok(data)) => ItemResult::success(path, data),
            Ok(Err(err)) => {
                debug!(path = %path, op = op.name(), error = %err, "Item failed");
                ItemResult::failure(path, err)
            }
            Err(_) => {
                warn!(path = %path, op = op.name(), "Item operation panicked");
                let err = FsError::internal(op.name(), &path, "operation panicked");
                ItemResult::failure(path, err)
            }
        }
    }

    async fn run(&self, path: &str, op: Operation) -> FsResult<ItemData> {
        match op {
            Operation::Metadata => self.stat(path).await.map(ItemData::Stat),
            Operation::Checksum => self.checksum(path).await.map(ItemData::Digest),
            Operation::Delete => self.delete(path).await.map(ItemData::Stat),
        }
    }

    /// stat, following symlinks
    pub async fn stat(&self, path: &str) -> FsResult<StatRecord> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| FsError::from_io("stat", path, &e))?;
        Ok(StatRecord::from_metadata(&meta))
    }

    /// SHA-256 of the full file contents as lowercase hex
    pub async fn checksum(&self, path: &str) -> FsResult<String> {
        sha256_file(path, self.read_chunk_size).await
    }

    /// stat then unlink, returning the stat taken before removal
    ///
    /// A failed stat returns without attempting the unlink. If the unlink
    /// fails (the file vanished or permissions changed after the stat), the
    /// stat is discarded and the unlink error is returned.
    pub async fn delete(&self, path: &str) -> FsResult<StatRecord> {
        let stat = self.stat(path).await?;

        tokio::fs::remove_file(path)
            .await
            .map_err(|e| FsError::from_io("unlink", path, &e))?;

        Ok(stat)
    }
}
