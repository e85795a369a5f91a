//! Local key-value persistence.
//!
//! Every component reads and writes through the [`KvStore`] trait, which
//! models a single named bucket of JSON values. The typed wrappers in
//! [`buckets`] sit on top of it and validate what crosses the boundary.

pub mod buckets;
pub mod file;
pub mod memory;

pub use buckets::{JobStore, SettingsStore};
pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Alias for `Result<T, StoreError>`.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access bucket file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bucket {bucket} is not a JSON object: {message}")]
    Corrupt { bucket: String, message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key-value persistence over a single named bucket.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Name of the bucket this store is scoped to.
    fn bucket(&self) -> &str;

    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> StoreResult<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: Value) -> StoreResult<()>;

    /// Deletes `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> StoreResult<()>;
}
