//! Typed views over the raw key-value buckets.

use super::{KvStore, StoreResult};
use crate::models::JobRecord;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

const JOBS_KEY: &str = "jobs";
const API_URL_KEY: &str = "api_url";

/// The ordered job record list, oldest first.
#[derive(Clone)]
pub struct JobStore {
    kv: Arc<dyn KvStore>,
}

impl JobStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Loads every stored record. Entries that fail validation are dropped.
    pub async fn load(&self) -> StoreResult<Vec<JobRecord>> {
        let raw = match self.kv.get(JOBS_KEY).await? {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(other) => {
                warn!(
                    "Bucket {} holds a non-array job list, ignoring it: {}",
                    self.kv.bucket(),
                    other
                );
                return Ok(Vec::new());
            }
        };

        let mut records = Vec::with_capacity(raw.len());
        for (index, item) in raw.into_iter().enumerate() {
            match JobRecord::from_value(item) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Dropping stored job #{}: {}", index, e),
            }
        }
        Ok(records)
    }

    pub async fn save(&self, records: &[JobRecord]) -> StoreResult<()> {
        let value = serde_json::to_value(records)?;
        self.kv.set(JOBS_KEY, value).await
    }

    pub async fn clear(&self) -> StoreResult<()> {
        self.kv.remove(JOBS_KEY).await
    }
}

/// Separately scoped settings bucket holding the sync endpoint.
#[derive(Clone)]
pub struct SettingsStore {
    kv: Arc<dyn KvStore>,
}

impl SettingsStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The configured sync endpoint. Blank strings count as unset.
    pub async fn api_url(&self) -> StoreResult<Option<String>> {
        let url = self
            .kv
            .get(API_URL_KEY)
            .await?
            .and_then(|v| v.as_str().map(str::trim).map(String::from))
            .filter(|s| !s.is_empty());
        Ok(url)
    }

    pub async fn set_api_url(&self, url: &str) -> StoreResult<()> {
        self.kv.set(API_URL_KEY, Value::String(url.to_string())).await
    }

    pub async fn clear_api_url(&self) -> StoreResult<()> {
        self.kv.remove(API_URL_KEY).await
    }
}
