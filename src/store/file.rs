//! JSON-file bucket that persists across process restarts.
//!
//! Each bucket is a single JSON object stored at `<dir>/<bucket>.json`.
//! The file is created on first read, and every write replaces it through a
//! temp file and a rename so readers never see a half-written bucket.

use super::{KvStore, StoreError, StoreResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

pub struct FileStore {
    bucket: String,
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Opens the bucket `name` under `dir`. Nothing touches the disk until first use.
    pub fn new(dir: &Path, name: impl Into<String>) -> Self {
        let bucket = name.into();
        let path = dir.join(format!("{}.json", bucket));
        Self {
            bucket,
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_map(&self) -> StoreResult<Map<String, Value>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(Map::new()),
            Ok(content) => match serde_json::from_str::<Value>(&content)? {
                Value::Object(map) => Ok(map),
                other => Err(StoreError::Corrupt {
                    bucket: self.bucket.clone(),
                    message: format!("expected object, found {}", json_kind(&other)),
                }),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Creating empty bucket at {}", self.path.display());
                let empty = Map::new();
                self.write_map(&empty).await?;
                Ok(empty)
            }
            Err(source) => Err(StoreError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    async fn write_map(&self, map: &Map<String, Value>) -> StoreResult<()> {
        let io_err = |source| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let content = serde_json::to_string_pretty(map)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl KvStore for FileStore {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn get(&self, key: &str) -> StoreResult<Option<Value>> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        Ok(map.remove(key))
    }

    async fn set(&self, key: &str, value: Value) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        map.insert(key.to_string(), value);
        self.write_map(&map).await
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().await;
        let mut map = self.read_map().await?;
        if map.remove(key).is_some() {
            self.write_map(&map).await?;
        }
        Ok(())
    }
}
