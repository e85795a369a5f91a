//! Pushes trend snapshots to the configured remote endpoint.

use crate::models::{SyncOutcome, TrendEntry};
use crate::store::SettingsStore;
use chrono::Utc;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Error text when no endpoint has been configured.
pub const NO_API_URL: &str = "No API URL configured";

/// Body of the outbound sync request.
#[derive(Debug, Serialize)]
struct SyncPayload<'a> {
    trends: &'a [TrendEntry],
    synced_at: i64,
}

/// One-shot trend publisher. Cheap to clone.
#[derive(Clone)]
pub struct SyncDispatcher {
    settings: SettingsStore,
    http_client: reqwest::Client,
}

impl SyncDispatcher {
    /// Create a dispatcher. With `timeout` unset a hung endpoint blocks its sync indefinitely.
    pub fn new(settings: SettingsStore, timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(settings, builder.build()?))
    }

    pub fn with_client(settings: SettingsStore, http_client: reqwest::Client) -> Self {
        Self {
            settings,
            http_client,
        }
    }

    /// Resolve the configured endpoint, or the failed outcome to report without one.
    pub async fn endpoint(&self) -> Result<String, SyncOutcome> {
        match self.settings.api_url().await {
            Ok(Some(url)) => Ok(url),
            Ok(None) => Err(SyncOutcome::failed(NO_API_URL)),
            Err(e) => Err(SyncOutcome::failed(e.to_string())),
        }
    }

    /// Post `trends` to `url`. Never fails; every error is folded into the outcome.
    pub async fn push(&self, url: &str, trends: &[TrendEntry]) -> SyncOutcome {
        let payload = SyncPayload {
            trends,
            synced_at: Utc::now().timestamp_millis(),
        };

        debug!("Syncing {} trends to {}", trends.len(), url);

        match self.http_client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                info!("Synced {} trends to {}", trends.len(), url);
                SyncOutcome::ok()
            }
            Ok(response) => {
                let status = response.status().as_u16();
                warn!("Sync to {} rejected with HTTP {}", url, status);
                SyncOutcome::failed(format!("HTTP {}", status))
            }
            Err(e) => {
                warn!("Sync to {} failed: {}", url, e);
                SyncOutcome::failed(e.to_string())
            }
        }
    }
}
