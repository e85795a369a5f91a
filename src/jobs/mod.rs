//! Job record bookkeeping.
//!
//! [`TrendService`] owns the job bucket and the status badge. Ingestion
//! (dedup + cap) lives in [`ingest`], age-based eviction in [`retention`].

pub mod ingest;
pub mod retention;

pub use retention::spawn_sweeper;

use crate::analysis::compute_trends;
use crate::badge::{badge_text, Badge};
use crate::models::{InvalidRecord, JobRecord, TrendEntry, MAX_JOBS};
use crate::store::{JobStore, StoreError, StoreResult};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Errors raised while accepting a job record.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("rejected job record: {0}")]
    Invalid(#[from] InvalidRecord),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Retention limits applied to the job bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum number of records kept, newest win.
    pub max_jobs: usize,
    /// Records older than this many days are swept.
    pub max_age_days: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_jobs: MAX_JOBS,
            max_age_days: 7,
        }
    }
}

/// Job bucket plus the badge that mirrors its size.
pub struct TrendService {
    jobs: JobStore,
    badge: Arc<dyn Badge>,
    limits: Limits,
}

impl TrendService {
    pub fn new(jobs: JobStore, badge: Arc<dyn Badge>, limits: Limits) -> Self {
        Self {
            jobs,
            badge,
            limits,
        }
    }

    /// Current skill trends, recomputed from every stored record.
    pub async fn get_trends(&self) -> StoreResult<Vec<TrendEntry>> {
        let records = self.jobs.load().await?;
        Ok(compute_trends(&records))
    }

    pub async fn records(&self) -> StoreResult<Vec<JobRecord>> {
        self.jobs.load().await
    }

    pub async fn count(&self) -> StoreResult<usize> {
        Ok(self.records().await?.len())
    }

    /// Delete every record and blank the badge.
    pub async fn clear(&self) -> StoreResult<()> {
        self.jobs.clear().await?;
        self.badge.set_text("");
        info!("Cleared all job records");
        Ok(())
    }

    fn show_count(&self, count: usize) {
        self.badge.set_text(&badge_text(count));
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::badge::MemoryBadge;
    use crate::store::MemoryStore;

    pub fn service() -> (TrendService, MemoryBadge) {
        service_with(Limits::default())
    }

    pub fn service_with(limits: Limits) -> (TrendService, MemoryBadge) {
        let badge = MemoryBadge::new();
        let jobs = JobStore::new(Arc::new(MemoryStore::new("jobs")));
        (
            TrendService::new(jobs, Arc::new(badge.clone()), limits),
            badge,
        )
    }

    pub fn job(url: &str, skills: &[&str], timestamp: i64) -> JobRecord {
        JobRecord::new(url, skills.iter().map(|s| s.to_string()).collect(), timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{job, service};

    #[tokio::test]
    async fn test_trends_from_service() {
        let (service, _) = service();
        assert!(service.get_trends().await.unwrap().is_empty());

        service.add_job(job("https://a", &["go"], 1)).await.unwrap();
        service
            .add_job(job("https://b", &["go", "rust"], 2))
            .await
            .unwrap();

        let trends = service.get_trends().await.unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].skill, "go");
        assert_eq!(trends[0].pct, 100);
        assert_eq!(trends[1].pct, 50);
    }

    #[tokio::test]
    async fn test_clear_resets_badge() {
        let (service, badge) = service();
        service.add_job(job("https://a", &["go"], 1)).await.unwrap();
        assert_eq!(badge.text(), "1");

        service.clear().await.unwrap();
        assert_eq!(service.count().await.unwrap(), 0);
        assert_eq!(badge.text(), "");
    }
}
