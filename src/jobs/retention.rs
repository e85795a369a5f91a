//! Age-based eviction of stored job records.

use super::TrendService;
use crate::models::JobRecord;
use crate::router::RouterHandle;
use crate::store::StoreResult;
use chrono::Utc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Default sweep period: one week.
pub const SWEEP_INTERVAL_MINUTES: u64 = 10_080;

/// Epoch-ms cutoff for a sweep at `now_ms`. Records at or before it are evicted.
pub fn cutoff(now_ms: i64, max_age_days: u32) -> i64 {
    now_ms - i64::from(max_age_days) * DAY_MS
}

/// Keep only records strictly newer than `cutoff_ms`. Returns how many were removed.
pub fn retain_recent(records: &mut Vec<JobRecord>, cutoff_ms: i64) -> usize {
    let before = records.len();
    records.retain(|r| r.timestamp > cutoff_ms);
    before - records.len()
}

impl TrendService {
    /// Evict records older than the retention window, as of `now_ms`.
    pub async fn sweep_at(&self, now_ms: i64) -> StoreResult<usize> {
        let mut records = self.jobs.load().await?;
        let removed = retain_recent(&mut records, cutoff(now_ms, self.limits.max_age_days));

        self.jobs.save(&records).await?;
        self.show_count(records.len());

        if removed > 0 {
            info!("Swept {} expired jobs, {} remain", removed, records.len());
        } else {
            debug!("Sweep found nothing to evict");
        }
        Ok(removed)
    }

    pub async fn sweep(&self) -> StoreResult<usize> {
        self.sweep_at(Utc::now().timestamp_millis()).await
    }
}

/// Run a sweep through `router` every `period`, starting one period from now.
///
/// `period` must be non-zero. The task stops only when the router shuts down
/// or the handle is aborted.
pub fn spawn_sweeper(router: RouterHandle, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match router.sweep().await {
                Ok(removed) => debug!("Scheduled sweep removed {} jobs", removed),
                Err(e) if e.is_closed() => {
                    debug!("Router closed, stopping sweeper");
                    break;
                }
                Err(e) => warn!("Scheduled sweep failed: {}", e),
            }
        }
    })
}
