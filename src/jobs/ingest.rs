//! Scraped job ingestion: URL dedup and the record cap.

use super::{JobError, TrendService};
use crate::models::JobRecord;
use tracing::debug;

/// Append `record` unless its URL is already present, then keep only the
/// newest `max` records. Returns whether the record was inserted.
pub fn append_capped(records: &mut Vec<JobRecord>, record: JobRecord, max: usize) -> bool {
    if records.iter().any(|r| r.url == record.url) {
        return false;
    }

    records.push(record);
    if records.len() > max {
        let overflow = records.len() - max;
        records.drain(..overflow);
    }
    true
}

impl TrendService {
    /// Store a freshly scraped job.
    ///
    /// Duplicate URLs are a silent no-op and return `Ok(false)`.
    pub async fn add_job(&self, record: JobRecord) -> Result<bool, JobError> {
        record.validate()?;

        let mut records = self.jobs.load().await?;
        let url = record.url.clone();
        if !append_capped(&mut records, record, self.limits.max_jobs) {
            debug!("Skipping duplicate job {}", url);
            return Ok(false);
        }

        self.jobs.save(&records).await?;
        self.show_count(records.len());
        debug!("Stored job {} ({} total)", url, records.len());
        Ok(true)
    }
}
