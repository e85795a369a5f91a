//! Data models for the trend aggregator.
//!
//! This module contains the scraped job record, the derived trend entry
//! and the sync outcome, plus the validation applied at the store boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Default cap on retained job records.
pub const MAX_JOBS: usize = 100;

/// Reason a job record was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRecord {
    #[error("job url is empty")]
    EmptyUrl,
    #[error("job url must start with http:// or https://: {0}")]
    BadScheme(String),
    #[error("job timestamp must be positive, got {0}")]
    BadTimestamp(i64),
    #[error("job has a blank skill at position {0}")]
    BlankSkill(usize),
    #[error("job record is malformed: {0}")]
    Malformed(String),
}

/// One scraped job posting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Posting URL, unique within the store.
    pub url: String,
    /// Skill tags extracted from the posting text, in order.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Scrape time in epoch milliseconds.
    pub timestamp: i64,
    /// Remaining scrape metadata (title, company, ...), passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl JobRecord {
    /// Creates a record with no extra metadata.
    #[allow(dead_code)] // Builder utility, records normally arrive as JSON
    pub fn new(url: impl Into<String>, skills: Vec<String>, timestamp: i64) -> Self {
        Self {
            url: url.into(),
            skills,
            timestamp,
            extra: Map::new(),
        }
    }

    /// Decodes and validates a record from an untyped JSON value.
    pub fn from_value(value: Value) -> Result<Self, InvalidRecord> {
        let record: JobRecord =
            serde_json::from_value(value).map_err(|e| InvalidRecord::Malformed(e.to_string()))?;
        record.validate()?;
        Ok(record)
    }

    /// Checks the shape guarantees every stored record must satisfy.
    pub fn validate(&self) -> Result<(), InvalidRecord> {
        if self.url.trim().is_empty() {
            return Err(InvalidRecord::EmptyUrl);
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(InvalidRecord::BadScheme(self.url.clone()));
        }
        if self.timestamp <= 0 {
            return Err(InvalidRecord::BadTimestamp(self.timestamp));
        }
        if let Some(pos) = self.skills.iter().position(|s| s.trim().is_empty()) {
            return Err(InvalidRecord::BlankSkill(pos));
        }
        Ok(())
    }
}

/// Skill frequency across the stored job records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendEntry {
    pub skill: String,
    /// Number of records mentioning the skill.
    pub count: usize,
    /// `round(count / total_records * 100)`.
    pub pct: u32,
}

/// Result of a single sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SyncOutcome {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Metadata about a trend report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// When the snapshot was taken.
    pub generated_at: DateTime<Utc>,
    /// Number of job records the trends were computed from.
    pub total_jobs: usize,
    /// Number of distinct skills seen.
    pub distinct_skills: usize,
    /// Sum of all trend counts.
    pub total_mentions: usize,
}

/// A trend snapshot ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendReport {
    pub metadata: ReportMetadata,
    pub trends: Vec<TrendEntry>,
}

impl TrendReport {
    pub fn new(trends: Vec<TrendEntry>, total_jobs: usize) -> Self {
        let metadata = ReportMetadata {
            generated_at: Utc::now(),
            total_jobs,
            distinct_skills: trends.len(),
            total_mentions: crate::analysis::total_mentions(&trends),
        };
        Self { metadata, trends }
    }

    /// Keep only the `n` leading trends. Metadata still describes the full snapshot.
    pub fn truncate(&mut self, n: usize) {
        self.trends.truncate(n);
    }
}
