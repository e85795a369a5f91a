//! Skill trend aggregation and statistics.
//!
//! This module turns the stored job records into skill-frequency counts
//! with demand percentages. Everything here is a pure function of its input.

use crate::models::{JobRecord, TrendEntry};
use std::collections::{HashMap, HashSet};

/// Compute skill trends across all records.
///
/// Counts the records mentioning each skill, converts that to a share of the
/// record count and sorts by count, highest first. Equal counts keep
/// first-seen order. A skill repeated inside one record counts once.
pub fn compute_trends(records: &[JobRecord]) -> Vec<TrendEntry> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for record in records {
        let mut seen: HashSet<&str> = HashSet::new();
        for skill in &record.skills {
            if !seen.insert(skill.as_str()) {
                continue;
            }
            match index.get(skill.as_str()) {
                Some(&i) => counts[i].1 += 1,
                None => {
                    index.insert(skill.as_str(), counts.len());
                    counts.push((skill.as_str(), 1));
                }
            }
        }
    }

    let total = records.len();
    let mut trends: Vec<TrendEntry> = counts
        .into_iter()
        .map(|(skill, count)| TrendEntry {
            skill: skill.to_string(),
            count,
            pct: percentage(count, total),
        })
        .collect();

    // sort_by_key is stable, so ties stay in first-seen order
    trends.sort_by_key(|t| std::cmp::Reverse(t.count));
    trends
}

/// `round(count / total * 100)`, halves rounded up.
pub fn percentage(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((count as f64 / total as f64) * 100.0).round() as u32
}

/// Total number of skill mentions represented by a trend snapshot.
pub fn total_mentions(trends: &[TrendEntry]) -> usize {
    trends.iter().map(|t| t.count).sum()
}

/// Generate a short text summary of a trend snapshot.
pub fn generate_summary_text(trends: &[TrendEntry], total_jobs: usize, n: usize) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Jobs tracked: {}", total_jobs));
    lines.push(format!("Distinct skills: {}", trends.len()));

    if !trends.is_empty() {
        lines.push(String::new());
        lines.push("Top skills:".to_string());
        for trend in trends.iter().take(n) {
            lines.push(format!("- {}: {} ({}%)", trend.skill, trend.count, trend.pct));
        }
    }

    lines.join("\n")
}
