//! Markdown and JSON trend report generation.
//!
//! This module renders a [`TrendReport`] for the `trends` command.

use crate::models::{ReportMetadata, TrendEntry, TrendReport};
use anyhow::Result;

/// Width of the demand bar at 100%.
const BAR_WIDTH: usize = 20;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &TrendReport) -> String {
    let mut output = String::new();

    output.push_str("# Skill Trend Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_trends_section(&report.trends));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Jobs Tracked:** {}\n", metadata.total_jobs));
    section.push_str(&format!(
        "- **Distinct Skills:** {}\n",
        metadata.distinct_skills
    ));
    section.push_str(&format!(
        "- **Skill Mentions:** {}\n",
        metadata.total_mentions
    ));
    section.push('\n');

    section
}

/// Generate the ranked trend table.
fn generate_trends_section(trends: &[TrendEntry]) -> String {
    let mut section = String::new();

    section.push_str("## Skills in Demand\n\n");

    if trends.is_empty() {
        section.push_str("No jobs have been collected yet.\n\n");
        return section;
    }

    section.push_str("| Rank | Skill | Jobs | Demand | |\n");
    section.push_str("|:---:|:---|:---:|:---:|:---|\n");

    for (i, trend) in trends.iter().enumerate() {
        section.push_str(&format!(
            "| {} | {} | {} | {}% | `{}` |\n",
            i + 1,
            trend.skill,
            trend.count,
            trend.pct,
            demand_bar(trend.pct)
        ));
    }
    section.push('\n');

    section
}

/// Fixed-width text bar for a percentage.
fn demand_bar(pct: u32) -> String {
    let filled = (pct.min(100) as usize * BAR_WIDTH + 50) / 100;
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by SkillTrend*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &TrendReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
