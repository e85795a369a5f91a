//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SkillTrend - job-skill trend aggregator
///
/// Collects scraped job postings, tracks which skills they ask for,
/// evicts stale postings weekly and pushes trend snapshots upstream.
///
/// Examples:
///   skilltrend ingest jobs.json
///   skilltrend trends --top 10
///   skilltrend set-url https://skillos.example.com/api/trends
///   skilltrend sync
///   skilltrend serve < messages.jsonl
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .skilltrend.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Directory holding the persisted buckets
    #[arg(long, value_name = "DIR", env = "SKILLTREND_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Override the retained job cap
    #[arg(long, value_name = "COUNT", global = true)]
    pub max_jobs: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Store scraped jobs from a JSON file (object or array); "-" reads stdin
    Ingest {
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Print the current skill trends
    Trends {
        /// Only show the N most demanded skills
        #[arg(long, value_name = "N")]
        top: Option<usize>,

        /// Output format (markdown, json)
        #[arg(long, default_value = "markdown", value_name = "FORMAT")]
        format: OutputFormat,

        /// Write the report to a file instead of stdout
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Delete every stored job
    Clear,

    /// Evict jobs older than the retention window now
    Sweep,

    /// Push the current trends to the configured endpoint
    Sync,

    /// Show the stored job count
    Status,

    /// Set or remove the sync endpoint
    SetUrl {
        #[arg(value_name = "URL", required_unless_present = "unset")]
        url: Option<String>,

        #[arg(long, conflicts_with = "url")]
        unset: bool,
    },

    /// Read JSON messages from stdin, one per line, and run the weekly sweep
    Serve {
        /// Keep all data in memory instead of the data directory
        #[arg(long)]
        ephemeral: bool,
    },

    /// Generate a default .skilltrend.toml configuration file
    InitConfig,
}

/// Output format for the trend report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_jobs == Some(0) {
            return Err("Max jobs must be at least 1".to_string());
        }

        match &self.command {
            Command::Trends { top: Some(0), .. } => {
                return Err("--top must be at least 1".to_string());
            }
            Command::SetUrl { url: Some(url), .. } => {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err("Sync URL must start with 'http://' or 'https://'".to_string());
                }
            }
            _ => {}
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args(command: Command) -> Args {
        Args {
            command,
            config: None,
            data_dir: None,
            max_jobs: None,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_subcommands() {
        let args = Args::try_parse_from(["skilltrend", "trends", "--top", "5", "--format", "json"])
            .unwrap();
        match args.command {
            Command::Trends { top, format, .. } => {
                assert_eq!(top, Some(5));
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = Args::try_parse_from(["skilltrend", "set-url", "--unset"]).unwrap();
        assert!(matches!(args.command, Command::SetUrl { url: None, unset: true }));

        assert!(Args::try_parse_from(["skilltrend", "set-url"]).is_err());
    }

    #[test]
    fn test_validation_invalid_url() {
        let args = make_args(Command::SetUrl {
            url: Some("skillos.dev".to_string()),
            unset: false,
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::Status);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_limits() {
        let mut args = make_args(Command::Status);
        args.max_jobs = Some(0);
        assert!(args.validate().is_err());

        let args = make_args(Command::Trends {
            top: Some(0),
            format: OutputFormat::Markdown,
            output: None,
        });
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::Status);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
