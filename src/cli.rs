//! Command-line interface definitions for newswatch.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Arguments can be provided via command-line flags or environment variables.

use clap::Parser;

use crate::job::DEFAULT_TIME_BUDGET;

/// Command-line arguments for the newswatch daemon.
///
/// # Examples
///
/// ```sh
/// # Run as a daemon, polling sources on their cron schedules
/// newswatch -s ./sources.json
///
/// # Crawl every active source exactly once and exit
/// newswatch -s ./sources.json --once
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the JSON file listing sources
    #[arg(short, long, env = "NEWSWATCH_SOURCES")]
    pub sources: String,

    /// Crawl every active source once and exit instead of scheduling
    #[arg(long)]
    pub once: bool,

    /// Wall-clock budget per crawl run, in seconds
    #[arg(long, env = "NEWSWATCH_TIME_BUDGET_SECS", default_value_t = DEFAULT_TIME_BUDGET.as_secs())]
    pub time_budget_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from(&["newswatch", "--sources", "./sources.json"]);
        assert_eq!(cli.sources, "./sources.json");
        assert!(!cli.once);
        assert_eq!(cli.time_budget_secs, 30);
    }

    #[test]
    fn test_cli_short_flags_and_once() {
        let cli = Cli::parse_from(&[
            "newswatch",
            "-s",
            "/tmp/sources.json",
            "--once",
            "--time-budget-secs",
            "5",
        ]);
        assert_eq!(cli.sources, "/tmp/sources.json");
        assert!(cli.once);
        assert_eq!(cli.time_budget_secs, 5);
    }
}
