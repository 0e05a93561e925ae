//! # newswatch
//!
//! A schedule-driven news crawler. Each configured source names a page URL,
//! a 6-field cron schedule, and a set of CSS selectors; newswatch polls every
//! active source on its own schedule, extracts article-like records,
//! normalizes their free-text publish dates, and persists only records it
//! has not seen before.
//!
//! ## Architecture
//!
//! Each scheduled tick runs one pipeline, independently of all other sources:
//! 1. **Fetch**: download the source's page ([`fetch`])
//! 2. **Extract**: apply the source's selectors to the HTML ([`extract`])
//! 3. **Normalize**: parse free-text publish dates ([`dates`])
//! 4. **Dedupe**: drop records whose hash is already stored ([`dedup`])
//! 5. **Persist**: save the surviving batch in one storage call ([`storage`])
//!
//! The recurring jobs themselves are owned by [`registry::JobRegistry`],
//! which adds, replaces, and cancels them as sources change.
//!
//! ## Usage
//!
//! ```sh
//! newswatch -s ./sources.json            # daemon mode
//! newswatch -s ./sources.json --once     # one manual crawl of each source
//! ```

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod dates;
mod dedup;
mod error;
mod extract;
mod fetch;
mod job;
mod models;
mod registry;
mod storage;

use cli::Cli;
use fetch::HttpFetcher;
use job::SourceJob;
use registry::JobRegistry;
use storage::{MemoryStorage, Storage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!("newswatch starting up");

    let args = Cli::parse();
    debug!(?args.sources, args.once, args.time_budget_secs, "Parsed CLI arguments");

    let storage = Arc::new(MemoryStorage::from_sources_file(&args.sources).await?);
    let runner = Arc::new(SourceJob::new(
        Arc::new(HttpFetcher::new()),
        Arc::clone(&storage) as Arc<dyn Storage>,
        Duration::from_secs(args.time_budget_secs),
    ));

    let active_sources = storage.find_active_sources().await?;
    info!(count = active_sources.len(), "Loaded active sources");

    if args.once {
        // Manual trigger surface: run each source directly, bypassing the
        // schedule. Errors propagate to us, the caller, per source.
        use futures::stream::{self, StreamExt};
        const PARALLEL_CRAWLS: usize = 4;

        let results: Vec<(&str, Result<usize, error::CrawlError>)> =
            stream::iter(active_sources.iter())
                .map(|source| {
                    let runner = Arc::clone(&runner);
                    async move { (source.url.as_str(), runner.run(source).await) }
                })
                .buffer_unordered(PARALLEL_CRAWLS)
                .collect()
                .await;

        let mut failures = 0usize;
        for (url, result) in results {
            match result {
                Ok(new_articles) => info!(%url, new_articles, "Crawl finished"),
                Err(e) => {
                    failures += 1;
                    error!(%url, error = %e, "Crawl failed");
                }
            }
        }
        info!(
            total = active_sources.len(),
            failed = failures,
            saved_articles = storage.saved_articles().len(),
            "One-shot crawl complete"
        );
        if failures > 0 {
            return Err(format!("{failures} source(s) failed").into());
        }
        return Ok(());
    }

    let mut registry = JobRegistry::new(runner).await?;
    let scheduled = registry.bootstrap(&active_sources).await;
    info!(scheduled, "Scheduler running; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    for source in &active_sources {
        registry.unregister(&source.url).await;
    }
    registry.shutdown().await?;

    Ok(())
}
