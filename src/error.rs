//! Error taxonomy for the crawl pipeline.
//!
//! Every failure a scheduled run can hit is a [`CrawlError`] variant, so the
//! per-job error boundary in [`crate::registry`] can log one typed value and
//! the manual-trigger path can hand the same value straight to its caller.
//!
//! Per-record problems (a missing title, an unparseable date) are deliberately
//! NOT errors: they reduce the candidate list and are logged as skips.

use std::time::Duration;
use thiserror::Error;

/// Everything that can abort a source registration or a single crawl run.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The source's cron expression is malformed; the source stays unscheduled.
    #[error("invalid cron schedule `{schedule}` for {url}: {reason}")]
    InvalidSchedule {
        url: String,
        schedule: String,
        reason: String,
    },

    /// Network or timeout failure fetching the page. Retried on the next tick.
    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// A configured selector string is not valid CSS.
    #[error("`{selector}` is not a valid CSS selector")]
    InvalidSelector { selector: String },

    /// The block selector matched nothing; the selector configuration is
    /// likely wrong for the current page markup.
    #[error("block selector `{selector}` matched no elements")]
    NoMatchingBlock { selector: String },

    /// Positional pairing is unsafe when title and date counts disagree.
    #[error("selector count mismatch: {titles} titles vs {dates} dates")]
    SelectorCountMismatch { titles: usize, dates: usize },

    /// The run blew its wall-clock budget; nothing from it is persisted.
    #[error("run exceeded time budget ({elapsed:?} > {budget:?})")]
    TimeBudgetExceeded { elapsed: Duration, budget: Duration },

    /// Storage rejected the batch because a hash already exists, e.g. a
    /// concurrent run inserted the same article first.
    #[error("uniqueness violation while saving articles: {0}")]
    PersistenceConflict(String),

    /// Any other storage failure.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The shared scheduling facility refused an add/remove operation.
    #[error("scheduler failure: {0}")]
    Scheduler(String),
}
