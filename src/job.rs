//! One crawl run: fetch → extract → normalize → dedupe → persist.
//!
//! [`SourceJob`] is the unit of recurring work the scheduler invokes on every
//! tick, and also the surface a manual/on-demand trigger calls directly. A run
//! is all-or-nothing: either the surviving batch is persisted in one storage
//! call, or the run aborts with an error and persists nothing, including
//! when the wall-clock time budget trips after extraction already produced
//! results.
//!
//! Per-record problems inside a run (missing title, unparseable date) are
//! skips, not errors: one bad record never aborts the batch.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

use crate::dates;
use crate::dedup::{article_hash, filter_new};
use crate::error::CrawlError;
use crate::extract::extract;
use crate::fetch::PageFetcher;
use crate::models::{NewsArticle, Source};
use crate::storage::Storage;

/// Default wall-clock budget per run, fetch start to end of normalization.
pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(30);

/// Executes crawl runs against a fetcher and a storage collaborator.
pub struct SourceJob {
    fetcher: Arc<dyn PageFetcher>,
    storage: Arc<dyn Storage>,
    budget: Duration,
}

impl SourceJob {
    pub fn new(fetcher: Arc<dyn PageFetcher>, storage: Arc<dyn Storage>, budget: Duration) -> Self {
        Self {
            fetcher,
            storage,
            budget,
        }
    }

    /// Run the full pipeline once for one source.
    ///
    /// # Returns
    ///
    /// The number of newly persisted articles; `Ok(0)` when everything on the
    /// page was already known.
    ///
    /// # Errors
    ///
    /// Fetch, extraction, budget, and storage failures abort the run; see
    /// [`CrawlError`]. Scheduled invocations catch these at the registry's
    /// per-job boundary, manual invocations receive them directly.
    #[instrument(level = "info", skip_all, fields(url = %source.url))]
    pub async fn run(&self, source: &Source) -> Result<usize, CrawlError> {
        info!("Start scanning for new articles");
        let started = Instant::now();

        let page = self.fetcher.fetch(&source.url).await?;
        let candidates = extract(&page, &source.selectors)?;
        let scanned = candidates.len();

        let pattern = source.selectors.date_pattern.as_deref();
        let mut articles: Vec<NewsArticle> = Vec::new();
        for candidate in candidates {
            let Some(title) = candidate.title.filter(|t| !t.is_empty()) else {
                warn!("Skipping record with missing title");
                continue;
            };
            let publish_date = candidate
                .raw_date
                .as_deref()
                .and_then(|raw| dates::normalize(raw, pattern));
            let Some(publish_date) = publish_date else {
                warn!(title = %title, "Skipping record with missing or unparseable date");
                continue;
            };

            let hash = article_hash(&title, publish_date, source.id);
            articles.push(NewsArticle {
                title,
                content: candidate.content,
                publish_date,
                source_id: source.id,
                hash,
            });
        }

        let elapsed = started.elapsed();
        if elapsed > self.budget {
            warn!(?elapsed, budget = ?self.budget, "Run exceeded its time budget; persisting nothing");
            return Err(CrawlError::TimeBudgetExceeded {
                elapsed,
                budget: self.budget,
            });
        }

        let known = self.storage.find_known_hashes(source.id).await?;
        let fresh = filter_new(articles, &known);

        if fresh.is_empty() {
            info!(scanned, "No new articles were found");
            return Ok(0);
        }

        info!(scanned, new = fresh.len(), "Found and saving new articles");
        self.storage.save_articles(&fresh).await?;
        Ok(fresh.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::PageFetcher;
    use crate::models::SelectorSet;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    /// Serves one canned page for every URL.
    struct StaticFetcher(&'static str);

    #[async_trait]
    impl PageFetcher for StaticFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, CrawlError> {
            Ok(self.0.to_string())
        }
    }

    /// Always fails, simulating a network outage.
    struct FailingFetcher;

    #[async_trait]
    impl PageFetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> Result<String, CrawlError> {
            Err(CrawlError::Fetch {
                url: url.to_string(),
                reason: "connection refused".to_string(),
            })
        }
    }

    const PAGE: &str = r#"
        <h2 class="t">Alpha</h2><p class="c">Body a</p><span class="d">15.01.2025</span>
        <h2 class="t">Beta</h2><p class="c">Body b</p><span class="d">16.01.2025</span>
        <h2 class="t">Gamma</h2><p class="c">Body c</p><span class="d">not a date</span>"#;

    fn source() -> Source {
        Source {
            id: 1,
            url: "https://news.example.com".to_string(),
            schedule: "0 * * * * *".to_string(),
            selectors: SelectorSet {
                title: ".t".to_string(),
                content: ".c".to_string(),
                date: ".d".to_string(),
                block: None,
                date_pattern: None,
            },
            is_active: true,
        }
    }

    fn job(page: &'static str, storage: Arc<MemoryStorage>) -> SourceJob {
        SourceJob::new(Arc::new(StaticFetcher(page)), storage, DEFAULT_TIME_BUDGET)
    }

    #[tokio::test]
    async fn test_run_persists_only_parseable_records() {
        let storage = Arc::new(MemoryStorage::new(Vec::new()));
        // 3 candidates on the page, one with an unparseable date.
        let saved = job(PAGE, Arc::clone(&storage)).run(&source()).await.unwrap();

        assert_eq!(saved, 2);
        let articles = storage.saved_articles();
        assert_eq!(articles[0].title, "Alpha");
        assert_eq!(
            articles[0].publish_date,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
        );
        assert_eq!(articles[1].title, "Beta");
    }

    #[tokio::test]
    async fn test_run_skips_already_known_hashes() {
        let storage = Arc::new(MemoryStorage::new(Vec::new()));
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let known = NewsArticle {
            title: "Alpha".to_string(),
            content: None,
            publish_date: date,
            source_id: 1,
            hash: article_hash("Alpha", date, 1),
        };
        storage.save_articles(&[known]).await.unwrap();

        let saved = job(PAGE, Arc::clone(&storage)).run(&source()).await.unwrap();
        assert_eq!(saved, 1);
        assert_eq!(storage.saved_articles().last().unwrap().title, "Beta");
    }

    #[tokio::test]
    async fn test_run_with_nothing_new_has_no_side_effect() {
        let storage = Arc::new(MemoryStorage::new(Vec::new()));
        let runner = job(PAGE, Arc::clone(&storage));
        runner.run(&source()).await.unwrap();

        // Second run over the identical page finds nothing new.
        assert_eq!(runner.run(&source()).await.unwrap(), 0);
        assert_eq!(storage.saved_articles().len(), 2);
    }

    #[tokio::test]
    async fn test_run_aborts_on_fetch_failure() {
        let storage = Arc::new(MemoryStorage::new(Vec::new()));
        let runner = SourceJob::new(
            Arc::new(FailingFetcher),
            Arc::clone(&storage) as Arc<dyn Storage>,
            DEFAULT_TIME_BUDGET,
        );

        let err = runner.run(&source()).await.unwrap_err();
        assert!(matches!(err, CrawlError::Fetch { .. }));
        assert!(storage.saved_articles().is_empty());
    }

    #[tokio::test]
    async fn test_run_aborts_on_selector_count_mismatch() {
        const MISMATCH_PAGE: &str = r#"
            <h2 class="t">One</h2><span class="d">15.01.2025</span>
            <h2 class="t">Two</h2><span class="d">16.01.2025</span>
            <h2 class="t">Three</h2>"#;
        let storage = Arc::new(MemoryStorage::new(Vec::new()));
        let err = job(MISMATCH_PAGE, Arc::clone(&storage))
            .run(&source())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CrawlError::SelectorCountMismatch { titles: 3, dates: 2 }
        ));
        assert!(storage.saved_articles().is_empty());
    }

    #[tokio::test]
    async fn test_run_over_budget_persists_nothing() {
        let storage = Arc::new(MemoryStorage::new(Vec::new()));
        let runner = SourceJob::new(
            Arc::new(StaticFetcher(PAGE)),
            Arc::clone(&storage) as Arc<dyn Storage>,
            Duration::ZERO,
        );

        let err = runner.run(&source()).await.unwrap_err();
        assert!(matches!(err, CrawlError::TimeBudgetExceeded { .. }));
        assert!(storage.saved_articles().is_empty());
    }
}
