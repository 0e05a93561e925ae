//! Storage collaborator boundary.
//!
//! The crawl core does not own a storage engine; it only needs three query
//! shapes, captured by the [`Storage`] trait: the active sources at startup,
//! the set of hashes already known for one source (the scoped dedup query),
//! and an atomic batch insert that can distinguish a uniqueness violation
//! from any other failure.
//!
//! [`MemoryStorage`] is the in-process implementation behind the binary and
//! the tests: sources come from a JSON file, articles live in a mutex-guarded
//! vector with per-source hash uniqueness enforced all-or-nothing per batch.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, instrument};

use crate::error::CrawlError;
use crate::models::{NewsArticle, Source};

/// The persistence operations the crawl core consumes.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Every source with `is_active` set; used once at startup bootstrap.
    async fn find_active_sources(&self) -> Result<Vec<Source>, CrawlError>;

    /// Hashes already stored for one source. A scoped query, never a scan
    /// across other sources' articles.
    async fn find_known_hashes(&self, source_id: i64) -> Result<HashSet<String>, CrawlError>;

    /// Insert a batch of articles atomically.
    ///
    /// # Errors
    ///
    /// [`CrawlError::PersistenceConflict`] when any article's hash already
    /// exists for its source (the whole batch is rejected);
    /// [`CrawlError::Storage`] for any other failure.
    async fn save_articles(&self, articles: &[NewsArticle]) -> Result<(), CrawlError>;
}

/// In-process [`Storage`] backed by a mutex-guarded vector.
#[derive(Debug)]
pub struct MemoryStorage {
    sources: Vec<Source>,
    articles: Mutex<Vec<NewsArticle>>,
}

impl MemoryStorage {
    pub fn new(sources: Vec<Source>) -> Self {
        Self {
            sources,
            articles: Mutex::new(Vec::new()),
        }
    }

    /// Load sources from a JSON file containing an array of [`Source`].
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn from_sources_file(path: impl AsRef<Path>) -> Result<Self, CrawlError> {
        let raw = tokio::fs::read_to_string(path.as_ref())
            .await
            .map_err(|e| CrawlError::Storage(format!("cannot read sources file: {e}")))?;
        let sources: Vec<Source> = serde_json::from_str(&raw)
            .map_err(|e| CrawlError::Storage(format!("malformed sources file: {e}")))?;

        // Source urls are unique: they are the scheduling key.
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.url.as_str()) {
                return Err(CrawlError::Storage(format!(
                    "source url {} appears more than once",
                    source.url
                )));
            }
        }

        info!(count = sources.len(), "Loaded sources");
        Ok(Self::new(sources))
    }

    /// Snapshot of everything saved so far, in insertion order.
    pub fn saved_articles(&self) -> Vec<NewsArticle> {
        self.articles.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn find_active_sources(&self) -> Result<Vec<Source>, CrawlError> {
        Ok(self
            .sources
            .iter()
            .filter(|source| source.is_active)
            .cloned()
            .collect())
    }

    async fn find_known_hashes(&self, source_id: i64) -> Result<HashSet<String>, CrawlError> {
        let articles = self.articles.lock().unwrap();
        Ok(articles
            .iter()
            .filter(|article| article.source_id == source_id)
            .map(|article| article.hash.clone())
            .collect())
    }

    async fn save_articles(&self, articles: &[NewsArticle]) -> Result<(), CrawlError> {
        let mut stored = self.articles.lock().unwrap();

        // All-or-nothing: reject the whole batch on the first conflict,
        // including duplicates inside the batch itself.
        let mut incoming: HashSet<(i64, &str)> = HashSet::new();
        for article in articles {
            let key = (article.source_id, article.hash.as_str());
            let conflict = !incoming.insert(key)
                || stored
                    .iter()
                    .any(|existing| (existing.source_id, existing.hash.as_str()) == key);
            if conflict {
                return Err(CrawlError::PersistenceConflict(format!(
                    "hash {} already stored for source {}",
                    article.hash, article.source_id
                )));
            }
        }

        stored.extend_from_slice(articles);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::article_hash;
    use chrono::NaiveDate;

    fn article(title: &str, source_id: i64) -> NewsArticle {
        let publish_date = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        NewsArticle {
            title: title.to_string(),
            content: Some("body".to_string()),
            publish_date,
            source_id,
            hash: article_hash(title, publish_date, source_id),
        }
    }

    #[tokio::test]
    async fn test_known_hashes_are_scoped_per_source() {
        let storage = MemoryStorage::new(Vec::new());
        storage
            .save_articles(&[article("a", 1), article("b", 2)])
            .await
            .unwrap();

        let hashes = storage.find_known_hashes(1).await.unwrap();
        assert_eq!(hashes.len(), 1);
        assert!(hashes.contains(&article("a", 1).hash));
    }

    #[tokio::test]
    async fn test_duplicate_hash_rejects_whole_batch() {
        let storage = MemoryStorage::new(Vec::new());
        storage.save_articles(&[article("a", 1)]).await.unwrap();

        let err = storage
            .save_articles(&[article("fresh", 1), article("a", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, CrawlError::PersistenceConflict(_)));
        // Nothing from the failed batch landed.
        assert_eq!(storage.saved_articles().len(), 1);
    }

    #[tokio::test]
    async fn test_same_hash_for_different_sources_is_allowed() {
        let storage = MemoryStorage::new(Vec::new());
        storage
            .save_articles(&[article("a", 1), article("a", 2)])
            .await
            .unwrap();
        assert_eq!(storage.saved_articles().len(), 2);
    }

    #[tokio::test]
    async fn test_from_sources_file_roundtrip() {
        let json = r#"[{
            "id": 1,
            "url": "https://news.example.com/lenta",
            "schedule": "0 */5 * * * *",
            "isActive": true,
            "selectors": {"title": "h2", "content": "p", "date": "time"}
        }]"#;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        tokio::fs::write(&path, json).await.unwrap();

        let storage = MemoryStorage::from_sources_file(&path).await.unwrap();
        let sources = storage.find_active_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].url, "https://news.example.com/lenta");
    }

    #[tokio::test]
    async fn test_from_sources_file_reports_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sources.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let err = MemoryStorage::from_sources_file(&path).await.unwrap_err();
        assert!(matches!(err, CrawlError::Storage(_)));
    }

    #[tokio::test]
    async fn test_find_active_sources_filters_inactive() {
        let selectors = crate::models::SelectorSet {
            title: "h2".into(),
            content: "p".into(),
            date: "time".into(),
            block: None,
            date_pattern: None,
        };
        let active = Source {
            id: 1,
            url: "https://a.example".into(),
            schedule: "0 * * * * *".into(),
            selectors,
            is_active: true,
        };
        let mut inactive = active.clone();
        inactive.id = 2;
        inactive.url = "https://b.example".into();
        inactive.is_active = false;

        let storage = MemoryStorage::new(vec![active, inactive]);
        let sources = storage.find_active_sources().await.unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, 1);
    }
}
