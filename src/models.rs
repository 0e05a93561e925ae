//! Data models for crawl sources and the articles extracted from them.
//!
//! This module defines the core data structures used throughout the application:
//! - [`Source`]: A configured page to poll, with its cron schedule and selectors
//! - [`SelectorSet`]: The role → CSS-selector mapping that drives extraction
//! - [`CandidateRecord`]: A raw, unvalidated extraction result (never persisted)
//! - [`NewsArticle`]: A deduplicated article as handed to storage
//!
//! `Source` and `SelectorSet` use camelCase field names on the wire to match
//! the JSON shape of the sources file, hence the serde rename attributes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A configured source: one page polled on its own cron schedule.
///
/// # Invariants
///
/// * `url` is unique across all sources and doubles as the natural key used
///   by [`crate::registry::JobRegistry`] for job replacement and cancellation.
/// * `schedule` must be a 6-field cron expression
///   (`sec min hour day month weekday`) before a job is created from it;
///   validation happens at registration, not at deserialization.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Opaque numeric identity, referenced by every article the source yields.
    pub id: i64,
    /// The page URL to fetch. Unique.
    pub url: String,
    /// 6-field cron expression controlling when the source is polled.
    pub schedule: String,
    /// CSS selectors describing where to find articles on the page.
    pub selectors: SelectorSet,
    /// Inactive sources keep their configuration but are never scheduled.
    pub is_active: bool,
}

/// The CSS selectors that drive extraction for one source.
///
/// `title`, `content`, and `date` are required roles. `block` optionally scopes
/// one repeated article unit on the page; when present, the three role
/// selectors are evaluated inside each block instead of page-wide. `date_pattern`
/// optionally supplies an explicit chrono-style format for the raw date text.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorSet {
    /// Selector for the article title.
    pub title: String,
    /// Selector for the article body/teaser. Content is optional per record.
    pub content: String,
    /// Selector for the publish-date text.
    pub date: String,
    /// Optional selector scoping one repeated article unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<String>,
    /// Optional chrono format pattern for the date text, e.g. `"%d.%m.%Y"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_pattern: Option<String>,
}

/// A raw extraction result before date normalization and dedup.
///
/// Any field may be absent; a candidate missing its title or with an
/// unparseable date is skipped during a run, never treated as a fatal error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateRecord {
    /// The article title text, if the title selector matched.
    pub title: Option<String>,
    /// The article content text, if the content selector matched.
    pub content: Option<String>,
    /// The unparsed publish-date text, if the date selector matched.
    pub raw_date: Option<String>,
}

/// A validated, deduplicated article as handed to the storage collaborator.
///
/// Articles are immutable once created: the core never updates or deletes
/// them. `hash` is a deterministic function of the lowercased title, the
/// publish date, and the owning source id (see [`crate::dedup::article_hash`]);
/// storage enforces its uniqueness per source.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    /// The article title as extracted.
    pub title: String,
    /// The article body/teaser, when the source exposes one.
    pub content: Option<String>,
    /// The normalized publish date.
    pub publish_date: NaiveDate,
    /// Id of the owning [`Source`].
    pub source_id: i64,
    /// Deterministic fingerprint used for duplicate detection.
    pub hash: String,
}
