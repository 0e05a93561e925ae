//! Selector-driven article extraction from fetched HTML.
//!
//! A source's [`SelectorSet`] is configuration, not code: the extractor
//! delegates every selector string to the `scraper` engine and never
//! interprets its syntax. Two page shapes are supported:
//!
//! - **Block mode** (`block` selector configured): each block element is one
//!   repeated article unit; `title`, `content`, and `date` are selected inside
//!   it independently. A missing sub-element yields an absent field on that
//!   candidate rather than aborting the block.
//! - **Positional mode** (no `block` selector): `title`, `content`, and
//!   `date` are selected as parallel page-wide lists and paired by index.
//!   Pairing is unsafe when the title and date counts disagree, so that case
//!   is an operator-visible error; a short or empty content list is fine
//!   because content is optional.

use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use crate::error::CrawlError;
use crate::models::{CandidateRecord, SelectorSet};

/// Apply a source's selectors to a fetched page and yield candidate records.
///
/// # Errors
///
/// * [`CrawlError::InvalidSelector`] - a selector string is not valid CSS
/// * [`CrawlError::NoMatchingBlock`] - block mode with zero block matches;
///   the selector configuration is likely stale for the current markup
/// * [`CrawlError::SelectorCountMismatch`] - positional mode with differing
///   title and date counts
pub fn extract(html: &str, selectors: &SelectorSet) -> Result<Vec<CandidateRecord>, CrawlError> {
    let document = Html::parse_document(html);

    let title = parse_selector(&selectors.title)?;
    let content = parse_selector(&selectors.content)?;
    let date = parse_selector(&selectors.date)?;

    match &selectors.block {
        Some(block) => extract_blocks(&document, block, &title, &content, &date),
        None => extract_positional(&document, &title, &content, &date),
    }
}

fn parse_selector(selector: &str) -> Result<Selector, CrawlError> {
    Selector::parse(selector).map_err(|_| CrawlError::InvalidSelector {
        selector: selector.to_string(),
    })
}

fn extract_blocks(
    document: &Html,
    block: &str,
    title: &Selector,
    content: &Selector,
    date: &Selector,
) -> Result<Vec<CandidateRecord>, CrawlError> {
    let block_selector = parse_selector(block)?;
    let blocks: Vec<ElementRef> = document.select(&block_selector).collect();
    if blocks.is_empty() {
        warn!(selector = %block, "Block selector matched nothing");
        return Err(CrawlError::NoMatchingBlock {
            selector: block.to_string(),
        });
    }

    Ok(blocks
        .into_iter()
        .map(|unit| CandidateRecord {
            title: first_text(unit, title),
            content: first_text(unit, content),
            raw_date: first_text(unit, date),
        })
        .collect())
}

fn extract_positional(
    document: &Html,
    title: &Selector,
    content: &Selector,
    date: &Selector,
) -> Result<Vec<CandidateRecord>, CrawlError> {
    let titles = all_texts(document, title);
    let contents = all_texts(document, content);
    let dates = all_texts(document, date);

    if titles.len() != dates.len() {
        warn!(
            titles = titles.len(),
            dates = dates.len(),
            "The number of titles does not match the number of dates"
        );
        return Err(CrawlError::SelectorCountMismatch {
            titles: titles.len(),
            dates: dates.len(),
        });
    }

    Ok(titles
        .into_iter()
        .zip(dates)
        .enumerate()
        .map(|(i, (title, raw_date))| CandidateRecord {
            title: Some(title),
            content: contents.get(i).cloned(),
            raw_date: Some(raw_date),
        })
        .collect())
}

/// Inner text of the first element matching `selector` inside `scope`.
fn first_text(scope: ElementRef, selector: &Selector) -> Option<String> {
    scope.select(selector).next().map(element_text)
}

/// Inner texts of every element matching `selector`, in document order.
fn all_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document.select(selector).map(element_text).collect()
}

/// Collect an element's text nodes into one whitespace-normalized string.
fn element_text(element: ElementRef) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
