use anyhow::{Context, Result};
use async_trait::async_trait;
use feed_rs::model::Entry;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::models::{FeedEntry, FetchedFeed, NO_LINK};

const UNTITLED: &str = "Untitled";
const TEXT_WIDTH: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// The feed could not be reached or is not valid feed content.
    #[error("feed unavailable: {0}")]
    Unavailable(String),

    /// The feed parsed but yielded no entries with usable text.
    #[error("feed has no usable entries")]
    Empty,
}

/// Anything that can hand back the latest entries of a feed.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str, max_articles: usize) -> Result<FetchedFeed, FeedError>;
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (compatible; FeedSummaries/1.0)")
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl FeedSource for FeedFetcher {
    async fn fetch(&self, url: &str, max_articles: usize) -> Result<FetchedFeed, FeedError> {
        debug!(feed = %url, "Fetching feed");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FeedError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Unavailable(format!("HTTP error: {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::Unavailable(format!("Failed to read response body: {}", e)))?;

        parse_feed(&body, max_articles)
    }
}

/// Parse raw RSS/Atom bytes into at most `max_articles` entries.
///
/// Only the first `max_articles` entries are considered; entries among those with no
/// usable text are dropped. A feed left with nothing is [`FeedError::Empty`].
pub fn parse_feed(content: &[u8], max_articles: usize) -> Result<FetchedFeed, FeedError> {
    let feed = feed_rs::parser::parse(content)
        .map_err(|e| FeedError::Unavailable(format!("Failed to parse feed: {}", e)))?;

    let title = feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());

    let entries: Vec<FeedEntry> = feed
        .entries
        .into_iter()
        .take(max_articles)
        .filter_map(convert_entry)
        .collect();

    if entries.is_empty() {
        return Err(FeedError::Empty);
    }

    Ok(FetchedFeed { title, entries })
}

fn convert_entry(entry: Entry) -> Option<FeedEntry> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());

    // Prefer the summary, then the full content, then fall back to the title.
    let raw_body = entry
        .summary
        .as_ref()
        .map(|s| s.content.clone())
        .filter(|s| !s.trim().is_empty())
        .or_else(|| {
            entry
                .content
                .as_ref()
                .and_then(|c| c.body.clone())
                .filter(|b| !b.trim().is_empty())
        })
        .or_else(|| title.clone())?;

    let body = html_to_text(&raw_body);
    if body.trim().is_empty() {
        return None;
    }

    let link = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_else(|| NO_LINK.to_string());

    Some(FeedEntry {
        title: title.unwrap_or_else(|| UNTITLED.to_string()),
        link,
        published: entry.published.or(entry.updated),
        body,
    })
}

fn html_to_text(raw: &str) -> String {
    if !raw.contains('<') {
        return raw.trim().to_string();
    }

    html2text::from_read(raw.as_bytes(), TEXT_WIDTH)
        .trim()
        .to_string()
}
