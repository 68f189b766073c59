use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stand-in link for entries that carry none.
pub const NO_LINK: &str = "No URL available";

/// One article pulled from a feed. Discarded once it has been summarized.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: Option<DateTime<Utc>>,
    pub body: String,
}

impl FeedEntry {
    pub fn new(title: impl Into<String>, link: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published: None,
            body: body.into(),
        }
    }
}

/// Result of a successful fetch: the feed's own title (if it has one) plus its entries,
/// most recent first as the feed reports them.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub title: Option<String>,
    pub entries: Vec<FeedEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedStatus {
    Active,
    Removed,
}

/// A subscribed feed, keyed by URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRecord {
    pub url: String,
    pub status: FeedStatus,
}

impl FeedRecord {
    pub fn active(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: FeedStatus::Active,
        }
    }

    pub fn removed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: FeedStatus::Removed,
        }
    }
}

/// A summarized article as it appears in the output document.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleSummary {
    pub title: String,
    pub link: String,
    pub summary: String,
}

impl ArticleSummary {
    pub fn has_link(&self) -> bool {
        let link = self.link.trim();
        !link.is_empty() && link != NO_LINK
    }
}

/// The rendered section for one feed. Never constructed with zero articles.
#[derive(Debug, Clone)]
pub struct SummaryBlock {
    pub label: String,
    pub url: String,
    pub articles: Vec<ArticleSummary>,
}
