//! Data models shared by the fetch, state and notify stages.
//!
//! - [`Article`]: one news item as projected from either the feed or the homepage
//! - [`FetchResult`]: which strategy produced the articles of a run
//! - [`RunReport`]: counters describing a single relay run

use chrono::{DateTime, FixedOffset};

/// A news article as discovered by one of the sources.
///
/// The `url` is the article's identity: two articles with the same URL are the
/// same article, whatever their titles say.
#[derive(Debug, Clone, PartialEq)]
pub struct Article {
    /// Headline, trimmed.
    pub title: String,
    /// Absolute article URL, trimmed. Used as the dedup key.
    pub url: String,
    /// Publication time in the source's own offset, when the source reports one.
    pub published_at: Option<DateTime<FixedOffset>>,
    /// Plain-text teaser with markup stripped.
    pub summary: Option<String>,
    /// Unique image URLs in discovery order.
    pub images: Vec<String>,
}

impl Article {
    /// Build an article with only the mandatory fields set.
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            published_at: None,
            summary: None,
            images: Vec::new(),
        }
    }

    /// The first image, if any. Used as the photo in photo mode.
    pub fn lead_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

/// Outcome of one fetch, tagged with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Articles parsed from the RSS/Atom feed.
    Feed(Vec<Article>),
    /// Articles scraped from the homepage after the feed failed or came back empty.
    Html(Vec<Article>),
    /// Both strategies failed or produced nothing.
    Empty,
}

impl FetchResult {
    /// Articles of this result, newest first.
    pub fn articles(&self) -> &[Article] {
        match self {
            FetchResult::Feed(a) | FetchResult::Html(a) => a,
            FetchResult::Empty => &[],
        }
    }

    /// Short label for logs: `"feed"`, `"html"` or `"none"`.
    pub fn strategy(&self) -> &'static str {
        match self {
            FetchResult::Feed(_) => "feed",
            FetchResult::Html(_) => "html",
            FetchResult::Empty => "none",
        }
    }
}

/// Counters for a single relay run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Articles returned by the fetcher.
    pub fetched: usize,
    /// Fetched articles whose URL was not in the seen-set.
    pub unseen: usize,
    /// Articles delivered successfully.
    pub sent: usize,
    /// Articles whose delivery failed (still marked seen).
    pub failed: usize,
    /// Whether the seen-set was written back to disk.
    pub persisted: bool,
}

impl RunReport {
    /// Number of articles handed to the notifier this run.
    pub fn attempted(&self) -> usize {
        self.sent + self.failed
    }
}
