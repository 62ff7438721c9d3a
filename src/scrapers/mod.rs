//! Article sources for the relayed news site.
//!
//! Two strategies are available, tried in order by [`crate::fetcher::Fetcher`]:
//!
//! | Source | Module | Method | Notes |
//! |--------|--------|--------|-------|
//! | Feed | [`feed`] | RSS 2.0 / Atom via `quick-xml` | Preferred; carries dates, summaries, images |
//! | Homepage | [`homepage`] | HTML scraping via `scraper` | Fallback; titles, links and a lead image only |
//!
//! Both implement [`ArticleSource`] and pass their raw results through
//! [`tidy`] so that callers always see the same shape: no blank titles or
//! URLs, one article per URL, newest first, at most `limit` entries.

use crate::error::FetchError;
use crate::models::Article;
use itertools::Itertools;
use std::cmp::Reverse;

pub mod feed;
pub mod homepage;

/// A place articles can be fetched from.
pub trait ArticleSource {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Fetch the latest articles, newest first.
    ///
    /// An empty vector is a valid answer; errors cover transport and parse
    /// failures only.
    async fn fetch(&self) -> Result<Vec<Article>, FetchError>;
}

/// Normalize a raw article list.
///
/// - drops entries with a blank title or URL
/// - collapses duplicate URLs, keeping the first occurrence
/// - sorts newest first when every entry carries a timestamp, otherwise keeps
///   source order
/// - keeps at most `limit` entries
pub fn tidy(raw: Vec<Article>, limit: usize) -> Vec<Article> {
    let mut articles: Vec<Article> = raw
        .into_iter()
        .map(|mut a| {
            a.title = a.title.trim().to_string();
            a.url = a.url.trim().to_string();
            a
        })
        .filter(|a| !a.title.is_empty() && !a.url.is_empty())
        .unique_by(|a| a.url.clone())
        .collect();

    if !articles.is_empty() && articles.iter().all(|a| a.published_at.is_some()) {
        articles.sort_by_key(|a| Reverse(a.published_at));
    }

    articles.truncate(limit);
    articles
}
