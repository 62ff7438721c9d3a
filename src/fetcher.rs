//! Fetch with fallback: feed first, homepage second, nothing third.

use crate::models::{Article, FetchResult};
use crate::scrapers::{ArticleSource, tidy};
use tracing::{error, info, instrument, warn};

/// Runs a primary source and falls back to a secondary one.
///
/// The fallback is tried when the primary fails or returns no articles.
/// A failure of both is logged and turned into [`FetchResult::Empty`]; it is
/// never an error for the caller.
#[derive(Debug)]
pub struct Fetcher<P, F> {
    primary: P,
    fallback: F,
    limit: usize,
}

impl<P, F> Fetcher<P, F>
where
    P: ArticleSource,
    F: ArticleSource,
{
    pub fn new(primary: P, fallback: F, limit: usize) -> Self {
        Self {
            primary,
            fallback,
            limit,
        }
    }

    /// Fetch the latest articles, newest first.
    #[instrument(level = "info", skip_all, fields(primary = self.primary.name(), fallback = self.fallback.name()))]
    pub async fn fetch(&self) -> FetchResult {
        match self.primary.fetch().await {
            Ok(articles) if !articles.is_empty() => {
                info!(count = articles.len(), source = self.primary.name(), "Primary source succeeded");
                return FetchResult::Feed(self.finish(articles));
            }
            Ok(_) => warn!(source = self.primary.name(), "Primary source returned no articles"),
            Err(e) => warn!(source = self.primary.name(), error = %e, "Primary source failed"),
        }

        match self.fallback.fetch().await {
            Ok(articles) if !articles.is_empty() => {
                info!(count = articles.len(), source = self.fallback.name(), "Fallback source succeeded");
                FetchResult::Html(self.finish(articles))
            }
            Ok(_) => {
                warn!(source = self.fallback.name(), "Fallback source returned no articles");
                FetchResult::Empty
            }
            Err(e) => {
                error!(source = self.fallback.name(), error = %e, "Fallback source failed");
                FetchResult::Empty
            }
        }
    }

    fn finish(&self, articles: Vec<Article>) -> Vec<Article> {
        tidy(articles, self.limit)
    }
}
