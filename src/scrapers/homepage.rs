//! Homepage scraper, used when the feed is down or empty.
//!
//! Article-like nodes are located with a list of CSS selectors that covers the
//! site's JNews theme (`.jeg_post`, `h3.jeg_post_title`) as well as generic
//! WordPress markup (`article`, `.post`, `h2.entry-title`). Each node yields at
//! most one article: the first link inside it, titled by the link text or the
//! nearest heading.

use super::{ArticleSource, tidy};
use crate::error::FetchError;
use crate::models::Article;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

static CANDIDATES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("article, .post, .jeg_post, .entry-header, h3.jeg_post_title, h2.entry-title")
        .expect("valid candidate selector")
});
static ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("valid anchor selector"));
static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h2, h3").expect("valid heading selector"));
static IMAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("valid image selector"));

/// Homepage-backed [`ArticleSource`].
#[derive(Debug, Clone)]
pub struct HomepageSource {
    client: Client,
    url: String,
    limit: usize,
}

impl HomepageSource {
    /// Create a homepage source reading `url`, keeping at most `limit` entries.
    pub fn new(client: Client, url: impl Into<String>, limit: usize) -> Self {
        Self {
            client,
            url: url.into(),
            limit,
        }
    }
}

impl ArticleSource for HomepageSource {
    fn name(&self) -> &'static str {
        "homepage"
    }

    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<Article>, FetchError> {
        let base = Url::parse(&self.url)?;
        info!("Fetching homepage HTML");
        let html = self
            .client
            .get(base.clone())
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = html.len(), "Homepage body received");

        let articles = parse_homepage(&html, &base, self.limit);
        info!(count = articles.len(), "Extracted homepage articles");
        Ok(articles)
    }
}

/// Extract articles from a homepage document.
///
/// Relative links are resolved against `base`; anything that does not end up
/// as an `http`/`https` URL is skipped.
pub fn parse_homepage(html: &str, base: &Url, limit: usize) -> Vec<Article> {
    let document = Html::parse_document(html);

    let raw = document
        .select(&CANDIDATES)
        .filter_map(|node| extract(node, base))
        .collect::<Vec<_>>();
    debug!(candidates = raw.len(), "Homepage candidates");

    tidy(raw, limit)
}

fn extract(node: ElementRef<'_>, base: &Url) -> Option<Article> {
    let anchor = node.select(&ANCHOR).next()?;
    let url = resolve(base, anchor.value().attr("href")?)?;

    let title = Some(text_of(anchor))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            let heading = node.select(&HEADING).next().unwrap_or(node);
            Some(text_of(heading)).filter(|t| !t.is_empty())
        })?;

    let mut article = Article::new(title, url);
    article.images.extend(lead_image(node, base));
    Some(article)
}

fn lead_image(node: ElementRef<'_>, base: &Url) -> Option<String> {
    let img = node.select(&IMAGE).next()?;
    // Lazy-loading themes keep the real source in data-src.
    ["data-src", "src"]
        .into_iter()
        .filter_map(|key| img.value().attr(key))
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.starts_with("data:"))
        .and_then(|src| resolve(base, src))
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let resolved = base.join(href).ok()?;
    matches!(resolved.scheme(), "http" | "https").then(|| resolved.to_string())
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;

    const PAGE: &str = r##"<!doctype html>
<html><body>
  <div class="jeg_post">
    <div class="jeg_thumb"><a href="/20251015/first/"><img src="data:image/gif;base64,R0lG" data-src="/wp-content/first.jpg"></a></div>
    <h3 class="jeg_post_title"><a href="/20251015/first/">  First   story </a></h3>
  </div>
  <article>
    <a href="https://www.chinapress.com.my/20251015/second/"><span></span></a>
    <h2>Second story</h2>
    <img src="https://cdn.example/second.jpg">
  </article>
  <article>
    <a href="#comments">Comments</a>
  </article>
  <article>
    <a href="javascript:void(0)">Share</a>
  </article>
  <div class="post">
    <a href="/20251015/third/">Third story</a>
  </div>
  <h2 class="entry-title"><a href="/20251015/first/">First story again</a></h2>
</body></html>"##;

    fn base() -> Url {
        Url::parse("https://www.chinapress.com.my/").unwrap()
    }

    #[test]
    fn test_parse_homepage_extracts_and_dedups() {
        let articles = parse_homepage(PAGE, &base(), 30);
        let urls: Vec<_> = articles.iter().map(|a| a.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://www.chinapress.com.my/20251015/first/",
                "https://www.chinapress.com.my/20251015/second/",
                "https://www.chinapress.com.my/20251015/third/",
            ]
        );
    }

    #[test]
    fn test_title_falls_back_to_heading() {
        let articles = parse_homepage(PAGE, &base(), 30);
        assert_eq!(articles[1].title, "Second story");
        assert_eq!(articles[1].images, vec!["https://cdn.example/second.jpg"]);
    }

    #[test]
    fn test_first_node_wins_and_prefers_lazy_image() {
        let articles = parse_homepage(PAGE, &base(), 30);
        let first = &articles[0];
        // The thumbnail link has no text, so the heading supplies the title.
        assert_eq!(first.title, "First story");
        assert_eq!(
            first.images,
            vec!["https://www.chinapress.com.my/wp-content/first.jpg"]
        );
        assert!(first.published_at.is_none());
    }

    #[test]
    fn test_limit_applies() {
        let articles = parse_homepage(PAGE, &base(), 2);
        assert_eq!(articles.len(), 2);
    }

    #[test]
    fn test_page_without_articles() {
        let articles = parse_homepage("<html><body><p>maintenance</p></body></html>", &base(), 30);
        assert!(articles.is_empty());
    }

    #[tokio::test]
    async fn test_homepage_not_found_is_http_error() {
        let server = StubServer::start(vec![]).await;
        let source = HomepageSource::new(Client::new(), server.url("/"), 10);

        match source.fetch().await {
            Err(FetchError::Http(e)) => {
                assert_eq!(e.status().map(|s| s.as_u16()), Some(404));
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_homepage_source_fetches_over_http() {
        let server = StubServer::start(vec![("/", 200, PAGE)]).await;
        let source = HomepageSource::new(Client::new(), server.url("/"), 10);

        let articles = source.fetch().await.unwrap();
        assert_eq!(articles.len(), 3);
        // Relative links resolve against the page that was fetched.
        assert_eq!(articles[0].url, server.url("/20251015/first/"));
    }
}
