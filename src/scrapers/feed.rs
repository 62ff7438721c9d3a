//! RSS 2.0 / Atom feed source.
//!
//! The feed is the preferred strategy: unlike the homepage it carries
//! publication dates, teasers and media attachments. Parsing is done with a
//! streaming `quick-xml` reader so that both `<item>` (RSS) and `<entry>`
//! (Atom) documents are handled by the same loop.
//!
//! # Field sources
//!
//! | Article field | RSS | Atom |
//! |---------------|-----|------|
//! | `title` | `<title>` | `<title>` |
//! | `url` | `<link>`, else a permalink `<guid>` | `<link href>` (rel `alternate` or none) |
//! | `published_at` | `<pubDate>`, `<dc:date>` | `<published>`, else `<updated>` |
//! | `summary` | `<description>`, else `<content:encoded>` | `<summary>`, else `<content>` |
//! | `images` | `media:content`, `media:thumbnail`, image `enclosure`, `<img>` in the description | same |

use super::{ArticleSource, tidy};
use crate::error::FetchError;
use crate::models::Article;
use crate::utils::strip_markup;
use chrono::{DateTime, FixedOffset};
use itertools::Itertools;
use once_cell::sync::Lazy;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

static IMG_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).expect("valid img regex"));

/// Feed-backed [`ArticleSource`].
#[derive(Debug, Clone)]
pub struct FeedSource {
    client: Client,
    url: String,
    limit: usize,
}

impl FeedSource {
    /// Create a feed source reading `url`, keeping at most `limit` entries.
    pub fn new(client: Client, url: impl Into<String>, limit: usize) -> Self {
        Self {
            client,
            url: url.into(),
            limit,
        }
    }
}

impl ArticleSource for FeedSource {
    fn name(&self) -> &'static str {
        "feed"
    }

    #[instrument(level = "info", skip_all, fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<Article>, FetchError> {
        info!("Fetching feed");
        let body = self
            .client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        debug!(bytes = body.len(), "Feed body received");

        let articles = parse_feed(&body, self.limit)?;
        info!(count = articles.len(), "Parsed feed entries");
        Ok(articles)
    }
}

/// Parse an RSS or Atom document into articles.
///
/// Entries without a title or link are skipped. The result has gone through
/// [`tidy`], so it is deduplicated, newest first and capped at `limit`.
///
/// # Errors
///
/// Returns [`FetchError::Xml`] if the document is not well-formed.
pub fn parse_feed(xml: &str, limit: usize) -> Result<Vec<Article>, FetchError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut raw = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    // Open elements below the current item/entry. Fields are its direct
    // children; anything deeper is inline markup kept in the field's text.
    let mut depth = 0usize;
    let mut field = String::new();
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = tag_name(&e);
                let Some(entry) = current.as_mut() else {
                    if name == "item" || name == "entry" {
                        current = Some(EntryBuilder::default());
                        depth = 0;
                    }
                    continue;
                };
                if depth == 0 {
                    text.clear();
                    entry.absorb_attributes(&name, &e);
                    field = name;
                } else {
                    text.push('<');
                    text.push_str(&String::from_utf8_lossy(&e));
                    text.push('>');
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if let Some(entry) = current.as_mut() {
                    if depth == 0 || field == "media:group" {
                        entry.absorb_attributes(&tag_name(&e), &e);
                    } else {
                        text.push('<');
                        text.push_str(&String::from_utf8_lossy(&e));
                        text.push_str("/>");
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if current.is_some() && depth > 0 {
                    let chunk = match e.unescape() {
                        Ok(s) => s.into_owned(),
                        // HTML entities such as &nbsp; are not valid XML escapes.
                        Err(_) => html_escape::decode_html_entities(
                            &String::from_utf8_lossy(&e),
                        )
                        .into_owned(),
                    };
                    text.push_str(&chunk);
                }
            }
            Ok(Event::CData(e)) => {
                if current.is_some() && depth > 0 {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::End(e)) => {
                if current.is_none() {
                    continue;
                }
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match depth {
                    0 => {
                        if let Some(article) = current.take().and_then(EntryBuilder::build) {
                            raw.push(article);
                        } else {
                            debug!("Skipping feed entry without title or link");
                        }
                    }
                    1 => {
                        depth = 0;
                        if let Some(entry) = current.as_mut() {
                            entry.absorb_text(&name, std::mem::take(&mut text));
                        }
                        field.clear();
                    }
                    _ => {
                        depth -= 1;
                        text.push_str("</");
                        text.push_str(&name);
                        text.push('>');
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(position = reader.buffer_position(), error = %e, "Feed XML parse error");
                return Err(e.into());
            }
            _ => {}
        }
    }

    Ok(tidy(raw, limit))
}

fn tag_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).to_string()
}

fn attr(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key.as_bytes())
        .and_then(|a| a.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .ok()
}

#[derive(Default)]
struct EntryBuilder {
    title: Option<String>,
    link: Option<String>,
    guid: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    description: Option<String>,
    content: Option<String>,
    images: Vec<String>,
}

impl EntryBuilder {
    fn absorb_attributes(&mut self, name: &str, e: &BytesStart<'_>) {
        match name {
            "link" => {
                let rel = attr(e, "rel");
                if self.link.is_none() && matches!(rel.as_deref(), None | Some("alternate")) {
                    self.link = attr(e, "href");
                }
            }
            "media:content" | "media:thumbnail" => {
                let is_image = attr(e, "type").is_none_or(|t| t.starts_with("image/"))
                    && attr(e, "medium").is_none_or(|m| m == "image");
                if is_image {
                    self.images.extend(attr(e, "url"));
                }
            }
            "enclosure" => {
                if attr(e, "type").is_some_and(|t| t.starts_with("image/")) {
                    self.images.extend(attr(e, "url"));
                }
            }
            _ => {}
        }
    }

    fn absorb_text(&mut self, name: &str, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        let slot = match name {
            "title" => &mut self.title,
            "link" => &mut self.link,
            "guid" => &mut self.guid,
            "pubDate" | "published" | "dc:date" => &mut self.published,
            "updated" => &mut self.updated,
            "description" | "summary" => &mut self.description,
            "content:encoded" | "content" => &mut self.content,
            _ => return,
        };
        if slot.is_none() {
            *slot = Some(text);
        }
    }

    fn build(self) -> Option<Article> {
        let title = strip_markup(&self.title?)?;
        let url = self
            .link
            .or(self.guid.filter(|g| g.starts_with("http://") || g.starts_with("https://")))?;

        let published_at = self
            .published
            .as_deref()
            .and_then(parse_date)
            .or_else(|| self.updated.as_deref().and_then(parse_date));

        let body = self.description.or(self.content);

        let mut images = self.images;
        if let Some(html) = body.as_deref() {
            images.extend(IMG_SRC.captures_iter(html).map(|c| c[1].to_string()));
        }

        Some(Article {
            title,
            url,
            published_at,
            summary: body.as_deref().and_then(strip_markup),
            images: images.into_iter().unique().collect(),
        })
    }
}
