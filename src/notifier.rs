//! Delivery of articles to a Telegram chat.
//!
//! # Architecture
//!
//! - [`Notifier`]: the seam the pipeline talks to, one article at a time
//! - [`TelegramNotifier`]: Bot API implementation (`sendMessage`, optionally
//!   `sendPhoto` with a text fallback)
//! - [`build_message`]: the HTML message layout shared by both calls
//!
//! # Message layout
//!
//! ```text
//! <b>Headline</b>
//! 🕒 2025-10-15 10:00
//! Optional teaser…
//! https://www.chinapress.com.my/20251015/newer/
//! ```

use crate::error::NotifyError;
use crate::models::Article;
use crate::utils::{truncate_chars, truncate_for_log};
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, error, instrument, warn};

/// Default Bot API endpoint.
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Telegram's limit for `sendMessage` text.
pub const MESSAGE_LIMIT: usize = 4096;
/// Telegram's limit for photo captions.
pub const CAPTION_LIMIT: usize = 1024;

const TITLE_LIMIT: usize = 256;
const SUMMARY_LIMIT: usize = 280;

/// Sends one article somewhere a human will read it.
pub trait Notifier {
    /// Deliver `article`.
    ///
    /// A failure only concerns this article; the caller decides what to do
    /// with it.
    async fn send(&self, article: &Article) -> Result<(), NotifyError>;
}

/// Presentation switches for outgoing messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageOptions {
    /// Ask Telegram not to render a link preview.
    pub disable_preview: bool,
    /// Append the article teaser below the timestamp.
    pub include_summary: bool,
    /// Post the lead image with a caption instead of a plain message.
    pub send_photos: bool,
}

/// Telegram Bot API client bound to a single chat.
pub struct TelegramNotifier {
    client: Client,
    api_url: String,
    bot_token: String,
    chat_id: String,
    options: MessageOptions,
}

impl std::fmt::Debug for TelegramNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramNotifier")
            .field("api_url", &self.api_url)
            .field("chat_id", &self.chat_id)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TelegramNotifier {
    pub fn new(
        client: Client,
        bot_token: impl Into<String>,
        chat_id: impl Into<String>,
        options: MessageOptions,
    ) -> Self {
        Self {
            client,
            api_url: TELEGRAM_API_URL.to_string(),
            bot_token: bot_token.into(),
            chat_id: chat_id.into(),
            options,
        }
    }

    /// Point the client at a different Bot API server (e.g. a self-hosted one).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Send an HTML text message.
    pub async fn send_message(&self, text: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": self.options.disable_preview,
        });
        self.call("sendMessage", &payload).await
    }

    /// Send a photo by URL with an HTML caption.
    pub async fn send_photo(&self, photo_url: &str, caption: &str) -> Result<(), NotifyError> {
        let payload = json!({
            "chat_id": self.chat_id,
            "photo": photo_url,
            "caption": caption,
            "parse_mode": "HTML",
        });
        self.call("sendPhoto", &payload).await
    }

    #[instrument(level = "debug", skip_all, fields(method = %method))]
    async fn call(&self, method: &str, payload: &Value) -> Result<(), NotifyError> {
        let url = format!("{}/bot{}/{}", self.api_url, self.bot_token, method);
        let resp = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            // The request URL embeds the bot token.
            .map_err(|e| NotifyError::Http(e.without_url()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(
                method,
                status = status.as_u16(),
                body = %truncate_for_log(&body, 300),
                "Telegram call rejected"
            );
            return Err(NotifyError::Api {
                status: status.as_u16(),
                body,
            });
        }
        debug!(method, "Telegram call succeeded");
        Ok(())
    }
}

impl Notifier for TelegramNotifier {
    #[instrument(level = "info", skip_all, fields(url = %article.url))]
    async fn send(&self, article: &Article) -> Result<(), NotifyError> {
        if self.options.send_photos {
            let photo = article.lead_image();
            let caption = fit_message(article, self.options.include_summary, CAPTION_LIMIT);
            if let (Some(photo), Some(caption)) = (photo, caption) {
                match self.send_photo(photo, &caption).await {
                    Ok(()) => return Ok(()),
                    Err(e) => warn!(error = %e, "sendPhoto failed; falling back to text message"),
                }
            }
        }

        let Some(text) = fit_message(article, self.options.include_summary, MESSAGE_LIMIT) else {
            return Err(NotifyError::TooLong {
                len: build_message(article, false).chars().count(),
                limit: MESSAGE_LIMIT,
            });
        };
        self.send_message(&text).await
    }
}

/// Render an article as Bot API HTML.
///
/// Title and summary are escaped and shortened; the timestamp is shown in the
/// source's own offset.
pub fn build_message(article: &Article, include_summary: bool) -> String {
    let title = truncate_chars(&article.title, TITLE_LIMIT);
    let mut parts = vec![format!("<b>{}</b>", html_escape::encode_text(&title))];

    if let Some(published) = article.published_at {
        parts.push(format!("🕒 {}", published.format("%Y-%m-%d %H:%M")));
    }

    if include_summary {
        if let Some(summary) = article.summary.as_deref() {
            let summary = truncate_chars(summary, SUMMARY_LIMIT);
            parts.push(html_escape::encode_text(&summary).into_owned());
        }
    }

    parts.push(html_escape::encode_text(&article.url).into_owned());
    parts.join("\n")
}

/// Render within `limit` characters, dropping the summary if needed.
///
/// Returns `None` when even the summary-less message is too long.
pub fn fit_message(article: &Article, include_summary: bool, limit: usize) -> Option<String> {
    let fits = |s: &String| s.chars().count() <= limit;
    Some(build_message(article, include_summary))
        .filter(fits)
        .or_else(|| Some(build_message(article, false)).filter(fits))
}
