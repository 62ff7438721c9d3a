//! Command-line interface definitions.
//!
//! Every option can also be supplied through an environment variable, which
//! is how scheduled runs (cron, CI) are expected to configure the relay.

use crate::notifier::{MessageOptions, TELEGRAM_API_URL};
use crate::state::DEFAULT_STATE_PATH;
use clap::Parser;
use clap::builder::BoolishValueParser;
use std::time::Duration;

/// Relay new articles from a news feed to a Telegram chat.
///
/// # Examples
///
/// ```sh
/// # Everything from the environment
/// TELEGRAM_BOT_TOKEN=123:abc TELEGRAM_CHAT_ID=@channel news_relay
///
/// # Bigger batches, photos, custom state location
/// news_relay --max-items 20 --send-photos --state-path /var/lib/news_relay/seen.json
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Telegram bot token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub bot_token: String,

    /// Target chat id or @channel username
    #[arg(long, env = "TELEGRAM_CHAT_ID")]
    pub chat_id: String,

    /// Maximum number of articles to send per run
    #[arg(long = "max-items", env = "MAX_ITEMS_PER_RUN", default_value_t = 10)]
    pub max_items: usize,

    /// Maximum number of articles to read from a source (default: 3 × max-items)
    #[arg(long, env = "FETCH_LIMIT")]
    pub fetch_limit: Option<usize>,

    /// RSS/Atom feed URL
    #[arg(long, env = "FEED_URL", default_value = "https://www.chinapress.com.my/feed/")]
    pub feed_url: String,

    /// Homepage URL scraped when the feed fails or is empty
    #[arg(long, env = "HOME_URL", default_value = "https://www.chinapress.com.my/")]
    pub home_url: String,

    /// Path of the JSON file holding already sent URLs
    #[arg(long, env = "STATE_PATH", default_value = DEFAULT_STATE_PATH)]
    pub state_path: String,

    /// Timeout for feed and homepage requests, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 15)]
    pub fetch_timeout_secs: u64,

    /// Timeout for Telegram requests, in seconds
    #[arg(long, env = "SEND_TIMEOUT_SECS", default_value_t = 20)]
    pub send_timeout_secs: u64,

    /// Bot API base URL (for a self-hosted Bot API server)
    #[arg(long, env = "TELEGRAM_API_URL", default_value = TELEGRAM_API_URL)]
    pub telegram_api_url: String,

    /// Disable link previews in sent messages
    #[arg(long = "disable-preview", env = "DISABLE_WEB_PAGE_PREVIEW", value_parser = BoolishValueParser::new())]
    pub disable_preview: bool,

    /// Include the article teaser in messages
    #[arg(long, env = "INCLUDE_SUMMARY", value_parser = BoolishValueParser::new())]
    pub include_summary: bool,

    /// Send the lead image with a caption when the article has one
    #[arg(long, env = "SEND_PHOTOS", value_parser = BoolishValueParser::new())]
    pub send_photos: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Per-source article limit.
    pub fn fetch_limit(&self) -> usize {
        self.fetch_limit
            .unwrap_or_else(|| self.max_items.saturating_mul(3))
            .max(self.max_items)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }

    pub fn message_options(&self) -> MessageOptions {
        MessageOptions {
            disable_preview: self.disable_preview,
            include_summary: self.include_summary,
            send_photos: self.send_photos,
        }
    }
}
