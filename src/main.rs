//! # News Relay
//!
//! Forwards new articles from a news site to a Telegram chat. Each invocation
//! is one complete run; scheduling is left to cron or CI.
//!
//! ## Usage
//!
//! ```sh
//! TELEGRAM_BOT_TOKEN=123:abc TELEGRAM_CHAT_ID=@channel news_relay
//! ```
//!
//! ## Architecture
//!
//! 1. **State**: load the set of already sent URLs from a JSON file
//! 2. **Fetching**: read the RSS feed, falling back to scraping the homepage
//! 3. **Selection**: keep unseen articles, oldest first, up to the per-run cap
//! 4. **Delivery**: post each one to Telegram and mark it seen
//! 5. **Persistence**: rewrite the state file if anything was sent
//!
//! Failures in any stage are logged and the process still exits cleanly; the
//! next scheduled run picks up where this one left off.

use clap::Parser;
use std::error::Error;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod error;
mod fetcher;
mod models;
mod notifier;
mod pipeline;
mod scrapers;
mod state;
#[cfg(test)]
mod test_support;
mod utils;

use cli::Cli;
use fetcher::Fetcher;
use notifier::TelegramNotifier;
use pipeline::Relay;
use scrapers::feed::FeedSource;
use scrapers::homepage::HomepageSource;
use state::StateStore;
use utils::http_client;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Cli::parse();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "news_relay starting up");
    debug!(
        feed_url = %args.feed_url,
        home_url = %args.home_url,
        state_path = %args.state_path,
        max_items = args.max_items,
        fetch_limit = args.fetch_limit(),
        "Parsed CLI arguments"
    );

    let fetch_client = http_client(args.fetch_timeout())?;
    let send_client = http_client(args.send_timeout())?;

    let limit = args.fetch_limit();
    let fetcher = Fetcher::new(
        FeedSource::new(fetch_client.clone(), &args.feed_url, limit),
        HomepageSource::new(fetch_client, &args.home_url, limit),
        limit,
    );
    let notifier = TelegramNotifier::new(
        send_client,
        &args.bot_token,
        &args.chat_id,
        args.message_options(),
    )
    .with_api_url(&args.telegram_api_url);

    let relay = Relay::new(
        StateStore::new(&args.state_path),
        fetcher,
        notifier,
        args.max_items,
    );
    let report = relay.run().await;

    let elapsed = start_time.elapsed();
    info!(
        fetched = report.fetched,
        unseen = report.unseen,
        sent = report.sent,
        failed = report.failed,
        persisted = report.persisted,
        millis = elapsed.as_millis() as u64,
        "Execution complete"
    );

    Ok(())
}
