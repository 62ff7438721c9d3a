//! Error types for the three failure classes of a relay run.
//!
//! None of these is fatal: the pipeline logs them and carries on.

use thiserror::Error;

/// Failure to obtain articles from one source.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure or non-2xx status.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Feed body is not well-formed XML.
    #[error("feed XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Source URL could not be parsed.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

/// Failure to deliver one article.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The Bot API answered with a non-success status.
    #[error("Telegram API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Even the shortest rendering exceeds Telegram's text limit; nothing was sent.
    #[error("message too long for Telegram ({len} > {limit} characters)")]
    TooLong { len: usize, limit: usize },
}

/// Failure to read or write the seen-set file.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("state file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
