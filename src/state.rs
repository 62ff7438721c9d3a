//! Persisted set of already delivered article URLs.
//!
//! The state file is a pretty-printed, sorted JSON array of URLs so that it
//! diffs cleanly when committed back to a repository between runs:
//!
//! ```json
//! [
//!   "https://www.chinapress.com.my/20251014/older/",
//!   "https://www.chinapress.com.my/20251015/newer/"
//! ]
//! ```
//!
//! The legacy shape `{"seen": [...]}` is still accepted on load. Loading never
//! fails: a missing, unreadable or malformed file yields an empty set.

use crate::error::StateError;
use crate::utils::ensure_parent_dir;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// Default location of the state file, relative to the working directory.
pub const DEFAULT_STATE_PATH: &str = "data/seen.json";

/// URLs already forwarded to the chat. Only ever grows.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeenSet {
    urls: BTreeSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Record `url`; returns `true` if it was not present before.
    pub fn insert(&mut self, url: impl Into<String>) -> bool {
        self.urls.insert(url.into())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// URLs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    /// Interpret a decoded state document.
    ///
    /// Accepts an array, or an object with a `seen` array. Non-string members
    /// are stringified. Returns `None` for any other shape.
    fn from_json(value: Value) -> Option<Self> {
        let items = match value {
            Value::Array(items) => items,
            Value::Object(mut map) => match map.remove("seen") {
                Some(Value::Array(items)) => items,
                _ => return None,
            },
            _ => return None,
        };
        let urls = items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => s,
                other => other.to_string(),
            })
            .collect();
        Some(Self { urls })
    }
}

impl<S: Into<String>> FromIterator<S> for SeenSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            urls: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Loads and saves a [`SeenSet`] at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the seen-set, treating a missing or corrupt file as empty.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display()))]
    pub async fn load(&self) -> SeenSet {
        match self.try_load().await {
            Ok(Some(seen)) => {
                info!(count = seen.len(), "Loaded seen-set");
                seen
            }
            Ok(None) => {
                warn!("State file has an unexpected shape; starting empty");
                SeenSet::new()
            }
            Err(StateError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No state file yet; starting empty");
                SeenSet::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to load state; starting empty");
                SeenSet::new()
            }
        }
    }

    async fn try_load(&self) -> Result<Option<SeenSet>, StateError> {
        let raw = fs::read_to_string(&self.path).await?;
        let value: Value = serde_json::from_str(&raw)?;
        Ok(SeenSet::from_json(value))
    }

    /// Rewrite the state file in full.
    ///
    /// The set is written to `<path>.tmp` first and then renamed over the
    /// target, so a crash mid-write leaves the previous file intact.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the directory, temp file or rename fails.
    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), count = seen.len()))]
    pub async fn save(&self, seen: &SeenSet) -> Result<(), StateError> {
        ensure_parent_dir(&self.path).await?;

        let urls: Vec<&str> = seen.iter().collect();
        let mut body = serde_json::to_string_pretty(&urls)?;
        body.push('\n');

        let tmp = self.tmp_path();
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Wrote seen-set");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}
