//! One relay run: load state, fetch, diff, send, persist.
//!
//! ```text
//! StateStore::load ─► Fetcher::fetch ─► select_unseen ─► Notifier::send (each) ─► StateStore::save
//! ```
//!
//! Every stage is non-fatal. A run with nothing new, or with nothing fetched
//! at all, completes normally and leaves the state file untouched.

use crate::fetcher::Fetcher;
use crate::models::{Article, RunReport};
use crate::notifier::Notifier;
use crate::scrapers::ArticleSource;
use crate::state::{SeenSet, StateStore};
use tracing::{error, info, instrument, warn};

/// The relay and its collaborators.
#[derive(Debug)]
pub struct Relay<P, F, N> {
    store: StateStore,
    fetcher: Fetcher<P, F>,
    notifier: N,
    max_items: usize,
}

impl<P, F, N> Relay<P, F, N>
where
    P: ArticleSource,
    F: ArticleSource,
    N: Notifier,
{
    /// `max_items` caps the number of articles sent per run.
    pub fn new(store: StateStore, fetcher: Fetcher<P, F>, notifier: N, max_items: usize) -> Self {
        Self {
            store,
            fetcher,
            notifier,
            max_items,
        }
    }

    /// Execute one complete run and report what happened.
    ///
    /// Every selected article is marked seen once a send has been attempted,
    /// whether or not it succeeded, so a message Telegram keeps rejecting is
    /// not retried forever.
    #[instrument(level = "info", skip_all, fields(max_items = self.max_items))]
    pub async fn run(&self) -> RunReport {
        let mut report = RunReport::default();
        if self.max_items == 0 {
            info!("Per-run cap is zero; nothing to do");
            return report;
        }

        let mut seen = self.store.load().await;
        if seen.is_empty() {
            info!("Seen-set is empty; every fetched article counts as new");
        }

        let fetched = self.fetcher.fetch().await;
        report.fetched = fetched.articles().len();
        if report.fetched == 0 {
            info!("No articles fetched");
            return report;
        }
        info!(count = report.fetched, strategy = fetched.strategy(), "Fetched articles");

        report.unseen = fetched
            .articles()
            .iter()
            .filter(|a| !seen.contains(&a.url))
            .count();
        let batch = select_unseen(fetched.articles(), &seen, self.max_items);
        if report.unseen > batch.len() {
            info!(
                unseen = report.unseen,
                sending = batch.len(),
                "More new articles than the per-run cap; the rest wait for the next run"
            );
        }

        for article in batch {
            match self.notifier.send(article).await {
                Ok(()) => {
                    report.sent += 1;
                    info!(url = %article.url, title = %article.title, "Sent article");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(url = %article.url, error = %e, "Send failed; marking seen anyway");
                }
            }
            seen.insert(article.url.clone());
        }

        if report.attempted() == 0 {
            info!("No new items to send");
            return report;
        }

        match self.store.save(&seen).await {
            Ok(()) => report.persisted = true,
            Err(e) => error!(error = %e, path = %self.store.path().display(), "Failed to persist seen-set"),
        }

        info!(
            sent = report.sent,
            failed = report.failed,
            seen_total = seen.len(),
            "Relay run complete"
        );
        report
    }
}

/// Pick the articles to send this run.
///
/// `articles` is newest first. Unseen ones are returned oldest first, at most
/// `max` of them, so a backlog drains in publication order over several runs.
pub fn select_unseen<'a>(articles: &'a [Article], seen: &SeenSet, max: usize) -> Vec<&'a Article> {
    articles
        .iter()
        .filter(|a| !seen.contains(&a.url))
        .rev()
        .take(max)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NotifyError;
    use crate::fetcher::tests::StubSource;
    use std::cell::RefCell;
    use std::collections::HashSet;
    use std::path::Path;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: RefCell<Vec<String>>,
        reject: HashSet<String>,
    }

    impl RecordingNotifier {
        fn rejecting(urls: &[&str]) -> Self {
            Self {
                sent: RefCell::default(),
                reject: urls.iter().map(|u| u.to_string()).collect(),
            }
        }
    }

    impl Notifier for RecordingNotifier {
        async fn send(&self, article: &Article) -> Result<(), NotifyError> {
            self.sent.borrow_mut().push(article.url.clone());
            if self.reject.contains(&article.url) {
                return Err(NotifyError::Api {
                    status: 400,
                    body: "Bad Request: can't parse entities".into(),
                });
            }
            Ok(())
        }
    }

    /// Newest first, as the sources return them.
    fn articles(urls: &[&str]) -> Vec<Article> {
        urls.iter().map(|u| Article::new(format!("title {u}"), *u)).collect()
    }

    fn relay(
        state: &Path,
        feed: Vec<Article>,
        notifier: RecordingNotifier,
        max: usize,
    ) -> Relay<StubSource, StubSource, RecordingNotifier> {
        Relay::new(
            StateStore::new(state),
            Fetcher::new(StubSource::ok("feed", feed), StubSource::failing("homepage"), 50),
            notifier,
            max,
        )
    }

    #[test]
    fn test_select_unseen_oldest_first_with_cap() {
        let list = articles(&["u5", "u4", "u3", "u2", "u1"]);
        let seen: SeenSet = ["u1"].into_iter().collect();
        let picked: Vec<_> = select_unseen(&list, &seen, 2).into_iter().map(|a| a.url.as_str()).collect();
        assert_eq!(picked, vec!["u2", "u3"]);
    }

    #[tokio::test]
    async fn test_all_new_articles_sent() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        let r = relay(&state, articles(&["u3", "u2", "u1"]), RecordingNotifier::default(), 10);

        let report = r.run().await;
        assert_eq!(report.sent, 3);
        assert!(report.persisted);
        assert_eq!(*r.notifier.sent.borrow(), vec!["u1", "u2", "u3"]);
        assert_eq!(StateStore::new(&state).load().await.len(), 3);
    }

    #[tokio::test]
    async fn test_only_unseen_sent() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        std::fs::write(&state, r#"["url1"]"#).unwrap();
        let r = relay(&state, articles(&["url1", "url2"]), RecordingNotifier::default(), 10);

        let report = r.run().await;
        assert_eq!(report.unseen, 1);
        assert_eq!(*r.notifier.sent.borrow(), vec!["url2"]);

        let seen = StateStore::new(&state).load().await;
        assert_eq!(seen.iter().collect::<Vec<_>>(), vec!["url1", "url2"]);
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        let feed = articles(&["u2", "u1"]);

        let first = relay(&state, feed.clone(), RecordingNotifier::default(), 10).run().await;
        assert_eq!(first.sent, 2);

        let again = relay(&state, feed, RecordingNotifier::default(), 10);
        let second = again.run().await;
        assert_eq!(second.sent, 0);
        assert!(!second.persisted);
        assert!(again.notifier.sent.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_cap_limits_sends_and_backlog_drains() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        let feed = articles(&["u5", "u4", "u3", "u2", "u1"]);

        let r = relay(&state, feed.clone(), RecordingNotifier::default(), 2);
        let report = r.run().await;
        assert_eq!(report.unseen, 5);
        assert_eq!(report.sent, 2);
        assert_eq!(*r.notifier.sent.borrow(), vec!["u1", "u2"]);

        let r = relay(&state, feed, RecordingNotifier::default(), 2);
        r.run().await;
        assert_eq!(*r.notifier.sent.borrow(), vec!["u3", "u4"]);
    }

    #[tokio::test]
    async fn test_failed_send_still_marked_seen() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        let r = relay(&state, articles(&["u2", "u1"]), RecordingNotifier::rejecting(&["u1"]), 10);

        let report = r.run().await;
        assert_eq!(report.sent, 1);
        assert_eq!(report.failed, 1);
        assert!(report.persisted);
        assert!(StateStore::new(&state).load().await.contains("u1"));
    }

    #[tokio::test]
    async fn test_nothing_fetched_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        let r = Relay::new(
            StateStore::new(&state),
            Fetcher::new(StubSource::failing("feed"), StubSource::failing("homepage"), 50),
            RecordingNotifier::default(),
            10,
        );

        let report = r.run().await;
        assert_eq!(report, RunReport::default());
        assert!(!state.exists());
    }

    #[tokio::test]
    async fn test_fallback_results_are_relayed() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        let r = Relay::new(
            StateStore::new(&state),
            Fetcher::new(
                StubSource::ok("feed", vec![]),
                StubSource::ok("homepage", articles(&["h1"])),
                50,
            ),
            RecordingNotifier::default(),
            10,
        );

        assert_eq!(r.run().await.sent, 1);
        assert_eq!(*r.notifier.sent.borrow(), vec!["h1"]);
    }

    #[tokio::test]
    async fn test_zero_cap_skips_fetch_and_send() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("seen.json");
        let feed = StubSource::ok("feed", articles(&["u1"]));
        let feed_calls = feed.calls.clone();
        let r = Relay::new(
            StateStore::new(&state),
            Fetcher::new(feed, StubSource::failing("homepage"), 50),
            RecordingNotifier::default(),
            0,
        );

        let report = r.run().await;
        assert_eq!(report, RunReport::default());
        assert_eq!(feed_calls.get(), 0);
        assert!(r.notifier.sent.borrow().is_empty());
        assert!(!state.exists());
    }
}
