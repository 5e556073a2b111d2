//! The core of the bot that moves articles from the news API to the channel
//! without flooding it.

mod bucket;
mod dedup;
mod format;
mod queue;
mod status;

use crate::news::{Article, NewsQuery, NewsSource};
use crate::observability::metrics::*;
use crate::prelude::*;
use crate::Result;
use async_trait::async_trait;
use bucket::TokenBucket;
use dedup::{DedupeKey, SeenSet};
use metrics::{counter, gauge};
use parking_lot::Mutex;
use queue::{Pending, PendingQueue};
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use status::{BotStatus, StatusInputs, StatusReport};
use std::sync::Arc;
use std::time::Duration;
use teloxide::utils::markdown;
use tokio::time::MissedTickBehavior;

pub(crate) use format::Post;

#[serde_as]
#[derive(Debug, Deserialize, Clone)]
pub(crate) struct Config {
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "poll_interval_secs", default = "default_poll_interval")]
    pub(crate) poll_interval: Duration,

    #[serde(default = "default_bucket_capacity")]
    pub(crate) bucket_capacity: u32,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(rename = "bucket_interval_secs", default = "default_bucket_interval")]
    pub(crate) bucket_interval: Duration,

    /// Zero disables the periodic status reports
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(
        rename = "status_report_interval_secs",
        default = "default_status_report_interval"
    )]
    pub(crate) status_report_interval: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_bucket_capacity() -> u32 {
    2
}

fn default_bucket_interval() -> Duration {
    Duration::from_secs(10 * 60)
}

fn default_status_report_interval() -> Duration {
    Duration::from_secs(60 * 60)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            bucket_capacity: default_bucket_capacity(),
            bucket_interval: default_bucket_interval(),
            status_report_interval: default_status_report_interval(),
        }
    }
}

impl Config {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.poll_interval.is_zero() {
            return Err("RELAY_POLL_INTERVAL_SECS must be positive".to_owned());
        }
        if self.bucket_capacity == 0 {
            return Err("RELAY_BUCKET_CAPACITY must be positive".to_owned());
        }
        if self.bucket_interval.is_zero() {
            return Err("RELAY_BUCKET_INTERVAL_SECS must be positive".to_owned());
        }
        Ok(())
    }
}

/// Destination of the relayed articles
#[async_trait]
pub(crate) trait Publisher: Send + Sync {
    async fn publish(&self, post: &Post) -> Result;

    /// Sends a MarkdownV2 message to the owner of the bot
    async fn notify_owner(&self, text: String) -> Result;
}

/// Outcome of a single poll of the news API
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TickReport {
    pub(crate) paused: bool,
    pub(crate) fetched: usize,
    pub(crate) duplicates: usize,
    pub(crate) published: usize,
    pub(crate) failed: usize,
    pub(crate) queued: usize,
    pub(crate) evicted: usize,
}

/// Shared context of the relay loop and the owner commands.
///
/// The state is guarded by a sync mutex, which must never be held across
/// an `.await`.
pub(crate) struct Relay {
    source: Arc<dyn NewsSource>,
    publisher: Arc<dyn Publisher>,
    queries: Vec<NewsQuery>,
    cfg: Config,
    state: Mutex<RelayState>,
}

struct RelayState {
    bucket: TokenBucket,
    queue: PendingQueue,
    seen: SeenSet,
    status: BotStatus,
}

#[derive(Debug)]
enum Admission {
    Duplicate,
    AlreadyPending,
    Publish(Pending),
    Queued { evicted: Option<Pending> },
}

impl RelayState {
    /// Decides what to do with a freshly fetched article
    fn admit(&mut self, article: Article, tag: &str) -> Admission {
        let key = DedupeKey::of(&article);

        if self.seen.contains(&key) {
            self.status.duplicate_count += 1;
            return Admission::Duplicate;
        }

        // Pause may be requested while the tick is in progress
        if !self.status.is_paused && self.bucket.can_post_now() {
            self.bucket.consume_token();
            self.seen.insert(key.clone());
            return Admission::Publish(Pending {
                key,
                article,
                tag: tag.to_owned(),
            });
        }

        if self.queue.contains(&key) {
            return Admission::AlreadyPending;
        }

        let evicted = self.queue.push(Pending {
            key,
            article,
            tag: tag.to_owned(),
        });

        if evicted.is_some() {
            self.status.evicted_count += 1;
        }

        Admission::Queued { evicted }
    }

    /// Takes the oldest pending article if there is a token to publish it
    fn drain_one(&mut self) -> Option<Pending> {
        if self.status.is_paused {
            return None;
        }

        while let Some(front) = self.queue.front() {
            if self.seen.contains(&front.key) {
                debug!(key = %front.key, "Discarding pending article that was already seen");
                self.queue.pop_front();
                continue;
            }

            if !self.bucket.can_post_now() {
                return None;
            }

            let pending = self.queue.pop_front()?;
            self.bucket.consume_token();
            self.seen.insert(pending.key.clone());
            return Some(pending);
        }
        None
    }

    fn update_gauges(&self) {
        gauge!(RELAY_BUCKET_TOKENS, self.bucket.tokens());
        gauge!(RELAY_QUEUE_DEPTH, self.queue.len() as f64);
        gauge!(RELAY_SEEN_TOTAL, self.seen.len() as f64);
    }
}

impl Relay {
    pub(crate) fn new(
        source: Arc<dyn NewsSource>,
        publisher: Arc<dyn Publisher>,
        queries: Vec<NewsQuery>,
        cfg: Config,
    ) -> Self {
        let state = RelayState {
            bucket: TokenBucket::new(cfg.bucket_capacity, cfg.bucket_interval),
            queue: PendingQueue::default(),
            seen: SeenSet::default(),
            status: BotStatus::new(),
        };

        Self {
            source,
            publisher,
            queries,
            cfg,
            state: Mutex::new(state),
        }
    }

    /// Polls the news API forever with the configured interval
    pub(crate) async fn run_loop(&self) {
        let mut interval = tokio::time::interval(self.cfg.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            poll_interval = tracing_duration(self.cfg.poll_interval),
            queries = self.queries.len(),
            "Starting the relay loop"
        );

        loop {
            interval.tick().await;

            let report = self.tick().await;

            info!(
                paused = report.paused,
                fetched = report.fetched,
                duplicates = report.duplicates,
                published = report.published,
                failed = report.failed,
                queued = report.queued,
                evicted = report.evicted,
                "Relay tick finished"
            );
        }
    }

    /// Sends the status to the owner periodically, unless disabled
    pub(crate) async fn report_loop(&self) {
        let period = self.cfg.status_report_interval;
        if period.is_zero() {
            info!("Periodic status reports are disabled");
            return;
        }

        let mut interval =
            tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let text = format!(
                "{}\n{}",
                markdown::escape("📊 Status report"),
                self.status().to_markdown()
            );

            if let Err(err) = self.publisher.notify_owner(text).await {
                warn!(err = tracing_err(&err), "Failed to send the status report");
            }
        }
    }

    /// Single iteration of the relay loop: fetch, dedup, rate-limit, publish
    #[instrument(skip_all)]
    pub(crate) async fn tick(&self) -> TickReport {
        let mut report = TickReport::default();

        if self.state.lock().status.is_paused {
            debug!("Relay is paused, skipping the tick");
            report.paused = true;
            return report;
        }

        for query in &self.queries {
            let articles = self.fetch(query).await;
            report.fetched += articles.len();

            for article in articles {
                let admission = self.state.lock().admit(article, &query.tag);

                match admission {
                    Admission::Duplicate => {
                        report.duplicates += 1;
                        counter!(RELAY_ARTICLES_DUPLICATE_TOTAL, 1);
                    }
                    Admission::AlreadyPending => {}
                    Admission::Queued { evicted } => {
                        report.queued += 1;
                        counter!(RELAY_ARTICLES_QUEUED_TOTAL, 1);

                        if let Some(evicted) = evicted {
                            report.evicted += 1;
                            counter!(RELAY_ARTICLES_EVICTED_TOTAL, 1);
                            debug!(
                                title = evicted.article.title,
                                "Evicted the oldest pending article"
                            );
                        }
                    }
                    Admission::Publish(pending) => {
                        self.publish(pending, &mut report).await;
                    }
                }
            }
        }

        if report.published == 0 {
            let pending = self.state.lock().drain_one();
            if let Some(pending) = pending {
                self.publish(pending, &mut report).await;
            }
        }

        self.state.lock().update_gauges();

        report
    }

    async fn fetch(&self, query: &NewsQuery) -> Vec<Article> {
        let result = self
            .source
            .fetch(query)
            .with_duration_log("Fetched news")
            .instrument(info_span!("fetch", tag = %query.tag))
            .await;

        match result {
            Ok(articles) => {
                counter!(RELAY_ARTICLES_FETCHED_TOTAL, articles.len() as u64);
                articles
            }
            Err(err) => {
                counter!(RELAY_FETCH_FAILURES_TOTAL, 1);
                warn!(
                    err = tracing_err(&err),
                    tag = %query.tag,
                    "Failed to fetch news, skipping the query"
                );
                vec![]
            }
        }
    }

    #[instrument(skip_all, fields(title = %pending.article.title, tag = %pending.tag))]
    async fn publish(&self, pending: Pending, report: &mut TickReport) {
        let post = Post::new(&pending.article, &pending.tag);

        let Err(err) = self.publisher.publish(&post).await else {
            self.state.lock().status.record_published(&pending.article);
            report.published += 1;
            counter!(RELAY_ARTICLES_PUBLISHED_TOTAL, 1);
            info!(url = %pending.article.url, "Published article");
            return;
        };

        self.state.lock().status.failed_count += 1;
        report.failed += 1;
        counter!(RELAY_ARTICLES_FAILED_TOTAL, 1);
        warn!(err = tracing_err(&err), "Failed to publish article");

        let text = markdown::escape(&format!(
            "⚠️ Failed to publish an article (error id: {}):\n{}\n\n{}",
            err.id(),
            pending.article.title,
            pending.article.url,
        ));

        if let Err(err) = self.publisher.notify_owner(text).await {
            warn!(
                err = tracing_err(&err),
                "Failed to notify the owner about the failed publish"
            );
        }
    }

    /// Returns `false` if the relay was already paused
    pub(crate) fn pause(&self) -> bool {
        let mut state = self.state.lock();
        !std::mem::replace(&mut state.status.is_paused, true)
    }

    /// Returns `false` if the relay was already running
    pub(crate) fn resume(&self) -> bool {
        let mut state = self.state.lock();
        std::mem::replace(&mut state.status.is_paused, false)
    }

    /// Changes the rate limit and refills the bucket to the new capacity
    pub(crate) fn set_limit(&self, capacity: u32, refill_interval: Duration) {
        let mut state = self.state.lock();
        state.bucket.reconfigure(capacity, refill_interval);
        state.update_gauges();
        info!(
            capacity,
            refill_interval = tracing_duration(refill_interval),
            "Rate limit changed"
        );
    }

    pub(crate) fn status(&self) -> StatusReport {
        let mut state = self.state.lock();
        state.bucket.refill();

        let state = &*state;

        StatusReport::new(StatusInputs {
            status: &state.status,
            bucket_tokens: state.bucket.tokens(),
            bucket_capacity: state.bucket.capacity(),
            bucket_refill_interval: state.bucket.refill_interval(),
            queue_depth: state.queue.len(),
            seen: state.seen.len(),
        })
    }

    /// Description of the last published article in MarkdownV2
    pub(crate) fn last_post_markdown(&self) -> String {
        self.state.lock().status.last_post_markdown()
    }
}
