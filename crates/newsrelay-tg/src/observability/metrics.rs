use super::GLOBAL_LABELS;
use crate::config::from_env_or_panic;
use metrics_exporter_prometheus::Matcher;
use serde::Deserialize;

/// Histogram buckets to measure the distribution of request durations in seconds
pub(crate) const DEFAULT_DURATION_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

pub(crate) const HTTP_REQUEST_DURATION_SECONDS: &str = "http_request_duration_seconds";

pub(crate) const RELAY_ARTICLES_FETCHED_TOTAL: &str = "relay_articles_fetched_total";
pub(crate) const RELAY_ARTICLES_DUPLICATE_TOTAL: &str = "relay_articles_duplicate_total";
pub(crate) const RELAY_ARTICLES_QUEUED_TOTAL: &str = "relay_articles_queued_total";
pub(crate) const RELAY_ARTICLES_EVICTED_TOTAL: &str = "relay_articles_evicted_total";
pub(crate) const RELAY_ARTICLES_PUBLISHED_TOTAL: &str = "relay_articles_published_total";
pub(crate) const RELAY_ARTICLES_FAILED_TOTAL: &str = "relay_articles_failed_total";
pub(crate) const RELAY_FETCH_FAILURES_TOTAL: &str = "relay_fetch_failures_total";
pub(crate) const RELAY_BUCKET_TOKENS: &str = "relay_bucket_tokens";
pub(crate) const RELAY_QUEUE_DEPTH: &str = "relay_queue_depth";
pub(crate) const RELAY_SEEN_TOTAL: &str = "relay_seen_total";

pub(crate) const TG_UPDATES_TOTAL: &str = "tg_updates_total";
pub(crate) const TG_UPDATES_SKIPPED_TOTAL: &str = "tg_updates_skipped_total";

#[derive(Deserialize)]
struct MetricsConfig {
    /// When not set, the metrics are collected, but not exported
    metrics_port: Option<u16>,
}

pub fn init_metrics() {
    describe_metrics();

    let config: MetricsConfig = from_env_or_panic("");

    let Some(port) = config.metrics_port else {
        return;
    };

    let mut builder = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .set_buckets_for_metric(
            Matcher::Full(HTTP_REQUEST_DURATION_SECONDS.to_owned()),
            DEFAULT_DURATION_BUCKETS,
        )
        .expect("BUG: invalid histogram buckets");

    for (key, value) in GLOBAL_LABELS {
        builder = builder.add_global_label(*key, *value);
    }

    builder
        .install()
        .expect("BUG: failed to initialize the metrics listener");
}

fn describe_metrics() {
    use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

    describe_histogram!(
        HTTP_REQUEST_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of a single real http request including retries"
    );

    describe_counter!(
        RELAY_ARTICLES_FETCHED_TOTAL,
        "Number of articles returned by the news API"
    );
    describe_counter!(
        RELAY_ARTICLES_DUPLICATE_TOTAL,
        "Number of fetched articles that were already seen"
    );
    describe_counter!(
        RELAY_ARTICLES_QUEUED_TOTAL,
        "Number of articles put into the pending queue because the rate limit was hit"
    );
    describe_counter!(
        RELAY_ARTICLES_EVICTED_TOTAL,
        "Number of pending articles dropped because the queue was full"
    );
    describe_counter!(
        RELAY_ARTICLES_PUBLISHED_TOTAL,
        "Number of articles posted to the channel"
    );
    describe_counter!(
        RELAY_ARTICLES_FAILED_TOTAL,
        "Number of articles that Telegram refused to post"
    );
    describe_counter!(
        RELAY_FETCH_FAILURES_TOTAL,
        "Number of news API queries that failed"
    );

    describe_gauge!(
        RELAY_BUCKET_TOKENS,
        "Number of publishing tokens currently available"
    );
    describe_gauge!(RELAY_QUEUE_DEPTH, "Number of articles waiting to be published");
    describe_gauge!(RELAY_SEEN_TOTAL, "Number of articles remembered as seen");

    describe_counter!(TG_UPDATES_TOTAL, "Number of updates received from Telegram");
    describe_counter!(
        TG_UPDATES_SKIPPED_TOTAL,
        "Number of updates received from Telegram, that were skipped by the bot"
    );
}
