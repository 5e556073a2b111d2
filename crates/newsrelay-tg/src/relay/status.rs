use crate::news::Article;
use crate::prelude::*;
use crate::util::{display, encoding};
use chrono::prelude::*;
use serde::Serialize;
use std::time::Duration;
use teloxide::utils::markdown;
use url::Url;

/// Counters and flags describing what the relay has been doing since start
#[derive(Debug, Clone)]
pub(crate) struct BotStatus {
    pub(crate) published_count: u64,
    pub(crate) last_post_time: Option<DateTime<Utc>>,
    pub(crate) last_title: Option<String>,
    pub(crate) last_url: Option<Url>,
    pub(crate) is_paused: bool,
    pub(crate) failed_count: u64,
    pub(crate) duplicate_count: u64,
    pub(crate) evicted_count: u64,
    pub(crate) started_at: DateTime<Utc>,
}

impl BotStatus {
    pub(crate) fn new() -> Self {
        Self {
            published_count: 0,
            last_post_time: None,
            last_title: None,
            last_url: None,
            is_paused: false,
            failed_count: 0,
            duplicate_count: 0,
            evicted_count: 0,
            started_at: Utc::now(),
        }
    }

    pub(crate) fn record_published(&mut self, article: &Article) {
        self.published_count += 1;
        self.last_post_time = Some(Utc::now());
        self.last_title = Some(article.title.clone());
        self.last_url = Some(article.url.clone());
    }

    /// Describes the last published article in MarkdownV2
    pub(crate) fn last_post_markdown(&self) -> String {
        let (Some(title), Some(url), Some(time)) =
            (&self.last_title, &self.last_url, self.last_post_time)
        else {
            return markdown::escape("Nothing was published yet");
        };

        let ago = (Utc::now() - time).to_std().unwrap_or_default();

        let header = markdown::escape(&format!(
            "Last post at {} ({} ago):",
            time.to_human_readable(),
            display::human_duration(ago),
        ));

        format!(
            "{header}\n\n{}\n{}",
            markdown::bold(&markdown::escape(title)),
            markdown::link(url.as_str(), "Read more"),
        )
    }
}

/// Snapshot of the relay state shown to the owner
#[derive(Debug, Clone, Serialize)]
pub(crate) struct StatusReport {
    pub(crate) state: &'static str,
    pub(crate) uptime: String,
    pub(crate) bucket_tokens: f64,
    pub(crate) bucket_capacity: u32,
    pub(crate) bucket_refill_interval: String,
    pub(crate) queue_depth: usize,
    pub(crate) seen: usize,
    pub(crate) published: u64,
    pub(crate) failed: u64,
    pub(crate) duplicates: u64,
    pub(crate) evicted: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) last_post_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) last_title: Option<String>,
}

pub(crate) struct StatusInputs<'a> {
    pub(crate) status: &'a BotStatus,
    pub(crate) bucket_tokens: f64,
    pub(crate) bucket_capacity: u32,
    pub(crate) bucket_refill_interval: Duration,
    pub(crate) queue_depth: usize,
    pub(crate) seen: usize,
}

impl StatusReport {
    pub(crate) fn new(inputs: StatusInputs<'_>) -> Self {
        let StatusInputs {
            status,
            bucket_tokens,
            bucket_capacity,
            bucket_refill_interval,
            queue_depth,
            seen,
        } = inputs;

        let uptime = (Utc::now() - status.started_at)
            .to_std()
            .unwrap_or_default();

        Self {
            state: if status.is_paused { "paused" } else { "running" },
            uptime: display::human_duration(uptime),
            bucket_tokens: (bucket_tokens * 100.0).round() / 100.0,
            bucket_capacity,
            bucket_refill_interval: display::human_duration(bucket_refill_interval),
            queue_depth,
            seen,
            published: status.published_count,
            failed: status.failed_count,
            duplicates: status.duplicate_count,
            evicted: status.evicted_count,
            last_post_time: status.last_post_time.map(|time| time.to_human_readable()),
            last_title: status.last_title.clone(),
        }
    }

    pub(crate) fn to_markdown(&self) -> String {
        markdown::code_block_with_lang(&encoding::to_yaml_string(self), "yml")
    }
}
