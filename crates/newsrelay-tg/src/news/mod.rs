//! News aggregation API (<https://newsapi.org>) integration

mod client;
mod model;
mod query;

use crate::Result;
use async_trait::async_trait;
use itertools::Itertools;
use serde::Deserialize;
use serde_with::serde_as;
use url::Url;

pub(crate) use client::Client;
pub(crate) use query::NewsQuery;

#[serde_as]
#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    api_key: String,

    #[serde(default = "default_api_url")]
    api_url: Url,

    /// JSON array of tagged queries that are polled on every tick
    #[serde_as(as = "serde_with::json::JsonString")]
    #[serde(default = "query::default_queries")]
    queries: Vec<NewsQuery>,

    /// Tag of the query used for on-demand `/news` command. Defaults to the
    /// first query from [`Config::queries`].
    on_demand_query: Option<String>,
}

fn default_api_url() -> Url {
    Url::parse("https://newsapi.org/v2").unwrap_or_else(|err| panic!("BUG: bad url: {err}"))
}

impl Config {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.api_key.trim().is_empty() {
            return Err("NEWS_API_KEY must not be empty".to_owned());
        }

        if self.queries.is_empty() {
            return Err("NEWS_QUERIES must contain at least one query".to_owned());
        }

        for query in &self.queries {
            query.validate()?;
        }

        if let Some(query) = self.queries.iter().duplicates_by(|query| &query.tag).next() {
            return Err(format!(
                "NEWS_QUERIES contains duplicate tag `{}`",
                query.tag
            ));
        }

        if let Some(tag) = &self.on_demand_query {
            if self.query_by_tag(tag).is_none() {
                return Err(format!(
                    "NEWS_ON_DEMAND_QUERY references unknown query tag `{tag}`"
                ));
            }
        }

        Ok(())
    }

    fn query_by_tag(&self, tag: &str) -> Option<&NewsQuery> {
        self.queries.iter().find(|query| query.tag == tag)
    }
}

/// A single article as returned by the news API. Articles without a valid
/// URL or title are never constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Article {
    pub(crate) url: Url,
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) content: Option<String>,
    pub(crate) image_url: Option<Url>,
}

/// Abstraction over the source of articles to let the relay work with
/// an in-memory source in tests.
#[async_trait]
pub(crate) trait NewsSource: Send + Sync {
    async fn fetch(&self, query: &NewsQuery) -> Result<Vec<Article>>;
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum NewsApiError {
    #[error("News API responded with an error (code: {code}): {message}")]
    Status { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(queries: &str) -> Config {
        Config {
            api_key: "key".to_owned(),
            api_url: default_api_url(),
            queries: serde_json::from_str(queries).unwrap(),
            on_demand_query: None,
        }
    }

    #[test]
    fn default_queries_are_valid() {
        let config = Config {
            queries: query::default_queries(),
            ..config("[]")
        };
        config.validate().unwrap();
    }

    #[test]
    fn rejects_duplicate_tags() {
        let config = config(
            r#"[
                {"tag": "uk", "endpoint": "top-headlines", "country": "gb"},
                {"tag": "uk", "endpoint": "everything", "q": "london"}
            ]"#,
        );
        let err = config.validate().unwrap_err();
        assert!(err.contains("duplicate tag `uk`"), "{err}");
    }

    #[test]
    fn rejects_unknown_on_demand_query() {
        let config = Config {
            on_demand_query: Some("mars".to_owned()),
            ..config(r#"[{"tag": "uk", "endpoint": "top-headlines", "country": "gb"}]"#)
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("unknown query tag `mars`"), "{err}");
    }

    #[test]
    fn rejects_empty_queries() {
        assert!(config("[]").validate().is_err());
    }
}
