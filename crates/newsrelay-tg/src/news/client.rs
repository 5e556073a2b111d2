use super::model::{ArticlesResponse, RawArticle};
use super::{Article, Config, NewsApiError, NewsQuery, NewsSource};
use crate::prelude::*;
use crate::{http, Result};
use async_trait::async_trait;
use url::Url;

pub(crate) struct Client {
    http: http::Client,
    cfg: Config,
}

impl Client {
    pub(crate) fn new(cfg: Config, http: http::Client) -> Self {
        Self { http, cfg }
    }

    pub(crate) fn queries(&self) -> &[NewsQuery] {
        &self.cfg.queries
    }

    /// Query used to serve on-demand requests for headlines from users
    pub(crate) fn on_demand_query(&self) -> &NewsQuery {
        self.cfg
            .on_demand_query
            .as_deref()
            .and_then(|tag| self.cfg.query_by_tag(tag))
            .unwrap_or(&self.cfg.queries[0])
    }

    fn endpoint_url(&self, query: &NewsQuery) -> Result<Url> {
        let mut url = self.cfg.api_url.clone();
        url.path_segments_mut()
            .ok()
            .fatal_ctx(|| format!("News API URL can't be a base: {}", self.cfg.api_url))?
            .pop_if_empty()
            .push(query.endpoint.into());
        Ok(url)
    }
}

#[async_trait]
impl NewsSource for Client {
    /// API docs: <https://newsapi.org/docs/endpoints>
    #[instrument(skip_all, fields(tag = %query.tag))]
    async fn fetch(&self, query: &NewsQuery) -> Result<Vec<Article>> {
        // The API responds with 4xx status codes and `status: error` JSON body
        // that describes the problem, so the body is parsed for any status code.
        let (status, body) = self
            .http
            .get(self.endpoint_url(query)?)
            .header("X-Api-Key", &self.cfg.api_key)
            .query(&query.to_params())
            .read_bytes_any_status()
            .await?;

        into_articles(http::decode_json(status, &body)?)
    }
}

fn into_articles(response: ArticlesResponse) -> Result<Vec<Article>> {
    if response.status != "ok" {
        return Err(err!(NewsApiError::Status {
            code: response.code.unwrap_or_else(|| "{unknown}".to_owned()),
            message: response.message.unwrap_or_default(),
        }));
    }

    let total = response.articles.len();

    let articles: Vec<_> = response
        .articles
        .into_iter()
        .filter_map(RawArticle::into_article)
        .collect();

    debug!(
        total,
        usable = articles.len(),
        "Fetched articles from the news API"
    );

    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::http::HttpClientError;
    use assert_matches::assert_matches;
    use reqwest::StatusCode;

    fn parse(status: StatusCode, body: &str) -> Result<Vec<Article>> {
        into_articles(http::decode_json(status, body.as_bytes())?)
    }

    #[test_log::test(tokio::test)]
    #[ignore]
    async fn manual_sandbox() {
        let _ = dotenvy::dotenv();

        let cfg: Config = crate::config::from_env_or_panic("NEWS_");

        let client = Client::new(cfg, crate::http::create_client());

        let articles = client.fetch(client.on_demand_query()).await.unwrap();

        eprintln!("{articles:#?}");
    }

    #[test]
    fn endpoint_url_keeps_api_version() {
        let cfg = Config {
            api_key: "key".to_owned(),
            api_url: "https://newsapi.org/v2/".parse().unwrap(),
            queries: super::super::query::default_queries(),
            on_demand_query: Some("world".to_owned()),
        };

        let client = Client::new(cfg, crate::http::create_client());

        assert_eq!(client.on_demand_query().tag, "world");

        let url = client.endpoint_url(&client.queries()[0]).unwrap();
        assert_eq!(url.as_str(), "https://newsapi.org/v2/top-headlines");

        let url = client.endpoint_url(&client.queries()[1]).unwrap();
        assert_eq!(url.as_str(), "https://newsapi.org/v2/everything");
    }

    #[test]
    fn api_error_with_error_status_code() {
        let err = parse(
            StatusCode::UNAUTHORIZED,
            r#"{
                "status": "error",
                "code": "apiKeyInvalid",
                "message": "Your API key is invalid or incorrect."
            }"#,
        )
        .unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::NewsApi {
                source: NewsApiError::Status { code, message }
            } if code == "apiKeyInvalid" && message == "Your API key is invalid or incorrect."
        );
    }

    #[test]
    fn gateway_error_without_json_body() {
        let err = parse(StatusCode::SERVICE_UNAVAILABLE, "upstream is down").unwrap_err();

        assert_matches!(
            err.kind(),
            ErrorKind::HttpClient {
                source: HttpClientError::BadResponseStatusCode { status, .. }
            } if *status == StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn ok_response() {
        let articles = parse(
            StatusCode::OK,
            r#"{
                "status": "ok",
                "totalResults": 1,
                "articles": [{ "title": "Headline", "url": "https://example.com/1" }]
            }"#,
        )
        .unwrap();

        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Headline");
    }
}
