use super::Article;
use serde::Deserialize;
use url::Url;

/// Placeholder the API puts into all fields of articles taken down by the publisher
const REMOVED_PLACEHOLDER: &str = "[Removed]";

/// API docs: <https://newsapi.org/docs/endpoints/everything#response>
#[derive(Debug, Deserialize)]
pub(super) struct ArticlesResponse {
    /// Either `ok` or `error`
    pub(super) status: String,

    #[serde(default)]
    pub(super) articles: Vec<RawArticle>,

    /// Error code, if the status is `error`
    pub(super) code: Option<String>,

    /// Error description, if the status is `error`
    pub(super) message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
}

impl RawArticle {
    /// Returns [`None`] if the article can't be published because it has
    /// no title or URL, or it was removed by the publisher.
    pub(super) fn into_article(self) -> Option<Article> {
        let title = non_blank(self.title)?;
        let url = Url::parse(&non_blank(self.url)?).ok()?;

        if title == REMOVED_PLACEHOLDER {
            return None;
        }

        Some(Article {
            url,
            title,
            description: non_blank(self.description),
            content: non_blank(self.content),
            image_url: non_blank(self.url_to_image).and_then(|url| Url::parse(&url).ok()),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
