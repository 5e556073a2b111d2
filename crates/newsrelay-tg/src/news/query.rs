use serde::{Deserialize, Serialize};

/// Parameterized search against the news API. The results of the query are
/// labeled with the [`NewsQuery::tag`] (e.g. a region) when published.
///
/// API docs: <https://newsapi.org/docs/endpoints>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct NewsQuery {
    pub(crate) tag: String,

    #[serde(default)]
    pub(crate) endpoint: Endpoint,

    /// Keywords or phrases to search for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) q: Option<String>,

    /// Comma-separated allow-list of news source identifiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) sources: Option<String>,

    /// Comma-separated allow-list of domains, only for [`Endpoint::Everything`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) domains: Option<String>,

    /// 2-letter ISO 3166-1 code, only for [`Endpoint::TopHeadlines`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) country: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) category: Option<String>,

    /// 2-letter ISO-639-1 code, only for [`Endpoint::Everything`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) language: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) sort_by: Option<SortBy>,

    #[serde(default = "default_page_size")]
    pub(crate) page_size: u32,
}

#[derive(
    Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr,
)]
pub(crate) enum Endpoint {
    #[default]
    #[serde(rename = "everything")]
    #[strum(serialize = "everything")]
    Everything,

    #[serde(rename = "top-headlines")]
    #[strum(serialize = "top-headlines")]
    TopHeadlines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::IntoStaticStr)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub(crate) enum SortBy {
    Relevancy,
    Popularity,
    PublishedAt,
}

/// Maximum page size allowed by the API
const MAX_PAGE_SIZE: u32 = 100;

fn default_page_size() -> u32 {
    10
}

pub(super) fn default_queries() -> Vec<NewsQuery> {
    let blank = NewsQuery {
        tag: String::new(),
        endpoint: Endpoint::TopHeadlines,
        q: None,
        sources: None,
        domains: None,
        country: None,
        category: None,
        language: None,
        sort_by: None,
        page_size: default_page_size(),
    };

    vec![
        NewsQuery {
            tag: "uk".to_owned(),
            endpoint: Endpoint::TopHeadlines,
            country: Some("gb".to_owned()),
            ..blank.clone()
        },
        NewsQuery {
            tag: "world".to_owned(),
            endpoint: Endpoint::Everything,
            q: Some("world news".to_owned()),
            language: Some("en".to_owned()),
            sort_by: Some(SortBy::PublishedAt),
            ..blank
        },
    ]
}

impl NewsQuery {
    pub(crate) fn validate(&self) -> Result<(), String> {
        let tag = &self.tag;

        if tag.trim().is_empty() {
            return Err(format!("Query tag must not be empty: {self:?}"));
        }

        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(format!(
                "Query `{tag}` page size must be in range 1..={MAX_PAGE_SIZE}"
            ));
        }

        match self.endpoint {
            Endpoint::Everything => {
                if self.q.is_none() && self.sources.is_none() && self.domains.is_none() {
                    return Err(format!(
                        "Query `{tag}` to `everything` requires one of `q`, `sources` or `domains`"
                    ));
                }
                if self.country.is_some() || self.category.is_some() {
                    return Err(format!(
                        "Query `{tag}` to `everything` doesn't support `country` or `category`"
                    ));
                }
            }
            Endpoint::TopHeadlines => {
                if self.sources.is_some() && (self.country.is_some() || self.category.is_some()) {
                    return Err(format!(
                        "Query `{tag}` to `top-headlines` can't mix `sources` \
                        with `country` or `category`"
                    ));
                }
                if self.domains.is_some() || self.language.is_some() {
                    return Err(format!(
                        "Query `{tag}` to `top-headlines` doesn't support `domains` or `language`"
                    ));
                }
            }
        }

        Ok(())
    }

    /// URL query parameters in the format expected by the news API
    pub(crate) fn to_params(&self) -> Vec<(&'static str, String)> {
        let optional = [
            ("q", &self.q),
            ("sources", &self.sources),
            ("domains", &self.domains),
            ("country", &self.country),
            ("category", &self.category),
            ("language", &self.language),
        ];

        optional
            .into_iter()
            .filter_map(|(key, value)| Some((key, value.clone()?)))
            .chain(
                self.sort_by
                    .map(|sort_by| ("sortBy", <&str>::from(sort_by).to_owned())),
            )
            .chain([("pageSize", self.page_size.to_string())])
            .collect()
    }
}
