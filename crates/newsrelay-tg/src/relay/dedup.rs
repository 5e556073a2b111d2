use crate::news::Article;
use itertools::Itertools;
use std::collections::HashSet;
use std::fmt;
use url::Url;

/// Normalized identity of an article used to suppress repeats. The same
/// article returned by different queries or with a different tracking query
/// string in its URL yields the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct DedupeKey(String);

impl DedupeKey {
    pub(crate) fn of(article: &Article) -> Self {
        let url = normalize_url(&article.url);
        let title = normalize_title(&article.title);
        Self(format!("{url}|{title}"))
    }
}

impl fmt::Display for DedupeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Drops the scheme, query string, fragment, `www.` prefix and trailing slashes
fn normalize_url(url: &Url) -> String {
    let Some(host) = url.host_str() else {
        return url.path().trim_end_matches('/').to_owned();
    };

    let host = host.to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let port = url.port().map(|port| format!(":{port}")).unwrap_or_default();
    let path = url.path().trim_end_matches('/');

    format!("{host}{port}{path}")
}

/// Lowercases, strips punctuation and collapses whitespace
fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|char| char.is_alphanumeric() || char.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// Keys of all articles the relay has ever tried to publish. It lives only
/// in memory and grows for the whole lifetime of the process.
#[derive(Debug, Default)]
pub(crate) struct SeenSet {
    keys: HashSet<DedupeKey>,
}

impl SeenSet {
    pub(crate) fn contains(&self, key: &DedupeKey) -> bool {
        self.keys.contains(key)
    }

    /// Returns `false` if the key was already seen
    pub(crate) fn insert(&mut self, key: DedupeKey) -> bool {
        self.keys.insert(key)
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }
}
