use crate::news::Article;
use itertools::Itertools;
use lazy_regex::regex;
use std::borrow::Cow;
use teloxide::utils::markdown;
use url::Url;

/// Telegram limit for the caption of a photo message
const MAX_CAPTION_LEN: usize = 1024;

const MAX_EXCERPT_SENTENCES: usize = 5;

/// Message ready to be sent to the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Post {
    /// Text in MarkdownV2 format
    pub(crate) text: String,

    /// If present, the post is sent as a photo with the text in the caption
    pub(crate) image: Option<Url>,
}

impl Post {
    pub(crate) fn new(article: &Article, tag: &str) -> Self {
        let mut sentences = excerpt_sentences(article);
        let text = render(&article.title, &sentences, &article.url, tag);

        let Some(image) = &article.image_url else {
            return Self { text, image: None };
        };

        let mut title = Cow::Borrowed(article.title.as_str());

        loop {
            let caption = render(&title, &sentences, &article.url, tag);
            let overflow = caption.chars().count().saturating_sub(MAX_CAPTION_LEN);

            if overflow == 0 {
                return Self {
                    text: caption,
                    image: Some(image.clone()),
                };
            }

            if sentences.pop().is_some() {
                continue;
            }

            let title_len = title.chars().count();
            if title_len <= 1 {
                // Not even the link fits into the caption, so the photo is skipped
                return Self { text, image: None };
            }

            let keep = title_len.saturating_sub(overflow + 1);
            title = Cow::Owned(format!("{}…", title.chars().take(keep).collect::<String>()));
        }
    }
}

fn render(title: &str, sentences: &[String], url: &Url, tag: &str) -> String {
    let title = markdown::bold(&markdown::escape(title));
    let excerpt = markdown::escape(&sentences.join(" "));
    let link = markdown::link(url.as_str(), "Read more");
    let hashtag = hashtag(tag)
        .map(|tag| markdown::escape(&format!("#{tag}")))
        .unwrap_or_default();

    [title, excerpt, link, hashtag]
        .into_iter()
        .filter(|part| !part.is_empty())
        .join("\n\n")
}

/// Telegram hashtags consist only of letters, digits and underscores
fn hashtag(tag: &str) -> Option<String> {
    let tag: String = tag
        .trim()
        .chars()
        .map(|char| if char.is_alphanumeric() { char } else { '_' })
        .collect();

    let tag = tag.trim_matches('_');

    (!tag.is_empty()).then(|| tag.to_owned())
}

/// First sentences of the article content, or its description if the
/// content is missing
fn excerpt_sentences(article: &Article) -> Vec<String> {
    let body = [&article.content, &article.description]
        .into_iter()
        .flatten()
        .map(|text| clean_text(text))
        .find(|text| !text.is_empty());

    let Some(body) = body else {
        return vec![];
    };

    regex!(r"(?s).+?(?:[.!?]+(?:\s+|$)|$)")
        .find_iter(&body)
        .map(|sentence| sentence.as_str().trim())
        .filter(|sentence| !sentence.is_empty())
        .take(MAX_EXCERPT_SENTENCES)
        .map(ToOwned::to_owned)
        .collect()
}

/// The news API truncates the content and appends a marker like `… [+1520 chars]`
fn clean_text(text: &str) -> String {
    let text = regex!(r"\s*\[\+\d+ chars\]\s*$").replace(text, "");
    let text = text.trim_end();
    let text = text
        .strip_suffix('…')
        .or_else(|| text.strip_suffix("..."))
        .unwrap_or(text);

    text.split_whitespace().join(" ")
}
