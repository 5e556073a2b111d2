//! On-demand headlines with an inline button to load the fresh ones

use crate::news::{Article, NewsSource};
use crate::prelude::*;
use crate::util::DynResult;
use crate::{tg, Result};
use itertools::Itertools;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::markdown;
use teloxide::{ApiError, RequestError};

const MORE_NEWS_CALLBACK: &str = "more_news";
const MAX_HEADLINES: usize = 5;

pub(crate) async fn reply_with_news(ctx: &tg::Ctx, msg: &Message) -> Result {
    let text = headlines(ctx).await?;

    ctx.bot
        .reply_chunked(msg, text)
        .reply_markup(keyboard("More news 🔁"))
        .disable_web_page_preview(true)
        .await?;

    Ok(())
}

#[instrument(skip_all, fields(from = %query.from.debug_id(), data = query.data.as_deref()))]
pub(crate) async fn handle_callback_query(ctx: Arc<tg::Ctx>, query: CallbackQuery) -> DynResult {
    if query.data.as_deref() != Some(MORE_NEWS_CALLBACK) {
        debug!("Ignoring unknown callback query");
        return Ok(());
    }

    // Stop the loading animation on the button
    if let Err(err) = ctx.bot.answer_callback_query(query.id.clone()).await {
        warn!(err = tracing_err(&err), "Failed to answer the callback query");
    }

    let Some(message) = &query.message else {
        debug!("The message with the button is too old, ignoring the query");
        return Ok(());
    };

    let text = refreshed_headlines(&ctx).await.unwrap_or_else(|err| {
        warn!(err = tracing_err(&err), "Failed to fetch the news on demand");
        markdown::escape(&format!(
            "⚠️ Sorry, couldn't get the news, try again later (error id: {})",
            err.id()
        ))
    });

    let result = ctx
        .bot
        .edit_message_text(message.chat.id, message.id, text)
        .reply_markup(keyboard("Refresh 🔄"))
        .disable_web_page_preview(true)
        .await;

    match result {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

async fn headlines(ctx: &tg::Ctx) -> Result<String> {
    let articles = ctx.news.fetch(ctx.news.on_demand_query()).await?;
    Ok(render_headlines(&articles))
}

async fn refreshed_headlines(ctx: &tg::Ctx) -> Result<String> {
    let query = ctx.news.on_demand_query();
    let articles = ctx.news.fetch(query).await?;
    Ok(render_refreshed_headlines(&query.tag, &articles))
}

/// The header lets the user see that the message was refreshed
fn render_refreshed_headlines(tag: &str, articles: &[Article]) -> String {
    let header = markdown::escape(&format!("📰 More {} News:", tag_label(tag)));
    format!("{header}

{}", render_headlines(articles))
}

/// Short tags are abbreviations like `uk` or `us`
fn tag_label(tag: &str) -> String {
    if tag.chars().count() <= 3 {
        return tag.to_uppercase();
    }
    let mut chars = tag.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

fn render_headlines(articles: &[Article]) -> String {
    if articles.is_empty() {
        return markdown::escape("⚠️ Sorry, no news found.");
    }

    articles
        .iter()
        .take(MAX_HEADLINES)
        .format_with("\n\n", |article, f| {
            f(&format_args!(
                "{}\n{}",
                markdown::escape(&format!("🗞 {}", article.title)),
                markdown::link(article.url.as_str(), "Read more"),
            ))
        })
        .to_string()
}

fn keyboard(text: &str) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new([[InlineKeyboardButton::callback(
        text,
        MORE_NEWS_CALLBACK,
    )]])
}
