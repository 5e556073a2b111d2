use crate::prelude::*;
use crate::util::{display, DynError, DynResult};
use crate::{tg, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use teloxide::utils::markdown;

const REFUSAL: &str = "⛔ Sorry, this command is available only to the owner of the bot.";

#[derive(BotCommands, Clone, Debug)]
#[command(
    rename_rule = "snake_case",
    description = "Commands for the bot owner only:"
)]
pub(crate) enum Cmd {
    #[command(description = "display this text")]
    OwnerHelp,

    #[command(description = "show the rate limit, the pending queue and the counters")]
    Status,

    #[command(description = "stop publishing news to the channel")]
    Pause,

    #[command(description = "continue publishing news to the channel")]
    Resume,

    #[command(description = "show the last published article")]
    Last,

    #[command(description = "set the rate limit: <capacity> <refill interval in seconds>")]
    SetLimit(String),
}

#[async_trait]
impl tg::cmd::Command for Cmd {
    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result {
        match self {
            Cmd::OwnerHelp => {
                ctx.bot.reply_help_md_escaped::<Cmd>(msg).await?;
            }
            Cmd::Status => {
                ctx.bot
                    .reply_chunked(msg, ctx.relay.status().to_markdown())
                    .await?;
            }
            Cmd::Pause => {
                let reply = if ctx.relay.pause() {
                    "⏸ Publishing is paused"
                } else {
                    "Publishing is already paused"
                };
                ctx.bot.reply_chunked(msg, markdown::escape(reply)).await?;
            }
            Cmd::Resume => {
                let reply = if ctx.relay.resume() {
                    "▶️ Publishing is resumed"
                } else {
                    "Publishing is already running"
                };
                ctx.bot.reply_chunked(msg, markdown::escape(reply)).await?;
            }
            Cmd::Last => {
                ctx.bot
                    .reply_chunked(msg, ctx.relay.last_post_markdown())
                    .disable_web_page_preview(true)
                    .await?;
            }
            Cmd::SetLimit(args) => {
                let (capacity, interval) = parse_set_limit(&args)?;

                ctx.relay.set_limit(capacity, interval);

                let reply = format!(
                    "✅ Rate limit is set to {capacity} posts per {}, \
                    the bucket is refilled to {capacity} tokens",
                    display::human_duration(interval),
                );

                ctx.bot.reply_chunked(msg, markdown::escape(&reply)).await?;
            }
        }
        Ok(())
    }
}

/// Runs the parsed owner command if it came from the owner, refuses otherwise
pub(crate) fn handler() -> UpdateHandler<Box<DynError>> {
    dptree::entry()
        .branch(dptree::filter(filter).endpoint(tg::cmd::handle::<Cmd>()))
        .endpoint(refuse)
}

/// Owner commands are accepted only in the private chat with the owner
fn filter(ctx: Arc<tg::Ctx>, msg: Message) -> bool {
    let Some(sender) = msg.from() else {
        return false;
    };

    let is_owner =
        msg.chat.is_private() && ctx.cfg.is_owner(sender.id, sender.username.as_deref());

    if !is_owner {
        info!(
            sender = %sender.debug_id(),
            chat = %msg.chat.debug_id(),
            "Non-owner user tried to access owner command"
        );
    }

    is_owner
}

/// Replies to everyone who isn't allowed to run owner commands
async fn refuse(ctx: Arc<tg::Ctx>, msg: Message) -> DynResult {
    ctx.bot
        .reply_chunked(&msg, markdown::escape(REFUSAL))
        .await?;
    Ok(())
}

fn parse_set_limit(args: &str) -> Result<(u32, Duration), SetLimitCommandError> {
    match args.split_whitespace().collect::<Vec<_>>().as_slice() {
        [] | [_] => Err(SetLimitCommandError::MissingArgs),
        [capacity, interval] => {
            let capacity = parse_positive(capacity)?;
            let interval = parse_positive(interval)?;
            Ok((capacity, Duration::from_secs(interval.into())))
        }
        _ => Err(SetLimitCommandError::TooManyArgs),
    }
}

fn parse_positive(input: &str) -> Result<u32, SetLimitCommandError> {
    input
        .parse()
        .ok()
        .filter(|&value| value > 0)
        .ok_or_else(|| SetLimitCommandError::NotPositiveInteger {
            input: input.to_owned(),
        })
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum SetLimitCommandError {
    #[error(
        "Expected two arguments: <capacity> <refill interval in seconds>. \
        Example: /set_limit 3 900"
    )]
    MissingArgs,

    #[error("Too many arguments, expected only <capacity> <refill interval in seconds>")]
    TooManyArgs,

    #[error("Expected a positive integer, but got `{input}`")]
    NotPositiveInteger { input: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{news, relay};
    use assert_matches::assert_matches;
    use serde_json::json;

    const OWNER: u64 = 42;
    const STRANGER: u64 = 7;

    fn ctx() -> Arc<tg::Ctx> {
        let cfg: tg::Config = serde_json::from_value(json!({
            "token": "123:abc",
            "channel": "@world_news",
            "owner_id": OWNER,
        }))
        .unwrap();

        let news_cfg: news::Config = serde_json::from_value(json!({ "api_key": "key" })).unwrap();
        let news = Arc::new(news::Client::new(news_cfg, crate::http::create_client()));

        // Nothing listens on this port, so replies fail without reaching Telegram
        let bot = tg::with_adaptors(
            teloxide::Bot::new(cfg.token.clone()).set_api_url("http://127.0.0.1:1".parse().unwrap()),
        );

        let publisher = Arc::new(tg::TgPublisher {
            bot: bot.clone(),
            channel: cfg.channel(),
            owner: cfg.owner_id,
        });

        let relay = Arc::new(relay::Relay::new(
            news.clone(),
            publisher,
            news.queries().to_vec(),
            relay::Config::default(),
        ));

        Arc::new(tg::Ctx {
            bot,
            cfg: Arc::new(cfg),
            relay,
            news,
        })
    }

    fn private_chat(user: u64) -> serde_json::Value {
        json!({ "id": user, "type": "private", "first_name": "User" })
    }

    fn group_chat() -> serde_json::Value {
        json!({ "id": -100_123, "type": "group", "title": "News fans" })
    }

    fn set_limit_message(sender: u64, chat: serde_json::Value) -> Message {
        serde_json::from_value(json!({
            "message_id": 1,
            "date": 1_700_000_000,
            "chat": chat,
            "from": {
                "id": sender,
                "is_bot": false,
                "first_name": "User",
                "username": format!("user{sender}"),
            },
            "text": "/set_limit 3 900",
            "entities": [{ "type": "bot_command", "offset": 0, "length": 10 }],
        }))
        .unwrap()
    }

    async fn dispatch_set_limit(ctx: &Arc<tg::Ctx>, msg: Message) {
        let deps = dptree::deps![ctx.clone(), msg, Cmd::SetLimit("3 900".to_owned())];

        // Both branches end up replying, which fails with the unreachable API
        assert!(handler().dispatch(deps).await.is_break());
    }

    #[tokio::test]
    async fn only_owner_in_private_chat_passes() {
        let ctx = ctx();

        assert!(filter(ctx.clone(), set_limit_message(OWNER, private_chat(OWNER))));
        assert!(!filter(ctx.clone(), set_limit_message(OWNER, group_chat())));
        assert!(!filter(
            ctx.clone(),
            set_limit_message(STRANGER, private_chat(STRANGER))
        ));
        assert!(!filter(ctx, set_limit_message(STRANGER, group_chat())));
    }

    #[tokio::test]
    async fn set_limit_from_non_owner_leaves_the_bucket_intact() {
        let ctx = ctx();
        let before = ctx.relay.status();

        dispatch_set_limit(&ctx, set_limit_message(STRANGER, private_chat(STRANGER))).await;
        dispatch_set_limit(&ctx, set_limit_message(OWNER, group_chat())).await;

        let after = ctx.relay.status();
        assert_eq!(after.bucket_capacity, before.bucket_capacity);
        assert_eq!(after.bucket_refill_interval, before.bucket_refill_interval);
        assert_eq!(after.bucket_capacity, 2);
    }

    #[tokio::test]
    async fn set_limit_from_owner() {
        let ctx = ctx();

        dispatch_set_limit(&ctx, set_limit_message(OWNER, private_chat(OWNER))).await;

        let status = ctx.relay.status();
        assert_eq!(status.bucket_capacity, 3);
        assert_eq!(status.bucket_tokens, 3.0);
    }

    #[test]
    fn set_limit_args() {
        assert_eq!(
            parse_set_limit("3 900").unwrap(),
            (3, Duration::from_secs(900))
        );
        assert_eq!(
            parse_set_limit("  1    60 ").unwrap(),
            (1, Duration::from_secs(60))
        );
    }

    #[test]
    fn set_limit_malformed_args() {
        assert_matches!(parse_set_limit(""), Err(SetLimitCommandError::MissingArgs));
        assert_matches!(parse_set_limit("3"), Err(SetLimitCommandError::MissingArgs));
        assert_matches!(
            parse_set_limit("3 900 1"),
            Err(SetLimitCommandError::TooManyArgs)
        );
        assert_matches!(
            parse_set_limit("0 900"),
            Err(SetLimitCommandError::NotPositiveInteger { input }) if input == "0"
        );
        assert_matches!(
            parse_set_limit("3 -900"),
            Err(SetLimitCommandError::NotPositiveInteger { input }) if input == "-900"
        );
        assert_matches!(
            parse_set_limit("three 900"),
            Err(SetLimitCommandError::NotPositiveInteger { input }) if input == "three"
        );
    }

    #[test]
    fn parses_command() {
        assert_matches!(
            Cmd::parse("/set_limit 3 900", "news_bot"),
            Ok(Cmd::SetLimit(args)) if args == "3 900"
        );
        assert_matches!(Cmd::parse("/status", "news_bot"), Ok(Cmd::Status));
        assert_matches!(Cmd::parse("/owner_help", "news_bot"), Ok(Cmd::OwnerHelp));
    }
}
