//! Telegram commands root module

mod cmd;
mod config;
mod news_button;

use crate::observability::metrics::{TG_UPDATES_SKIPPED_TOTAL, TG_UPDATES_TOTAL};
use crate::prelude::*;
use crate::relay::{self, Post, Publisher, Relay};
use crate::{news, Result};
use async_trait::async_trait;
use dptree::di::DependencyMap;
use metrics::counter;
use std::sync::Arc;
use teloxide::adaptors::{CacheMe, DefaultParseMode, Throttle, Trace};
use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode, Recipient};
use teloxide::utils::command::BotCommands;
use teloxide::utils::markdown;

pub(crate) use cmd::SetLimitCommandError;
pub(crate) use config::*;

pub(crate) type Bot = Trace<CacheMe<DefaultParseMode<Throttle<teloxide::Bot>>>>;

pub(crate) struct Ctx {
    bot: Bot,
    cfg: Arc<Config>,
    relay: Arc<Relay>,
    news: Arc<news::Client>,
}

pub(crate) struct RunBotOptions {
    pub(crate) tg_cfg: Config,
    pub(crate) relay_cfg: relay::Config,
    pub(crate) news: news::Client,
}

pub(crate) async fn run_bot(opts: RunBotOptions) -> Result {
    let RunBotOptions {
        tg_cfg,
        relay_cfg,
        news,
    } = opts;

    let mut di = DependencyMap::new();

    let bot = with_adaptors(teloxide::Bot::new(tg_cfg.token.clone()));

    if tg_cfg.owner_id.is_none() {
        warn!(
            "The owner is identified only by the username, which may be reassigned \
            to a different user. Set TG_OWNER_ID to identify the owner reliably. \
            Notifications to the owner are disabled until then."
        );
    }

    let news = Arc::new(news);

    let publisher = Arc::new(TgPublisher {
        bot: bot.clone(),
        channel: tg_cfg.channel(),
        owner: tg_cfg.owner_id,
    });

    let relay = Arc::new(Relay::new(
        news.clone(),
        publisher.clone(),
        news.queries().to_vec(),
        relay_cfg,
    ));

    di.insert(Arc::new(Ctx {
        bot: bot.clone(),
        cfg: Arc::new(tg_cfg),
        relay: relay.clone(),
        news,
    }));

    info!("Starting bot...");

    bot.set_my_commands(cmd::regular::Cmd::bot_commands())
        .await?;

    if let Err(err) = publisher.notify_owner(markdown::escape("✅ Bot is alive!")).await {
        warn!(err = tracing_err(&err), "Failed to send the startup message");
    }

    tokio::spawn({
        let relay = relay.clone();
        async move { relay.run_loop().await }.in_current_span()
    });

    tokio::spawn(async move { relay.report_loop().await }.in_current_span());

    let handler = dptree::entry()
        .inspect(|update: Update| {
            counter!(TG_UPDATES_TOTAL, 1);
            trace!(target: "tg_update", "{update:#?}");
        })
        .branch(
            Update::filter_message()
                .filter_command::<cmd::StartCommand>()
                .filter(cmd::filter_pm_with_bot)
                .endpoint(cmd::handle::<cmd::StartCommand>()),
        )
        .branch(
            Update::filter_message()
                .filter_command::<cmd::regular::Cmd>()
                .endpoint(cmd::handle::<cmd::regular::Cmd>()),
        )
        .branch(
            Update::filter_message()
                .filter_command::<cmd::owner::Cmd>()
                .chain(cmd::owner::handler()),
        )
        .branch(Update::filter_callback_query().endpoint(news_button::handle_callback_query))
        .inspect(|_: Update| {
            counter!(TG_UPDATES_SKIPPED_TOTAL, 1);
        });

    Dispatcher::builder(bot, handler)
        .dependencies(di)
        // We don't handle all possible messages that users send,
        // so to suppress the warning that we don't do this we have
        // a noop default handler here
        .default_handler(|_| std::future::ready(()))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    info!("Bot stopped");

    Ok(())
}

fn with_adaptors(bot: teloxide::Bot) -> Bot {
    bot.throttle(Default::default())
        .parse_mode(ParseMode::MarkdownV2)
        .cache_me()
        .trace(teloxide::adaptors::trace::Settings::all())
}

/// Posts the news to the channel and reports problems to the owner
struct TgPublisher {
    bot: Bot,
    channel: Recipient,
    owner: Option<UserId>,
}

#[async_trait]
impl Publisher for TgPublisher {
    async fn publish(&self, post: &Post) -> Result {
        if let Some(image) = &post.image {
            let result = self
                .bot
                .send_photo(self.channel.clone(), InputFile::url(image.clone()))
                .caption(&post.text)
                .await;

            match result {
                Ok(_) => return Ok(()),
                Err(err) => warn!(
                    err = tracing_err(&err),
                    %image,
                    "Failed to send the article with the photo, sending it as text"
                ),
            }
        }

        self.bot
            .send_message(self.channel.clone(), &post.text)
            .await?;

        Ok(())
    }

    async fn notify_owner(&self, text: String) -> Result {
        let Some(owner) = self.owner else {
            debug!("Owner id is unknown, skipping the notification");
            return Ok(());
        };

        self.bot.send_message(ChatId::from(owner), text).await?;

        Ok(())
    }
}
