use crate::prelude::*;
use crate::tg;
use crate::Result;
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use teloxide::utils::markdown;

#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "snake_case", description = "Commands:")]
pub(crate) enum Cmd {
    #[command(description = "show the list of commands")]
    Help,

    #[command(description = "show the latest headlines")]
    News,
}

#[async_trait]
impl tg::cmd::Command for Cmd {
    async fn handle(self, ctx: &tg::Ctx, msg: &Message) -> Result {
        match self {
            Cmd::Help => {
                let greeting = "👋 Hi! I post the latest news to the channel without \
                    flooding it. You can also ask me for the headlines right here.";

                let help = markdown::escape(&format!(
                    "{greeting}\n\n{}",
                    Cmd::descriptions()
                ));

                ctx.bot.reply_chunked(msg, help).await?;
            }
            Cmd::News => {
                tg::news_button::reply_with_news(ctx, msg).await?;
            }
        }
        Ok(())
    }
}
