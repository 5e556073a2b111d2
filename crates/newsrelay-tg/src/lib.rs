mod config;
mod error;
mod http;
mod news;
mod observability;
mod relay;
mod tg;

pub mod util;

pub use crate::error::*;
pub use config::*;
pub use observability::*;

#[allow(unused_imports)]
mod prelude {
    pub(crate) use crate::error::prelude::*;
    pub(crate) use crate::http::prelude::*;
    pub(crate) use crate::observability::logging::prelude::*;
    pub(crate) use crate::util::prelude::*;
}

/// Run the news relay loop and the telegram bot processing loop
pub async fn run(config: Config) -> Result<()> {
    let http = http::create_client();

    let opts = tg::RunBotOptions {
        tg_cfg: config.tg,
        relay_cfg: config.relay,
        news: news::Client::new(config.news, http),
    };

    tg::run_bot(opts).await
}
