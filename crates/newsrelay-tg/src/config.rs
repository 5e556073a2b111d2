use crate::{news, relay, tg};
use serde::de::DeserializeOwned;

pub struct Config {
    pub(crate) tg: tg::Config,
    pub(crate) news: news::Config,
    pub(crate) relay: relay::Config,
}

impl Config {
    pub fn load_or_panic() -> Config {
        let config = Self {
            tg: from_env_or_panic("TG_"),
            news: from_env_or_panic("NEWS_"),
            relay: from_env_or_panic("RELAY_"),
        };

        if let Err(message) = config.validate() {
            panic!("BUG: Invalid configuration in environment: {message}");
        }

        config
    }

    fn validate(&self) -> Result<(), String> {
        self.tg.validate()?;
        self.news.validate()?;
        self.relay.validate()
    }
}

pub(crate) fn from_env_or_panic<T: DeserializeOwned>(prefix: &str) -> T {
    envy::prefixed(prefix).from_env().unwrap_or_else(|err| {
        panic!(
            "BUG: Couldn't load config from environment for {}: {:#?}",
            std::any::type_name::<T>(),
            err
        );
    })
}
