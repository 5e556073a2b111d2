use serde::Deserialize;
use teloxide::types::{ChatId, Recipient, UserId};

#[derive(Deserialize, Clone)]
pub(crate) struct Config {
    pub(crate) token: String,

    /// Numeric id of the channel where the news are posted, or its `@username`
    channel: String,

    /// ID of the user, who owns the bot, and thus has full access to it
    pub(crate) owner_id: Option<UserId>,

    /// Fallback for identifying the owner when [`Config::owner_id`] isn't set.
    /// Usernames can be changed and then taken by anyone else, so this is
    /// less secure than the numeric id.
    pub(crate) owner_username: Option<String>,
}

impl Config {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.token.trim().is_empty() {
            return Err("TG_TOKEN must not be empty".to_owned());
        }

        if self.channel.parse::<i64>().is_err()
            && !(self.channel.starts_with('@') && self.channel.len() > 1)
        {
            return Err(format!(
                "TG_CHANNEL must be a numeric chat id or a @username, but got `{}`",
                self.channel
            ));
        }

        let username = self.owner_username.as_deref().map(str::trim);
        if self.owner_id.is_none() && matches!(username, None | Some("" | "@")) {
            return Err("Either TG_OWNER_ID or TG_OWNER_USERNAME must be set".to_owned());
        }

        Ok(())
    }

    pub(crate) fn channel(&self) -> Recipient {
        match self.channel.parse() {
            Ok(id) => Recipient::Id(ChatId(id)),
            Err(_) => Recipient::ChannelUsername(self.channel.clone()),
        }
    }

    /// The numeric id, if configured, is the only source of truth.
    /// Otherwise the username is compared case-insensitively.
    pub(crate) fn is_owner(&self, user_id: UserId, username: Option<&str>) -> bool {
        if let Some(owner_id) = self.owner_id {
            return user_id == owner_id;
        }

        let normalize = |username: &str| username.trim().trim_start_matches('@').to_lowercase();

        match (self.owner_username.as_deref(), username) {
            (Some(expected), Some(actual)) => {
                let expected = normalize(expected);
                !expected.is_empty() && expected == normalize(actual)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn config(owner_id: Option<u64>, owner_username: Option<&str>) -> Config {
        Config {
            token: "123:abc".to_owned(),
            channel: "@world_news".to_owned(),
            owner_id: owner_id.map(UserId),
            owner_username: owner_username.map(ToOwned::to_owned),
        }
    }

    #[test]
    fn owner_by_id() {
        let config = config(Some(42), Some("alice"));

        assert!(config.is_owner(UserId(42), None));
        assert!(config.is_owner(UserId(42), Some("bob")));

        // The username is ignored when the id is known
        assert!(!config.is_owner(UserId(7), Some("alice")));
    }

    #[test]
    fn owner_by_username() {
        let config = config(None, Some("@Alice"));

        assert!(config.is_owner(UserId(7), Some("alice")));
        assert!(config.is_owner(UserId(8), Some("ALICE")));
        assert!(!config.is_owner(UserId(7), Some("alice_")));
        assert!(!config.is_owner(UserId(7), None));
    }

    #[test]
    fn channel_recipient() {
        let mut config = config(Some(1), None);
        assert_matches!(config.channel(), Recipient::ChannelUsername(name) if name == "@world_news");

        config.channel = "-1001234567890".to_owned();
        assert_matches!(config.channel(), Recipient::Id(ChatId(-1001234567890)));
        config.validate().unwrap();
    }

    #[test]
    fn validation() {
        config(Some(1), None).validate().unwrap();
        config(None, Some("alice")).validate().unwrap();

        assert!(config(None, None).validate().is_err());
        assert!(config(None, Some(" @ ")).validate().is_err());

        let mut bad_channel = config(Some(1), None);
        bad_channel.channel = "world_news".to_owned();
        assert!(bad_channel.validate().is_err());
    }
}
