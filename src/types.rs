use std::fmt;

use secrecy::SecretString;
use serenity::model::prelude::{ChannelId, GuildId, WebhookId};

const MAX_FEED_NAME_LEN: usize = 21;

/// Name of a subreddit, stored without the `r/` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedName(String);

impl FeedName {
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let name = trimmed
            .strip_prefix("r/")
            .or_else(|| trimmed.strip_prefix("/r/"))
            .unwrap_or(trimmed);

        let valid = !name.is_empty()
            && name.len() <= MAX_FEED_NAME_LEN
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

        valid.then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn url(&self) -> String {
        format!("https://www.reddit.com/r/{}", self.0)
    }
}

impl fmt::Display for FeedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r/{}", self.0)
    }
}

/// Points back at the slash command invocation that started an authorization.
/// The interaction token is what Discord needs to address a follow-up message.
#[derive(Debug, Clone)]
pub struct InteractionHandle {
    pub interaction_token: SecretString,
}

impl InteractionHandle {
    pub fn new(interaction_token: impl Into<String>) -> Self {
        Self {
            interaction_token: SecretString::new(interaction_token.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub requester: InteractionHandle,
    pub feed: FeedName,
}

/// Webhook issued by the OAuth token exchange.
#[derive(Debug, Clone)]
pub struct WebhookCredential {
    pub webhook_id: WebhookId,
    pub webhook_token: SecretString,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
}

#[derive(Debug, Clone)]
pub struct SubscriptionRecord {
    pub id: Option<i64>,
    pub feed: FeedName,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub webhook_id: WebhookId,
    pub webhook_token: SecretString,
}

impl SubscriptionRecord {
    pub fn new(feed: FeedName, credential: &WebhookCredential) -> Self {
        Self {
            id: None,
            feed,
            guild_id: credential.guild_id,
            channel_id: credential.channel_id,
            webhook_id: credential.webhook_id,
            webhook_token: credential.webhook_token.clone(),
        }
    }
}
