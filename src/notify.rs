use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::json;
use serenity::model::channel::MessageFlags;

use crate::error::ProvisionError;
use crate::types::{FeedName, InteractionHandle};
use crate::webhook::DISCORD_API_BASE;

pub const SUPPORT_URL: &str = "https://discord.gg/sD3ABd5";

#[async_trait]
pub trait FollowupSender: Send + Sync {
    async fn send_ephemeral(
        &self,
        handle: &InteractionHandle,
        content: &str,
    ) -> anyhow::Result<()>;
}

/// Sends follow-ups through the interaction webhook Discord keeps open for
/// every command invocation, addressed by application id and interaction token.
pub struct DiscordFollowups {
    http: reqwest::Client,
    application_id: u64,
    api_base: String,
}

impl DiscordFollowups {
    pub fn new(http: reqwest::Client, application_id: u64) -> Self {
        Self::with_api_base(http, application_id, DISCORD_API_BASE)
    }

    pub fn with_api_base(
        http: reqwest::Client,
        application_id: u64,
        api_base: impl Into<String>,
    ) -> Self {
        Self {
            http,
            application_id,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl FollowupSender for DiscordFollowups {
    async fn send_ephemeral(
        &self,
        handle: &InteractionHandle,
        content: &str,
    ) -> anyhow::Result<()> {
        let url = format!(
            "{}/webhooks/{}/{}",
            self.api_base,
            self.application_id,
            handle.interaction_token.expose_secret()
        );

        self.http
            .post(url)
            .json(&json!({
                "content": content,
                "flags": MessageFlags::EPHEMERAL.bits(),
            }))
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|err| err.without_url())
            .context("Failed to create follow-up message")?;

        Ok(())
    }
}

pub struct ResultNotifier {
    sender: Arc<dyn FollowupSender>,
}

impl ResultNotifier {
    pub fn new(sender: Arc<dyn FollowupSender>) -> Self {
        Self { sender }
    }

    pub async fn notify(
        &self,
        requester: &InteractionHandle,
        feed: &FeedName,
        verified: bool,
    ) -> Result<(), ProvisionError> {
        let content = if verified {
            success_message(feed)
        } else {
            failure_message()
        };

        self.sender
            .send_ephemeral(requester, &content)
            .await
            .map_err(ProvisionError::NotifyFailed)
    }
}

pub fn success_message(feed: &FeedName) -> String {
    format!(
        "Successfully added webhook for {}. Everything is ready to go",
        feed
    )
}

pub fn failure_message() -> String {
    format!(
        "There was a problem setting up your webhook.\nRetry or reach out for help [here]({})",
        SUPPORT_URL
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox {
        fail: bool,
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FollowupSender for Outbox {
        async fn send_ephemeral(
            &self,
            _handle: &InteractionHandle,
            content: &str,
        ) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("Unknown Webhook");
            }
            self.sent.lock().unwrap().push(content.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn wording_follows_verification_outcome() {
        let outbox = Arc::new(Outbox::default());
        let notifier = ResultNotifier::new(outbox.clone());
        let handle = InteractionHandle::new("interaction");
        let feed = FeedName::parse("golang").unwrap();

        notifier.notify(&handle, &feed, true).await.unwrap();
        notifier.notify(&handle, &feed, false).await.unwrap();

        let sent = outbox.sent.lock().unwrap();
        assert_eq!(
            sent[0],
            "Successfully added webhook for r/golang. Everything is ready to go"
        );
        assert!(sent[1].starts_with("There was a problem setting up your webhook."));
        assert!(sent[1].contains(SUPPORT_URL));
    }

    #[tokio::test]
    async fn send_failure_becomes_notify_failed() {
        let notifier = ResultNotifier::new(Arc::new(Outbox {
            fail: true,
            ..Default::default()
        }));
        let feed = FeedName::parse("golang").unwrap();

        let err = notifier
            .notify(&InteractionHandle::new("interaction"), &feed, true)
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisionError::NotifyFailed(_)));
    }
}
