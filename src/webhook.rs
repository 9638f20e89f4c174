use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use serenity::model::prelude::WebhookId;

use crate::error::ProvisionError;
use crate::types::{FeedName, WebhookCredential};

pub const DISCORD_API_BASE: &str = "https://discord.com/api/v10";

/// Delivers message content through a webhook.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn execute(
        &self,
        id: WebhookId,
        token: &SecretString,
        content: &str,
    ) -> anyhow::Result<()>;
}

pub struct DiscordWebhooks {
    http: reqwest::Client,
    api_base: String,
}

impl DiscordWebhooks {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            api_base: DISCORD_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(http: reqwest::Client, api_base: impl Into<String>) -> Self {
        Self {
            http,
            api_base: api_base.into(),
        }
    }
}

#[async_trait]
impl WebhookTransport for DiscordWebhooks {
    async fn execute(
        &self,
        id: WebhookId,
        token: &SecretString,
        content: &str,
    ) -> anyhow::Result<()> {
        // wait=true makes Discord answer only once the message exists.
        let url = format!(
            "{}/webhooks/{}/{}?wait=true",
            self.api_base,
            id,
            token.expose_secret()
        );

        self.http
            .post(url)
            .json(&json!({ "content": content }))
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(|err| err.without_url())
            .with_context(|| format!("Failed to execute webhook {}", id))?;

        Ok(())
    }
}

/// A delivery client bound to one webhook.
#[derive(Clone)]
pub struct WebhookClient {
    transport: Arc<dyn WebhookTransport>,
    id: WebhookId,
    token: SecretString,
}

impl WebhookClient {
    pub fn id(&self) -> WebhookId {
        self.id
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub async fn send(&self, content: &str) -> anyhow::Result<()> {
        self.transport.execute(self.id, &self.token, content).await
    }
}

pub struct Provisioned {
    pub client: WebhookClient,
    pub verified: bool,
}

pub struct WebhookProvisioner {
    transport: Arc<dyn WebhookTransport>,
}

impl WebhookProvisioner {
    pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
        Self { transport }
    }

    pub fn client_for(&self, credential: &WebhookCredential) -> WebhookClient {
        WebhookClient {
            transport: self.transport.clone(),
            id: credential.webhook_id,
            token: credential.webhook_token.clone(),
        }
    }

    /// Builds the client and posts a confirmation through it. A failed post
    /// is reported through `verified`, it never aborts provisioning.
    pub async fn provision(
        &self,
        credential: &WebhookCredential,
        feed: &FeedName,
    ) -> Provisioned {
        let client = self.client_for(credential);

        let verified = match client.send(&verification_message(feed)).await {
            Ok(()) => true,
            Err(err) => {
                log::error!(
                    "Webhook {} for {}: {}",
                    client.id(),
                    feed,
                    ProvisionError::VerifyFailed(err)
                );
                false
            }
        };

        Provisioned { client, verified }
    }
}

pub fn verification_message(feed: &FeedName) -> String {
    format!("Webhook for [{}]({}) successfully created", feed, feed.url())
}
