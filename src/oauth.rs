//! Authorization-code exchange against Discord's OAuth2 token endpoint.
//!
//! The `webhook.incoming` scope makes Discord create a webhook in the channel
//! the user picked and return it alongside the access token.

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serenity::model::prelude::{ChannelId, GuildId, WebhookId};

use crate::error::ExchangeError;
use crate::types::WebhookCredential;

pub const DISCORD_TOKEN_URL: &str = "https://discord.com/api/v10/oauth2/token";
pub const DISCORD_AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: u64,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub token_url: String,
}

#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange(&self, code: &str) -> Result<WebhookCredential, ExchangeError>;
}

pub struct DiscordOAuth {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl DiscordOAuth {
    pub fn new(http: reqwest::Client, config: OAuthConfig) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl TokenExchange for DiscordOAuth {
    async fn exchange(&self, code: &str) -> Result<WebhookCredential, ExchangeError> {
        let client_id = self.config.client_id.to_string();
        let form = [
            ("client_id", client_id.as_str()),
            ("client_secret", self.config.client_secret.expose_secret().as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&form[..])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        parse_token_response(status.as_u16(), &body)
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    webhook: WebhookPayload,
}

#[derive(Deserialize)]
struct WebhookPayload {
    id: WebhookId,
    token: String,
    guild_id: GuildId,
    channel_id: ChannelId,
}

pub(crate) fn parse_token_response(
    status: u16,
    body: &str,
) -> Result<WebhookCredential, ExchangeError> {
    if !(200..300).contains(&status) {
        return Err(ExchangeError::Status(status));
    }

    let TokenResponse { webhook } = serde_json::from_str(body)?;

    Ok(WebhookCredential {
        webhook_id: webhook.id,
        webhook_token: SecretString::new(webhook.token),
        guild_id: webhook.guild_id,
        channel_id: webhook.channel_id,
    })
}

/// URL the user opens to pick a channel and authorize the webhook.
pub fn authorize_url(config: &OAuthConfig, state: &str) -> anyhow::Result<Url> {
    let url = Url::parse_with_params(
        DISCORD_AUTHORIZE_URL,
        &[
            ("client_id", config.client_id.to_string().as_str()),
            ("redirect_uri", config.redirect_uri.as_str()),
            ("response_type", "code"),
            ("scope", "webhook.incoming"),
            ("state", state),
        ],
    )?;
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BODY: &str = r#"{
        "token_type": "Bearer",
        "access_token": "abc",
        "scope": "webhook.incoming",
        "webhook": {
            "type": 1,
            "id": "347114750880120863",
            "name": "feedhook",
            "token": "kKDdjXa1g9tKNs0-_yOwLyALC9BydkWKpBbWLbrgnCZYOqXGgshcv94yZHVSBxOeg1_s",
            "guild_id": "290926792226357250",
            "channel_id": "345626669224982402"
        }
    }"#;

    fn config() -> OAuthConfig {
        OAuthConfig {
            client_id: 1234,
            client_secret: SecretString::new("shh".to_string()),
            redirect_uri: "https://feedhook.example/webhook/create".to_string(),
            token_url: DISCORD_TOKEN_URL.to_string(),
        }
    }

    #[test]
    fn parses_webhook_from_token_response() {
        let credential = parse_token_response(200, BODY).unwrap();
        assert_eq!(credential.webhook_id, WebhookId(347114750880120863));
        assert_eq!(credential.guild_id, GuildId(290926792226357250));
        assert_eq!(credential.channel_id, ChannelId(345626669224982402));
        assert!(credential.webhook_token.expose_secret().starts_with("kKDdj"));
    }

    #[test]
    fn non_success_status_is_rejected_before_parsing() {
        let err = parse_token_response(400, r#"{"error":"invalid_grant"}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::Status(400)));
    }

    #[test]
    fn missing_webhook_fields_are_malformed() {
        let err = parse_token_response(200, r#"{"access_token":"abc"}"#).unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedBody(_)));

        let body = r#"{"webhook":{"id":"1","token":"t","guild_id":"2"}}"#;
        let err = parse_token_response(200, body).unwrap_err();
        assert!(matches!(err, ExchangeError::MalformedBody(_)));
    }

    #[test]
    fn authorize_url_carries_state_and_scope() {
        let url = authorize_url(&config(), "tok").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();

        assert!(pairs.contains(&("client_id".into(), "1234".into())));
        assert!(pairs.contains(&("scope".into(), "webhook.incoming".into())));
        assert!(pairs.contains(&("state".into(), "tok".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "https://feedhook.example/webhook/create".into()
        )));
    }

    #[test]
    fn config_debug_does_not_leak_secret() {
        assert!(!format!("{:?}", config()).contains("shh"));
    }
}
