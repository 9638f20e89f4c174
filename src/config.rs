use std::env;

use anyhow::Context;
use secrecy::SecretString;

use crate::http::CREATE_CALLBACK_PATH;
use crate::oauth::{OAuthConfig, DISCORD_TOKEN_URL};

#[derive(Debug)]
pub struct Config {
    pub discord_token: SecretString,
    pub application_id: u64,
    pub client_secret: SecretString,
    pub base_url: String,
    pub listen_addr: String,
    pub db_path: String,
    pub state_ttl: chrono::Duration,
    pub http_timeout: tokio::time::Duration,
}

impl Config {
    pub fn oauth(&self) -> OAuthConfig {
        OAuthConfig {
            client_id: self.application_id,
            client_secret: self.client_secret.clone(),
            redirect_uri: format!("{}{}", self.base_url, CREATE_CALLBACK_PATH),
            token_url: DISCORD_TOKEN_URL.to_string(),
        }
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).with_context(|| format!("Expected {} env var", name))
}

fn optional(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

pub fn get_config_from_env() -> anyhow::Result<Config> {
    let application_id = required("FEEDHOOK_APPLICATION_ID")?
        .parse::<u64>()
        .context("Invalid application id")?;

    let state_ttl = optional("FEEDHOOK_STATE_TTL_SECONDS", "900")
        .parse::<i64>()
        .context("Invalid state TTL")?;

    let http_timeout = optional("FEEDHOOK_HTTP_TIMEOUT_SECONDS", "10")
        .parse::<u64>()
        .context("Invalid HTTP timeout")?;

    Ok(Config {
        discord_token: SecretString::new(required("FEEDHOOK_DISCORD_TOKEN")?),
        application_id,
        client_secret: SecretString::new(required("FEEDHOOK_CLIENT_SECRET")?),
        base_url: required("FEEDHOOK_BASE_URL")?.trim_end_matches('/').to_string(),
        listen_addr: optional("FEEDHOOK_LISTEN_ADDR", "0.0.0.0:8080"),
        db_path: optional("FEEDHOOK_DB_PATH", "feedhook.db"),
        state_ttl: chrono::Duration::seconds(state_ttl),
        http_timeout: tokio::time::Duration::from_secs(http_timeout),
    })
}
