use axum::http::StatusCode;
use thiserror::Error;

/// Why the OAuth code exchange did not yield a usable webhook.
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned status {0}")]
    Status(u16),

    #[error("token response did not contain a valid webhook: {0}")]
    MalformedBody(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("missing query parameter `{0}`")]
    Validation(&'static str),

    #[error("state not found or expired")]
    StateNotFound,

    #[error("code exchange failed: {0}")]
    ExchangeFailed(#[from] ExchangeError),

    #[error("verification message could not be sent: {0:#}")]
    VerifyFailed(anyhow::Error),

    #[error("follow-up message could not be sent: {0:#}")]
    NotifyFailed(anyhow::Error),

    #[error("subscription could not be stored: {0:#}")]
    PersistFailed(anyhow::Error),
}

impl ProvisionError {
    /// Status the browser sees when the callback ends in this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProvisionError::Validation(_) => StatusCode::BAD_REQUEST,
            ProvisionError::StateNotFound => StatusCode::FORBIDDEN,
            ProvisionError::ExchangeFailed(_)
            | ProvisionError::VerifyFailed(_)
            | ProvisionError::NotifyFailed(_)
            | ProvisionError::PersistFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
