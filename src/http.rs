use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;

use crate::error::ProvisionError;
use crate::flow::{CallbackParams, WebhookFlow};
use crate::notify::SUPPORT_URL;

pub const CREATE_CALLBACK_PATH: &str = "/webhook/create";
pub const SUCCESS_PATH: &str = "/webhook/create/success";

#[derive(Clone)]
pub struct AppState {
    pub flow: Arc<WebhookFlow>,
    pub base_url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(CREATE_CALLBACK_PATH, get(webhook_create))
        .route(SUCCESS_PATH, get(webhook_create_success))
        .with_state(state)
}

async fn webhook_create(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let report = state.flow.run(params).await;

    match report.error {
        None => Redirect::to(&format!("{}{}", state.base_url, SUCCESS_PATH)).into_response(),
        Some(err) => error_page(&err),
    }
}

async fn webhook_create_success() -> Html<String> {
    Html(format!(
        r#"subreddit successfully created.<br />You can now close this site<br /><br />For further questions you can reach out <a href="{}" target="_blank">here</a>"#,
        SUPPORT_URL
    ))
}

fn error_page(err: &ProvisionError) -> Response {
    let headline = match err {
        ProvisionError::Validation(_) => "missing info",
        ProvisionError::StateNotFound => "state not found or expired",
        _ => "There was a problem setting up your subreddit notifications",
    };

    let body = format!(
        r#"{}<br />Retry or reach out <a href="{}" target="_blank">here</a> for help"#,
        headline, SUPPORT_URL
    );

    (err.status(), Html(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn error_pages_use_taxonomy_status() {
        assert_eq!(
            error_page(&ProvisionError::Validation("code")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_page(&ProvisionError::StateNotFound).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            error_page(&ProvisionError::NotifyFailed(anyhow::anyhow!("boom"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
