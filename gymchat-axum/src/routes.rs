use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use gymchat_auth::{
    bearer_from_header, AuthorizationResponse, TokenResponse, WebhookReceipt, SIGNATURE_HEADERS,
};
use gymchat_core::GymContext;

use crate::{ChatAxumError, ChatAxumState};

/// Header carrying the gym the session has selected.
pub const GYM_HEADER: &str = "x-gym-id";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "authorization").and_then(bearer_from_header)
}

/// The gym comes from the header only; a body never selects it. An
/// unreadable value is the same as none.
fn gym_from_headers(headers: &HeaderMap) -> Option<GymContext> {
    header_str(headers, GYM_HEADER).and_then(GymContext::from_selector)
}

fn signature(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| header_str(headers, name))
}

async fn issue_token(
    State(state): State<ChatAxumState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, ChatAxumError> {
    let bearer = bearer(&headers);
    let res = state
        .service
        .issue_token(bearer.as_deref(), gym_from_headers(&headers))
        .await?;
    Ok(Json(res))
}

async fn receive_webhook(
    State(state): State<ChatAxumState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReceipt>, ChatAxumError> {
    let receipt = state
        .service
        .receive_webhook(&body, signature(&headers))
        .await?;
    Ok(Json(receipt))
}

async fn authorize_channel(
    State(state): State<ChatAxumState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AuthorizationResponse>, ChatAxumError> {
    let res = state
        .service
        .authorize_channel(&body, signature(&headers))
        .await?;
    Ok(Json(res))
}

/// Chat endpoints: `/chat/token`, `/chat/webhook`, `/chat/authorize`.
pub fn chat_router(state: ChatAxumState) -> Router<()> {
    Router::new()
        .route("/chat/token", post(issue_token).get(issue_token))
        .route("/chat/webhook", post(receive_webhook))
        .route("/chat/authorize", post(authorize_channel))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn gym_selector_comes_from_the_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(gym_from_headers(&headers), None);

        headers.insert(GYM_HEADER, HeaderValue::from_static("123"));
        assert_eq!(gym_from_headers(&headers), Some(GymContext::new(123)));

        headers.insert(GYM_HEADER, HeaderValue::from_static("gym_123"));
        assert_eq!(gym_from_headers(&headers), None);
    }

    #[test]
    fn signature_prefers_the_x_header() {
        let mut headers = HeaderMap::new();
        headers.insert("signature", HeaderValue::from_static("bb"));
        assert_eq!(signature(&headers), Some("bb"));

        headers.insert("x-signature", HeaderValue::from_static("aa"));
        assert_eq!(signature(&headers), Some("aa"));
    }
}
