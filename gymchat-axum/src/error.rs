use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gymchat_auth::ChatAuthError;
use gymchat_core::errors::ChatError;

#[derive(Debug)]
pub struct ChatAxumError(pub anyhow::Error);

impl From<anyhow::Error> for ChatAxumError {
    fn from(e: anyhow::Error) -> Self {
        Self(e)
    }
}

impl From<ChatAuthError> for ChatAxumError {
    fn from(e: ChatAuthError) -> Self {
        Self(e.into_anyhow())
    }
}

impl IntoResponse for ChatAxumError {
    fn into_response(self) -> Response {
        // A ChatError anywhere in the chain keeps its status and fields.
        if let Some(chat) = ChatError::from_anyhow(&self.0) {
            if chat.code() >= 500 {
                tracing::error!(error = ?self.0, "request failed");
            }
            let safe = chat.sanitize_for_client();
            let status = StatusCode::from_u16(safe.code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            return (status, Json(safe.to_json())).into_response();
        }

        tracing::error!(error = ?self.0, "request failed");
        let chat = ChatError::general_error(self.0.to_string());
        let safe = chat.sanitize_for_client();
        let status = StatusCode::from_u16(safe.code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(safe.to_json())).into_response()
    }
}
