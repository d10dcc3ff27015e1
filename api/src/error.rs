use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ictdash_shared::{PipelineError, StoreError};
use serde_json::json;

/// Error type for API responses, rendered as `{ "error": ... }`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("bad_request: {0}")]
    BadRequest(String),
    #[error("refresh_failed: {0}")]
    Refresh(#[from] PipelineError),
    #[error("db_error: {0}")]
    Store(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Refresh(_) => StatusCode::BAD_GATEWAY,
            Self::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = json!({ "error": self.to_string() });
        (status, axum::Json(body)).into_response()
    }
}
