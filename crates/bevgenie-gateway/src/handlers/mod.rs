//! Route handlers. Every failure is answered as `{"error": "..."}`.

pub mod chat;
pub mod knowledge;
pub mod page;
pub mod presentation;
pub mod session;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bevgenie_core::GenieError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

/// Invalid input is the caller's fault; everything else is ours.
impl From<GenieError> for ApiError {
    fn from(e: GenieError) -> Self {
        match e {
            GenieError::InvalidInput(message) => Self::bad_request(message),
            other => {
                tracing::error!(target: "bevgenie::gateway", error = %other, "request failed");
                Self::internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}
