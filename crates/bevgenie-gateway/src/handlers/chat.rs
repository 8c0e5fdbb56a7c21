use super::ApiError;
use crate::{session_cookie, sse, AppState};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use bevgenie_core::page::InteractionContext;
use bevgenie_core::{ChatTurnRequest, GenieError};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub context: Option<InteractionContext>,
    #[serde(default)]
    pub interaction_source: Option<String>,
}

/// POST /api/chat/stream
pub async fn chat_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ChatBody>,
) -> Result<Response, ApiError> {
    let session = session_cookie::resolve(&headers);
    let request = ChatTurnRequest {
        session_id: session.id.clone(),
        message: body.message.unwrap_or_default(),
        interaction_context: body.context.filter(|c| !c.is_empty()),
        interaction_source: body.interaction_source,
    };

    let turn = state.orchestrator.prepare(request).await.map_err(|e| match e {
        GenieError::InvalidInput(message) => ApiError::bad_request(message),
        other => {
            tracing::error!(target: "bevgenie::gateway", session_id = %session.id, error = %other, "session init failed");
            ApiError::internal("Failed to initialize session")
        }
    })?;
    tracing::info!(
        target: "bevgenie::gateway",
        session_id = %session.id,
        message_count = turn.session().message_count,
        "chat stream opened"
    );

    let mut response = sse::event_stream(state.orchestrator.start(turn)).into_response();
    let out = response.headers_mut();
    out.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    out.insert(
        HeaderName::from_static("x-accel-buffering"),
        HeaderValue::from_static("no"),
    );
    if let Some(cookie) = session.set_cookie {
        out.insert(header::SET_COOKIE, cookie);
    }
    Ok(response)
}
