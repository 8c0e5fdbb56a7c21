use super::ApiError;
use crate::{session_cookie, AppState};
use axum::{extract::State, http::HeaderMap, Json};
use serde_json::{json, Value};

/// POST /api/session/reset
///
/// Forgets persona, history, and signals for the cookie's session. The
/// cookie itself is kept, so the next turn starts a fresh profile under
/// the same id. A turn still streaming on the session finishes first.
pub async fn reset_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let Some(session_id) = session_cookie::from_headers(&headers) else {
        return Ok(Json(json!({ "success": true, "cleared": false })));
    };
    state.orchestrator.reset_session(&session_id).await?;
    Ok(Json(json!({ "success": true, "cleared": true })))
}
