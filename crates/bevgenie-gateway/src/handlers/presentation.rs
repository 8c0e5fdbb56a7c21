use super::ApiError;
use crate::{session_cookie, AppState};
use axum::{extract::State, http::HeaderMap, Json};
use bevgenie_core::presentation::Slide;
use bevgenie_core::session::SessionTracker;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresentationMetadata {
    pub queries_count: usize,
    pub duration: String,
    pub roi_savings: u64,
}

#[derive(Debug, Serialize)]
pub struct PresentationResponse {
    pub success: bool,
    pub slides: Vec<Slide>,
    pub metadata: PresentationMetadata,
}

const NO_SESSION_DATA: &str = "No session data available. Please interact with BevGenie first.";

/// POST /api/generate-presentation
///
/// Builds the deck from the cookie's stored conversation.
pub async fn generate_presentation(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PresentationResponse>, ApiError> {
    let Some(session_id) = session_cookie::from_headers(&headers) else {
        return Err(ApiError::bad_request(NO_SESSION_DATA));
    };
    let record = state.sessions.get_session(&session_id).await?;
    let history = state
        .sessions
        .get_conversation_history(&session_id, usize::MAX)
        .await?;
    let tracker = SessionTracker::from_history(&record, &history);
    if tracker.is_empty() {
        return Err(ApiError::bad_request(NO_SESSION_DATA));
    }

    let data = tracker.presentation_data(chrono::Utc::now());
    let slides = state.presentations.generate(&data).await?;
    tracing::info!(
        target: "bevgenie::presentation",
        session_id = %session_id,
        slides = slides.len(),
        "presentation generated"
    );
    Ok(Json(PresentationResponse {
        success: true,
        slides,
        metadata: PresentationMetadata {
            queries_count: data.actual_questions.len(),
            duration: data.duration,
            roi_savings: data.roi.cost_saved,
        },
    }))
}
