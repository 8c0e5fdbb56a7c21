use super::ApiError;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use bevgenie_core::page::{PageGenerationRequest, PageGenerationResponse};

/// POST /api/generate-page
///
/// Non-streaming page generation. A page that never validates is still a
/// 200 with `success: false`; only an empty message is rejected.
pub async fn generate_page(
    State(state): State<AppState>,
    Json(request): Json<PageGenerationRequest>,
) -> Result<(StatusCode, Json<PageGenerationResponse>), ApiError> {
    if request.user_message.trim().is_empty() {
        return Err(ApiError::bad_request("userMessage is required"));
    }
    let response = state
        .orchestrator
        .page_generator()
        .generate_page_spec(&request)
        .await;
    Ok((StatusCode::OK, Json(response)))
}
