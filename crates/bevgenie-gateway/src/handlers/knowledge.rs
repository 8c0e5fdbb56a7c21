use super::ApiError;
use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use bevgenie_core::knowledge::NewDocument;
use serde_json::{json, Value};

/// POST /api/knowledge/documents
pub async fn add_document(
    State(state): State<AppState>,
    Json(document): Json<NewDocument>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = state.knowledge.add_document(document).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "documents": state.knowledge.len() })),
    ))
}
