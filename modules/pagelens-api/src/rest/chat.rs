use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::AppState;

#[derive(Deserialize)]
pub struct ChatRequest {
    /// External handle of the page the question is about.
    pub page_id: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub response: String,
}

/// Answer a question about a cached page. Requires the page to exist locally;
/// reasoning-service outages fall back to a deterministic answer and never
/// surface as an HTTP failure.
pub async fn api_chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> impl IntoResponse {
    let detail = match state.store.get_by_handle(&request.page_id).await {
        Ok(Some(detail)) => detail,
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "page context not found" })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(page = %request.page_id, error = %e, "failed to load chat context");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let response = state.insight.answer(&detail, &request.message).await;
    Json(ChatResponse { response }).into_response()
}
