//! Suggestion and chat endpoints, backed by the hosted text-generation service

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::assistant::{AssistantClient, AssistantError};
use crate::server::{ApiError, SharedState};

#[derive(Debug, Deserialize)]
pub struct SuggestionRequest {
    pub disease: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuggestionResponse {
    pub suggestion: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub disease: String,
    /// Prior turns rendered as `User: ...` / `Assistant: ...` lines
    #[serde(default)]
    pub previous_messages: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

fn client(state: &SharedState) -> Result<&AssistantClient, ApiError> {
    state
        .assistant
        .as_ref()
        .ok_or(ApiError::Assistant(AssistantError::NotConfigured))
}

/// POST /suggestion - Treatment guidance for a detected disease
pub async fn suggestion(
    State(state): State<SharedState>,
    request: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<Json<SuggestionResponse>, ApiError> {
    let Json(request) = request?;
    let suggestion = client(&state)?.suggest(&request.disease).await?;
    Ok(Json(SuggestionResponse { suggestion }))
}

/// POST /chat - Follow-up question about a detected disease
pub async fn chat(
    State(state): State<SharedState>,
    request: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = request?;
    let response = client(&state)?
        .chat(&request.disease, &request.message, &request.previous_messages)
        .await?;
    Ok(Json(ChatResponse { response }))
}
