use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use retrieval_pipeline::retrieve_answer;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ReadRequest {
    #[serde(default)]
    pub question: Option<String>,
}

/// Answers `{"question": "..."}` with `{"data": <answer or null>}`.
pub async fn read_answer(
    State(state): State<ApiState>,
    payload: Result<Json<ReadRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::ValidationError(rejection.body_text()))?;
    let question = request.question.unwrap_or_default();

    info!(question_chars = question.chars().count(), "Received read request");

    let answer = retrieve_answer(
        &state.index(),
        &state.embedding_provider,
        state.completion.as_ref(),
        &question,
        &state.retrieval_config,
    )
    .await?;

    Ok(Json(json!({ "data": answer })))
}
