use axum::{extract::State, response::IntoResponse, Json};
use common::error::AppError;
use ingestion_pipeline::{utils::document_loader::load_documents, IngestionReport};
use serde_json::json;
use tracing::{error, info};

use crate::{api_state::ApiState, error::ApiError};

const SETUP_FAILED: &str = "Failed to create index or load data into the vector store";

/// Loads the documents directory, makes sure the index exists and ingests everything.
pub async fn setup_index(State(state): State<ApiState>) -> Result<impl IntoResponse, ApiError> {
    match run_setup(&state).await {
        Ok(report) => Ok(Json(json!({
            "data": format!(
                "Successfully created index and loaded {} vectors from {} documents",
                report.vectors_upserted, report.documents
            )
        }))),
        Err(err) => {
            error!(error = %err, "Setup failed");
            Err(match err {
                AppError::IndexNotReady { .. } => ApiError::ServiceUnavailable(SETUP_FAILED.into()),
                _ => ApiError::InternalError(SETUP_FAILED.into()),
            })
        }
    }
}

async fn run_setup(state: &ApiState) -> Result<IngestionReport, AppError> {
    let config = &state.config;
    let documents = load_documents(&config.documents_dir).await?;
    info!(
        documents = documents.len(),
        dir = %config.documents_dir,
        "Loaded documents for setup"
    );

    state
        .index_manager
        .ensure_index(&config.index_name, config.embedding_dimensions as usize)
        .await?;

    state
        .ingestion_pipeline
        .ingest(&documents, &state.index())
        .await
}
