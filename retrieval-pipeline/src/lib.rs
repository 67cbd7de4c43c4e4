#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod answer_retrieval;

use common::{
    error::AppError,
    storage::index_manager::VectorIndex,
    utils::{
        config::AppConfig,
        embedding::{generate_embedding_with_provider, EmbeddingProvider},
        llm::CompletionModel,
    },
};
use tracing::{debug, info};

use answer_retrieval::{build_context, create_stuff_prompt};

#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

impl RetrievalConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.query_top_k,
        }
    }
}

/// Primary orchestrator for answering a question from the vector index.
///
/// Returns `Ok(None)` for a blank question or when the index has no matches; the
/// completion model is only called when there is context to give it.
#[tracing::instrument(skip_all, fields(index = %index.name()))]
pub async fn retrieve_answer(
    index: &VectorIndex,
    embedding_provider: &EmbeddingProvider,
    completion: &dyn CompletionModel,
    question: &str,
    config: &RetrievalConfig,
) -> Result<Option<String>, AppError> {
    let question = question.trim();
    if question.is_empty() {
        debug!("Empty question; nothing to answer");
        return Ok(None);
    }

    let query_vector = generate_embedding_with_provider(embedding_provider, question).await?;
    let result = index.query(query_vector, config.top_k).await?;
    info!(matches = result.len(), "Found matches");

    let Some(context) = build_context(&result) else {
        info!("Since there are no matches, the completion model will not be queried");
        return Ok(None);
    };

    let answer = completion
        .complete(create_stuff_prompt(&context, question))
        .await?;
    debug!(answer_chars = answer.chars().count(), "Answer generated");

    Ok(Some(answer))
}
