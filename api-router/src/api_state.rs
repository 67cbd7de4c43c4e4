use std::sync::Arc;

use common::{
    error::AppError,
    storage::{
        index_manager::{IndexManager, ReadinessPolicy, VectorIndex},
        vector_store::VectorStore,
    },
    utils::{config::AppConfig, embedding::EmbeddingProvider, llm::CompletionModel},
};
use ingestion_pipeline::{IngestionConfig, IngestionPipeline};
use retrieval_pipeline::RetrievalConfig;

#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub index_manager: IndexManager,
    pub embedding_provider: Arc<EmbeddingProvider>,
    pub completion: Arc<dyn CompletionModel>,
    pub ingestion_pipeline: Arc<IngestionPipeline>,
    pub retrieval_config: RetrievalConfig,
}

impl ApiState {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn VectorStore>,
        embedding_provider: Arc<EmbeddingProvider>,
        completion: Arc<dyn CompletionModel>,
    ) -> Result<Self, AppError> {
        let index_manager = IndexManager::new(store, ReadinessPolicy::from_config(config));
        let ingestion_pipeline = Arc::new(IngestionPipeline::new_with_config(
            Arc::clone(&embedding_provider),
            IngestionConfig::from_app_config(config),
        )?);

        Ok(Self {
            config: config.clone(),
            index_manager,
            embedding_provider,
            completion,
            ingestion_pipeline,
            retrieval_config: RetrievalConfig::from_app_config(config),
        })
    }

    /// Handle to the configured index.
    pub fn index(&self) -> VectorIndex {
        self.index_manager.index(&self.config.index_name)
    }
}
