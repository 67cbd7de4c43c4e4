use std::sync::Arc;

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::types::document::{Chunk, Document},
    utils::embedding::EmbeddingProvider,
};

use crate::utils::chunking::{split_text, SplitStrategy};

#[async_trait]
pub trait PipelineServices: Send + Sync {
    async fn split_document(
        &self,
        document: &Document,
        chunk_size: usize,
    ) -> Result<Vec<Chunk>, AppError>;

    /// One embedding per chunk, in chunk order.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, AppError>;
}

pub struct DefaultPipelineServices {
    embedding_provider: Arc<EmbeddingProvider>,
}

impl DefaultPipelineServices {
    pub fn new(embedding_provider: Arc<EmbeddingProvider>) -> Self {
        Self { embedding_provider }
    }
}

#[async_trait]
impl PipelineServices for DefaultPipelineServices {
    async fn split_document(
        &self,
        document: &Document,
        chunk_size: usize,
    ) -> Result<Vec<Chunk>, AppError> {
        split_text(
            &document.content,
            chunk_size,
            SplitStrategy::for_path(&document.source_path),
        )
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, AppError> {
        let inputs = chunks.iter().map(Chunk::embedding_input).collect();
        Ok(self.embedding_provider.embed_batch(inputs).await?)
    }
}
