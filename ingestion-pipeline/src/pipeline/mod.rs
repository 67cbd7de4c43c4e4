mod config;
mod services;

pub use config::{IngestionConfig, IngestionTuning};
#[allow(clippy::module_name_repetitions)]
pub use services::{DefaultPipelineServices, PipelineServices};

use std::{sync::Arc, time::Instant};

use common::{
    error::AppError,
    storage::{
        index_manager::VectorIndex,
        types::{document::Document, indexed_vector::IndexedVector},
    },
    utils::embedding::EmbeddingProvider,
};
use tracing::{debug, info, warn};

/// Totals for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionReport {
    pub documents: usize,
    pub chunks: usize,
    pub vectors_upserted: usize,
    pub batches: usize,
}

/// Accumulates vectors across documents and sends each full batch exactly once.
struct UpsertBatcher<'a> {
    index: &'a VectorIndex,
    batch_size: usize,
    pending: Vec<IndexedVector>,
    upserted: usize,
    batches: usize,
}

impl<'a> UpsertBatcher<'a> {
    fn new(index: &'a VectorIndex, batch_size: usize) -> Self {
        Self {
            index,
            batch_size,
            pending: Vec::with_capacity(batch_size),
            upserted: 0,
            batches: 0,
        }
    }

    async fn push(&mut self, vector: IndexedVector) -> Result<(), AppError> {
        self.pending.push(vector);
        if self.pending.len() >= self.batch_size {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), AppError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let batch_len = batch.len();
        self.index.upsert_batch(batch).await?;
        self.upserted = self.upserted.saturating_add(batch_len);
        self.batches = self.batches.saturating_add(1);
        Ok(())
    }

    /// Sends whatever is left, including a trailing partial batch.
    async fn finish(mut self) -> Result<(usize, usize), AppError> {
        self.flush().await?;
        Ok((self.upserted, self.batches))
    }
}

#[allow(clippy::module_name_repetitions)]
pub struct IngestionPipeline {
    pipeline_config: IngestionConfig,
    services: Arc<dyn PipelineServices>,
}

impl IngestionPipeline {
    pub fn new(embedding_provider: Arc<EmbeddingProvider>) -> Result<Self, AppError> {
        Self::new_with_config(embedding_provider, IngestionConfig::default())
    }

    pub fn new_with_config(
        embedding_provider: Arc<EmbeddingProvider>,
        pipeline_config: IngestionConfig,
    ) -> Result<Self, AppError> {
        let services = DefaultPipelineServices::new(embedding_provider);
        Self::with_services(pipeline_config, Arc::new(services))
    }

    pub fn with_services(
        pipeline_config: IngestionConfig,
        services: Arc<dyn PipelineServices>,
    ) -> Result<Self, AppError> {
        pipeline_config.validate()?;
        Ok(Self {
            pipeline_config,
            services,
        })
    }

    fn duration_millis(duration: std::time::Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    /// Splits, embeds and upserts every document, one after another.
    ///
    /// Vector ids are `<source_path>_<chunk_index>`, so running this twice over the same
    /// documents overwrites rather than duplicates.
    #[tracing::instrument(skip_all, fields(index = %index.name(), documents = documents.len()))]
    pub async fn ingest(
        &self,
        documents: &[Document],
        index: &VectorIndex,
    ) -> Result<IngestionReport, AppError> {
        let started = Instant::now();
        let tuning = &self.pipeline_config.tuning;
        let mut batcher = UpsertBatcher::new(index, tuning.upsert_batch_size);
        let mut report = IngestionReport {
            documents: documents.len(),
            ..IngestionReport::default()
        };

        for document in documents {
            let source = document.source_path.as_str();
            info!(%source, "Processing document");

            let chunks = self
                .services
                .split_document(document, tuning.chunk_size)
                .await?;
            if chunks.is_empty() {
                warn!(%source, "Document has no text content; skipping");
                continue;
            }
            debug!(%source, chunks = chunks.len(), "Text split into chunks");

            let embeddings = self.services.embed_chunks(&chunks).await?;
            if embeddings.len() != chunks.len() {
                return Err(AppError::Processing(format!(
                    "received {} embeddings for {} chunks of {source}",
                    embeddings.len(),
                    chunks.len()
                )));
            }

            report.chunks = report.chunks.saturating_add(chunks.len());
            for (chunk_index, (chunk, values)) in chunks.into_iter().zip(embeddings).enumerate() {
                let vector =
                    IndexedVector::new(source, chunk_index, chunk.text, &chunk.location, values)?;
                batcher.push(vector).await?;
            }
        }

        let (vectors_upserted, batches) = batcher.finish().await?;
        report.vectors_upserted = vectors_upserted;
        report.batches = batches;

        info!(
            documents = report.documents,
            chunks = report.chunks,
            vectors_upserted,
            batches,
            total_ms = Self::duration_millis(started.elapsed()),
            "ingestion finished"
        );

        Ok(report)
    }
}
