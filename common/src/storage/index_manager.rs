use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use tracing::{debug, info};

use crate::{
    error::AppError,
    storage::{
        types::{
            index_spec::IndexSpec,
            indexed_vector::IndexedVector,
            query_result::{QueryRequest, QueryResult},
        },
        vector_store::VectorStore,
    },
    utils::config::AppConfig,
};

/// Largest batch the store accepts in one upsert call.
pub const MAX_UPSERT_BATCH: usize = 100;

/// How long to wait for a freshly created index, and how often to ask.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessPolicy {
    pub timeout: Duration,
    pub poll_every: Duration,
}

impl Default for ReadinessPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(180),
            poll_every: Duration::from_secs(2),
        }
    }
}

impl ReadinessPolicy {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.index_ready_timeout_secs),
            poll_every: Duration::from_millis(config.index_poll_interval_ms),
        }
    }
}

/// Handle to a single named index.
#[derive(Clone)]
pub struct VectorIndex {
    store: Arc<dyn VectorStore>,
    name: String,
}

impl VectorIndex {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sends one batch. Callers are responsible for keeping batches within [`MAX_UPSERT_BATCH`].
    pub async fn upsert_batch(&self, vectors: Vec<IndexedVector>) -> Result<(), AppError> {
        if vectors.is_empty() {
            return Ok(());
        }
        if vectors.len() > MAX_UPSERT_BATCH {
            return Err(AppError::Validation(format!(
                "upsert batch of {} vectors exceeds the limit of {MAX_UPSERT_BATCH}",
                vectors.len()
            )));
        }

        let batch_len = vectors.len();
        debug!(index = %self.name, batch_len, "Upserting vectors");
        let acknowledged = self.store.upsert(&self.name, vectors).await?;
        info!(index = %self.name, batch_len, acknowledged, "Upserted vectors");

        Ok(())
    }

    /// Nearest neighbours with metadata and values. No matches is an empty result.
    pub async fn query(&self, vector: Vec<f32>, top_k: usize) -> Result<QueryResult, AppError> {
        let request = QueryRequest::with_everything(vector, top_k);
        let result = self.store.query(&self.name, &request).await?;
        debug!(index = %self.name, top_k, matches = result.len(), "Index queried");
        Ok(result)
    }
}

/// Creates indexes on demand and hands out [`VectorIndex`] handles.
#[derive(Clone)]
pub struct IndexManager {
    store: Arc<dyn VectorStore>,
    readiness: ReadinessPolicy,
}

impl IndexManager {
    pub fn new(store: Arc<dyn VectorStore>, readiness: ReadinessPolicy) -> Self {
        Self { store, readiness }
    }

    pub fn store(&self) -> &Arc<dyn VectorStore> {
        &self.store
    }

    pub fn index(&self, name: &str) -> VectorIndex {
        VectorIndex {
            store: Arc::clone(&self.store),
            name: name.to_string(),
        }
    }

    /// Creates a cosine index named `name` unless one already exists, then waits until it is
    /// ready. Existing indexes are left untouched.
    #[tracing::instrument(skip(self))]
    pub async fn ensure_index(&self, name: &str, dimension: usize) -> Result<(), AppError> {
        info!("Checking if index exists");
        let existing = self.store.list_indexes().await?;

        if existing.iter().any(|index| index == name) {
            info!("Index exists");
            return Ok(());
        }

        info!("Index does not exist. Creating...");
        self.store
            .create_index(&IndexSpec::cosine(name, dimension))
            .await?;
        info!("Index created; waiting for it to become ready");

        self.wait_until_ready(name).await
    }

    async fn wait_until_ready(&self, name: &str) -> Result<(), AppError> {
        let started_at = Instant::now();

        loop {
            let description = self.store.describe_index(name).await?;
            if description.ready {
                info!(index = %name, elapsed = ?started_at.elapsed(), "Index is ready");
                return Ok(());
            }

            let waited = started_at.elapsed();
            if waited >= self.readiness.timeout {
                return Err(AppError::IndexNotReady {
                    index: name.to_string(),
                    waited,
                });
            }

            debug!(index = %name, waited = ?waited, "Index not ready yet");
            tokio::time::sleep(self.readiness.poll_every).await;
        }
    }
}
