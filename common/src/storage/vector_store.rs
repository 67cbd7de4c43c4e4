use async_trait::async_trait;

use crate::{
    error::AppError,
    storage::types::{
        index_spec::{IndexDescription, IndexSpec},
        indexed_vector::IndexedVector,
        query_result::{QueryRequest, QueryResult},
    },
};

/// Operations the application needs from an external vector database.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of every index visible to the configured credentials.
    async fn list_indexes(&self) -> Result<Vec<String>, AppError>;

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), AppError>;

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, AppError>;

    /// Inserts or overwrites vectors by id. Returns the number the store acknowledged.
    async fn upsert(&self, index: &str, vectors: Vec<IndexedVector>) -> Result<usize, AppError>;

    async fn query(&self, index: &str, request: &QueryRequest) -> Result<QueryResult, AppError>;
}
