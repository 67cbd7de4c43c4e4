use serde::{Deserialize, Serialize};

use super::document::ChunkLocation;
use crate::error::AppError;

/// Metadata stored alongside each vector. Values stay flat strings because the store
/// rejects nested objects, so the chunk location is kept as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorMetadata {
    #[serde(rename = "txtPath")]
    pub source_path: String,
    #[serde(rename = "pageContent")]
    pub chunk_text: String,
    #[serde(rename = "loc")]
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedVector {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: VectorMetadata,
}

impl IndexedVector {
    /// Deterministic id for the `chunk_index`-th chunk of `source_path`.
    pub fn vector_id(source_path: &str, chunk_index: usize) -> String {
        format!("{source_path}_{chunk_index}")
    }

    pub fn new(
        source_path: &str,
        chunk_index: usize,
        chunk_text: String,
        location: &ChunkLocation,
        values: Vec<f32>,
    ) -> Result<Self, AppError> {
        Ok(Self {
            id: Self::vector_id(source_path, chunk_index),
            values,
            metadata: VectorMetadata {
                source_path: source_path.to_string(),
                chunk_text,
                location: serde_json::to_string(location)?,
            },
        })
    }
}
