//! In-memory [`VectorStore`] used by tests across the workspace.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    error::AppError,
    storage::{
        types::{
            index_spec::{IndexDescription, IndexSpec},
            indexed_vector::IndexedVector,
            query_result::{QueryMatch, QueryRequest, QueryResult},
        },
        vector_store::VectorStore,
    },
};

#[derive(Default)]
struct MemoryIndex {
    spec: Option<IndexSpec>,
    vectors: BTreeMap<String, IndexedVector>,
    pending_describes: usize,
}

#[derive(Default)]
struct MemoryState {
    indexes: HashMap<String, MemoryIndex>,
    create_calls: Vec<String>,
    upsert_batches: Vec<usize>,
    query_calls: usize,
}

/// Records every call so tests can assert on the traffic a real store would see.
#[derive(Default)]
pub struct MemoryVectorStore {
    state: Mutex<MemoryState>,
    not_ready_describes: usize,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Newly created indexes report `ready: false` for the first `describes` describe calls.
    pub fn with_not_ready_describes(describes: usize) -> Self {
        Self {
            state: Mutex::default(),
            not_ready_describes: describes,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only happens after a test already panicked.
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub fn create_calls(&self) -> Vec<String> {
        self.lock().create_calls.clone()
    }

    pub fn upsert_batches(&self) -> Vec<usize> {
        self.lock().upsert_batches.clone()
    }

    pub fn query_calls(&self) -> usize {
        self.lock().query_calls
    }

    pub fn vector_count(&self, index: &str) -> usize {
        self.lock()
            .indexes
            .get(index)
            .map_or(0, |entry| entry.vectors.len())
    }

    /// Stored ids in lexical order.
    pub fn vector_ids(&self, index: &str) -> Vec<String> {
        self.lock()
            .indexes
            .get(index)
            .map(|entry| entry.vectors.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn vector(&self, index: &str, id: &str) -> Option<IndexedVector> {
        self.lock()
            .indexes
            .get(index)
            .and_then(|entry| entry.vectors.get(id).cloned())
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|v| v * v).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn list_indexes(&self) -> Result<Vec<String>, AppError> {
        let mut names: Vec<String> = self.lock().indexes.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<(), AppError> {
        let mut state = self.lock();
        state.create_calls.push(spec.name.clone());
        if state.indexes.contains_key(&spec.name) {
            return Err(AppError::VectorStore {
                status: 409,
                message: format!("index {} already exists", spec.name),
            });
        }
        state.indexes.insert(
            spec.name.clone(),
            MemoryIndex {
                spec: Some(spec.clone()),
                vectors: BTreeMap::new(),
                pending_describes: self.not_ready_describes,
            },
        );
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<IndexDescription, AppError> {
        let mut state = self.lock();
        let entry = state
            .indexes
            .get_mut(name)
            .ok_or_else(|| AppError::NotFound(format!("index {name}")))?;

        let ready = entry.pending_describes == 0;
        entry.pending_describes = entry.pending_describes.saturating_sub(1);

        let spec = entry
            .spec
            .clone()
            .unwrap_or_else(|| IndexSpec::cosine(name, 0));
        Ok(IndexDescription {
            name: spec.name,
            dimension: spec.dimension,
            metric: spec.metric,
            ready,
            host: Some(format!("{name}.memory.local")),
        })
    }

    async fn upsert(&self, index: &str, vectors: Vec<IndexedVector>) -> Result<usize, AppError> {
        let mut state = self.lock();
        let count = vectors.len();
        let entry = state
            .indexes
            .get_mut(index)
            .ok_or_else(|| AppError::NotFound(format!("index {index}")))?;
        for vector in vectors {
            entry.vectors.insert(vector.id.clone(), vector);
        }
        state.upsert_batches.push(count);
        Ok(count)
    }

    async fn query(&self, index: &str, request: &QueryRequest) -> Result<QueryResult, AppError> {
        let mut state = self.lock();
        state.query_calls = state.query_calls.saturating_add(1);
        let entry = state
            .indexes
            .get(index)
            .ok_or_else(|| AppError::NotFound(format!("index {index}")))?;

        let mut matches: Vec<QueryMatch> = entry
            .vectors
            .values()
            .map(|vector| QueryMatch {
                id: vector.id.clone(),
                score: cosine(&request.vector, &vector.values),
                values: if request.include_values {
                    vector.values.clone()
                } else {
                    Vec::new()
                },
                metadata: if request.include_metadata {
                    serde_json::to_value(&vector.metadata)
                        .ok()
                        .and_then(|value| value.as_object().cloned())
                } else {
                    None
                },
            })
            .collect();

        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        matches.truncate(request.top_k);

        Ok(QueryResult { matches })
    }
}
