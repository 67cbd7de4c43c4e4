pub mod index_manager;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
pub mod pinecone;
pub mod types;
pub mod vector_store;
