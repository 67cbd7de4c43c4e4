pub mod document;
pub mod index_spec;
pub mod indexed_vector;
pub mod query_result;
