pub mod chunking;
pub mod document_loader;
pub mod pdf_ingestion;
