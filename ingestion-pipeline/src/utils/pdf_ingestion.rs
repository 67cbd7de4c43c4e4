use std::path::Path;

use common::error::AppError;
use tracing::debug;

/// Extracts the text layer of a PDF. Parsing runs on the blocking pool.
pub async fn extract_pdf_text(file_path: &Path) -> Result<String, AppError> {
    let pdf_bytes = tokio::fs::read(file_path).await?;

    let extraction = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text_from_mem(&pdf_bytes).map(|s| s.trim().to_string())
    })
    .await?
    .map_err(|err| AppError::Processing(format!("Failed to extract text from PDF: {err}")))?;

    debug!(
        path = %file_path.display(),
        chars = extraction.chars().count(),
        "Extracted PDF text layer"
    );

    Ok(extraction)
}
