use std::path::{Path, PathBuf};

use common::{error::AppError, storage::types::document::Document};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::pdf_ingestion::extract_pdf_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Text,
    Pdf,
}

fn document_kind(path: &Path) -> Option<DocumentKind> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "txt" | "md" => Some(DocumentKind::Text),
        "pdf" => Some(DocumentKind::Pdf),
        _ => None,
    }
}

/// Recursively loads every `.txt`, `.md` and `.pdf` file under `dir`, sorted by path.
pub async fn load_documents(dir: impl AsRef<Path>) -> Result<Vec<Document>, AppError> {
    let dir = dir.as_ref().to_path_buf();
    if !tokio::fs::try_exists(&dir).await? {
        return Err(AppError::NotFound(format!(
            "documents directory {}",
            dir.display()
        )));
    }

    let paths = tokio::task::spawn_blocking(move || collect_paths(&dir)).await??;

    let mut documents = Vec::with_capacity(paths.len());
    for (path, kind) in paths {
        let content = match kind {
            DocumentKind::Text => tokio::fs::read_to_string(&path).await?,
            DocumentKind::Pdf => extract_pdf_text(&path).await?,
        };
        debug!(path = %path.display(), bytes = content.len(), "Loaded document");
        documents.push(Document::new(path.to_string_lossy(), content));
    }

    info!(count = documents.len(), "Documents loaded");
    Ok(documents)
}

fn collect_paths(dir: &Path) -> Result<Vec<(PathBuf, DocumentKind)>, AppError> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|err| AppError::Io(err.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        match document_kind(entry.path()) {
            Some(kind) => paths.push((entry.into_path(), kind)),
            None => debug!(path = %entry.path().display(), "Skipping unsupported file"),
        }
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn loads_supported_files_recursively_in_path_order() {
        let dir = tempdir().expect("tempdir");
        let nested = dir.path().join("nested");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join("b.txt"), "bravo").expect("write");
        std::fs::write(dir.path().join("a.md"), "# alpha").expect("write");
        std::fs::write(dir.path().join("ignored.csv"), "x,y").expect("write");
        std::fs::write(nested.join("c.TXT"), "charlie").expect("write");

        let documents = load_documents(dir.path()).await.expect("load");

        let contents: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
        assert_eq!(contents, vec!["# alpha", "bravo", "charlie"]);
        assert!(documents[0].source_path.ends_with("a.md"));
        assert!(documents[2].source_path.ends_with("c.TXT"));
    }

    #[tokio::test]
    async fn missing_directory_is_not_found() {
        let dir = tempdir().expect("tempdir");
        let err = load_documents(dir.path().join("absent"))
            .await
            .expect_err("missing dir");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unreadable_pdf_is_an_error() {
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("broken.pdf"), b"definitely not a pdf").expect("write");

        assert!(load_documents(dir.path()).await.is_err());
    }

    #[test]
    fn kind_detection_is_case_insensitive() {
        assert_eq!(document_kind(Path::new("x.PDF")), Some(DocumentKind::Pdf));
        assert_eq!(document_kind(Path::new("x.Md")), Some(DocumentKind::Text));
        assert_eq!(document_kind(Path::new("x")), None);
        assert_eq!(document_kind(Path::new("x.docx")), None);
    }
}
