use std::path::Path;

use common::{
    error::AppError,
    storage::types::document::{Chunk, ChunkLocation, LineRange},
};
use text_splitter::{ChunkConfig, MarkdownSplitter, TextSplitter};

/// Boundary policy used when splitting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStrategy {
    /// Paragraph, sentence, then word aware.
    PlainText,
    /// Additionally respects Markdown block structure.
    Markdown,
}

impl SplitStrategy {
    pub fn for_path(path: &str) -> Self {
        let is_markdown = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown")
            });

        if is_markdown {
            Self::Markdown
        } else {
            Self::PlainText
        }
    }
}

/// Splits `text` into chunks of at most `chunk_size` characters, in document order.
/// Whitespace-only input yields no chunks.
pub fn split_text(
    text: &str,
    chunk_size: usize,
    strategy: SplitStrategy,
) -> Result<Vec<Chunk>, AppError> {
    if chunk_size == 0 {
        return Err(AppError::Validation(
            "chunk size must be greater than zero".into(),
        ));
    }

    let config = ChunkConfig::new(chunk_size);
    let pieces: Vec<(usize, &str)> = match strategy {
        SplitStrategy::PlainText => TextSplitter::new(config).chunk_indices(text).collect(),
        SplitStrategy::Markdown => MarkdownSplitter::new(config).chunk_indices(text).collect(),
    };

    let mut chunks = Vec::with_capacity(pieces.len());
    let mut line = 1usize;
    let mut cursor = 0usize;

    for (offset, piece) in pieces {
        if piece.trim().is_empty() {
            continue;
        }
        let skipped = text.get(cursor..offset).unwrap_or_default();
        line = line.saturating_add(count_newlines(skipped));
        cursor = offset;

        chunks.push(Chunk {
            text: piece.to_string(),
            location: ChunkLocation {
                lines: LineRange {
                    from: line,
                    to: line.saturating_add(count_newlines(piece)),
                },
            },
        });
    }

    Ok(chunks)
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|b| *b == b'\n').count()
}
