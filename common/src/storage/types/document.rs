use serde::{Deserialize, Serialize};

/// A source file loaded from disk, before splitting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub source_path: String,
    pub content: String,
}

impl Document {
    pub fn new(source_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            content: content.into(),
        }
    }
}

/// 1-based, inclusive line span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub from: usize,
    pub to: usize,
}

/// Where a chunk sits inside its document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkLocation {
    pub lines: LineRange,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    pub location: ChunkLocation,
}

impl Chunk {
    /// Text as sent to the embedding endpoint: embedded newlines collapsed to spaces.
    pub fn embedding_input(&self) -> String {
        self.text.replace('\n', " ")
    }
}
