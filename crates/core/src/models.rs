use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    EmbeddedText,
    ImageOcr,
    ScannedPdfOcr,
}

impl fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::EmbeddedText => "embedded-text",
            Self::ImageOcr => "image-ocr",
            Self::ScannedPdfOcr => "scanned-pdf-ocr",
        };
        f.write_str(tag)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    page_number: u32,
    chunk_id: u32,
    text: String,
}

impl Chunk {
    pub fn new(page_number: u32, chunk_id: u32, text: impl Into<String>) -> Self {
        Self {
            page_number,
            chunk_id,
            text: text.into(),
        }
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn chunk_id(&self) -> u32 {
        self.chunk_id
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ChunkMetadata {
    pub doc_id: String,
    pub page_number: u32,
    pub chunk_id: u32,
}

impl ChunkMetadata {
    // e.g. `[DOC001, page 1, chunk 2]`
    pub fn citation(&self) -> String {
        format!(
            "[{}, page {}, chunk {}]",
            self.doc_id, self.page_number, self.chunk_id
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedRecord {
    pub storage_id: String,
    pub metadata: ChunkMetadata,
    pub text: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryMatch {
    pub storage_id: String,
    pub metadata: ChunkMetadata,
    pub text: String,
    pub distance: f32,
}

pub fn render_context(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .map(|hit| format!("{}: {}\n", hit.metadata.citation(), hit.text))
        .collect()
}
