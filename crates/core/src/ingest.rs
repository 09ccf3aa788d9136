use crate::chunking::{chunk_ocr_lines, segment_pages, SegmentationConfig};
use crate::embeddings::EmbeddingProvider;
use crate::error::IngestError;
use crate::index::VectorIndex;
use crate::models::{Chunk, ExtractionMethod};
use crate::traits::VectorStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentText {
    Pages(Vec<String>),
    // One list of recognized lines per page.
    OcrLines(Vec<Vec<String>>),
}

impl DocumentText {
    pub fn page_count(&self) -> usize {
        match self {
            Self::Pages(pages) => pages.len(),
            Self::OcrLines(pages) => pages.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestionReport {
    pub doc_id: String,
    pub extraction_method: ExtractionMethod,
    pub page_count: usize,
    pub chunk_count: usize,
    pub ingested_at: DateTime<Utc>,
}

impl IngestionReport {
    pub fn has_indexable_content(&self) -> bool {
        self.chunk_count > 0
    }
}

pub fn segment_document(text: &DocumentText, config: &SegmentationConfig) -> Vec<Chunk> {
    match text {
        DocumentText::Pages(pages) => segment_pages(pages, config),
        DocumentText::OcrLines(pages) => chunk_ocr_lines(pages, config),
    }
}

pub fn validate_doc_id(doc_id: &str) -> Result<(), IngestError> {
    if doc_id.trim().is_empty() {
        return Err(IngestError::InvalidArgument("doc_id is empty".to_string()));
    }
    // The separator would let one document's delete prefix cover another's keys.
    if doc_id.contains("::") {
        return Err(IngestError::InvalidArgument(format!(
            "doc_id {doc_id:?} must not contain \"::\""
        )));
    }
    Ok(())
}

pub async fn ingest_document<E, S>(
    index: &VectorIndex<E, S>,
    doc_id: &str,
    extraction_method: ExtractionMethod,
    text: &DocumentText,
    config: &SegmentationConfig,
) -> Result<IngestionReport, IngestError>
where
    E: EmbeddingProvider + Send + Sync,
    S: VectorStore + Send + Sync,
{
    validate_doc_id(doc_id)?;
    config.validate()?;

    let chunks = segment_document(text, config);
    if chunks.is_empty() {
        warn!(doc_id, %extraction_method, "no indexable content");
    } else {
        index.add(doc_id, &chunks).await?;
    }

    let report = IngestionReport {
        doc_id: doc_id.to_string(),
        extraction_method,
        page_count: text.page_count(),
        chunk_count: chunks.len(),
        ingested_at: Utc::now(),
    };
    info!(
        doc_id,
        %extraction_method,
        pages = report.page_count,
        chunks = report.chunk_count,
        "ingested document"
    );
    Ok(report)
}
