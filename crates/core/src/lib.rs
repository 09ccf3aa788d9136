pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod index;
pub mod ingest;
pub mod models;
pub mod quality;
pub mod store;
pub mod stores;
pub mod traits;

pub use chunking::{
    chunk_ocr_lines, page_candidates, segment_pages, SegmentationConfig, DEFAULT_MAX_LINE_WINDOW,
    DEFAULT_MAX_PARA_CHARS,
};
pub use embeddings::{
    CharacterNgramEmbedder, EmbeddingProvider, HttpEmbeddingConfig, HttpEmbeddingProvider,
    DEFAULT_EMBEDDING_DIMENSIONS,
};
pub use error::{EmbeddingError, IndexError, IndexFailure, IngestError, StoreError};
pub use extractor::{extract_pdf_pages, has_embedded_text, load_ocr_lines, load_text_pages};
pub use index::{storage_id, VectorIndex};
pub use ingest::{ingest_document, segment_document, DocumentText, IngestionReport};
pub use models::{
    render_context, Chunk, ChunkMetadata, ExtractionMethod, IndexedRecord, QueryMatch,
};
pub use quality::{is_valid, QualityFilter};
pub use store::{DocIdFilter, StoreMatch};
pub use stores::{LocalVectorStore, QdrantStore};
pub use traits::VectorStore;
