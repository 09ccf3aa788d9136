use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("embedding dimension {actual} != {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("embedding for {0:?} has zero magnitude")]
    Degenerate(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("store request rejected: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum IndexFailure {
    #[error("embedding provider failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store failed: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index write failed for {doc_id}: {source}")]
    Write {
        doc_id: String,
        #[source]
        source: IndexFailure,
    },

    #[error("index query failed: {source}")]
    Query {
        #[source]
        source: IndexFailure,
    },

    #[error("index delete failed for {doc_id}: {source}")]
    Delete {
        doc_id: String,
        #[source]
        source: IndexFailure,
    },
}

impl IndexError {
    pub(crate) fn write(doc_id: &str, source: impl Into<IndexFailure>) -> Self {
        Self::Write {
            doc_id: doc_id.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn query(source: impl Into<IndexFailure>) -> Self {
        Self::Query {
            source: source.into(),
        }
    }

    pub(crate) fn delete(doc_id: &str, source: impl Into<IndexFailure>) -> Self {
        Self::Delete {
            doc_id: doc_id.to_string(),
            source: source.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Index(#[from] IndexError),
}
