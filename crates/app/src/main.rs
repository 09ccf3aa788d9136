use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use doc_research_core::{
    extract_pdf_pages, has_embedded_text, ingest_document, load_ocr_lines, load_text_pages,
    render_context, CharacterNgramEmbedder, DocumentText, EmbeddingProvider, ExtractionMethod,
    HttpEmbeddingConfig, HttpEmbeddingProvider, LocalVectorStore, QdrantStore,
    SegmentationConfig, VectorIndex, VectorStore, DEFAULT_EMBEDDING_DIMENSIONS,
    DEFAULT_MAX_LINE_WINDOW, DEFAULT_MAX_PARA_CHARS,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

type DynIndex = VectorIndex<Box<dyn EmbeddingProvider + Send + Sync>, Box<dyn VectorStore + Send + Sync>>;

#[derive(Parser)]
#[command(name = "doc-research", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Vector store backend
    #[arg(long, env = "DOC_RESEARCH_STORE", value_enum, default_value_t = StoreKind::Local)]
    store: StoreKind,

    /// JSON snapshot used by the local store
    #[arg(long, env = "DOC_RESEARCH_STORE_PATH", default_value = "data/vector_index.json")]
    store_path: PathBuf,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    qdrant_url: String,

    /// Qdrant collection
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "doc_chunks")]
    qdrant_collection: String,

    /// Embedding provider
    #[arg(long, env = "DOC_RESEARCH_EMBEDDER", value_enum, default_value_t = EmbedderKind::Ngram)]
    embedder: EmbedderKind,

    /// Base URL of an OpenAI-compatible embeddings server
    #[arg(long, env = "EMBEDDING_URL", default_value = "http://localhost:8080/v1")]
    embedding_url: String,

    /// Embedding model name sent to the server
    #[arg(long, env = "EMBEDDING_MODEL", default_value = "all-MiniLM-L6-v2")]
    embedding_model: String,

    /// Bearer token for the embeddings server
    #[arg(long, env = "EMBEDDING_API_KEY", hide_env_values = true)]
    embedding_api_key: Option<String>,

    /// Vector width produced by the embedder
    #[arg(long, env = "EMBEDDING_DIMENSIONS", default_value_t = DEFAULT_EMBEDDING_DIMENSIONS)]
    embedding_dimensions: usize,

    /// HTTP timeout for embedding requests, in seconds
    #[arg(long, env = "EMBEDDING_TIMEOUT_SECS", default_value_t = 30)]
    embedding_timeout_secs: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum StoreKind {
    Local,
    Qdrant,
}

#[derive(Clone, Copy, ValueEnum)]
enum EmbedderKind {
    Ngram,
    Http,
}

#[derive(Clone, Copy, ValueEnum)]
enum OcrSource {
    Image,
    ScannedPdf,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct SourceArgs {
    /// PDF with embedded text
    #[arg(long)]
    pdf: Option<PathBuf>,

    /// JSON file of OCR lines per page: [["line", ...], ...]
    #[arg(long)]
    ocr_lines: Option<PathBuf>,

    /// Plain-text file, pages separated by form feeds
    #[arg(long)]
    text: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Segment one document and index its chunks.
    Ingest {
        /// Stable document id, e.g. DOC001.
        #[arg(long)]
        doc_id: String,
        #[command(flatten)]
        source: SourceArgs,
        /// Where the OCR lines came from.
        #[arg(long, value_enum, default_value_t = OcrSource::ScannedPdf)]
        ocr_source: OcrSource,
        /// Paragraphs longer than this are split into line windows.
        #[arg(long, default_value_t = DEFAULT_MAX_PARA_CHARS)]
        max_para_chars: usize,
        /// Lines per window for oversized paragraphs and OCR pages.
        #[arg(long, default_value_t = DEFAULT_MAX_LINE_WINDOW)]
        max_line_window: usize,
    },
    /// Retrieve the closest chunks and print them with citations.
    Query {
        /// Question text
        #[arg(long)]
        text: String,
        /// Number of chunks to return.
        #[arg(long, default_value = "5")]
        top_k: usize,
        /// Restrict to these documents; repeat for several.
        #[arg(long = "doc-id")]
        doc_ids: Vec<String>,
    },
    /// Remove every indexed chunk of a document.
    Delete {
        #[arg(long)]
        doc_id: String,
    },
}

async fn build_index(cli: &Cli) -> anyhow::Result<DynIndex> {
    let embedder: Box<dyn EmbeddingProvider + Send + Sync> = match cli.embedder {
        EmbedderKind::Ngram => Box::new(CharacterNgramEmbedder {
            dimensions: cli.embedding_dimensions,
        }),
        EmbedderKind::Http => Box::new(HttpEmbeddingProvider::new(HttpEmbeddingConfig {
            base_url: cli.embedding_url.clone(),
            model: cli.embedding_model.clone(),
            api_key: cli.embedding_api_key.clone(),
            dimensions: cli.embedding_dimensions,
            timeout: Duration::from_secs(cli.embedding_timeout_secs),
        })?),
    };

    let store: Box<dyn VectorStore + Send + Sync> = match cli.store {
        StoreKind::Local => Box::new(
            LocalVectorStore::open(&cli.store_path)
                .await
                .with_context(|| format!("opening {}", cli.store_path.display()))?,
        ),
        StoreKind::Qdrant => Box::new(QdrantStore::new(
            &cli.qdrant_url,
            &cli.qdrant_collection,
            embedder.dimensions(),
        )?),
    };

    Ok(VectorIndex::new(embedder, store))
}

fn load_document(
    source: &SourceArgs,
    ocr_source: OcrSource,
) -> anyhow::Result<(ExtractionMethod, DocumentText)> {
    if let Some(path) = &source.pdf {
        let pages = extract_pdf_pages(path)?;
        if !has_embedded_text(&pages) {
            bail!(
                "{} has no embedded text; run OCR and pass the lines with --ocr-lines",
                path.display()
            );
        }
        return Ok((ExtractionMethod::EmbeddedText, DocumentText::Pages(pages)));
    }

    if let Some(path) = &source.ocr_lines {
        let method = match ocr_source {
            OcrSource::Image => ExtractionMethod::ImageOcr,
            OcrSource::ScannedPdf => ExtractionMethod::ScannedPdfOcr,
        };
        return Ok((method, DocumentText::OcrLines(load_ocr_lines(path)?)));
    }

    if let Some(path) = &source.text {
        return Ok((
            ExtractionMethod::EmbeddedText,
            DocumentText::Pages(load_text_pages(path)?),
        ));
    }

    bail!("one of --pdf, --ocr-lines or --text is required")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let index = build_index(&cli).await?;
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "doc-research boot"
    );

    match cli.command {
        Command::Ingest {
            doc_id,
            source,
            ocr_source,
            max_para_chars,
            max_line_window,
        } => {
            let (method, text) = load_document(&source, ocr_source)?;
            let config = SegmentationConfig {
                max_para_chars,
                max_line_window,
                ..SegmentationConfig::default()
            };

            let report = ingest_document(&index, &doc_id, method, &text, &config).await?;
            if !report.has_indexable_content() {
                warn!(doc_id = %report.doc_id, "document produced no indexable content");
            }

            println!(
                "{} chunks ingested for {} ({}, {} pages) at {}",
                report.chunk_count,
                report.doc_id,
                report.extraction_method,
                report.page_count,
                report.ingested_at.to_rfc3339()
            );
        }
        Command::Query {
            text,
            top_k,
            doc_ids,
        } => {
            let matches = index.query(&text, top_k, &doc_ids).await?;

            println!("query: {text}");
            if matches.is_empty() {
                println!("No relevant information found in the selected documents.");
                return Ok(());
            }

            for (rank, hit) in matches.iter().enumerate() {
                println!(
                    "[{}] distance={:.4} {} {}",
                    rank + 1,
                    hit.distance,
                    hit.storage_id,
                    hit.metadata.citation()
                );
                println!("  chunk_text:\n{}", hit.text);
            }

            println!("context:\n{}", render_context(&matches));
        }
        Command::Delete { doc_id } => {
            index.delete(&doc_id).await?;
            println!("deleted {doc_id}");
        }
    }

    Ok(())
}
