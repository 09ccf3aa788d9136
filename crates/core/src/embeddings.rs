use crate::error::EmbeddingError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT: usize = 384;

// all-MiniLM-L6-v2 output width.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = DEFAULT;

#[async_trait]
pub trait EmbeddingProvider {
    fn dimensions(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[async_trait]
impl<T> EmbeddingProvider for Box<T>
where
    T: EmbeddingProvider + Send + Sync + ?Sized,
{
    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        (**self).embed(text).await
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl CharacterNgramEmbedder {
    fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let lowered = text.trim().to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();
        if chars.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut vector = vec![0f32; self.dimensions.max(1)];
        let window = chars.len().min(3);
        for gram in chars.windows(window) {
            let token = gram.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude <= 0.0 {
            return Err(EmbeddingError::Degenerate(text.to_string()));
        }
        for value in &mut vector {
            *value /= magnitude;
        }

        Ok(vector)
    }
}

#[async_trait]
impl EmbeddingProvider for CharacterNgramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions.max(1)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_sync(text)
    }
}

#[derive(Debug, Clone)]
pub struct HttpEmbeddingConfig {
    /// Base URL of an OpenAI-compatible server; `/embeddings` is appended.
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout: Duration,
}

pub struct HttpEmbeddingProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingEntry>,
}

#[derive(Deserialize)]
struct EmbeddingEntry {
    embedding: Vec<f32>,
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpEmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model,
            api_key: config.api_key.filter(|key| !key.trim().is_empty()),
            dimensions: config.dimensions,
        })
    }

    fn take_single(&self, response: EmbeddingResponse) -> Result<Vec<f32>, EmbeddingError> {
        let mut data = response.data;
        if data.len() != 1 {
            return Err(EmbeddingError::BackendResponse {
                backend: self.endpoint.clone(),
                details: format!("expected 1 embedding, got {}", data.len()),
            });
        }
        let embedding = data.remove(0).embedding;
        if embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                actual: embedding.len(),
            });
        }
        if embedding.iter().all(|value| *value == 0.0) {
            return Err(EmbeddingError::Degenerate(self.model.clone()));
        }
        Ok(embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: [text],
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(EmbeddingError::BackendResponse {
                backend: self.endpoint.clone(),
                details: response.status().to_string(),
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        self.take_single(parsed)
    }
}
