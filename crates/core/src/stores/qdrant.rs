use crate::error::StoreError;
use crate::models::ChunkMetadata;
use crate::store::{DocIdFilter, StoreMatch};
use crate::traits::{check_batch_lengths, VectorStore};
use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;
use uuid::Uuid;

const SCROLL_PAGE: usize = 256;

// Point ids are name-based UUIDs; the storage id itself lives in the payload.
pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

#[derive(Debug, Deserialize)]
struct PointPayload {
    storage_id: String,
    doc_id: String,
    page_number: u32,
    chunk_id: u32,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ScoredPoint {
    score: f32,
    payload: PointPayload,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Debug, Deserialize)]
struct ScrolledPayload {
    storage_id: String,
}

#[derive(Debug, Deserialize)]
struct ScrolledPoint {
    payload: ScrolledPayload,
}

#[derive(Debug, Deserialize)]
struct ScrollPage {
    points: Vec<ScrolledPoint>,
    next_page_offset: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    result: ScrollPage,
}

impl QdrantStore {
    pub fn new(
        endpoint: &str,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Result<Self, StoreError> {
        let endpoint = Url::parse(endpoint)?;
        Ok(Self {
            endpoint: endpoint.as_str().trim_end_matches('/').to_string(),
            collection: collection.into(),
            client: Client::new(),
            vector_size,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/collections/{}", self.endpoint, self.collection)
    }

    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let response = self.client.get(self.collection_url()).send().await?;
        if existing(response).await?.is_some() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.collection_url())
            .json(&json!({
                "vectors": { "size": self.vector_size, "distance": "Cosine" }
            }))
            .send()
            .await?;
        check(response)?;

        let response = self
            .client
            .put(format!("{}/index?wait=true", self.collection_url()))
            .json(&json!({ "field_name": "doc_id", "field_schema": "keyword" }))
            .send()
            .await?;
        check(response)?;

        debug!(collection = %self.collection, size = self.vector_size, "created qdrant collection");
        Ok(())
    }
}

pub fn point_id(storage_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, storage_id.as_bytes())
}

fn status_error(status: StatusCode, details: &str) -> StoreError {
    StoreError::BackendResponse {
        backend: "qdrant".to_string(),
        details: if details.is_empty() {
            status.to_string()
        } else {
            format!("{status}: {details}")
        },
    }
}

fn check_status(status: StatusCode) -> Result<(), StoreError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(status_error(status, ""))
    }
}

fn check(response: Response) -> Result<Response, StoreError> {
    check_status(response.status())?;
    Ok(response)
}

// Qdrant answers a missing collection with a JSON status error. Any other 404
// (wrong base path, proxy) means the store is unreachable, not empty.
fn names_missing_collection(body: &str) -> bool {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return false;
    };
    value["status"]["error"].as_str().is_some_and(|error| {
        let error = error.to_lowercase();
        error.contains("collection") && (error.contains("doesn't exist") || error.contains("not found"))
    })
}

fn not_found_outcome(body: &str) -> Result<(), StoreError> {
    if names_missing_collection(body) {
        Ok(())
    } else {
        Err(status_error(StatusCode::NOT_FOUND, body.trim()))
    }
}

/// `None` when the collection has not been created yet.
async fn existing(response: Response) -> Result<Option<Response>, StoreError> {
    if response.status() != StatusCode::NOT_FOUND {
        return check(response).map(Some);
    }
    let body = response.text().await?;
    not_found_outcome(&body)?;
    Ok(None)
}

fn scroll_body(offset: Option<Value>) -> Value {
    let mut body = json!({
        "limit": SCROLL_PAGE,
        "with_payload": ["storage_id"],
        "with_vector": false,
    });
    if let Some(offset) = offset {
        body["offset"] = offset;
    }
    body
}

// Collects one scroll page and returns the offset of the next, if any.
fn absorb_page(ids: &mut Vec<String>, page: ScrollPage) -> Option<Value> {
    ids.extend(page.points.into_iter().map(|point| point.payload.storage_id));
    page.next_page_offset.filter(|next| !next.is_null())
}

fn search_body(embedding: &[f32], top_k: usize, filter: Option<&DocIdFilter>) -> Value {
    let mut body = json!({
        "vector": embedding,
        "limit": top_k,
        "with_payload": true,
    });
    if let Some(filter) = filter {
        body["filter"] = json!({
            "must": [{ "key": "doc_id", "match": { "any": filter.doc_ids().collect::<Vec<_>>() } }]
        });
    }
    body
}

fn into_matches(response: SearchResponse) -> Vec<StoreMatch> {
    response
        .result
        .into_iter()
        .map(|point| StoreMatch {
            id: point.payload.storage_id,
            metadata: ChunkMetadata {
                doc_id: point.payload.doc_id,
                page_number: point.payload.page_number,
                chunk_id: point.payload.chunk_id,
            },
            text: point.payload.text,
            // Qdrant reports cosine similarity.
            distance: 1.0 - point.score,
        })
        .collect()
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn add(
        &self,
        ids: &[String],
        metadatas: &[ChunkMetadata],
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        check_batch_lengths(ids, metadatas, texts, embeddings)?;
        if ids.is_empty() {
            return Ok(());
        }

        let points = ids
            .iter()
            .zip(metadatas)
            .zip(texts)
            .zip(embeddings)
            .map(|(((id, metadata), text), embedding)| {
                if embedding.len() != self.vector_size {
                    return Err(StoreError::Request(format!(
                        "embedding dimension {} != {}",
                        embedding.len(),
                        self.vector_size
                    )));
                }

                Ok(json!({
                    "id": point_id(id),
                    "vector": embedding,
                    "payload": {
                        "storage_id": id,
                        "doc_id": metadata.doc_id,
                        "page_number": metadata.page_number,
                        "chunk_id": metadata.chunk_id,
                        "text": text,
                    },
                }))
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        self.ensure_collection().await?;

        let response = self
            .client
            .put(format!("{}/points?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;
        check(response)?;

        debug!(collection = %self.collection, points = ids.len(), "upserted points");
        Ok(())
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&DocIdFilter>,
    ) -> Result<Vec<StoreMatch>, StoreError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        if embedding.len() != self.vector_size {
            return Err(StoreError::Request(format!(
                "query vector dim {} is not {}",
                embedding.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(format!("{}/points/search", self.collection_url()))
            .json(&search_body(embedding, top_k, filter))
            .send()
            .await?;

        let Some(response) = existing(response).await? else {
            return Ok(Vec::new());
        };
        let parsed: SearchResponse = response.json().await?;
        Ok(into_matches(parsed))
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        let points = ids.iter().map(|id| point_id(id)).collect::<Vec<_>>();
        let response = self
            .client
            .post(format!("{}/points/delete?wait=true", self.collection_url()))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        existing(response).await?;
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        let mut ids = Vec::new();
        let mut offset: Option<Value> = None;

        loop {
            let response = self
                .client
                .post(format!("{}/points/scroll", self.collection_url()))
                .json(&scroll_body(offset.take()))
                .send()
                .await?;
            let Some(response) = existing(response).await? else {
                return Ok(Vec::new());
            };

            let page: ScrollResponse = response.json().await?;
            match absorb_page(&mut ids, page.result) {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(ids)
    }
}
