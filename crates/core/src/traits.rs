use crate::error::StoreError;
use crate::models::ChunkMetadata;
use crate::store::{DocIdFilter, StoreMatch};
use async_trait::async_trait;

// A store that was never created behaves as empty for query, delete and list_ids.
#[async_trait]
pub trait VectorStore {
    async fn add(
        &self,
        ids: &[String],
        metadatas: &[ChunkMetadata],
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError>;

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&DocIdFilter>,
    ) -> Result<Vec<StoreMatch>, StoreError>;

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    async fn list_ids(&self) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
impl<T> VectorStore for Box<T>
where
    T: VectorStore + Send + Sync + ?Sized,
{
    async fn add(
        &self,
        ids: &[String],
        metadatas: &[ChunkMetadata],
        texts: &[String],
        embeddings: &[Vec<f32>],
    ) -> Result<(), StoreError> {
        (**self).add(ids, metadatas, texts, embeddings).await
    }

    async fn query(
        &self,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&DocIdFilter>,
    ) -> Result<Vec<StoreMatch>, StoreError> {
        (**self).query(embedding, top_k, filter).await
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        (**self).delete(ids).await
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        (**self).list_ids().await
    }
}

pub(crate) fn check_batch_lengths(
    ids: &[String],
    metadatas: &[ChunkMetadata],
    texts: &[String],
    embeddings: &[Vec<f32>],
) -> Result<(), StoreError> {
    if ids.len() != metadatas.len() || ids.len() != texts.len() || ids.len() != embeddings.len() {
        return Err(StoreError::Request(format!(
            "batch length mismatch: {} ids, {} metadatas, {} texts, {} embeddings",
            ids.len(),
            metadatas.len(),
            texts.len(),
            embeddings.len()
        )));
    }
    Ok(())
}
