use crate::error::StoreError;
use crate::models::{ChunkMetadata, IndexedRecord};
use crate::store::{cosine_distance, DocIdFilter, StoreMatch};
use crate::traits::{check_batch_lengths, VectorStore};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

// The snapshot file is only created by the first write; a missing file is an empty store.
pub struct LocalVectorStore {
    snapshot: Option<PathBuf>,
    records: RwLock<BTreeMap<String, IndexedRecord>>,
}

impl LocalVectorStore {
    pub fn in_memory() -> Self {
        Self {
            snapshot: None,
            records: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let records = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Vec<IndexedRecord>>(&bytes)?
                .into_iter()
                .map(|record| (record.storage_id.clone(), record))
                .collect(),
            Err(error) if error.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(error) => return Err(error.into()),
        };

        debug!(path = %path.display(), records = records.len(), "opened local vector store");
        Ok(Self {
            snapshot: Some(path),
            records: RwLock::new(records),
        })
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    fn stored_dimension(records: &BTreeMap<String, IndexedRecord>) -> Option<usize> {
        records.values().next().map(|record| record.embedding.len())
    }

    async fn persist(&self, records: &BTreeMap<String, IndexedRecord>) -> Result<(), StoreError> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(&records.values().collect::<Vec<_>>())?;
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, bytes).await?;
        tokio::fs::rename(&staging, path).await?;
        Ok(())
    }
}

#[async_trait]
impl VectorStore for LocalVectorStore {
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

        let mut records = self.records.write().await;
        let expected = Self::stored_dimension(&records).unwrap_or(embeddings[0].len());
        if let Some(bad) = embeddings.iter().find(|embedding| embedding.len() != expected) {
            return Err(dimension_error(bad.len(), expected));
        }

        let mut updated = records.clone();
        for (((id, metadata), text), embedding) in ids.iter().zip(metadatas).zip(texts).zip(embeddings) {
            updated.insert(
                id.clone(),
                IndexedRecord {
                    storage_id: id.clone(),
                    metadata: metadata.clone(),
                    text: text.clone(),
                    embedding: embedding.clone(),
                },
            );
        }

        self.persist(&updated).await?;
        *records = updated;
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

        let records = self.records.read().await;
        if let Some(expected) = Self::stored_dimension(&records) {
            if embedding.len() != expected {
                return Err(dimension_error(embedding.len(), expected));
            }
        }

        let mut matches = records
            .values()
            .filter(|record| filter.map_or(true, |filter| filter.contains(&record.metadata.doc_id)))
            .map(|record| StoreMatch {
                id: record.storage_id.clone(),
                metadata: record.metadata.clone(),
                text: record.text.clone(),
                distance: cosine_distance(embedding, &record.embedding),
            })
            .collect::<Vec<_>>();

        matches.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if !ids.iter().any(|id| records.contains_key(id.as_str())) {
            return Ok(());
        }

        let mut updated = records.clone();
        for id in ids {
            updated.remove(id.as_str());
        }

        self.persist(&updated).await?;
        *records = updated;
        Ok(())
    }

    async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}

fn dimension_error(actual: usize, expected: usize) -> StoreError {
    StoreError::Request(format!("embedding dimension {actual} != {expected}"))
}
