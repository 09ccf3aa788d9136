use crate::embeddings::EmbeddingProvider;
use crate::error::IndexError;
use crate::models::{Chunk, ChunkMetadata, QueryMatch};
use crate::store::DocIdFilter;
use crate::traits::VectorStore;
use tracing::{debug, info};

pub fn storage_id(doc_id: &str, page_number: u32, chunk_id: u32) -> String {
    format!("{doc_id}::p{page_number}::c{chunk_id}")
}

pub fn document_prefix(doc_id: &str) -> String {
    format!("{doc_id}::")
}

pub struct VectorIndex<E, S>
where
    E: EmbeddingProvider,
    S: VectorStore,
{
    embedder: E,
    store: S,
}

impl<E, S> VectorIndex<E, S>
where
    E: EmbeddingProvider + Send + Sync,
    S: VectorStore + Send + Sync,
{
    pub fn new(embedder: E, store: S) -> Self {
        Self { embedder, store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // Embeds every chunk before the single store write.
    pub async fn add(&self, doc_id: &str, chunks: &[Chunk]) -> Result<(), IndexError> {
        if chunks.is_empty() {
            debug!(doc_id, "no chunks to index");
            return Ok(());
        }

        let mut ids = Vec::with_capacity(chunks.len());
        let mut metadatas = Vec::with_capacity(chunks.len());
        let mut texts = Vec::with_capacity(chunks.len());
        let mut embeddings = Vec::with_capacity(chunks.len());

        for chunk in chunks {
            let embedding = self
                .embedder
                .embed(chunk.text())
                .await
                .map_err(|error| IndexError::write(doc_id, error))?;

            ids.push(storage_id(doc_id, chunk.page_number(), chunk.chunk_id()));
            metadatas.push(ChunkMetadata {
                doc_id: doc_id.to_string(),
                page_number: chunk.page_number(),
                chunk_id: chunk.chunk_id(),
            });
            texts.push(chunk.text().to_string());
            embeddings.push(embedding);
        }

        self.store
            .add(&ids, &metadatas, &texts, &embeddings)
            .await
            .map_err(|error| IndexError::write(doc_id, error))?;

        info!(doc_id, chunk_count = ids.len(), "indexed chunks");
        Ok(())
    }

    /// An empty `doc_ids` slice searches every document.
    pub async fn query(
        &self,
        text: &str,
        top_k: usize,
        doc_ids: &[String],
    ) -> Result<Vec<QueryMatch>, IndexError> {
        if top_k == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(text).await.map_err(IndexError::query)?;
        let filter = DocIdFilter::from_ids(doc_ids.iter().map(String::as_str));

        let mut matches = self
            .store
            .query(&embedding, top_k, filter.as_ref())
            .await
            .map_err(IndexError::query)?;

        if let Some(filter) = &filter {
            matches.retain(|hit| filter.contains(&hit.metadata.doc_id));
        }
        // Stable sort keeps the store's order for equal distances.
        matches.sort_by(|left, right| left.distance.total_cmp(&right.distance));
        matches.truncate(top_k);

        debug!(top_k, returned = matches.len(), "query served");
        Ok(matches.into_iter().map(|hit| hit.into_query_match()).collect())
    }

    pub async fn delete(&self, doc_id: &str) -> Result<(), IndexError> {
        let prefix = document_prefix(doc_id);
        let ids = self
            .store
            .list_ids()
            .await
            .map_err(|error| IndexError::delete(doc_id, error))?
            .into_iter()
            .filter(|id| id.starts_with(&prefix))
            .collect::<Vec<_>>();

        if ids.is_empty() {
            debug!(doc_id, "nothing to delete");
            return Ok(());
        }

        self.store
            .delete(&ids)
            .await
            .map_err(|error| IndexError::delete(doc_id, error))?;

        info!(doc_id, removed = ids.len(), "deleted document records");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::CharacterNgramEmbedder;
    use crate::error::{EmbeddingError, IndexFailure, StoreError};
    use crate::store::StoreMatch;
    use crate::stores::LocalVectorStore;
    use async_trait::async_trait;

    fn chunk(page: u32, id: u32, text: &str) -> Chunk {
        Chunk::new(page, id, text)
    }

    fn corpus() -> Vec<(&'static str, Vec<Chunk>)> {
        vec![
            (
                "DOC001",
                vec![
                    chunk(1, 1, "Hydraulic pump maintenance requires checking the seals weekly."),
                    chunk(2, 2, "Replace the pressure relief valve when the gauge reads above limit."),
                ],
            ),
            (
                "DOC002",
                vec![chunk(1, 1, "Hydraulic pump maintenance schedule for the northern plant.")],
            ),
            (
                "DOC010",
                vec![chunk(1, 1, "Employee onboarding checklist and badge collection steps.")],
            ),
        ]
    }

    async fn seeded_index() -> Result<VectorIndex<CharacterNgramEmbedder, LocalVectorStore>, IndexError> {
        let index = VectorIndex::new(CharacterNgramEmbedder::default(), LocalVectorStore::in_memory());
        for (doc_id, chunks) in corpus() {
            index.add(doc_id, &chunks).await?;
        }
        Ok(index)
    }

    async fn ids_for(
        index: &VectorIndex<CharacterNgramEmbedder, LocalVectorStore>,
        doc_id: &str,
    ) -> Result<Vec<String>, StoreError> {
        let prefix = document_prefix(doc_id);
        Ok(index
            .store()
            .list_ids()
            .await?
            .into_iter()
            .filter(|id| id.starts_with(&prefix))
            .collect())
    }

    #[test]
    fn storage_id_is_deterministic_and_prefixed() {
        assert_eq!(storage_id("DOC001", 3, 12), "DOC001::p3::c12");
        assert!(storage_id("DOC001", 3, 12).starts_with(&document_prefix("DOC001")));
        assert!(!storage_id("DOC0010", 1, 1).starts_with(&document_prefix("DOC001")));
    }

    #[tokio::test]
    async fn add_is_idempotent_per_storage_id() -> Result<(), Box<dyn std::error::Error>> {
        let index = seeded_index().await?;
        let before = ids_for(&index, "DOC001").await?;
        assert_eq!(before, vec!["DOC001::p1::c1", "DOC001::p2::c2"]);

        index.add("DOC001", &corpus()[0].1).await?;
        assert_eq!(ids_for(&index, "DOC001").await?, before);
        Ok(())
    }

    #[tokio::test]
    async fn query_returns_closest_first_with_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let index = seeded_index().await?;
        let matches = index
            .query("Hydraulic pump maintenance requires checking the seals weekly.", 3, &[])
            .await?;

        assert_eq!(matches.len(), 3);
        assert_eq!(matches[0].storage_id, "DOC001::p1::c1");
        assert_eq!(
            matches[0].metadata,
            ChunkMetadata {
                doc_id: "DOC001".to_string(),
                page_number: 1,
                chunk_id: 1,
            }
        );
        assert!(matches[0].distance.abs() < 1e-5);
        assert!(matches.windows(2).all(|pair| pair[0].distance <= pair[1].distance));
        Ok(())
    }

    #[tokio::test]
    async fn query_filter_never_leaks_other_documents() -> Result<(), Box<dyn std::error::Error>> {
        let index = seeded_index().await?;
        let only = vec!["DOC002".to_string()];
        let matches = index.query("hydraulic pump seals", 10, &only).await?;

        assert_eq!(matches.len(), 1);
        assert!(matches.iter().all(|hit| hit.metadata.doc_id == "DOC002"));
        Ok(())
    }

    #[tokio::test]
    async fn zero_top_k_and_blank_query_are_empty_successes() -> Result<(), Box<dyn std::error::Error>> {
        let index = seeded_index().await?;
        assert!(index.query("hydraulic", 0, &[]).await?.is_empty());
        assert!(index.query("   ", 5, &[]).await?.is_empty());

        let empty = VectorIndex::new(CharacterNgramEmbedder::default(), LocalVectorStore::in_memory());
        assert!(empty.query("hydraulic", 5, &[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn delete_removes_only_the_document_prefix() -> Result<(), Box<dyn std::error::Error>> {
        let index = seeded_index().await?;
        index.delete("DOC001").await?;

        let doc001 = vec!["DOC001".to_string()];
        assert!(index.query("hydraulic pump", 10, &doc001).await?.is_empty());
        assert_eq!(ids_for(&index, "DOC010").await?, vec!["DOC010::p1::c1"]);
        assert_eq!(ids_for(&index, "DOC002").await?.len(), 1);

        index.delete("DOC999").await?;
        index.delete("DOC001").await?;
        assert_eq!(index.store().list_ids().await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn reopened_snapshot_rejects_queries_of_another_width() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("index.json");

        let writer = VectorIndex::new(CharacterNgramEmbedder::default(), LocalVectorStore::open(&path).await?);
        let corpus = corpus();
        writer.add("DOC001", &corpus[0].1).await?;

        let narrow = CharacterNgramEmbedder { dimensions: 128 };
        let reader = VectorIndex::new(narrow, LocalVectorStore::open(&path).await?);
        let result = reader.query("hydraulic pump", 5, &[]).await;
        assert!(matches!(
            result,
            Err(IndexError::Query { source: IndexFailure::Store(StoreError::Request(_)) })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn adding_no_chunks_touches_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let index = VectorIndex::new(FailingEmbedder, FailingStore);
        index.add("DOC001", &[]).await?;
        Ok(())
    }

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FailingEmbedder {
        fn dimensions(&self) -> usize {
            4
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
            Err(EmbeddingError::BackendResponse {
                backend: "fake".to_string(),
                details: "503 Service Unavailable".to_string(),
            })
        }
    }

    struct FailingStore;

    #[async_trait]
    impl VectorStore for FailingStore {
        async fn add(
            &self,
            _ids: &[String],
            _metadatas: &[ChunkMetadata],
            _texts: &[String],
            _embeddings: &[Vec<f32>],
        ) -> Result<(), StoreError> {
            Err(StoreError::Request("connection refused".to_string()))
        }

        async fn query(
            &self,
            _embedding: &[f32],
            _top_k: usize,
            _filter: Option<&DocIdFilter>,
        ) -> Result<Vec<StoreMatch>, StoreError> {
            Err(StoreError::Request("connection refused".to_string()))
        }

        async fn delete(&self, _ids: &[String]) -> Result<(), StoreError> {
            Err(StoreError::Request("connection refused".to_string()))
        }

        async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Request("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn provider_failure_surfaces_as_write_and_query_errors() {
        let index = VectorIndex::new(FailingEmbedder, LocalVectorStore::in_memory());
        let corpus = corpus();
        let chunks = &corpus[0].1;

        let write = index.add("DOC001", chunks).await;
        assert!(matches!(
            write,
            Err(IndexError::Write { ref doc_id, source: IndexFailure::Embedding(_) }) if doc_id == "DOC001"
        ));

        let query = index.query("hydraulic", 5, &[]).await;
        assert!(matches!(
            query,
            Err(IndexError::Query { source: IndexFailure::Embedding(_) })
        ));
    }

    #[tokio::test]
    async fn store_failure_is_distinct_from_empty_results() {
        let index = VectorIndex::new(CharacterNgramEmbedder::default(), FailingStore);
        let corpus = corpus();
        let chunks = &corpus[0].1;

        assert!(matches!(
            index.add("DOC001", chunks).await,
            Err(IndexError::Write { source: IndexFailure::Store(_), .. })
        ));
        assert!(matches!(
            index.query("hydraulic", 5, &[]).await,
            Err(IndexError::Query { source: IndexFailure::Store(_) })
        ));
        assert!(matches!(
            index.delete("DOC001").await,
            Err(IndexError::Delete { source: IndexFailure::Store(_), .. })
        ));
    }

    #[tokio::test]
    async fn query_enforces_filter_and_limit_on_loose_stores() -> Result<(), Box<dyn std::error::Error>> {
        struct LooseStore;

        #[async_trait]
        impl VectorStore for LooseStore {
            async fn add(
                &self,
                _ids: &[String],
                _metadatas: &[ChunkMetadata],
                _texts: &[String],
                _embeddings: &[Vec<f32>],
            ) -> Result<(), StoreError> {
                Ok(())
            }

            async fn query(
                &self,
                _embedding: &[f32],
                _top_k: usize,
                _filter: Option<&DocIdFilter>,
            ) -> Result<Vec<StoreMatch>, StoreError> {
                let hit = |doc: &str, distance: f32| StoreMatch {
                    id: storage_id(doc, 1, 1),
                    metadata: ChunkMetadata {
                        doc_id: doc.to_string(),
                        page_number: 1,
                        chunk_id: 1,
                    },
                    text: "text".to_string(),
                    distance,
                };
                Ok(vec![hit("DOC002", 0.1), hit("DOC001", 0.4), hit("DOC001", 0.2)])
            }

            async fn delete(&self, _ids: &[String]) -> Result<(), StoreError> {
                Ok(())
            }

            async fn list_ids(&self) -> Result<Vec<String>, StoreError> {
                Ok(Vec::new())
            }
        }

        let index = VectorIndex::new(CharacterNgramEmbedder::default(), LooseStore);
        let matches = index.query("anything", 1, &["DOC001".to_string()]).await?;
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].metadata.doc_id, "DOC001");
        assert!((matches[0].distance - 0.2).abs() < 1e-6);
        Ok(())
    }
}
