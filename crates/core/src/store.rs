use crate::models::{ChunkMetadata, QueryMatch};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocIdFilter {
    doc_ids: BTreeSet<String>,
}

impl DocIdFilter {
    // An empty set means no restriction.
    pub fn from_ids<I, S>(doc_ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let doc_ids = doc_ids.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        if doc_ids.is_empty() {
            None
        } else {
            Some(Self { doc_ids })
        }
    }

    pub fn contains(&self, doc_id: &str) -> bool {
        self.doc_ids.contains(doc_id)
    }

    pub fn doc_ids(&self) -> impl Iterator<Item = &str> {
        self.doc_ids.iter().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreMatch {
    pub id: String,
    pub metadata: ChunkMetadata,
    pub text: String,
    pub distance: f32,
}

impl StoreMatch {
    pub fn into_query_match(self) -> QueryMatch {
        QueryMatch {
            storage_id: self.id,
            metadata: self.metadata,
            text: self.text,
            distance: self.distance,
        }
    }
}

/// `1 - cos(a, b)`; zero-magnitude or mismatched vectors are maximally distant.
pub fn cosine_distance(left: &[f32], right: &[f32]) -> f32 {
    if left.len() != right.len() || left.is_empty() {
        return 2.0;
    }

    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        return 2.0;
    }

    1.0 - dot / (left_norm * right_norm)
}
