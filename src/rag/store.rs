//! VectorStore trait — abstract interface for the retrieval index.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// A stored document with its ingest metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDoc {
    pub doc_id: String,
    /// The text content that was embedded.
    pub content: String,
    /// Source identifier (file path, URL, row number).
    pub source: String,
    /// Remaining row fields from ingest (JSON).
    pub metadata: Option<serde_json::Value>,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSearchResult {
    pub doc: StoredDoc,
    /// Cosine similarity (higher = better).
    pub score: f32,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert documents with their embedding vectors in one transaction.
    async fn insert_batch(&self, items: Vec<(StoredDoc, Vec<f32>)>) -> Result<(), ApiError>;

    /// Documents similar to the query embedding, ordered by descending
    /// similarity. Nothing clearing `min_score` is an empty result, not an
    /// error.
    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<DocSearchResult>, ApiError>;

    /// Total stored document count.
    async fn count(&self) -> Result<usize, ApiError>;

    /// Drop all documents, e.g. when the embedding model changes.
    async fn reindex(&self) -> Result<(), ApiError>;
}
