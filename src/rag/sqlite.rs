//! SQLite-backed vector store.
//!
//! In-process index using SQLite for document rows and brute-force cosine
//! similarity for search.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::store::{DocSearchResult, StoredDoc, VectorStore};
use crate::core::errors::ApiError;

pub struct SqliteVectorStore {
    pool: SqlitePool,
    #[allow(dead_code)]
    db_path: PathBuf,
}

impl SqliteVectorStore {
    pub async fn open(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(ApiError::internal)?;

        let store = Self { pool, db_path };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_docs (
                doc_id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source TEXT NOT NULL DEFAULT '',
                metadata TEXT DEFAULT '{}',
                embedding BLOB,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() || a.is_empty() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        let denom = norm_a * norm_b;

        if denom <= f32::EPSILON {
            0.0
        } else {
            dot / denom
        }
    }

    fn row_to_doc(row: &sqlx::sqlite::SqliteRow) -> StoredDoc {
        let metadata_str: String = row.get("metadata");
        let metadata = serde_json::from_str::<Value>(&metadata_str).ok();

        StoredDoc {
            doc_id: row.get("doc_id"),
            content: row.get("content"),
            source: row.get("source"),
            metadata,
        }
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn insert_batch(&self, items: Vec<(StoredDoc, Vec<f32>)>) -> Result<(), ApiError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        for (doc, embedding) in &items {
            let blob = Self::serialize_embedding(embedding);
            let metadata_str = doc
                .metadata
                .as_ref()
                .map(|m| serde_json::to_string(m).unwrap_or_default())
                .unwrap_or_else(|| "{}".to_string());

            sqlx::query(
                "INSERT OR REPLACE INTO rag_docs (doc_id, content, source, metadata, embedding)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&doc.doc_id)
            .bind(&doc.content)
            .bind(&doc.source)
            .bind(&metadata_str)
            .bind(&blob)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;
        }

        tx.commit().await.map_err(ApiError::internal)?;
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        limit: usize,
        min_score: f32,
    ) -> Result<Vec<DocSearchResult>, ApiError> {
        let rows = sqlx::query("SELECT doc_id, content, source, metadata, embedding FROM rag_docs")
            .fetch_all(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        let mut scored: Vec<DocSearchResult> = rows
            .iter()
            .filter_map(|row| {
                let embedding_bytes: Vec<u8> = row.get("embedding");
                if embedding_bytes.is_empty() {
                    return None;
                }
                let stored = Self::deserialize_embedding(&embedding_bytes);
                let score = Self::cosine_similarity(query_embedding, &stored);
                if score < min_score {
                    return None;
                }

                Some(DocSearchResult {
                    doc: Self::row_to_doc(row),
                    score,
                })
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit.max(1));

        Ok(scored)
    }

    async fn count(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_docs")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(count as usize)
    }

    async fn reindex(&self) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM rag_docs")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (tempfile::TempDir, SqliteVectorStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteVectorStore::open(dir.path().join("index.db"))
            .await
            .unwrap();
        (dir, store)
    }

    fn make_doc(id: &str, content: &str) -> StoredDoc {
        StoredDoc {
            doc_id: id.to_string(),
            content: content.to_string(),
            source: "test.csv".to_string(),
            metadata: Some(serde_json::json!({ "row": 1 })),
        }
    }

    #[tokio::test]
    async fn insert_and_search_ranks_by_similarity() {
        let (_dir, store) = test_store().await;

        store
            .insert_batch(vec![
                (make_doc("d1", "rust courses"), vec![1.0, 0.0, 0.0]),
                (make_doc("d2", "python courses"), vec![0.0, 1.0, 0.0]),
                (make_doc("d3", "mixed"), vec![0.7, 0.7, 0.0]),
            ])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.search(&[1.0, 0.0, 0.0], 10, 0.0).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].doc.doc_id, "d1");
        assert!(results[0].score > 0.99);
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[tokio::test]
    async fn nothing_above_threshold_is_empty_not_error() {
        let (_dir, store) = test_store().await;

        store
            .insert_batch(vec![(make_doc("d1", "off topic"), vec![0.0, 1.0, 0.0])])
            .await
            .unwrap();

        // Orthogonal query: similarity 0.0, below the 0.7 threshold.
        let results = store.search(&[1.0, 0.0, 0.0], 10, 0.7).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn search_respects_limit() {
        let (_dir, store) = test_store().await;

        let items = (0..5)
            .map(|i| (make_doc(&format!("d{i}"), "doc"), vec![1.0, 0.0, 0.0]))
            .collect();
        store.insert_batch(items).await.unwrap();

        let results = store.search(&[1.0, 0.0, 0.0], 2, 0.0).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn reindex_clears_all_documents() {
        let (_dir, store) = test_store().await;

        store
            .insert_batch(vec![(make_doc("d1", "data"), vec![1.0])])
            .await
            .unwrap();
        store.reindex().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }
}
