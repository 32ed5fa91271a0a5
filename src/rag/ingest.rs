use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use uuid::Uuid;

use super::store::{StoredDoc, VectorStore};
use crate::core::errors::ApiError;
use crate::llm::LlmProvider;

const EMBED_BATCH: usize = 64;

/// Loads a CSV file into the vector index, one document per row. The
/// configured source column becomes the document body; the remaining
/// columns ride along as metadata.
pub struct CsvIngestor {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    embedding_model: String,
    default_source_column: String,
}

impl CsvIngestor {
    pub fn new(
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        embedding_model: String,
        default_source_column: String,
    ) -> Self {
        Self {
            store,
            llm,
            embedding_model,
            default_source_column,
        }
    }

    pub async fn ingest(
        &self,
        path: &Path,
        source_column: Option<&str>,
    ) -> Result<usize, ApiError> {
        let column = source_column.unwrap_or(&self.default_source_column);

        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| ApiError::BadRequest(format!("failed to open {}: {}", path.display(), e)))?;

        let headers = reader
            .headers()
            .map_err(|e| ApiError::BadRequest(e.to_string()))?
            .clone();
        let content_idx = headers
            .iter()
            .position(|h| h == column)
            .ok_or_else(|| {
                ApiError::BadRequest(format!("source column '{}' not found in CSV header", column))
            })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let mut docs = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|e| ApiError::BadRequest(e.to_string()))?;
            let content = record.get(content_idx).unwrap_or("").trim().to_string();
            if content.is_empty() {
                continue;
            }

            let mut metadata = Map::new();
            for (idx, field) in record.iter().enumerate() {
                if idx == content_idx {
                    continue;
                }
                if let Some(header) = headers.get(idx) {
                    metadata.insert(header.to_string(), Value::String(field.to_string()));
                }
            }

            docs.push(StoredDoc {
                doc_id: Uuid::new_v4().to_string(),
                content,
                source: format!("{}:{}", file_name, row_idx + 2),
                metadata: Some(Value::Object(metadata)),
            });
        }

        let total = docs.len();
        for batch in docs.chunks(EMBED_BATCH) {
            let inputs: Vec<String> = batch.iter().map(|doc| doc.content.clone()).collect();
            let embeddings = self.llm.embed(&inputs, &self.embedding_model).await?;
            if embeddings.len() != batch.len() {
                return Err(ApiError::UpstreamUnavailable(format!(
                    "embedding count mismatch: sent {}, received {}",
                    batch.len(),
                    embeddings.len()
                )));
            }

            let items = batch.iter().cloned().zip(embeddings).collect();
            self.store.insert_batch(items).await?;
        }

        tracing::info!(file = %file_name, documents = total, "CSV ingested into vector index");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::MockProvider;
    use crate::rag::sqlite::SqliteVectorStore;
    use std::io::Write;

    #[tokio::test]
    async fn ingests_rows_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("faqs.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "prompt,response").unwrap();
        writeln!(file, "Do you have a rust course?,Yes we do.").unwrap();
        writeln!(file, "Do you offer refunds?,Within 30 days.").unwrap();

        let store = Arc::new(
            SqliteVectorStore::open(dir.path().join("index.db"))
                .await
                .unwrap(),
        );
        let llm = Arc::new(MockProvider::with_replies(Vec::new()));
        let ingestor = CsvIngestor::new(
            store.clone(),
            llm,
            "embed-model".to_string(),
            "prompt".to_string(),
        );

        let count = ingestor.ingest(&csv_path, None).await.unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let results = store.search(&[1.0, 0.0, 0.0], 10, 0.0).await.unwrap();
        let first = &results[0].doc;
        assert!(first.source.starts_with("faqs.csv:"));
        let metadata = first.metadata.as_ref().unwrap();
        assert!(metadata.get("response").is_some());
        assert!(metadata.get("prompt").is_none());
    }

    #[tokio::test]
    async fn unknown_source_column_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("faqs.csv");
        let mut file = std::fs::File::create(&csv_path).unwrap();
        writeln!(file, "question,answer").unwrap();
        writeln!(file, "q,a").unwrap();

        let store = Arc::new(
            SqliteVectorStore::open(dir.path().join("index.db"))
                .await
                .unwrap(),
        );
        let llm = Arc::new(MockProvider::with_replies(Vec::new()));
        let ingestor = CsvIngestor::new(store, llm, "embed-model".to_string(), "prompt".to_string());

        let err = ingestor.ingest(&csv_path, None).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
