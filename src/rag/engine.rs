use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::store::{DocSearchResult, VectorStore};
use crate::core::config::settings::{LlmSettings, RagSettings};
use crate::core::errors::ApiError;
use crate::llm::{ChatRequest, LlmProvider};
use crate::prompt::{render, PromptTemplate};

const RAG_TEMPLATE: &str = "\
Given the following context and a question, generate an answer based on this context only.
In the answer try to provide as much text as possible from the \"response\" section in the
source document context without making many changes.
If the answer is not found in the context, kindly state \"I don't know.\" Don't try to make
up an answer.

CONTEXT:
{context}";

#[derive(Debug, Clone, Serialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<DocSearchResult>,
}

/// Retrieval-augmented answering: embed the question, retrieve rows above
/// the similarity threshold, condition the model on them.
pub struct RagEngine {
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmProvider>,
    template: PromptTemplate,
    rag: RagSettings,
    chat_model: String,
    embedding_model: String,
    temperature: f64,
}

impl RagEngine {
    pub fn new(
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmProvider>,
        rag: RagSettings,
        llm_settings: &LlmSettings,
    ) -> Self {
        Self {
            store,
            llm,
            template: PromptTemplate::new(RAG_TEMPLATE),
            rag,
            chat_model: llm_settings.chat_model.clone(),
            embedding_model: llm_settings.embedding_model.clone(),
            temperature: llm_settings.temperature,
        }
    }

    pub async fn answer(&self, question: &str) -> Result<RagAnswer, ApiError> {
        let mut embeddings = self.llm.embed(&[question.to_string()], &self.embedding_model).await?;
        let query_embedding = if embeddings.is_empty() {
            return Err(ApiError::UpstreamUnavailable(
                "embedding endpoint returned no vector for the question".to_string(),
            ));
        } else {
            embeddings.remove(0)
        };

        let sources = self
            .store
            .search(
                &query_embedding,
                self.rag.retrieval_limit,
                self.rag.similarity_threshold,
            )
            .await?;

        // No document cleared the threshold: empty-but-successful result,
        // answered without a model round trip.
        if sources.is_empty() {
            return Ok(RagAnswer {
                answer: self.rag.fallback_answer.clone(),
                sources,
            });
        }

        let context = sources
            .iter()
            .map(|result| {
                let response = result
                    .doc
                    .metadata
                    .as_ref()
                    .and_then(|m| m.get("response"))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default();
                if response.is_empty() {
                    result.doc.content.clone()
                } else {
                    format!("prompt: {}\nresponse: {}", result.doc.content, response)
                }
            })
            .collect::<Vec<_>>()
            .join("\n---\n");

        let bindings: HashMap<&str, String> = HashMap::from([("context", context)]);
        let messages = render(&self.template, &bindings, &[], question)?;

        let response = self
            .llm
            .chat(
                ChatRequest::new(messages).with_temperature(self.temperature),
                &self.chat_model,
            )
            .await?;

        Ok(RagAnswer {
            answer: response.text.trim().to_string(),
            sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::settings::Settings;
    use crate::llm::testing::MockProvider;
    use crate::llm::ModelResponse;
    use crate::rag::sqlite::SqliteVectorStore;
    use crate::rag::store::StoredDoc;

    async fn store_with_doc(
        dir: &tempfile::TempDir,
        embedding: Vec<f32>,
    ) -> Arc<SqliteVectorStore> {
        let store = Arc::new(
            SqliteVectorStore::open(dir.path().join("index.db"))
                .await
                .unwrap(),
        );
        store
            .insert_batch(vec![(
                StoredDoc {
                    doc_id: "d1".to_string(),
                    content: "Do you have a rust course?".to_string(),
                    source: "faqs.csv:2".to_string(),
                    metadata: Some(serde_json::json!({ "response": "Yes we do." })),
                },
                embedding,
            )])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn answers_from_retrieved_context() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_with_doc(&dir, vec![1.0, 0.0, 0.0]).await;

        let question = "Is there a rust course?".to_string();
        let llm = Arc::new(
            MockProvider::with_replies(vec![ModelResponse {
                text: "Yes we do.".to_string(),
                tool_calls: Vec::new(),
            }])
            .with_embeddings(HashMap::from([(question.clone(), vec![1.0, 0.0, 0.0])])),
        );

        let settings = Settings::default();
        let engine = RagEngine::new(store, llm.clone(), settings.rag.clone(), &settings.llm);

        let answer = engine.answer(&question).await.unwrap();
        assert_eq!(answer.answer, "Yes we do.");
        assert_eq!(answer.sources.len(), 1);

        // The retrieved row must be in the rendered context.
        let log = llm.chat_log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert!(log[0].messages[0].content.contains("Yes we do."));
    }

    #[tokio::test]
    async fn below_threshold_returns_fallback_without_model_call() {
        let dir = tempfile::tempdir().unwrap();
        // Stored vector is orthogonal to the question vector.
        let store = store_with_doc(&dir, vec![0.0, 1.0, 0.0]).await;

        let question = "Something unrelated".to_string();
        let llm = Arc::new(
            MockProvider::with_replies(Vec::new())
                .with_embeddings(HashMap::from([(question.clone(), vec![1.0, 0.0, 0.0])])),
        );

        let settings = Settings::default();
        let engine = RagEngine::new(store, llm.clone(), settings.rag.clone(), &settings.llm);

        let answer = engine.answer(&question).await.unwrap();
        assert_eq!(answer.answer, "I don't know.");
        assert!(answer.sources.is_empty());
        assert!(llm.chat_log.lock().unwrap().is_empty());
    }
}
