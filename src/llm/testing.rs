//! Scripted provider for exercising pipelines without a live endpoint.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::provider::LlmProvider;
use super::types::{ChatRequest, ModelResponse};
use crate::core::errors::ApiError;

pub struct MockProvider {
    replies: Mutex<VecDeque<ModelResponse>>,
    embeddings: HashMap<String, Vec<f32>>,
    pub chat_log: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn with_replies(replies: Vec<ModelResponse>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            embeddings: HashMap::new(),
            chat_log: Mutex::new(Vec::new()),
        }
    }

    /// Fixed embeddings per input text; unregistered inputs fall back to a
    /// default unit vector.
    pub fn with_embeddings(mut self, embeddings: HashMap<String, Vec<f32>>) -> Self {
        self.embeddings = embeddings;
        self
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> Result<bool, ApiError> {
        Ok(true)
    }

    async fn chat(&self, request: ChatRequest, _model_id: &str) -> Result<ModelResponse, ApiError> {
        self.chat_log.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::UpstreamUnavailable("mock reply script exhausted".to_string()))
    }

    async fn embed(&self, inputs: &[String], _model_id: &str) -> Result<Vec<Vec<f32>>, ApiError> {
        Ok(inputs
            .iter()
            .map(|input| {
                self.embeddings
                    .get(input)
                    .cloned()
                    .unwrap_or_else(|| vec![1.0, 0.0, 0.0])
            })
            .collect())
    }
}
