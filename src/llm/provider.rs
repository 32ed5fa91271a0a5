use async_trait::async_trait;

use super::types::{ChatRequest, ModelResponse};
use crate::core::errors::ApiError;

/// A remote completion endpoint. Each call is at-most-once: failures are
/// surfaced as `UpstreamUnavailable` and never retried here.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// provider name (e.g. "openai-compat")
    fn name(&self) -> &str;

    /// check if the endpoint is reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// chat completion, optionally advertising callable tools
    async fn chat(&self, request: ChatRequest, model_id: &str) -> Result<ModelResponse, ApiError>;

    /// generate embeddings
    async fn embed(&self, inputs: &[String], model_id: &str) -> Result<Vec<Vec<f32>>, ApiError>;
}
