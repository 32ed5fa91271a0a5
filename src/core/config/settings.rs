use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

/// Resolved application configuration. Loaded once at startup by
/// `ConfigService` and passed explicitly into component constructors.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub llm: LlmSettings,
    pub database: DatabaseSettings,
    pub rag: RagSettings,
    pub agent: AgentSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// 0 picks an ephemeral port.
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: 0,
            cors_allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// OpenAI-compatible endpoint root; `/v1/...` paths are appended.
    pub base_url: String,
    pub api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f64,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai".to_string(),
            api_key: String::new(),
            chat_model: "llama-3.3-70b-versatile".to_string(),
            embedding_model: "nomic-embed-text-v1.5".to_string(),
            temperature: 0.0,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: String,
    pub table: String,
    pub columns: Vec<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "movie.db".to_string(),
            table: "MOVIE".to_string(),
            columns: vec![
                "Name".to_string(),
                "Revenue".to_string(),
                "Year".to_string(),
                "Universe".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub index_path: String,
    pub similarity_threshold: f32,
    pub retrieval_limit: usize,
    /// CSV column whose value becomes the document body on ingest.
    pub source_column: String,
    pub fallback_answer: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            index_path: "rag_index.db".to_string(),
            similarity_threshold: 0.7,
            retrieval_limit: 4,
            source_column: "prompt".to_string(),
            fallback_answer: "I don't know.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    /// Upper bound on model/tool round trips before the run is aborted.
    pub max_tool_cycles: usize,
    /// File the save tool appends research output to.
    pub output_path: String,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_cycles: 6,
            output_path: "research_output.txt".to_string(),
        }
    }
}

impl Settings {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.llm.base_url.trim().is_empty() {
            return Err(ApiError::BadRequest("llm.base_url must not be empty".to_string()));
        }
        if self.llm.chat_model.trim().is_empty() {
            return Err(ApiError::BadRequest("llm.chat_model must not be empty".to_string()));
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(ApiError::BadRequest(
                "llm.request_timeout_secs must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.rag.similarity_threshold) {
            return Err(ApiError::BadRequest(
                "rag.similarity_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.rag.retrieval_limit == 0 {
            return Err(ApiError::BadRequest(
                "rag.retrieval_limit must be positive".to_string(),
            ));
        }
        if self.agent.max_tool_cycles == 0 {
            return Err(ApiError::BadRequest(
                "agent.max_tool_cycles must be positive".to_string(),
            ));
        }
        if self.database.table.trim().is_empty() || self.database.columns.is_empty() {
            return Err(ApiError::BadRequest(
                "database.table and database.columns must be set".to_string(),
            ));
        }
        Ok(())
    }
}
