pub mod config;
pub mod health;
pub mod home;
pub mod nl2sql;
pub mod rag;
pub mod research;

use serde::Deserialize;

use crate::core::errors::ApiError;

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

impl QuestionRequest {
    pub fn question(&self) -> Result<&str, ApiError> {
        let trimmed = self.question.trim();
        if trimmed.is_empty() {
            return Err(ApiError::BadRequest("question must not be empty".to_string()));
        }
        Ok(trimmed)
    }
}
