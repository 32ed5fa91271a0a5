use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::QuestionRequest;
use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = request.question()?;
    tracing::info!(%question, "rag query");

    let answer = state.rag_engine.answer(question).await?;
    Ok(Json(answer))
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub path: String,
    pub source_column: Option<String>,
}

pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let path = PathBuf::from(request.path.trim());
    if path.as_os_str().is_empty() {
        return Err(ApiError::BadRequest("path must not be empty".to_string()));
    }
    if !path.exists() {
        return Err(ApiError::NotFound(format!("{} does not exist", path.display())));
    }

    let ingested = state
        .ingestor
        .ingest(&path, request.source_column.as_deref())
        .await?;
    Ok(Json(json!({ "ingested": ingested })))
}
