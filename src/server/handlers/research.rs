use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use super::QuestionRequest;
use crate::core::errors::ApiError;
use crate::state::AppState;

/// Runs the tool-calling research agent to a structured report.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = request.question()?;
    tracing::info!(%question, "research request");

    let report = state.agent.run(question).await?;
    Ok(Json(report))
}
