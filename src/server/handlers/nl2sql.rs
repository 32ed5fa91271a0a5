use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use super::QuestionRequest;
use crate::core::errors::ApiError;
use crate::state::AppState;

/// English question → generated SQL → rows from the backing store.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QuestionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let question = request.question()?;
    tracing::info!(%question, "nl2sql request");

    let outcome = state.nl2sql.ask(question).await?;
    Ok(Json(outcome))
}
