use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Request-scoped pipeline failures. None of these is fatal to the process;
/// the next request proceeds independently.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unbound placeholder '{0}' in prompt template")]
    MissingPlaceholder(String),
    #[error("upstream model endpoint unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("model output did not match the expected schema: {reason}")]
    SchemaMismatch { reason: String, raw: String },
    #[error("model returned an empty query")]
    EmptyQuery,
    #[error("unknown tool '{0}'")]
    UnknownTool(String),
    #[error("query execution failed: {0}")]
    QueryExecutionError(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn upstream<E: std::fmt::Display>(err: E) -> Self {
        ApiError::UpstreamUnavailable(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = match &self {
            ApiError::MissingPlaceholder(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": self.to_string() }))
            }
            ApiError::UpstreamUnavailable(_) => {
                (StatusCode::BAD_GATEWAY, json!({ "error": self.to_string() }))
            }
            // Raw model output is included so the failure can be diagnosed.
            ApiError::SchemaMismatch { raw, .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "error": self.to_string(), "raw_response": raw }),
            ),
            ApiError::EmptyQuery => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": self.to_string() }))
            }
            ApiError::UnknownTool(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, json!({ "error": self.to_string() }))
            }
            ApiError::QueryExecutionError(_) => {
                (StatusCode::BAD_REQUEST, json!({ "error": self.to_string() }))
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg })),
        };

        (status, Json(body)).into_response()
    }
}
