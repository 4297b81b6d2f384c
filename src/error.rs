use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced at the HTTP boundary. Queue-core operations never fail;
/// everything here is a client input problem or an unknown route.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("agent query parameter required")]
    AgentRequired,

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Body(#[from] JsonRejection),

    #[error("not found")]
    NotFound,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::AgentRequired | ApiError::InvalidRequest(_) | ApiError::Body(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
