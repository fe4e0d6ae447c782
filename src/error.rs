use crate::mood::ResolveError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

const UPSTREAM_MESSAGE: &str = "The movie catalog is unavailable right now, please try again later";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("unrecognized mood '{0}'")]
    InvalidMood(String),
    #[error("catalog request failed")]
    Upstream(#[from] anyhow::Error),
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::InvalidMood(label) => AppError::InvalidMood(label),
            ResolveError::DataSource(source) => AppError::Upstream(source),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => {
                warn!("Rejected request: {}", msg);
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::InvalidMood(label) => {
                // Only enumerated moods are offered, so this is a caller defect.
                warn!("Rejected unrecognized mood '{}'", label);
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::Upstream(err) => {
                error!("Catalog request failed: {:#}", err);
                (StatusCode::BAD_GATEWAY, UPSTREAM_MESSAGE.to_string())
            }
        };
        (
            status,
            Json(json!({ "status": "error", "message": message })),
        )
            .into_response()
    }
}
