use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::{MovieId, UserId};

/// Errors raised by the recommendation engine itself
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Empty or malformed rating input
    #[error("Data error: {0}")]
    Data(String),

    /// Invalid hyperparameters
    #[error("Config error: {0}")]
    Config(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// A scorer found no neighbor evidence for a (user, movie) pair.
///
/// Never surfaced to callers; the blender reacts to it by falling through
/// to the next source.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("No signal for user {user_id} and movie {movie_id}")]
pub struct NoSignalWarning {
    pub user_id: UserId,
    pub movie_id: MovieId,
}

/// Application-level errors
#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Recommendation model not available")]
    ModelUnavailable,

    #[error("Movie catalog not available")]
    CatalogUnavailable,

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Engine(EngineError::Config(_)) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Engine(EngineError::Data(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::ModelUnavailable | AppError::CatalogUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Io(_) | AppError::Serialization(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
