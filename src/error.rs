use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::services::validation::ValidationErrors;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Any failure of the underlying storage engine. Never retried here.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
    #[error("Datos inválidos")]
    InvalidInput(ValidationErrors),
    #[error("Viaje no encontrado")]
    NotFound,
    #[error("El viaje está cancelado y no admite modificaciones")]
    TerminalState,
    #[error("El viaje fue modificado por otra operación (versión esperada {expected}, actual {actual})")]
    VersionConflict { expected: i64, actual: i64 },
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Io(_) | AppError::Migration(_) | AppError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::TerminalState | AppError::VersionConflict { .. } => StatusCode::CONFLICT,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
        }
    }

    /// Per-field violations, present only for rejected payloads.
    pub fn field_errors(&self) -> Option<&ValidationErrors> {
        match self {
            AppError::InvalidInput(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::InvalidInput(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {self:?}");
        }

        let body = match &self {
            AppError::InvalidInput(errors) => json!({
                "message": self.to_string(),
                "errors": errors.as_slice(),
            }),
            // Infrastructure details stay in the logs.
            AppError::StoreUnavailable(_) => json!({ "message": "store unavailable" }),
            AppError::Config(_) | AppError::Io(_) | AppError::Migration(_) | AppError::Other(_) => {
                json!({ "message": "internal error" })
            }
            _ => json!({ "message": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}
