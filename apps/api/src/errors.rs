use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::{PipelineError, Stage};

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Pipeline(e) => match e.stage {
                Stage::Extraction | Stage::MalformedResponse => StatusCode::UNPROCESSABLE_ENTITY,
                Stage::Completion => StatusCode::BAD_GATEWAY,
                Stage::Budget => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            AppError::Validation(msg) => json!({
                "code": "VALIDATION_ERROR",
                "message": msg
            }),
            AppError::PayloadTooLarge(msg) => json!({
                "code": "PAYLOAD_TOO_LARGE",
                "message": msg
            }),
            AppError::Pipeline(e) => json!({
                "code": "PIPELINE_ERROR",
                "stage": e.stage,
                "message": e.message
            }),
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                json!({
                    "code": "INTERNAL_ERROR",
                    "message": "An internal server error occurred"
                })
            }
        };

        let body = Json(json!({
            "status": "error",
            "error": error
        }));

        (status, body).into_response()
    }
}
