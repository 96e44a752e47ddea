//! Axum route handler for résumé uploads.

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{error, info};

use crate::errors::AppError;
use crate::extraction::upload::{allowed_extension, StagedUpload, ALLOWED_EXTENSIONS};
use crate::models::resume::ResumeRecord;
use crate::state::AppState;

/// Multipart field carrying the document.
const RESUME_FIELD: &str = "resume";

#[derive(Debug, Serialize)]
pub struct ParseResumeResponse {
    pub status: &'static str,
    pub data: ResumeRecord,
}

/// POST /parse-resume
///
/// Expects a multipart upload with the document under the `resume` field.
/// Extension and size are checked before anything reaches the pipeline.
#[tracing::instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn handle_parse_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ParseResumeResponse>, AppError> {
    info!("Received parse-resume request");

    let (extension, bytes) = read_upload(&mut multipart, state.config.max_upload_bytes).await?;

    let dir = state.config.upload_dir.clone();
    let staged = tokio::task::spawn_blocking(move || StagedUpload::stage(&dir, &extension, &bytes))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("failed to stage upload")))?;

    info!("Staged upload at {}", staged.path().display());

    let document = staged
        .read_document()
        .await
        .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("failed to read staged upload")))?;

    let result = state.pipeline.run(document).await;
    staged.close();
    let record = result?;

    info!("Successfully parsed resume");
    Ok(Json(ParseResumeResponse {
        status: "success",
        data: record,
    }))
}

/// Pulls the `resume` field out of the form and checks name, extension and size.
///
/// Returns the lowercased extension and the file bytes.
async fn read_upload(
    multipart: &mut Multipart,
    max_bytes: usize,
) -> Result<(String, Vec<u8>), AppError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(RESUME_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        info!("Received file: {filename}");
        if filename.is_empty() {
            error!("No file selected");
            return Err(AppError::Validation("No file selected".to_string()));
        }

        let Some(extension) = allowed_extension(&filename) else {
            error!("Invalid file type: {filename}");
            return Err(AppError::Validation(format!(
                "File type not allowed. Allowed types: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if bytes.len() + chunk.len() > max_bytes {
                error!("Upload {filename} exceeds {max_bytes} bytes");
                return Err(AppError::PayloadTooLarge(format!(
                    "File exceeds the {max_bytes} byte limit"
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        if bytes.is_empty() {
            return Err(AppError::Validation("Uploaded file is empty".to_string()));
        }

        return Ok((extension, bytes));
    }

    error!("No file uploaded");
    Err(AppError::Validation("No file uploaded".to_string()))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}
