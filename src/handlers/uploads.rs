use std::sync::Arc;

use axum::extract::{Multipart, State};
use serde::{Deserialize, Serialize};

use super::{ok, ApiResult};
use crate::errors::AppError;
use crate::services::documents::{allowed_extension, MAX_DOCUMENT_BYTES};
use crate::services::session::Session;
use crate::state::AppState;

#[derive(Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

// POST /api/uploads/documents
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    session: Session,
    mut multipart: Multipart,
) -> ApiResult<UploadResponse> {
    session.require_authenticated()?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let extension = allowed_extension(&filename).ok_or_else(|| {
            AppError::validation("only pdf, jpg, jpeg and png documents are accepted")
        })?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("failed to read upload: {e}")))?;
        if bytes.is_empty() {
            return Err(AppError::validation("uploaded file is empty"));
        }
        if bytes.len() > MAX_DOCUMENT_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "documents are limited to {} MiB",
                MAX_DOCUMENT_BYTES / (1024 * 1024)
            )));
        }

        let url = state.documents.store(extension, &bytes).await?;
        tracing::info!(url = %url, size = bytes.len(), "document uploaded");
        return Ok(ok(UploadResponse { url }));
    }

    Err(AppError::validation("missing file field"))
}
