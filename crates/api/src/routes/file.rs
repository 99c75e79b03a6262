use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::MultipartRejection,
    },
};
use drivegate_services::cloud_storage::{CloudFile, NewFile};
use futures::StreamExt;
use serde::Serialize;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use crate::{error::ApiError, state::AppState};

const LIST_PAGE_SIZE: u32 = 10;
const LIST_FIELDS: &str = "files(name, id)";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub file_id: String,
}

/// An uploaded file written to the staging directory. The file is
/// removed when this is dropped.
struct StagedUpload {
    file: NamedTempFile,
    name: String,
    mime_type: String,
    size: u64,
}

/// GET /files
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<CloudFile>>, ApiError> {
    let files = state
        .storage
        .list_files(LIST_PAGE_SIZE, LIST_FIELDS)
        .await
        .map_err(|e| {
            error!(error = %e, provider = state.storage.provider_name(), "Error listing files");
            ApiError::ListFailed
        })?;

    Ok(Json(files))
}

/// POST /upload
/// Multipart form with a single `file` field, relayed to cloud storage.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        warn!(error = %e, "Upload is not a multipart form");
        ApiError::InvalidUpload(e.body_text())
    })?;
    let staged = stage_upload(Path::new(&state.settings.upload.dir), &mut multipart).await?;

    let reader = tokio::fs::File::open(staged.file.path()).await.map_err(|e| {
        error!(error = %e, "Failed to reopen staged upload");
        ApiError::UploadFailed
    })?;

    let new_file = NewFile {
        name: staged.name.clone(),
        mime_type: staged.mime_type.clone(),
        size: Some(staged.size),
        body: ReaderStream::new(reader).boxed(),
    };

    let created = state.storage.create_file(new_file).await.map_err(|e| {
        error!(error = %e, name = %staged.name, "Error uploading file");
        ApiError::UploadFailed
    })?;

    info!(file_id = %created.id, name = %staged.name, size = staged.size, "Uploaded file");
    Ok(Json(UploadResponse {
        file_id: created.id,
    }))
}

/// Writes the `file` field of `multipart` into a temporary file under `dir`.
async fn stage_upload(dir: &Path, multipart: &mut Multipart) -> Result<StagedUpload, ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        warn!(error = %e, "Malformed multipart body");
        ApiError::InvalidUpload(format!("Multipart error: {e}"))
    })? {
        if field.name() != Some("file") {
            continue;
        }

        let name = field.file_name().unwrap_or("unnamed").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let file = create_staging_file(dir).await.map_err(|e| {
            error!(error = %e, dir = %dir.display(), "Failed to create staging file");
            ApiError::UploadFailed
        })?;
        let mut out = tokio::fs::File::from_std(file.reopen().map_err(|e| {
            error!(error = %e, "Failed to open staging file");
            ApiError::UploadFailed
        })?);

        let mut size = 0u64;
        while let Some(chunk) = field.chunk().await.map_err(|e| {
            warn!(error = %e, "Upload interrupted");
            ApiError::InvalidUpload(format!("Failed to read file: {e}"))
        })? {
            out.write_all(&chunk).await.map_err(|e| {
                error!(error = %e, "Failed to write staging file");
                ApiError::UploadFailed
            })?;
            size += chunk.len() as u64;
        }
        out.flush().await.map_err(|e| {
            error!(error = %e, "Failed to flush staging file");
            ApiError::UploadFailed
        })?;

        debug!(%name, %mime_type, size, path = %file.path().display(), "Staged upload");
        return Ok(StagedUpload {
            file,
            name,
            mime_type,
            size,
        });
    }

    Err(ApiError::InvalidUpload("Missing 'file' field".to_string()))
}

async fn create_staging_file(dir: &Path) -> std::io::Result<NamedTempFile> {
    tokio::fs::create_dir_all(dir).await?;
    let dir = dir.to_path_buf();
    tokio::task::spawn_blocking(move || {
        tempfile::Builder::new().prefix("upload-").tempfile_in(dir)
    })
    .await
    .map_err(std::io::Error::other)?
}
