// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File API handlers.
//!
//! Every store call is synchronous file I/O and runs on the blocking pool.

use axum::{
    body::Bytes,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tokio::task::JoinError;
use tracing::{error, info};

use crate::{
    error::ApiError,
    models::{DeleteResponse, FileListResponse, FileSummary, UploadForm, UploadResponse},
    state::AppState,
};

/// Multipart form field carrying the upload.
pub const FILE_FIELD: &str = "file";

/// Slack for multipart boundaries and part headers on top of the file limit.
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

const FALLBACK_MIMETYPE: &str = "application/octet-stream";

fn join_error(e: JoinError) -> ApiError {
    error!(error = %e, "blocking store task failed");
    ApiError::internal("Internal server error")
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::payload_too_large("File too large")
    } else {
        ApiError::bad_request(e.body_text())
    }
}

struct UploadedFile {
    name: String,
    mimetype: String,
    data: Bytes,
}

async fn read_file_field(multipart: &mut Multipart) -> Result<Option<UploadedFile>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let name = field.file_name().unwrap_or(FILE_FIELD).to_string();
        let mimetype = field
            .content_type()
            .unwrap_or(FALLBACK_MIMETYPE)
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        return Ok(Some(UploadedFile {
            name,
            mimetype,
            data,
        }));
    }
    Ok(None)
}

/// Upload and encrypt a file.
#[utoipa::path(
    post,
    path = "/api/upload",
    tag = "Files",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File stored", body = UploadResponse),
        (status = 400, description = "No file provided"),
        (status = 403, description = "Missing or wrong secret header"),
        (status = 413, description = "File exceeds the size limit"),
        (status = 500, description = "Upload failed")
    )
)]
pub async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;

    if upload.data.len() > state.max_file_size {
        return Err(ApiError::payload_too_large("File too large"));
    }

    let store = state.store.clone();
    let descriptor = tokio::task::spawn_blocking(move || {
        store.save(&upload.data, &upload.name, &upload.mimetype)
    })
    .await
    .map_err(join_error)?
    .map_err(|e| ApiError::from_store(e, "Upload failed"))?;

    info!(id = %descriptor.id, size = descriptor.size, "file uploaded");

    Ok(Json(UploadResponse {
        success: true,
        file: descriptor.into(),
    }))
}

/// List stored files, oldest first.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "Files",
    responses(
        (status = 200, description = "Stored files", body = FileListResponse),
        (status = 403, description = "Missing or wrong secret header"),
        (status = 500, description = "Failed to list files")
    )
)]
pub async fn list_files(State(state): State<AppState>) -> Result<Json<FileListResponse>, ApiError> {
    let store = state.store.clone();
    let descriptors = tokio::task::spawn_blocking(move || store.list())
        .await
        .map_err(join_error)?
        .map_err(|e| ApiError::from_store(e, "Failed to list files"))?;

    Ok(Json(FileListResponse {
        success: true,
        files: descriptors.into_iter().map(FileSummary::from).collect(),
    }))
}

/// Download and decrypt a file.
#[utoipa::path(
    get,
    path = "/api/download/{id}",
    tag = "Files",
    params(("id" = String, Path, description = "Storage id")),
    responses(
        (status = 200, description = "Decrypted file contents", body = [u8], content_type = "application/octet-stream"),
        (status = 403, description = "Missing or wrong secret header"),
        (status = 404, description = "File not found"),
        (status = 500, description = "Download failed")
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let store = state.store.clone();
    let (data, descriptor) = tokio::task::spawn_blocking(move || store.get(&id))
        .await
        .map_err(join_error)?
        .map_err(|e| ApiError::from_store(e, "Download failed"))?;

    let headers = [
        (header::CONTENT_TYPE, content_type(&descriptor.mimetype)),
        (
            header::CONTENT_DISPOSITION,
            attachment_disposition(&descriptor.original_name),
        ),
    ];
    Ok((headers, data).into_response())
}

/// Delete a file.
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "Files",
    params(("id" = String, Path, description = "Storage id")),
    responses(
        (status = 200, description = "File deleted", body = DeleteResponse),
        (status = 403, description = "Missing or wrong secret header"),
        (status = 404, description = "File not found"),
        (status = 500, description = "Delete failed")
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let store = state.store.clone();
    let report = tokio::task::spawn_blocking(move || store.delete(&id))
        .await
        .map_err(join_error)?
        .map_err(|e| ApiError::from_store(e, "Delete failed"))?;

    info!(%report, "file deleted");
    Ok(Json(DeleteResponse { success: true }))
}

/// `Content-Disposition` for a download. The name is reduced to printable
/// ASCII without quotes, backslashes or separators.
pub fn attachment_disposition(original_name: &str) -> HeaderValue {
    let sanitized: String = original_name
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let sanitized = match sanitized.trim() {
        "" => "download",
        name => name,
    };

    HeaderValue::from_str(&format!("attachment; filename=\"{sanitized}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// `Content-Type` for a stored mimetype, falling back to
/// `application/octet-stream`.
pub fn content_type(mimetype: &str) -> HeaderValue {
    match HeaderValue::from_str(mimetype) {
        Ok(value) if !mimetype.is_empty() => value,
        _ => HeaderValue::from_static(FALLBACK_MIMETYPE),
    }
}
