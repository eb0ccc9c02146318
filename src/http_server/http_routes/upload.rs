use std::sync::Arc;

use axum::extract::State;
use chrono::Utc;
use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};

use crate::http_server::error::{Report, RequestError};
use crate::http_server::extract::{Json, Multipart};
use crate::http_server::state::AppState;
use crate::storage::{UPLOAD_URL_TTL, build_object_key};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub key: String,
    pub url: String,
    pub filetype: String,
}

struct UploadedFile {
    filename: String,
    content_type: String,
    bytes: Vec<u8>,
}

/// `POST /api/upload`: stores the `file` field under a fresh key, optionally
/// beneath `prefix`, before answering.
pub async fn upload_file(
    State(app_state): State<Arc<AppState>>,
    Multipart(mut multipart): Multipart,
) -> Result<Json<UploadResponse>, Report> {
    let mut file = None;
    let mut prefix = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| RequestError::Multipart(e.body_text()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or(FALLBACK_CONTENT_TYPE)
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| RequestError::Multipart(e.body_text()))?;

                file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            Some("prefix") => {
                prefix = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| RequestError::Multipart(e.body_text()))?,
                );
            }
            _ => {}
        }
    }

    let file = file.ok_or(RequestError::MissingFile)?;
    let key = build_object_key(
        prefix.as_deref(),
        &file.filename,
        Utc::now().timestamp_millis(),
    );
    let size = file.bytes.len();

    app_state
        .storage
        .put_object(&key, file.bytes, &file.content_type)
        .await
        .wrap_err("Upload failed")?;

    log::info!("Uploaded {key} ({size} bytes, {})", file.content_type);

    Ok(Json(UploadResponse {
        url: app_state.storage.public_url(&key),
        key,
        filetype: file.content_type,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub filename: String,
    pub content_type: String,
    pub prefix: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignResponse {
    pub key: String,
    pub url: String,
    pub expires_in: u64,
}

/// `POST /api/upload/presign`: hands out a PUT URL so the client can write the
/// object itself, using the same key scheme as [`upload_file`].
pub async fn presign_upload(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<PresignRequest>,
) -> Result<Json<PresignResponse>, Report> {
    let key = build_object_key(
        request.prefix.as_deref(),
        &request.filename,
        Utc::now().timestamp_millis(),
    );

    let url = app_state
        .storage
        .generate_upload_url(&key, &request.content_type)
        .await
        .wrap_err("Failed to create upload URL")?;

    Ok(Json(PresignResponse {
        key,
        url,
        expires_in: UPLOAD_URL_TTL.as_secs(),
    }))
}
