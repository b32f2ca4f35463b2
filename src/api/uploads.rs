//! Admin media uploads: lesson videos and course thumbnails.
//!
//! Files are spooled to a temp file and pushed to object storage; the
//! response carries the public URL the admin then stores on the course or
//! lesson. Database rows are never written here, so a failed upload leaves
//! nothing behind.

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

use crate::storage::{object_key, Storage};
use crate::AppState;

use super::auth::AdminUser;
use super::error::ApiError;

pub const MAX_VIDEO_BYTES: u64 = 100 * 1024 * 1024;
pub const MAX_THUMBNAIL_BYTES: u64 = 5 * 1024 * 1024;

/// Upload request body limit: the largest media size plus multipart framing.
pub const MAX_UPLOAD_BODY: usize = (MAX_VIDEO_BYTES as usize) + 1024 * 1024;

#[derive(Debug, Clone, Copy)]
pub(crate) enum MediaKind {
    Video,
    Thumbnail,
}

impl MediaKind {
    pub(crate) fn key_prefix(&self) -> &'static str {
        match self {
            MediaKind::Video => "videos",
            MediaKind::Thumbnail => "thumbnails",
        }
    }

    pub(crate) fn mime_prefix(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/",
            MediaKind::Thumbnail => "image/",
        }
    }

    pub(crate) fn max_bytes(&self) -> u64 {
        match self {
            MediaKind::Video => MAX_VIDEO_BYTES,
            MediaKind::Thumbnail => MAX_THUMBNAIL_BYTES,
        }
    }

    fn bucket<'a>(&self, storage: &'a Storage) -> &'a str {
        match self {
            MediaKind::Video => &storage.video_bucket,
            MediaKind::Thumbnail => &storage.thumbnail_bucket,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Thumbnail => "image",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
    pub bucket: String,
    pub key: String,
}

async fn handle_upload(
    state: &AppState,
    mut multipart: Multipart,
    kind: MediaKind,
) -> Result<Json<UploadResponse>, ApiError> {
    let storage = state
        .storage
        .as_ref()
        .ok_or_else(|| ApiError::service_unavailable("Object storage is not configured"))?;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart request: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::validation_field("file", "Filename is missing"))?;

        let content_type = field
            .content_type()
            .map(str::to_string)
            .or_else(|| {
                mime_guess::from_path(&file_name)
                    .first()
                    .map(|m| m.essence_str().to_string())
            })
            .unwrap_or_else(|| "application/octet-stream".to_string());

        if !content_type.starts_with(kind.mime_prefix()) {
            return Err(ApiError::validation_field(
                "file",
                format!("Please select a {} file", kind.label()),
            ));
        }

        let mut spool = NamedTempFile::new()
            .map_err(|e| ApiError::internal(format!("Failed to create temp file: {e}")))?;
        let mut written: u64 = 0;

        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::bad_request(format!("Upload interrupted: {e}")))?
        {
            let chunk: bytes::Bytes = chunk;
            written += chunk.len() as u64;
            if written > kind.max_bytes() {
                return Err(ApiError::validation_field(
                    "file",
                    format!(
                        "{} file size must be less than {} MB",
                        kind.label(),
                        kind.max_bytes() / (1024 * 1024)
                    ),
                ));
            }
            spool
                .write_all(&chunk)
                .map_err(|e| ApiError::internal(format!("Failed to spool upload: {e}")))?;
        }

        spool
            .flush()
            .map_err(|e| ApiError::internal(format!("Failed to spool upload: {e}")))?;

        let bucket = kind.bucket(storage).to_string();
        let key = object_key(kind.key_prefix(), &file_name);

        storage.upload(&bucket, &key, spool.path(), &content_type).await?;
        let url = storage.public_url(&bucket, &key);

        tracing::info!(bucket = %bucket, key = %key, bytes = written, "Media uploaded");

        return Ok(Json(UploadResponse { url, bucket, key }));
    }

    Err(ApiError::validation_field("file", "No file field in request"))
}

/// POST /api/admin/uploads/videos
pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    handle_upload(&state, multipart, MediaKind::Video).await
}

/// POST /api/admin/uploads/thumbnails
pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    handle_upload(&state, multipart, MediaKind::Thumbnail).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limits_match_media_kind() {
        assert_eq!(MediaKind::Video.max_bytes(), 100 * 1024 * 1024);
        assert_eq!(MediaKind::Thumbnail.max_bytes(), 5 * 1024 * 1024);
        assert!(MAX_UPLOAD_BODY as u64 > MAX_VIDEO_BYTES);
    }

    #[test]
    fn mime_prefixes_gate_by_kind() {
        assert!("video/mp4".starts_with(MediaKind::Video.mime_prefix()));
        assert!(!"image/png".starts_with(MediaKind::Video.mime_prefix()));
        assert!("image/png".starts_with(MediaKind::Thumbnail.mime_prefix()));
    }
}
