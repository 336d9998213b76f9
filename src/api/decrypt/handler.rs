// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decrypt endpoint handler

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use axum_extra::extract::multipart::{Multipart, MultipartRejection};
use std::sync::Arc;
use tracing::{error, info};

use super::upload::{read_upload, MULTIPART_OVERHEAD_BYTES};
use crate::api::errors::ApiError;
use crate::api::server::AppState;
use crate::keystream::KeyMaterial;

/// Response header carrying the pipeline duration in milliseconds
pub const DURATION_HEADER: &str = "X-Decrypt-Duration";

/// POST /api/decrypt - Decrypt an uploaded video
///
/// Expects `multipart/form-data` with a `video` file and a `decode_key`
/// field. Answers the decrypted bytes as an MP4 attachment.
pub async fn decrypt_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let max_video = state.limits.max_upload_bytes;

    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > max_video.saturating_add(MULTIPART_OVERHEAD_BYTES)) {
        return Err(ApiError::PayloadTooLarge { limit: max_video });
    }

    let multipart = multipart.map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    let upload = read_upload(multipart, max_video).await?;

    let decode_key = upload
        .decode_key
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::missing_field("decode_key"))?;
    let video = upload.video.ok_or_else(|| ApiError::ValidationError {
        field: "video".to_string(),
        message: "No video file uploaded".to_string(),
    })?;
    let key = KeyMaterial::new(decode_key)?;

    state.node.session().ensure_ready().await?;

    info!(
        "📹 Decrypt request: {} {} ({:.2} MB)",
        key.fingerprint(),
        upload.file_name.as_deref().unwrap_or("<unnamed>"),
        video.len() as f64 / 1024.0 / 1024.0
    );

    let payload = state
        .node
        .pipeline()
        .decrypt(video, &key)
        .await
        .map_err(|e| {
            error!("❌ Decryption failed: {}", e);
            ApiError::from(e)
        })?;

    let filename = format!("decrypted_{}.mp4", chrono::Utc::now().timestamp_millis());
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, payload.data.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .header(DURATION_HEADER, payload.elapsed_ms())
        .body(Body::from(payload.data))
        .map_err(|e| ApiError::InternalError(format!("Failed to build response: {}", e)))
}
