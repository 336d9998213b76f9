// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload parsing for the decrypt endpoint

use axum_extra::extract::Multipart;
use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::api::errors::ApiError;

/// Slack allowed on top of the video limit for boundaries, headers and the
/// decode key field
pub const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Form field carrying the encrypted video
pub const VIDEO_FIELD: &str = "video";

/// Form field carrying the decode key
pub const DECODE_KEY_FIELD: &str = "decode_key";

/// Largest accepted `decode_key` field, 1 MiB
pub const MAX_DECODE_KEY_BYTES: usize = 1024 * 1024;

/// Fields collected from a decrypt upload
#[derive(Debug, Default)]
pub struct DecryptUpload {
    pub video: Option<Bytes>,
    pub file_name: Option<String>,
    pub decode_key: Option<String>,
}

/// Collect the `video` and `decode_key` fields, failing with 413 as soon as
/// the video grows past `max_video_bytes` or the key past
/// [`MAX_DECODE_KEY_BYTES`]. Unknown fields are skipped.
pub async fn read_upload(
    mut multipart: Multipart,
    max_video_bytes: usize,
) -> Result<DecryptUpload, ApiError> {
    let mut upload = DecryptUpload::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(VIDEO_FIELD) => {
                upload.file_name = field.file_name().map(str::to_string);
                let mut buffer = BytesMut::new();
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| ApiError::InvalidRequest(format!("Failed to read video: {}", e)))?
                {
                    if buffer.len() + chunk.len() > max_video_bytes {
                        return Err(ApiError::PayloadTooLarge {
                            limit: max_video_bytes,
                        });
                    }
                    buffer.extend_from_slice(&chunk);
                }
                upload.video = Some(buffer.freeze());
            }
            Some(DECODE_KEY_FIELD) => {
                let mut buffer = Vec::new();
                while let Some(chunk) = field.chunk().await.map_err(|e| {
                    ApiError::InvalidRequest(format!("Failed to read decode_key: {}", e))
                })? {
                    if buffer.len() + chunk.len() > MAX_DECODE_KEY_BYTES {
                        return Err(ApiError::FieldTooLarge {
                            field: DECODE_KEY_FIELD.to_string(),
                            limit: MAX_DECODE_KEY_BYTES,
                        });
                    }
                    buffer.extend_from_slice(&chunk);
                }
                let key = String::from_utf8(buffer).map_err(|_| ApiError::ValidationError {
                    field: DECODE_KEY_FIELD.to_string(),
                    message: "decode_key must be UTF-8 text".to_string(),
                })?;
                upload.decode_key = Some(key);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(upload)
}
