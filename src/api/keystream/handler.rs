// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Keystream endpoint handler

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use super::request::KeystreamRequest;
use super::response::KeystreamResponse;
use crate::api::errors::ApiError;
use crate::api::server::AppState;

/// POST /api/keystream - Derive the keystream for a decode key
pub async fn keystream_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<KeystreamRequest>, JsonRejection>,
) -> Result<Json<KeystreamResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge {
                limit: state.limits.json_body_limit_bytes,
            }
        } else {
            ApiError::InvalidRequest(rejection.body_text())
        }
    })?;

    let (key, format) = request.validate()?;

    state.node.session().ensure_ready().await?;

    info!("🔑 Keystream request: {} ({})", key.fingerprint(), format);
    let started = Instant::now();
    let keystream = state.node.keystreams().generate(&key).await?;
    let duration_ms = started.elapsed().as_millis() as u64;
    info!("✅ Keystream generated in {}ms", duration_ms);

    Ok(Json(KeystreamResponse {
        decode_key: key.as_str().to_string(),
        keystream: keystream.encode(format),
        format,
        size: keystream.len(),
        duration_ms,
        timestamp: chrono::Utc::now().to_rfc3339(),
    }))
}
