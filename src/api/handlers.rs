// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use crate::api::server::AppState;
use crate::session::SessionStatus;
use crate::version;

/// Routes listed in 404 responses
pub const AVAILABLE_ROUTES: &[&str] = &[
    "GET /",
    "GET /health",
    "GET /api/info",
    "POST /api/keystream",
    "POST /api/decrypt",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub engine: String,
    /// Module report plus `state` and, when known, `source`
    pub wasm: Value,
    pub timestamp: String,
}

impl HealthResponse {
    pub fn from_status(status: &SessionStatus) -> Self {
        let mut wasm = status
            .module
            .as_ref()
            .map(|m| m.details.clone())
            .unwrap_or_else(Map::new);
        wasm.insert("loaded".to_string(), Value::Bool(status.module_loaded()));
        wasm.insert(
            "state".to_string(),
            Value::String(status.state.as_str().to_string()),
        );
        if let Some(source) = status.source {
            wasm.insert(
                "source".to_string(),
                serde_json::to_value(source).unwrap_or(Value::Null),
            );
        }

        Self {
            status: "ok".to_string(),
            service: version::SERVICE_ID.to_string(),
            version: version::VERSION_NUMBER.to_string(),
            engine: version::ENGINE.to_string(),
            wasm: Value::Object(wasm),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfoResponse {
    pub service: String,
    pub version: String,
    pub engine: String,
    pub features: Vec<String>,
    pub endpoints: BTreeMap<String, String>,
}

impl Default for InfoResponse {
    fn default() -> Self {
        let endpoints = [
            ("health", "GET /health"),
            ("decrypt", "POST /api/decrypt"),
            ("keystream", "POST /api/keystream"),
            ("info", "GET /api/info"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            service: version::SERVICE_NAME.to_string(),
            version: version::VERSION_NUMBER.to_string(),
            engine: version::ENGINE.to_string(),
            features: version::FEATURES.iter().map(|f| f.to_string()).collect(),
            endpoints,
        }
    }
}

/// GET /health - Bring the session up if needed and report module status
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Response {
    let session = state.node.session();
    let status = match session.ensure_ready().await {
        Ok(_) => session.status().await,
        Err(e) => Err(e),
    };

    match status {
        Ok(status) => Json(HealthResponse::from_status(&status)).into_response(),
        Err(e) => {
            warn!("Health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "status": "error",
                    "service": version::SERVICE_ID,
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/info - Static service metadata
pub async fn info_handler() -> Json<InfoResponse> {
    Json(InfoResponse::default())
}

pub async fn not_found_handler(uri: Uri) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "Not found",
            "path": uri.path(),
            "available": AVAILABLE_ROUTES,
        })),
    )
}
