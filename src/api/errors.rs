// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::BridgeError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError { field: String, message: String },
    UnsupportedFormat { format: String, supported: Vec<String> },
    PayloadTooLarge { limit: usize },
    FieldTooLarge { field: String, limit: usize },
    SessionNotReady(String),
    ProtocolError(String),
    DecryptionFailed(String),
    InternalError(String),
}

impl ApiError {
    pub fn missing_field(field: &str) -> Self {
        ApiError::ValidationError {
            field: field.to_string(),
            message: format!("{} is required", field),
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        let (error_type, details) = match self {
            ApiError::NotFound(_) => ("not_found", None),
            ApiError::InvalidRequest(_) => ("invalid_request", None),
            ApiError::ValidationError { field, .. } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", Some(details))
            }
            ApiError::UnsupportedFormat { supported, .. } => {
                let mut details = HashMap::new();
                details.insert(
                    "supported".to_string(),
                    serde_json::Value::Array(
                        supported
                            .iter()
                            .map(|f| serde_json::Value::String(f.clone()))
                            .collect(),
                    ),
                );
                ("validation_error", Some(details))
            }
            ApiError::PayloadTooLarge { limit } => {
                let mut details = HashMap::new();
                details.insert(
                    "limit_bytes".to_string(),
                    serde_json::Value::Number((*limit as u64).into()),
                );
                ("payload_too_large", Some(details))
            }
            ApiError::FieldTooLarge { field, limit } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                details.insert(
                    "limit_bytes".to_string(),
                    serde_json::Value::Number((*limit as u64).into()),
                );
                ("payload_too_large", Some(details))
            }
            ApiError::SessionNotReady(_) => ("session_not_ready", None),
            ApiError::ProtocolError(_) => ("protocol_error", None),
            ApiError::DecryptionFailed(_) => ("decryption_failed", None),
            ApiError::InternalError(_) => ("internal_error", None),
        };

        ErrorResponse {
            error: self.message(),
            error_type: error_type.to_string(),
            details,
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NotFound(msg)
            | ApiError::InvalidRequest(msg)
            | ApiError::SessionNotReady(msg)
            | ApiError::ProtocolError(msg)
            | ApiError::DecryptionFailed(msg)
            | ApiError::InternalError(msg) => msg.clone(),
            ApiError::ValidationError { message, .. } => message.clone(),
            ApiError::UnsupportedFormat { format, supported } => format!(
                "Unsupported format '{}', supported formats: {}",
                format,
                supported.join(", ")
            ),
            ApiError::PayloadTooLarge { limit } => format!(
                "Video exceeds the {} MB upload limit",
                limit / (1024 * 1024)
            ),
            ApiError::FieldTooLarge { field, limit } => {
                format!("{} exceeds the {} byte limit", field, limit)
            }
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_)
            | ApiError::ValidationError { .. }
            | ApiError::UnsupportedFormat { .. } => 400,
            ApiError::PayloadTooLarge { .. } | ApiError::FieldTooLarge { .. } => 413,
            ApiError::SessionNotReady(_)
            | ApiError::ProtocolError(_)
            | ApiError::DecryptionFailed(_)
            | ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::UnsupportedFormat { format, .. } => {
                write!(f, "Unsupported format: {}", format)
            }
            ApiError::PayloadTooLarge { limit } => {
                write!(f, "Payload too large (limit {} bytes)", limit)
            }
            ApiError::FieldTooLarge { field, limit } => {
                write!(f, "Field {} too large (limit {} bytes)", field, limit)
            }
            ApiError::SessionNotReady(msg) => write!(f, "Session not ready: {}", msg),
            ApiError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
            ApiError::DecryptionFailed(msg) => write!(f, "Decryption failed: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        match err {
            BridgeError::EmptyKeyMaterial => ApiError::ValidationError {
                field: "decode_key".to_string(),
                message: err.to_string(),
            },
            BridgeError::NotReady { .. }
            | BridgeError::Launch(_)
            | BridgeError::ModuleLoadTimeout { .. }
            | BridgeError::SessionClosed => ApiError::SessionNotReady(err.to_string()),
            BridgeError::Protocol(_) => ApiError::ProtocolError(err.to_string()),
            BridgeError::ModuleCall { .. } | BridgeError::Decryption(_) => {
                ApiError::DecryptionFailed(err.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_response())).into_response()
    }
}
