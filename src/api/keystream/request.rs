// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Keystream request types and validation

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::errors::ApiError;
use crate::keystream::{KeyMaterial, KeystreamFormat};

/// Request body for POST /api/keystream
///
/// Fields are kept as raw JSON so a wrong type is reported against the
/// field rather than as an unparseable body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeystreamRequest {
    /// Decode key of the video (required, non-empty string)
    #[serde(default)]
    pub decode_key: Option<Value>,

    /// "hex" (default) or "base64"
    #[serde(default)]
    pub format: Option<Value>,
}

impl KeystreamRequest {
    pub fn new(decode_key: impl Into<String>) -> Self {
        Self {
            decode_key: Some(Value::String(decode_key.into())),
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(Value::String(format.into()));
        self
    }

    /// Validate and convert into typed key material and output format
    pub fn validate(&self) -> Result<(KeyMaterial, KeystreamFormat), ApiError> {
        let key = match &self.decode_key {
            Some(Value::String(s)) if !s.is_empty() => KeyMaterial::new(s.clone())?,
            Some(Value::Null) | None => return Err(ApiError::missing_field("decode_key")),
            Some(Value::String(_)) => return Err(ApiError::missing_field("decode_key")),
            Some(_) => {
                return Err(ApiError::ValidationError {
                    field: "decode_key".to_string(),
                    message: "decode_key must be a string".to_string(),
                })
            }
        };

        let format = match &self.format {
            None | Some(Value::Null) => KeystreamFormat::default(),
            Some(Value::String(s)) => s.parse().map_err(|_| unsupported(s))?,
            Some(other) => return Err(unsupported(&other.to_string())),
        };

        Ok((key, format))
    }
}

fn unsupported(format: &str) -> ApiError {
    ApiError::UnsupportedFormat {
        format: format.to_string(),
        supported: KeystreamFormat::names()
            .into_iter()
            .map(String::from)
            .collect(),
    }
}
