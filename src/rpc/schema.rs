// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wire schema for calls crossing into the module harness
//!
//! The harness and the node do not share memory, so every argument and
//! result crosses the boundary as text. Binary buffers travel as standard
//! base64. Each call is wrapped so the harness always answers with a JSON
//! envelope `{"v": 1, "ok": <value>}` or `{"v": 1, "error": "<message>"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{BridgeError, BridgeResult};

/// Version of the reply envelope produced by the call wrapper
pub const SCHEMA_VERSION: u32 = 1;

/// Harness function reporting `{loaded: bool, ...}`
pub const FN_MODULE_STATUS: &str = "checkWasmStatus";

/// Harness function deriving a base64 keystream from key material
pub const FN_GENERATE_KEYSTREAM: &str = "generateKeystream";

/// Harness function decrypting a base64 payload with a base64 keystream
pub const FN_DECRYPT_VIDEO: &str = "decryptVideo";

/// Expression that is true once the module entry symbols are callable
pub const ENTRY_POINTS_PROBE: &str =
    "typeof Module !== 'undefined' && typeof Module.WxIsaac64 !== 'undefined'";

/// Expression that is true when the harness loaded the module from the CDN
pub const CDN_SOURCE_PROBE: &str = "window.WASM_USING_CDN === true";

/// A single call into the hosted module
#[derive(Debug, Clone, PartialEq)]
pub enum RpcCall {
    /// Status probe, answers an object with at least `loaded`
    ModuleStatus,
    /// `generateKeystream(keyMaterial)` answers base64 of 131072 bytes
    GenerateKeystream { key_material: String },
    /// `decryptVideo(encryptedBase64, keystreamBase64)` answers base64 of the
    /// same length as the encrypted input
    DecryptVideo {
        encrypted_b64: String,
        keystream_b64: String,
    },
}

impl RpcCall {
    /// Name of the harness function this call targets
    pub fn function(&self) -> &'static str {
        match self {
            RpcCall::ModuleStatus => FN_MODULE_STATUS,
            RpcCall::GenerateKeystream { .. } => FN_GENERATE_KEYSTREAM,
            RpcCall::DecryptVideo { .. } => FN_DECRYPT_VIDEO,
        }
    }

    /// Positional string arguments in harness order
    pub fn args(&self) -> Vec<&str> {
        match self {
            RpcCall::ModuleStatus => Vec::new(),
            RpcCall::GenerateKeystream { key_material } => vec![key_material.as_str()],
            RpcCall::DecryptVideo {
                encrypted_b64,
                keystream_b64,
            } => vec![encrypted_b64.as_str(), keystream_b64.as_str()],
        }
    }

    /// Total argument bytes, used for logging
    pub fn payload_len(&self) -> usize {
        self.args().iter().map(|a| a.len()).sum()
    }

    /// Render the call as a self-contained JavaScript expression.
    ///
    /// Arguments are embedded as a JSON array, which is also a valid
    /// JavaScript literal, so no string escaping is done by hand. The
    /// expression evaluates to a promise of the envelope string.
    pub fn to_expression(&self) -> String {
        // Serializing a Vec<&str> cannot fail
        let args = serde_json::to_string(&self.args()).unwrap_or_else(|_| "[]".to_string());
        format!(
            "(async () => {{\n\
             \x20 try {{\n\
             \x20   const value = await window[{function}](...{args});\n\
             \x20   return JSON.stringify({{ v: {version}, ok: value === undefined ? null : value }});\n\
             \x20 }} catch (e) {{\n\
             \x20   return JSON.stringify({{ v: {version}, error: String((e && e.message) || e) }});\n\
             \x20 }}\n\
             }})()",
            function = Value::String(self.function().to_string()),
            args = args,
            version = SCHEMA_VERSION,
        )
    }
}

/// Reply envelope produced by the call wrapper
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplyEnvelope {
    pub v: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReplyEnvelope {
    pub fn ok(value: impl Into<Value>) -> Self {
        Self {
            v: SCHEMA_VERSION,
            ok: Some(value.into()),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            v: SCHEMA_VERSION,
            ok: None,
            error: Some(message.into()),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse raw envelope text returned by the harness for `function`.
    pub fn decode(function: &str, raw: &str) -> BridgeResult<Value> {
        let envelope: ReplyEnvelope = serde_json::from_str(raw).map_err(|e| {
            BridgeError::Protocol(format!("{} returned a malformed envelope: {}", function, e))
        })?;

        if envelope.v != SCHEMA_VERSION {
            return Err(BridgeError::Protocol(format!(
                "{} answered with schema v{}, expected v{}",
                function, envelope.v, SCHEMA_VERSION
            )));
        }

        if let Some(message) = envelope.error {
            return Err(BridgeError::ModuleCall {
                function: function.to_string(),
                message,
            });
        }

        envelope.ok.ok_or_else(|| {
            BridgeError::Protocol(format!("{} returned an envelope without a value", function))
        })
    }
}

/// Extract a string result, the only shape `generateKeystream` and
/// `decryptVideo` may answer with.
pub fn expect_string(function: &str, value: Value) -> BridgeResult<String> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(BridgeError::Protocol(format!(
            "{} returned {} instead of a base64 string",
            function,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
