// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decryption engine backed by the hosted vendor module

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

use super::DecryptionEngine;
use crate::errors::{BridgeError, BridgeResult};
use crate::keystream::Keystream;
use crate::rpc::schema::{expect_string, RpcCall, FN_DECRYPT_VIDEO};
use crate::rpc::RpcBridge;

/// Sends the whole payload to `decryptVideo` and decodes the answer.
///
/// Base64 work on large payloads runs on the blocking pool so it does not
/// stall the runtime.
pub struct ModuleDecryptionEngine {
    bridge: Arc<RpcBridge>,
}

impl ModuleDecryptionEngine {
    pub fn new(bridge: Arc<RpcBridge>) -> Self {
        Self { bridge }
    }
}

async fn blocking<T, F>(task: F) -> BridgeResult<T>
where
    F: FnOnce() -> BridgeResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| BridgeError::Decryption(format!("codec task failed: {}", e)))?
}

#[async_trait]
impl DecryptionEngine for ModuleDecryptionEngine {
    async fn decrypt(&self, encrypted: Bytes, keystream: &Keystream) -> BridgeResult<Vec<u8>> {
        let input_len = encrypted.len();
        let encrypted_b64 = blocking(move || Ok(STANDARD.encode(&encrypted))).await?;
        debug!(
            "Encoded {} bytes as {} base64 chars",
            input_len,
            encrypted_b64.len()
        );

        let value = self
            .bridge
            .invoke(RpcCall::DecryptVideo {
                encrypted_b64,
                keystream_b64: keystream.to_base64(),
            })
            .await?;
        let decrypted_b64 = expect_string(FN_DECRYPT_VIDEO, value)?;

        let decrypted = blocking(move || {
            STANDARD.decode(decrypted_b64.trim()).map_err(|e| {
                BridgeError::Protocol(format!("{} returned invalid base64: {}", FN_DECRYPT_VIDEO, e))
            })
        })
        .await?;

        if decrypted.len() != input_len {
            return Err(BridgeError::Protocol(format!(
                "{} returned {} bytes for a {} byte input",
                FN_DECRYPT_VIDEO,
                decrypted.len(),
                input_len
            )));
        }
        Ok(decrypted)
    }

    fn name(&self) -> &'static str {
        "module"
    }
}
