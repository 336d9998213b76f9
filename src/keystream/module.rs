// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Keystream provider backed by the hosted vendor module

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use super::{KeyMaterial, KeystreamProvider};
use crate::errors::{BridgeError, BridgeResult};
use crate::rpc::schema::{expect_string, RpcCall, FN_GENERATE_KEYSTREAM};
use crate::rpc::RpcBridge;

/// Calls `generateKeystream` through the RPC bridge
pub struct ModuleKeystreamProvider {
    bridge: Arc<RpcBridge>,
}

impl ModuleKeystreamProvider {
    pub fn new(bridge: Arc<RpcBridge>) -> Self {
        Self { bridge }
    }
}

#[async_trait]
impl KeystreamProvider for ModuleKeystreamProvider {
    async fn keystream_bytes(&self, key: &KeyMaterial) -> BridgeResult<Vec<u8>> {
        let value = self
            .bridge
            .invoke(RpcCall::GenerateKeystream {
                key_material: key.as_str().to_string(),
            })
            .await?;
        let encoded = expect_string(FN_GENERATE_KEYSTREAM, value)?;

        STANDARD.decode(encoded.trim()).map_err(|e| {
            BridgeError::Protocol(format!(
                "{} returned invalid base64: {}",
                FN_GENERATE_KEYSTREAM, e
            ))
        })
    }

    fn name(&self) -> &'static str {
        "module"
    }
}
