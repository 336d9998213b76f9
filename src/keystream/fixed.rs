// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deterministic in-process keystream generator
//!
//! Stands in for the vendor module in tests and local runs. It is NOT the
//! vendor algorithm: it expands the key material with the BLAKE3 XOF so the
//! output is a stable function of the key.

use async_trait::async_trait;

use super::{KeyMaterial, KeystreamProvider, KEYSTREAM_LEN};
use crate::errors::BridgeResult;

const DOMAIN: &str = "channels-decrypt-node fixed keystream v1";

/// Expand `key` into [`KEYSTREAM_LEN`] bytes.
pub fn derive_keystream(key: &str) -> Vec<u8> {
    let mut hasher = blake3::Hasher::new_derive_key(DOMAIN);
    hasher.update(key.as_bytes());
    let mut out = vec![0u8; KEYSTREAM_LEN];
    hasher.finalize_xof().fill(&mut out);
    out
}

#[derive(Debug, Clone, Default)]
pub struct FixedKeystreamProvider;

impl FixedKeystreamProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeystreamProvider for FixedKeystreamProvider {
    async fn keystream_bytes(&self, key: &KeyMaterial) -> BridgeResult<Vec<u8>> {
        Ok(derive_keystream(key.as_str()))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}
