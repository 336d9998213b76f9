// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decryption pipeline
//!
//! Derives the keystream, hands ciphertext and keystream to a
//! [`DecryptionEngine`], and refuses any output that does not start like an
//! ISO media container (`ftyp` at offset 4). A missing signature almost
//! always means the decode key belongs to another video.

pub mod module;
pub mod xor;

pub use module::ModuleDecryptionEngine;
pub use xor::{xor_prefix, XorDecryptionEngine};

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::errors::{BridgeError, BridgeResult};
use crate::keystream::{KeyMaterial, Keystream, KeystreamService};

/// Offset of the container signature in a decrypted payload
pub const SIGNATURE_OFFSET: usize = 4;

/// ISO base media file type box marker
pub const CONTAINER_SIGNATURE: &[u8; 4] = b"ftyp";

/// Applies the decryption transform to a full ciphertext.
///
/// Which byte range the transform touches belongs to the engine; callers
/// always pass the whole payload and the whole keystream and get back a
/// payload of identical length.
#[async_trait]
pub trait DecryptionEngine: Send + Sync {
    async fn decrypt(&self, encrypted: Bytes, keystream: &Keystream) -> BridgeResult<Vec<u8>>;

    /// Engine name for logging
    fn name(&self) -> &'static str;
}

/// True when `data` carries `ftyp` at offset 4
pub fn has_container_signature(data: &[u8]) -> bool {
    data.get(SIGNATURE_OFFSET..SIGNATURE_OFFSET + CONTAINER_SIGNATURE.len())
        == Some(&CONTAINER_SIGNATURE[..])
}

/// Reject output lacking the container signature
pub fn validate_signature(data: &[u8]) -> BridgeResult<()> {
    if has_container_signature(data) {
        return Ok(());
    }

    let found = data
        .get(SIGNATURE_OFFSET..SIGNATURE_OFFSET + CONTAINER_SIGNATURE.len())
        .map(hex::encode)
        .unwrap_or_else(|| format!("only {} bytes", data.len()));
    Err(BridgeError::Decryption(format!(
        "MP4 ftyp signature not found at offset {} (got {}); check that decode_key matches this video and the upload is complete",
        SIGNATURE_OFFSET, found
    )))
}

/// Decrypted bytes plus how long the whole pipeline took
#[derive(Debug, Clone)]
pub struct DecryptedPayload {
    pub data: Vec<u8>,
    pub elapsed: Duration,
}

impl DecryptedPayload {
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed.as_millis() as u64
    }
}

#[derive(Clone)]
pub struct DecryptionPipeline {
    keystreams: KeystreamService,
    engine: Arc<dyn DecryptionEngine>,
}

impl DecryptionPipeline {
    pub fn new(keystreams: KeystreamService, engine: Arc<dyn DecryptionEngine>) -> Self {
        Self { keystreams, engine }
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Decrypt one uploaded video. No retries: a failed call must be
    /// resubmitted by the caller.
    pub async fn decrypt(
        &self,
        encrypted: Bytes,
        key: &KeyMaterial,
    ) -> BridgeResult<DecryptedPayload> {
        let started = Instant::now();
        let input_len = encrypted.len();

        info!(
            "   [1/3] Deriving keystream for {} ({:.2} MB payload)",
            key.fingerprint(),
            input_len as f64 / 1024.0 / 1024.0
        );
        let keystream = self.keystreams.generate(key).await?;

        info!("   [2/3] Running {} engine", self.engine.name());
        let data = self.engine.decrypt(encrypted, &keystream).await?;
        if data.len() != input_len {
            return Err(BridgeError::Protocol(format!(
                "decrypted payload is {} bytes, expected {}",
                data.len(),
                input_len
            )));
        }

        info!("   [3/3] Validating container signature");
        if let Err(e) = validate_signature(&data) {
            warn!("❌ Rejecting output for {}: {}", key.fingerprint(), e);
            return Err(e);
        }

        let elapsed = started.elapsed();
        info!("✅ Decrypted {} bytes in {}ms", data.len(), elapsed.as_millis());
        Ok(DecryptedPayload { data, elapsed })
    }
}
