// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local keystream transform
//!
//! Channels videos are encrypted by XOR-ing the first `KEYSTREAM_LEN` bytes
//! with the keystream; the remainder of the file is plaintext. Applying the
//! transform twice restores the input.

use async_trait::async_trait;
use bytes::Bytes;

use super::DecryptionEngine;
use crate::errors::BridgeResult;
use crate::keystream::Keystream;

/// XOR `keystream` over the start of `data` in place.
///
/// Returns how many bytes were transformed: the shorter of the two lengths.
pub fn xor_prefix(data: &mut [u8], keystream: &[u8]) -> usize {
    let n = data.len().min(keystream.len());
    data[..n]
        .iter_mut()
        .zip(keystream)
        .for_each(|(byte, key)| *byte ^= key);
    n
}

/// In-process engine applying [`xor_prefix`]
#[derive(Debug, Clone, Default)]
pub struct XorDecryptionEngine;

impl XorDecryptionEngine {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DecryptionEngine for XorDecryptionEngine {
    async fn decrypt(&self, encrypted: Bytes, keystream: &Keystream) -> BridgeResult<Vec<u8>> {
        let mut data = encrypted.to_vec();
        xor_prefix(&mut data, keystream.as_bytes());
        Ok(data)
    }

    fn name(&self) -> &'static str {
        "xor"
    }
}
