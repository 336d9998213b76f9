// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Keystream derivation
//!
//! A keystream is exactly [`KEYSTREAM_LEN`] bytes derived from the caller's
//! key material by the vendor module. The derivation itself is a pluggable
//! [`KeystreamProvider`]; [`KeystreamService`] enforces the length contract
//! on whatever the provider returns.

pub mod fixed;
pub mod module;

pub use fixed::FixedKeystreamProvider;
pub use module::ModuleKeystreamProvider;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{BridgeError, BridgeResult};

/// Keystream length in bytes (128 KiB)
pub const KEYSTREAM_LEN: usize = 131_072;

/// Caller supplied decode key for one video.
///
/// Never printed in full: `Debug` and [`KeyMaterial::fingerprint`] only
/// reveal a short prefix.
#[derive(Clone, PartialEq, Eq)]
pub struct KeyMaterial(String);

impl KeyMaterial {
    pub fn new(value: impl Into<String>) -> BridgeResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(BridgeError::EmptyKeyMaterial);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short, log-safe identifier
    pub fn fingerprint(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{}…({} chars)", prefix, self.0.chars().count())
    }
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyMaterial").field(&self.fingerprint()).finish()
    }
}

impl TryFrom<String> for KeyMaterial {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Text encoding used to present a keystream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeystreamFormat {
    #[default]
    Hex,
    Base64,
}

impl KeystreamFormat {
    pub const ALL: [KeystreamFormat; 2] = [KeystreamFormat::Hex, KeystreamFormat::Base64];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeystreamFormat::Hex => "hex",
            KeystreamFormat::Base64 => "base64",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|f| f.as_str()).collect()
    }
}

impl FromStr for KeystreamFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hex" => Ok(KeystreamFormat::Hex),
            "base64" => Ok(KeystreamFormat::Base64),
            other => Err(format!(
                "unsupported format '{}', supported: {:?}",
                other,
                Self::names()
            )),
        }
    }
}

impl fmt::Display for KeystreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated keystream, always exactly [`KEYSTREAM_LEN`] bytes
#[derive(Clone, PartialEq, Eq)]
pub struct Keystream(Vec<u8>);

impl Keystream {
    /// Accept provider output, rejecting any other length as a protocol
    /// violation.
    pub fn from_bytes(bytes: Vec<u8>) -> BridgeResult<Self> {
        if bytes.len() != KEYSTREAM_LEN {
            return Err(BridgeError::Protocol(format!(
                "keystream must be {} bytes, module returned {}",
                KEYSTREAM_LEN,
                bytes.len()
            )));
        }
        Ok(Self(bytes))
    }

    /// Decode a base64 keystream as returned over the bridge
    pub fn from_base64(text: &str) -> BridgeResult<Self> {
        let bytes = STANDARD.decode(text.trim()).map_err(|e| {
            BridgeError::Protocol(format!("keystream is not valid base64: {}", e))
        })?;
        Self::from_bytes(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Lowercase hex, two characters per byte
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Presentation only; the underlying bytes never change.
    pub fn encode(&self, format: KeystreamFormat) -> String {
        match format {
            KeystreamFormat::Hex => self.to_hex(),
            KeystreamFormat::Base64 => self.to_base64(),
        }
    }
}

impl fmt::Debug for Keystream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keystream({} bytes)", self.0.len())
    }
}

/// Source of keystream bytes for a given key material
#[async_trait]
pub trait KeystreamProvider: Send + Sync {
    /// Derive raw keystream bytes. Length is validated by the caller.
    async fn keystream_bytes(&self, key: &KeyMaterial) -> BridgeResult<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Derives validated keystreams through a provider
#[derive(Clone)]
pub struct KeystreamService {
    provider: Arc<dyn KeystreamProvider>,
}

impl KeystreamService {
    pub fn new(provider: Arc<dyn KeystreamProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub async fn generate(&self, key: &KeyMaterial) -> BridgeResult<Keystream> {
        debug!(
            "Deriving keystream for {} via {}",
            key.fingerprint(),
            self.provider.name()
        );
        let bytes = self.provider.keystream_bytes(key).await?;
        Keystream::from_bytes(bytes)
    }
}
