// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Keystream response types

use serde::{Deserialize, Serialize};

use crate::keystream::KeystreamFormat;

/// Response body for POST /api/keystream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeystreamResponse {
    /// Echo of the requested decode key
    pub decode_key: String,
    /// Keystream text in `format`
    pub keystream: String,
    pub format: KeystreamFormat,
    /// Keystream length in bytes, always 131072
    pub size: usize,
    /// Time spent in the module, in milliseconds
    pub duration_ms: u64,
    /// RFC 3339 completion time
    pub timestamp: String,
}
