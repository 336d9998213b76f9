// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decrypt API endpoint module
//!
//! Provides POST /api/decrypt: a multipart upload of the encrypted video and
//! its decode key, answered with the decrypted MP4.

pub mod handler;
pub mod upload;

pub use handler::decrypt_handler;
pub use upload::{read_upload, DecryptUpload, MULTIPART_OVERHEAD_BYTES};
