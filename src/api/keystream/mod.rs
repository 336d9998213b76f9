// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Keystream API endpoint module
//!
//! Provides POST /api/keystream for deriving the 131072 byte keystream of a
//! decode key, presented as hex or base64.

pub mod handler;
pub mod request;
pub mod response;

pub use handler::keystream_handler;
pub use request::KeystreamRequest;
pub use response::KeystreamResponse;
