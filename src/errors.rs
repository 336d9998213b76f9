// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Error types for the decryption bridge
//!
//! Covers every failure the core can report:
//! - Input errors (empty key material)
//! - Session errors (not ready, launch failure, module load timeout, closed)
//! - Module errors (the harness threw while running a call)
//! - Protocol errors (the module answered with an unexpected shape)
//! - Decryption errors (output failed the container signature gate)

use std::time::Duration;
use thiserror::Error;

/// Errors produced by the execution session, RPC bridge, keystream service
/// and decryption pipeline
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Key material was empty
    #[error("decode_key must not be empty")]
    EmptyKeyMaterial,

    /// A call arrived while the session was not in the Ready state
    #[error("execution session is not ready (state: {state})")]
    NotReady { state: String },

    /// The sandboxed host process could not be started or the harness
    /// page could not be loaded
    #[error("failed to launch execution host: {0}")]
    Launch(String),

    /// Module entry points never became callable
    #[error("module entry points not callable after {}s", .waited.as_secs())]
    ModuleLoadTimeout { waited: Duration },

    /// The session was shut down before the call could complete
    #[error("execution session closed")]
    SessionClosed,

    /// The harness raised an error while executing a module function
    #[error("module call {function} failed: {message}")]
    ModuleCall { function: String, message: String },

    /// The module returned a response violating the call schema
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Output did not carry the expected container signature
    #[error("decryption failed: {0}")]
    Decryption(String),
}

impl BridgeError {
    /// True for errors that mean the session cannot serve calls right now
    pub fn is_session_error(&self) -> bool {
        matches!(
            self,
            BridgeError::NotReady { .. }
                | BridgeError::Launch(_)
                | BridgeError::ModuleLoadTimeout { .. }
                | BridgeError::SessionClosed
        )
    }
}

pub type BridgeResult<T> = std::result::Result<T, BridgeError>;
