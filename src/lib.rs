// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod decrypt;
pub mod errors;
pub mod keystream;
pub mod node;
pub mod rpc;
pub mod session;
pub mod version;

// Re-export the core types
pub use config::ServiceConfig;
pub use decrypt::{DecryptedPayload, DecryptionEngine, DecryptionPipeline};
pub use errors::{BridgeError, BridgeResult};
pub use keystream::{KeyMaterial, Keystream, KeystreamFormat, KeystreamProvider, KeystreamService};
pub use node::DecryptNode;
pub use rpc::RpcBridge;
pub use session::{ModuleHost, SessionConfig, SessionManager, SessionState, SessionStatus};
