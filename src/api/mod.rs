// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod decrypt;
pub mod errors;
pub mod handlers;
pub mod keystream;
pub mod server;

pub use decrypt::decrypt_handler;
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{HealthResponse, InfoResponse};
pub use keystream::{keystream_handler, KeystreamRequest, KeystreamResponse};
pub use server::{create_app, ApiLimits, ApiServer, AppState};
