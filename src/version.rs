// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Channels decrypt node

/// Full version string with feature description
pub const VERSION: &str = "v2.0.0-module-bridge-2025-11-03";

/// Semantic version number
pub const VERSION_NUMBER: &str = "2.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-11-03";

/// Service identifier reported by `/health`
pub const SERVICE_ID: &str = "wechat-decrypt-api";

/// Human readable service name reported by `/api/info`
pub const SERVICE_NAME: &str = "WeChat Channels Video Decryption API";

/// Execution engine hosting the vendor module
pub const ENGINE: &str = "headless-chromium";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "module-bridge",
    "fifo-rpc-queue",
    "keystream-hex",
    "keystream-base64",
    "ftyp-signature-gate",
    "offline-cli",
];
