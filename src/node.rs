// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wiring of the decryption node's core services

use std::sync::Arc;

use crate::decrypt::{DecryptionEngine, DecryptionPipeline, ModuleDecryptionEngine};
use crate::keystream::{KeystreamProvider, KeystreamService, ModuleKeystreamProvider};
use crate::session::{ModuleHost, SessionConfig, SessionManager};

/// Session plus the keystream and decryption services built on it
#[derive(Clone)]
pub struct DecryptNode {
    session: SessionManager,
    keystreams: KeystreamService,
    pipeline: DecryptionPipeline,
}

impl DecryptNode {
    /// Start a node whose keystream and decryption both run in the hosted
    /// module.
    pub fn start(host: Box<dyn ModuleHost>, config: SessionConfig) -> std::io::Result<Self> {
        let session = SessionManager::start(host, config)?;
        let bridge = session.bridge().clone();
        Ok(Self::with_capabilities(
            session,
            Arc::new(ModuleKeystreamProvider::new(bridge.clone())),
            Arc::new(ModuleDecryptionEngine::new(bridge)),
        ))
    }

    /// Build a node around explicit capabilities
    pub fn with_capabilities(
        session: SessionManager,
        provider: Arc<dyn KeystreamProvider>,
        engine: Arc<dyn DecryptionEngine>,
    ) -> Self {
        let keystreams = KeystreamService::new(provider);
        let pipeline = DecryptionPipeline::new(keystreams.clone(), engine);
        Self {
            session,
            keystreams,
            pipeline,
        }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    pub fn keystreams(&self) -> &KeystreamService {
        &self.keystreams
    }

    pub fn pipeline(&self) -> &DecryptionPipeline {
        &self.pipeline
    }
}
