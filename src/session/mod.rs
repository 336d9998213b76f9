// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Execution session lifecycle
//!
//! The session is the one sandboxed host process plus the module loaded in
//! it. It is created once, owned by the RPC bridge's host thread, and moves
//! through a fixed state machine:
//!
//! ```text
//! Uninitialized -> Launching -> WaitingForModule -> Ready -> Closed
//!                      |               |
//!                      +---------------+-> Failed (terminal)
//! ```
//!
//! A failed session is never relaunched; the process has to be restarted.

pub mod chrome;
pub mod host;

pub use chrome::{ChromeModuleHost, ChromeOptions};
pub use host::ModuleHost;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::errors::{BridgeError, BridgeResult};
use crate::rpc::schema::RpcCall;
use crate::rpc::RpcBridge;

/// Lifecycle state of the execution session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Launching,
    WaitingForModule,
    Ready,
    Closed,
    Failed(String),
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Launching => "launching",
            SessionState::WaitingForModule => "waiting_for_module",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
            SessionState::Failed(_) => "failed",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    /// Closed and Failed sessions never serve calls again
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed(_))
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Where the harness loaded the module from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleSource {
    /// Bundled local assets served by this node
    Local,
    /// Remote fallback (vendor CDN)
    Cdn,
}

impl ModuleSource {
    pub fn describe(&self) -> &'static str {
        match self {
            ModuleSource::Local => "Local files",
            ModuleSource::Cdn => "WeChat CDN (fallback)",
        }
    }
}

/// Status object reported by the harness status probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleStatus {
    pub loaded: bool,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// Shared view of the session, published by the host thread
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub source: Option<ModuleSource>,
}

/// Result of [`SessionManager::status`]
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatus {
    pub state: SessionState,
    pub source: Option<ModuleSource>,
    /// Present only when the session is ready and the probe answered
    pub module: Option<ModuleStatus>,
}

impl SessionStatus {
    pub fn module_loaded(&self) -> bool {
        self.module.as_ref().map(|m| m.loaded).unwrap_or(false)
    }
}

/// Session settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// URL of the harness page the host loads
    pub harness_url: String,
    /// How long to wait for the module entry points
    pub load_timeout: Duration,
    /// Delay between entry point probes
    pub poll_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            harness_url: "http://127.0.0.1:8010/worker.html".to_string(),
            load_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(250),
        }
    }
}

/// The hosted environment and loaded module.
///
/// Lives on the bridge's host thread; every method may block.
pub(crate) struct ExecutionSession {
    host: Box<dyn ModuleHost>,
    config: SessionConfig,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl ExecutionSession {
    pub(crate) fn new(
        host: Box<dyn ModuleHost>,
        config: SessionConfig,
    ) -> (Self, watch::Receiver<SessionSnapshot>) {
        let (snapshot, rx) = watch::channel(SessionSnapshot {
            state: SessionState::Uninitialized,
            source: None,
        });
        (
            Self {
                host,
                config,
                snapshot,
            },
            rx,
        )
    }

    fn state(&self) -> SessionState {
        self.snapshot.borrow().state.clone()
    }

    fn transition(&self, next: SessionState) {
        debug!("Session state {} -> {}", self.state(), next);
        self.snapshot.send_modify(|s| s.state = next);
    }

    /// Bring the session to Ready, launching the host if needed.
    pub(crate) fn initialize(&mut self) -> BridgeResult<ModuleSource> {
        match self.state() {
            SessionState::Ready => {
                return Ok(self.snapshot.borrow().source.unwrap_or(ModuleSource::Local));
            }
            SessionState::Uninitialized => {}
            other => {
                return Err(BridgeError::NotReady {
                    state: other.to_string(),
                })
            }
        }

        self.transition(SessionState::Launching);
        if let Err(e) = self
            .host
            .launch(&self.config.harness_url, self.config.load_timeout)
        {
            error!("❌ Execution host failed to launch: {:#}", e);
            self.host.close();
            self.transition(SessionState::Failed(format!("launch error: {}", e)));
            return Err(BridgeError::Launch(format!("{:#}", e)));
        }

        self.transition(SessionState::WaitingForModule);
        info!(
            "⏳ Waiting for module entry points (timeout {}s)",
            self.config.load_timeout.as_secs()
        );

        let started = Instant::now();
        let deadline = started + self.config.load_timeout;
        loop {
            // Each probe only gets the time left before the deadline
            let remaining = deadline.saturating_duration_since(Instant::now());
            if !remaining.is_zero() {
                match self.host.entry_points_ready(remaining) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(e) => debug!("Entry point probe failed: {:#}", e),
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                error!(
                    "❌ Module entry points not callable after {}s",
                    self.config.load_timeout.as_secs()
                );
                self.host.close();
                self.transition(SessionState::Failed("module load timeout".to_string()));
                return Err(BridgeError::ModuleLoadTimeout {
                    waited: self.config.load_timeout,
                });
            }

            std::thread::sleep(self.config.poll_interval.min(remaining));
        }

        let source = match self.host.module_source() {
            Ok(source) => source,
            Err(e) => {
                warn!("Could not determine module source, assuming local: {:#}", e);
                ModuleSource::Local
            }
        };

        self.snapshot.send_modify(|s| {
            s.state = SessionState::Ready;
            s.source = Some(source);
        });
        info!(
            "✅ Module ready in {}ms (source: {})",
            started.elapsed().as_millis(),
            source.describe()
        );
        Ok(source)
    }

    /// Run one call and return the raw reply envelope.
    pub(crate) fn call(&mut self, call: &RpcCall) -> BridgeResult<String> {
        let state = self.state();
        if !state.is_ready() {
            return Err(BridgeError::NotReady {
                state: state.to_string(),
            });
        }

        self.host
            .execute(call)
            .map_err(|e| BridgeError::ModuleCall {
                function: call.function().to_string(),
                message: format!("{:#}", e),
            })
    }

    /// Release the host process. A failed session keeps its failed state;
    /// its host was already released when it failed.
    pub(crate) fn close(&mut self) {
        match self.state() {
            SessionState::Closed | SessionState::Failed(_) => return,
            _ => {}
        }

        self.host.close();
        self.transition(SessionState::Closed);
        info!("Execution session released");
    }
}

impl Drop for ExecutionSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Lifecycle entry points for the execution session.
///
/// The session itself is owned by the [`RpcBridge`]; the manager drives it
/// through the bridge's queue and reads its published state.
#[derive(Clone)]
pub struct SessionManager {
    bridge: Arc<RpcBridge>,
}

impl SessionManager {
    pub fn new(bridge: Arc<RpcBridge>) -> Self {
        Self { bridge }
    }

    /// Start the host on its own thread and return a manager for it.
    pub fn start(host: Box<dyn ModuleHost>, config: SessionConfig) -> std::io::Result<Self> {
        Ok(Self::new(Arc::new(RpcBridge::start(host, config)?)))
    }

    pub fn bridge(&self) -> &Arc<RpcBridge> {
        &self.bridge
    }

    pub fn state(&self) -> SessionState {
        self.bridge.snapshot().state
    }

    /// Idempotent: launches the session on first use, returns immediately
    /// once it is ready.
    pub async fn ensure_ready(&self) -> BridgeResult<ModuleSource> {
        let snapshot = self.bridge.snapshot();
        if let (SessionState::Ready, Some(source)) = (&snapshot.state, snapshot.source) {
            return Ok(source);
        }
        self.bridge.initialize().await
    }

    /// Lifecycle state plus the module's own readiness report.
    pub async fn status(&self) -> BridgeResult<SessionStatus> {
        let snapshot = self.bridge.snapshot();
        let module = if snapshot.state.is_ready() {
            let value = self.bridge.invoke(RpcCall::ModuleStatus).await?;
            let status: ModuleStatus = serde_json::from_value(value).map_err(|e| {
                BridgeError::Protocol(format!("checkWasmStatus returned an invalid status: {}", e))
            })?;
            Some(status)
        } else {
            None
        };

        Ok(SessionStatus {
            state: snapshot.state,
            source: snapshot.source,
            module,
        })
    }

    /// Release the host process. Queued calls are abandoned.
    pub async fn shutdown(&self) {
        self.bridge.close().await;
    }
}
