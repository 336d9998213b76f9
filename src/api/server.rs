// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::decrypt::decrypt_handler;
use super::handlers::{health_handler, info_handler, not_found_handler};
use super::keystream::keystream_handler;
use crate::config::{ServiceConfig, DEFAULT_JSON_BODY_LIMIT_BYTES, DEFAULT_MAX_UPLOAD_BYTES};
use crate::node::DecryptNode;

/// Request size limits enforced by the API
#[derive(Debug, Clone)]
pub struct ApiLimits {
    pub max_upload_bytes: usize,
    pub json_body_limit_bytes: usize,
}

impl Default for ApiLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            json_body_limit_bytes: DEFAULT_JSON_BODY_LIMIT_BYTES,
        }
    }
}

/// Shared state handed to every handler
pub struct AppState {
    pub node: DecryptNode,
    pub limits: ApiLimits,
    /// Harness page served at `/worker.html`
    pub worker_html: PathBuf,
    /// Module assets served under `/wechat_files`
    pub assets_dir: PathBuf,
}

impl AppState {
    pub fn new(node: DecryptNode, config: &ServiceConfig) -> Self {
        Self {
            node,
            limits: ApiLimits {
                max_upload_bytes: config.max_upload_bytes,
                json_body_limit_bytes: config.json_body_limit_bytes,
            },
            worker_html: config.worker_html.clone(),
            assets_dir: config.assets_dir.clone(),
        }
    }

    /// State with default limits and asset locations
    pub fn with_node(node: DecryptNode) -> Self {
        Self::new(node, &ServiceConfig::default())
    }

    pub fn with_limits(mut self, limits: ApiLimits) -> Self {
        self.limits = limits;
        self
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let json_limit = state.limits.json_body_limit_bytes;

    Router::new()
        .route("/", get(info_handler))
        .route("/health", get(health_handler))
        .route("/api/info", get(info_handler))
        .route(
            "/api/keystream",
            post(keystream_handler).layer(DefaultBodyLimit::max(json_limit)),
        )
        // Upload size is enforced while streaming the multipart body
        .route(
            "/api/decrypt",
            post(decrypt_handler).layer(DefaultBodyLimit::disable()),
        )
        .route_service("/worker.html", ServeFile::new(&state.worker_html))
        .nest_service("/wechat_files", ServeDir::new(&state.assets_dir))
        .fallback(not_found_handler)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// HTTP server running in a background task
pub struct ApiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl ApiServer {
    /// Serve `state` on an already bound listener.
    ///
    /// The listener is bound by the caller so the harness URL, which points
    /// back at this server, is known before the session launches.
    pub fn start(listener: TcpListener, state: Arc<AppState>) -> std::io::Result<Self> {
        let addr = listener.local_addr()?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = create_app(state);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        info!("🌐 HTTP server listening on http://{}", addr);
        Ok(Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait up to `grace` for open ones.
    pub async fn shutdown(&mut self, grace: Duration) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.handle.take() {
            match tokio::time::timeout(grace, handle).await {
                Ok(Ok(Ok(()))) => info!("HTTP server stopped"),
                Ok(Ok(Err(e))) => warn!("HTTP server error: {}", e),
                Ok(Err(e)) => warn!("HTTP server task failed: {}", e),
                Err(_) => warn!(
                    "HTTP server still draining after {}s, abandoning open connections",
                    grace.as_secs()
                ),
            }
        }
    }
}
