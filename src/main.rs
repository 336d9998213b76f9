// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Result};
use channels_decrypt_node::{
    api::{ApiServer, AppState},
    config::ServiceConfig,
    node::DecryptNode,
    session::ChromeModuleHost,
    version,
};
use clap::Parser;
use std::{env, path::PathBuf, sync::Arc};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

/// Channels video decryption node
#[derive(Parser, Debug)]
#[command(name = "channels-decrypt-node")]
#[command(version = version::VERSION_NUMBER)]
#[command(about = "HTTP bridge to the Channels video decryption module", long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Harness page served at /worker.html
    #[arg(long, env = "WORKER_HTML")]
    worker_html: Option<PathBuf>,

    /// Module assets served under /wechat_files
    #[arg(long, env = "ASSETS_DIR")]
    assets_dir: Option<PathBuf>,

    /// Load the harness from this URL instead of this node
    #[arg(long, env = "HARNESS_URL")]
    harness_url: Option<String>,

    /// Chromium binary
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<PathBuf>,

    /// Start the session on first request instead of at startup
    #[arg(long)]
    lazy: bool,
}

impl Args {
    fn apply(self, config: &mut ServiceConfig) {
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(path) = self.worker_html {
            config.worker_html = path;
        }
        if let Some(dir) = self.assets_dir {
            config.assets_dir = dir;
        }
        if self.harness_url.is_some() {
            config.harness_url = self.harness_url;
        }
        if self.chrome_path.is_some() {
            config.chrome_path = self.chrome_path;
        }
        if self.lazy {
            config.eager_init = false;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    info!("🚀 Starting {}", version::SERVICE_NAME);
    info!("📦 BUILD VERSION: {}", version::VERSION);

    let mut config = ServiceConfig::from_env();
    Args::parse().apply(&mut config);
    config.validate().map_err(|e| anyhow!(e))?;
    let addr = config.listen_addr().map_err(|e| anyhow!(e))?;

    // The harness is loaded from this server, so listen before launching
    let listener = TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();

    let session_config = config.session_config(port);
    info!("   Harness URL: {}", session_config.harness_url);
    let node = DecryptNode::start(
        Box::new(ChromeModuleHost::new(config.chrome_options())),
        session_config,
    )?;

    let state = Arc::new(AppState::new(node.clone(), &config));
    let mut server = ApiServer::start(listener, state)?;

    if config.eager_init {
        match node.session().ensure_ready().await {
            Ok(source) => info!("✅ Module ready ({})", source.describe()),
            Err(e) => {
                error!("❌ Startup failed: {}", e);
                server.shutdown(config.shutdown_grace()).await;
                node.session().shutdown().await;
                std::process::exit(1);
            }
        }
    } else {
        info!("Lazy start: the module loads on the first request");
    }

    info!("📋 Endpoints:");
    info!("   GET  http://{}/health", server.local_addr());
    info!("   GET  http://{}/api/info", server.local_addr());
    info!("   POST http://{}/api/keystream", server.local_addr());
    info!("   POST http://{}/api/decrypt", server.local_addr());

    shutdown_signal().await;

    info!("🛑 Shutting down...");
    server.shutdown(config.shutdown_grace()).await;
    node.session().shutdown().await;
    info!("👋 Goodbye");
    Ok(())
}
