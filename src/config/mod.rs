// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::{ChromeOptions, SessionConfig};

/// 500 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 500 * 1024 * 1024;

/// 100 MiB
pub const DEFAULT_JSON_BODY_LIMIT_BYTES: usize = 100 * 1024 * 1024;

/// Configuration for the decryption node
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Interface the HTTP server binds to
    pub host: String,
    /// HTTP port
    pub port: u16,
    /// Harness page served at `/worker.html`
    pub worker_html: PathBuf,
    /// Directory served under `/wechat_files`
    pub assets_dir: PathBuf,
    /// Harness URL override; defaults to this node's own `/worker.html`
    pub harness_url: Option<String>,
    /// Chromium binary, auto-detected when unset
    pub chrome_path: Option<PathBuf>,
    /// Run Chromium without a window
    pub chrome_headless: bool,
    /// Seconds to wait for module entry points
    pub module_load_timeout_secs: u64,
    /// Milliseconds between entry point probes
    pub module_poll_interval_ms: u64,
    /// DevTools deadline for a single module call, in seconds
    pub call_timeout_secs: u64,
    /// Largest accepted video upload
    pub max_upload_bytes: usize,
    /// Largest accepted JSON body
    pub json_body_limit_bytes: usize,
    /// Bring the session up before serving traffic
    pub eager_init: bool,
    /// Seconds to wait for in-flight HTTP requests on shutdown
    pub shutdown_grace_secs: u64,
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| !matches!(v.trim().to_lowercase().as_str(), "false" | "0" | "no" | "off"))
        .unwrap_or(default)
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT", defaults.port),
            worker_html: env::var("WORKER_HTML")
                .map(PathBuf::from)
                .unwrap_or(defaults.worker_html),
            assets_dir: env::var("ASSETS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.assets_dir),
            harness_url: env::var("HARNESS_URL").ok().filter(|v| !v.is_empty()),
            chrome_path: env::var("CHROME_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            chrome_headless: env_flag("CHROME_HEADLESS", defaults.chrome_headless),
            module_load_timeout_secs: env_parse(
                "MODULE_LOAD_TIMEOUT_SECS",
                defaults.module_load_timeout_secs,
            ),
            module_poll_interval_ms: env_parse(
                "MODULE_POLL_INTERVAL_MS",
                defaults.module_poll_interval_ms,
            ),
            call_timeout_secs: env_parse("CALL_TIMEOUT_SECS", defaults.call_timeout_secs),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", defaults.max_upload_bytes),
            json_body_limit_bytes: env_parse(
                "JSON_BODY_LIMIT_BYTES",
                defaults.json_body_limit_bytes,
            ),
            eager_init: env_flag("EAGER_INIT", defaults.eager_init),
            shutdown_grace_secs: env_parse("SHUTDOWN_GRACE_SECS", defaults.shutdown_grace_secs),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.module_load_timeout_secs == 0 {
            return Err("Module load timeout must be greater than 0".to_string());
        }
        if self.module_poll_interval_ms == 0 {
            return Err("Module poll interval must be greater than 0".to_string());
        }
        if self.call_timeout_secs == 0 {
            return Err("Call timeout must be greater than 0".to_string());
        }
        if self.max_upload_bytes == 0 {
            return Err("Max upload size must be greater than 0".to_string());
        }
        if self.json_body_limit_bytes == 0 {
            return Err("JSON body limit must be greater than 0".to_string());
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| format!("Invalid listen address {}:{}: {}", self.host, self.port, e))
    }

    /// Harness URL for a server bound to `port`
    pub fn harness_url_for(&self, port: u16) -> String {
        self.harness_url
            .clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}/worker.html", port))
    }

    pub fn session_config(&self, port: u16) -> SessionConfig {
        SessionConfig {
            harness_url: self.harness_url_for(port),
            load_timeout: Duration::from_secs(self.module_load_timeout_secs),
            poll_interval: Duration::from_millis(self.module_poll_interval_ms),
        }
    }

    pub fn chrome_options(&self) -> ChromeOptions {
        ChromeOptions {
            chrome_path: self.chrome_path.clone(),
            headless: self.chrome_headless,
            call_timeout: Duration::from_secs(self.call_timeout_secs),
            ..ChromeOptions::default()
        }
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8010,
            worker_html: PathBuf::from("worker.html"),
            assets_dir: PathBuf::from("wechat_files"),
            harness_url: None,
            chrome_path: None,
            chrome_headless: true,
            module_load_timeout_secs: 60,
            module_poll_interval_ms: 250,
            call_timeout_secs: 30 * 60,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            json_body_limit_bytes: DEFAULT_JSON_BODY_LIMIT_BYTES,
            eager_init: true,
            shutdown_grace_secs: 10,
        }
    }
}
