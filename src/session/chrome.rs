// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Chromium-backed module host
//!
//! Launches a headless Chromium, opens the harness page and evaluates calls
//! in it over the DevTools protocol. The vendor module only runs inside a
//! browser page, so this is the production host.

use anyhow::{anyhow, Context, Result};
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::host::ModuleHost;
use super::ModuleSource;
use crate::rpc::schema::{RpcCall, CDN_SOURCE_PROBE, ENTRY_POINTS_PROBE};

/// Browser launch settings
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    /// Explicit Chromium binary, auto-detected when `None`
    pub chrome_path: Option<PathBuf>,
    /// Launch without a window
    pub headless: bool,
    /// Deadline for a single module call
    pub call_timeout: Duration,
    /// How long the browser connection may stay idle before it is dropped
    pub idle_timeout: Duration,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            call_timeout: Duration::from_secs(30 * 60),
            idle_timeout: Duration::from_secs(60 * 60 * 24 * 365),
        }
    }
}

pub struct ChromeModuleHost {
    options: ChromeOptions,
    browser: Option<Browser>,
    tab: Option<Arc<Tab>>,
}

impl ChromeModuleHost {
    pub fn new(options: ChromeOptions) -> Self {
        Self {
            options,
            browser: None,
            tab: None,
        }
    }

    fn tab(&self) -> Result<&Arc<Tab>> {
        self.tab
            .as_ref()
            .ok_or_else(|| anyhow!("harness page is not open"))
    }

    /// Evaluate `expression` in the harness, giving up after `timeout`.
    fn evaluate(
        &self,
        what: &str,
        expression: String,
        await_promise: bool,
        timeout: Duration,
    ) -> Result<Option<Value>> {
        let tab = Arc::clone(self.tab()?);
        run_within(what, timeout, move || {
            Ok(tab.evaluate(&expression, await_promise)?.value)
        })
    }

    fn evaluate_bool(&self, expression: &str, timeout: Duration) -> Result<bool> {
        let value = self.evaluate("probe", expression.to_string(), false, timeout)?;
        Ok(matches!(value, Some(Value::Bool(true))))
    }
}

/// Run a blocking DevTools exchange on a helper thread and stop waiting for
/// it after `timeout`.
///
/// The transport itself only gives up after the browser idle timeout, so a
/// page whose main thread is stuck would otherwise hold the host thread. An
/// abandoned exchange fails once the browser is closed.
fn run_within<T, F>(what: &str, timeout: Duration, work: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    thread::Builder::new()
        .name("cdp-call".to_string())
        .spawn(move || {
            let _ = tx.send(work());
        })
        .with_context(|| format!("could not start {}", what))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("{} did not answer within {}ms", what, timeout.as_millis());
            Err(anyhow!(
                "{} did not answer within {}ms",
                what,
                timeout.as_millis()
            ))
        }
        Err(RecvTimeoutError::Disconnected) => Err(anyhow!("{} was aborted", what)),
    }
}

impl ModuleHost for ChromeModuleHost {
    fn launch(&mut self, harness_url: &str, timeout: Duration) -> Result<()> {
        info!(
            "🚀 Launching Chromium ({})",
            if self.options.headless {
                "headless"
            } else {
                "headful"
            }
        );

        let options = LaunchOptions::default_builder()
            .headless(self.options.headless)
            .sandbox(false)
            .path(self.options.chrome_path.clone())
            .idle_browser_timeout(self.options.idle_timeout)
            .build()?;

        let browser = Browser::new(options).context("could not start chromium")?;
        let tab = browser.new_tab().context("could not open a tab")?;

        info!("Loading module harness from {}", harness_url);
        let loading = Arc::clone(&tab);
        let url = harness_url.to_string();
        run_within("harness page load", timeout, move || {
            loading.set_default_timeout(timeout);
            loading
                .navigate_to(&url)
                .with_context(|| format!("could not navigate to {}", url))?
                .wait_until_navigated()
                .context("harness page did not finish loading")?;
            Ok(())
        })?;
        tab.set_default_timeout(self.options.call_timeout);

        self.browser = Some(browser);
        self.tab = Some(tab);
        Ok(())
    }

    fn entry_points_ready(&mut self, timeout: Duration) -> Result<bool> {
        self.evaluate_bool(ENTRY_POINTS_PROBE, timeout)
    }

    fn module_source(&mut self) -> Result<ModuleSource> {
        if self.evaluate_bool(CDN_SOURCE_PROBE, self.options.call_timeout)? {
            Ok(ModuleSource::Cdn)
        } else {
            Ok(ModuleSource::Local)
        }
    }

    fn execute(&mut self, call: &RpcCall) -> Result<String> {
        debug!(
            "Evaluating {} in harness ({} argument bytes)",
            call.function(),
            call.payload_len()
        );
        let value = self.evaluate(
            call.function(),
            call.to_expression(),
            true,
            self.options.call_timeout,
        )?;

        match value {
            Some(Value::String(envelope)) => Ok(envelope),
            other => Err(anyhow!(
                "{} wrapper evaluated to {:?} instead of an envelope string",
                call.function(),
                other
            )),
        }
    }

    fn close(&mut self) {
        self.tab = None;
        if self.browser.take().is_some() {
            info!("👋 Chromium closed");
        }
    }
}

impl Drop for ChromeModuleHost {
    fn drop(&mut self) {
        self.close();
    }
}
