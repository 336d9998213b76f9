// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Host process abstraction for the execution session

use std::time::Duration;

use crate::rpc::schema::RpcCall;
use crate::session::ModuleSource;

/// A sandboxed process able to load the module harness and run calls in it.
///
/// Implementations are driven from a single dedicated thread, so methods
/// take `&mut self` and may block. The production implementation is
/// [`ChromeModuleHost`](crate::session::chrome::ChromeModuleHost).
pub trait ModuleHost: Send + 'static {
    /// Start the host process and load the harness page at `harness_url`.
    /// Page loading must give up once `timeout` has passed.
    fn launch(&mut self, harness_url: &str, timeout: Duration) -> anyhow::Result<()>;

    /// Poll whether the module entry symbols are callable yet, answering
    /// within `timeout` even when the page is unresponsive.
    fn entry_points_ready(&mut self, timeout: Duration) -> anyhow::Result<bool>;

    /// Where the harness loaded the module from.
    fn module_source(&mut self) -> anyhow::Result<ModuleSource>;

    /// Run one call and return the raw reply envelope text.
    fn execute(&mut self, call: &RpcCall) -> anyhow::Result<String>;

    /// Release the host process. Must be safe to call more than once.
    fn close(&mut self);
}
