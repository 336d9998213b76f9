// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Shared fixtures: a scripted module host that stands in for Chromium and
//! the vendor module, plus sample media and multipart helpers.
#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use channels_decrypt_node::{
    decrypt::xor_prefix,
    keystream::{fixed::derive_keystream, KEYSTREAM_LEN},
    node::DecryptNode,
    rpc::schema::{ReplyEnvelope, RpcCall},
    session::{ModuleHost, ModuleSource, SessionConfig, SessionManager},
};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Key material that makes the scripted module throw
pub const THROWING_KEY: &str = "module-throws";

/// Behaviour of a [`ScriptedHost`]
#[derive(Debug, Clone)]
pub struct HostScript {
    pub fail_launch: bool,
    pub never_ready: bool,
    /// Entry point probes answered `false` before the module reports ready
    pub probes_before_ready: usize,
    pub cdn: bool,
    /// Bytes of keystream the module returns
    pub keystream_len: usize,
    /// Time every call spends in the module
    pub call_delay: Duration,
    /// Drop this many bytes from every decrypt answer
    pub truncate_decrypt: usize,
    /// Time an entry point probe hangs, as a page with a busy main thread
    /// would. Bounded by the probe timeout like the real host.
    pub probe_stall: Duration,
}

impl Default for HostScript {
    fn default() -> Self {
        Self {
            fail_launch: false,
            never_ready: false,
            probes_before_ready: 2,
            cdn: false,
            keystream_len: KEYSTREAM_LEN,
            call_delay: Duration::ZERO,
            truncate_decrypt: 0,
            probe_stall: Duration::ZERO,
        }
    }
}

/// Counters shared between a test and its host
#[derive(Debug, Default)]
pub struct HostProbe {
    pub launches: AtomicUsize,
    pub probes: AtomicUsize,
    pub closes: AtomicUsize,
    /// Timeout handed to each launch and entry point probe, in order
    pub timeouts: Mutex<Vec<Duration>>,
    /// `function(first argument)` for every executed call, in order
    pub calls: Mutex<Vec<String>>,
}

impl HostProbe {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().unwrap().clone()
    }
}

pub struct ScriptedHost {
    script: HostScript,
    probe: Arc<HostProbe>,
    launched: bool,
}

impl ScriptedHost {
    pub fn new(script: HostScript) -> (Self, Arc<HostProbe>) {
        let probe = Arc::new(HostProbe::default());
        (
            Self {
                script,
                probe: probe.clone(),
                launched: false,
            },
            probe,
        )
    }

    fn answer(&self, call: &RpcCall) -> Result<ReplyEnvelope> {
        Ok(match call {
            RpcCall::ModuleStatus => ReplyEnvelope::ok(json!({
                "loaded": true,
                "module": "scripted",
            })),
            RpcCall::GenerateKeystream { key_material } => {
                if key_material == THROWING_KEY {
                    return Ok(ReplyEnvelope::error("WxIsaac64 aborted"));
                }
                let mut keystream = derive_keystream(key_material);
                keystream.resize(self.script.keystream_len, 0);
                ReplyEnvelope::ok(STANDARD.encode(keystream))
            }
            RpcCall::DecryptVideo {
                encrypted_b64,
                keystream_b64,
            } => {
                let mut data = STANDARD.decode(encrypted_b64)?;
                let keystream = STANDARD.decode(keystream_b64)?;
                xor_prefix(&mut data, &keystream);
                let keep = data.len().saturating_sub(self.script.truncate_decrypt);
                data.truncate(keep);
                ReplyEnvelope::ok(STANDARD.encode(data))
            }
        })
    }
}

impl ModuleHost for ScriptedHost {
    fn launch(&mut self, _harness_url: &str, timeout: Duration) -> Result<()> {
        self.probe.launches.fetch_add(1, Ordering::SeqCst);
        self.probe.timeouts.lock().unwrap().push(timeout);
        if self.script.fail_launch {
            bail!("could not start chromium: binary not found");
        }
        self.launched = true;
        Ok(())
    }

    fn entry_points_ready(&mut self, timeout: Duration) -> Result<bool> {
        if !self.launched {
            return Err(anyhow!("not launched"));
        }
        self.probe.timeouts.lock().unwrap().push(timeout);
        let seen = self.probe.probes.fetch_add(1, Ordering::SeqCst);

        if !self.script.probe_stall.is_zero() {
            std::thread::sleep(self.script.probe_stall.min(timeout));
            if self.script.probe_stall > timeout {
                bail!("probe did not answer within {}ms", timeout.as_millis());
            }
        }
        Ok(!self.script.never_ready && seen >= self.script.probes_before_ready)
    }

    fn module_source(&mut self) -> Result<ModuleSource> {
        Ok(if self.script.cdn {
            ModuleSource::Cdn
        } else {
            ModuleSource::Local
        })
    }

    fn execute(&mut self, call: &RpcCall) -> Result<String> {
        if !self.launched {
            bail!("host is not running");
        }
        let label = match call.args().first() {
            Some(arg) if arg.len() <= 64 => format!("{}({})", call.function(), arg),
            Some(_) => format!("{}(..)", call.function()),
            None => format!("{}()", call.function()),
        };
        self.probe.calls.lock().unwrap().push(label);

        if !self.script.call_delay.is_zero() {
            std::thread::sleep(self.script.call_delay);
        }
        Ok(self.answer(call)?.to_json())
    }

    fn close(&mut self) {
        if self.launched {
            self.launched = false;
        }
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Session timings short enough for tests
pub fn fast_session_config() -> SessionConfig {
    SessionConfig {
        harness_url: "http://127.0.0.1:0/worker.html".to_string(),
        load_timeout: Duration::from_millis(200),
        poll_interval: Duration::from_millis(5),
    }
}

pub fn start_session(script: HostScript) -> (SessionManager, Arc<HostProbe>) {
    let (host, probe) = ScriptedHost::new(script);
    let session = SessionManager::start(Box::new(host), fast_session_config()).unwrap();
    (session, probe)
}

/// Node whose keystream and decryption run through the scripted module
pub fn start_node(script: HostScript) -> (DecryptNode, Arc<HostProbe>) {
    let (host, probe) = ScriptedHost::new(script);
    let node = DecryptNode::start(Box::new(host), fast_session_config()).unwrap();
    (node, probe)
}

/// Bytes shaped like the start of an MP4: a `ftyp` box followed by filler
pub fn sample_mp4(len: usize) -> Vec<u8> {
    assert!(len >= 16);
    let mut data = vec![0u8; len];
    data[0..4].copy_from_slice(&[0x00, 0x00, 0x00, 0x20]);
    data[4..8].copy_from_slice(b"ftyp");
    data[8..12].copy_from_slice(b"isom");
    for (i, byte) in data.iter_mut().enumerate().skip(12) {
        *byte = (i.wrapping_mul(31) % 251) as u8;
    }
    data
}

/// Encrypt `plain` the way the platform does for `key`
pub fn encrypt(plain: &[u8], key: &str) -> Vec<u8> {
    let mut data = plain.to_vec();
    xor_prefix(&mut data, &derive_keystream(key));
    data
}

pub const BOUNDARY: &str = "X-CHANNELS-TEST-BOUNDARY";

/// One multipart field: name, optional file name, content
pub struct Part<'a> {
    pub name: &'a str,
    pub file_name: Option<&'a str>,
    pub data: &'a [u8],
}

impl<'a> Part<'a> {
    pub fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            data: value.as_bytes(),
        }
    }

    pub fn file(name: &'a str, file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            data,
        }
    }
}

/// Encode `parts` as a `multipart/form-data` body delimited by [`BOUNDARY`]
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: application/octet-stream\r\n\r\n",
                    part.name, file_name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name)
                    .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
