// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! RPC bridge into the execution session
//!
//! The bridge is the only path into the hosted module. It owns the
//! execution session on a dedicated OS thread and feeds it from a single
//! unbounded FIFO queue, so calls run one at a time in submission order.
//! Async callers enqueue a job and await its oneshot reply.

pub mod schema;

use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

use crate::errors::{BridgeError, BridgeResult};
use crate::session::{
    ExecutionSession, ModuleHost, ModuleSource, SessionConfig, SessionSnapshot,
};
use schema::{ReplyEnvelope, RpcCall};

enum Job {
    Initialize {
        reply: oneshot::Sender<BridgeResult<ModuleSource>>,
    },
    Invoke {
        seq: u64,
        call: RpcCall,
        reply: oneshot::Sender<BridgeResult<String>>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

pub struct RpcBridge {
    jobs: mpsc::UnboundedSender<Job>,
    snapshot: watch::Receiver<SessionSnapshot>,
    closing: Arc<AtomicBool>,
    next_seq: AtomicU64,
}

impl RpcBridge {
    /// Spawn the host thread that owns the session.
    pub fn start(host: Box<dyn ModuleHost>, config: SessionConfig) -> std::io::Result<Self> {
        let (session, snapshot) = ExecutionSession::new(host, config);
        let (jobs, queue) = mpsc::unbounded_channel();
        let closing = Arc::new(AtomicBool::new(false));

        let worker_closing = closing.clone();
        thread::Builder::new()
            .name("module-host".to_string())
            .spawn(move || run_queue(session, queue, worker_closing))?;

        Ok(Self {
            jobs,
            snapshot,
            closing,
            next_seq: AtomicU64::new(0),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Run `call` in the module once every earlier call has returned.
    ///
    /// Fails immediately with `NotReady` unless the session is ready; it
    /// never waits for initialization.
    pub async fn invoke(&self, call: RpcCall) -> BridgeResult<Value> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(BridgeError::SessionClosed);
        }

        let state = self.snapshot.borrow().state.clone();
        if !state.is_ready() {
            return Err(BridgeError::NotReady {
                state: state.to_string(),
            });
        }

        let function = call.function();
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let (reply, answer) = oneshot::channel();
        self.jobs
            .send(Job::Invoke { seq, call, reply })
            .map_err(|_| BridgeError::SessionClosed)?;

        let raw = answer.await.map_err(|_| BridgeError::SessionClosed)??;
        ReplyEnvelope::decode(function, &raw)
    }

    pub(crate) async fn initialize(&self) -> BridgeResult<ModuleSource> {
        if self.closing.load(Ordering::SeqCst) {
            return Err(BridgeError::SessionClosed);
        }

        let (reply, answer) = oneshot::channel();
        self.jobs
            .send(Job::Initialize { reply })
            .map_err(|_| BridgeError::SessionClosed)?;
        answer.await.map_err(|_| BridgeError::SessionClosed)?
    }

    /// Stop accepting calls, drop queued ones and release the session.
    /// Waits only for the call currently executing, if any.
    pub(crate) async fn close(&self) {
        if self.closing.swap(true, Ordering::SeqCst) {
            return;
        }

        info!("Closing RPC bridge");
        let (reply, done) = oneshot::channel();
        if self.jobs.send(Job::Shutdown { reply }).is_ok() {
            let _ = done.await;
        }
    }
}

fn run_queue(
    mut session: ExecutionSession,
    mut queue: mpsc::UnboundedReceiver<Job>,
    closing: Arc<AtomicBool>,
) {
    while let Some(job) = queue.blocking_recv() {
        match job {
            Job::Shutdown { reply } => {
                session.close();
                let _ = reply.send(());
                break;
            }
            Job::Initialize { reply } => {
                if closing.load(Ordering::SeqCst) {
                    let _ = reply.send(Err(BridgeError::SessionClosed));
                    continue;
                }
                let _ = reply.send(session.initialize());
            }
            Job::Invoke { seq, call, reply } => {
                if closing.load(Ordering::SeqCst) {
                    let _ = reply.send(Err(BridgeError::SessionClosed));
                    continue;
                }
                if reply.is_closed() {
                    debug!("Skipping call #{} ({}): caller went away", seq, call.function());
                    continue;
                }

                debug!("Running call #{} ({})", seq, call.function());
                let _ = reply.send(session.call(&call));
            }
        }
    }

    debug!("Module host queue stopped");
}
