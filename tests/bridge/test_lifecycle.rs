// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Session lifecycle: launch, module wait, terminal failures

use channels_decrypt_node::{
    session::{ModuleSource, SessionState},
    BridgeError,
};
use std::time::{Duration, Instant};

use crate::common::{start_session, HostScript};

#[tokio::test]
async fn test_ensure_ready_reaches_ready_once() {
    let (session, probe) = start_session(HostScript::default());
    assert_eq!(session.state(), SessionState::Uninitialized);

    let source = session.ensure_ready().await.unwrap();
    assert_eq!(source, ModuleSource::Local);
    assert_eq!(session.state(), SessionState::Ready);

    // Idempotent: no second launch
    assert_eq!(session.ensure_ready().await.unwrap(), ModuleSource::Local);
    assert_eq!(probe.launches(), 1);
}

#[tokio::test]
async fn test_concurrent_ensure_ready_launches_once() {
    let (session, probe) = start_session(HostScript::default());

    let results = futures::future::join_all((0..5).map(|_| session.ensure_ready())).await;
    assert!(results.iter().all(|r| r.is_ok()));
    assert_eq!(probe.launches(), 1);
}

#[tokio::test]
async fn test_cdn_source_is_recorded() {
    let (session, _probe) = start_session(HostScript {
        cdn: true,
        ..HostScript::default()
    });

    assert_eq!(session.ensure_ready().await.unwrap(), ModuleSource::Cdn);
    let status = session.status().await.unwrap();
    assert_eq!(status.source, Some(ModuleSource::Cdn));
}

#[tokio::test]
async fn test_launch_failure_is_terminal() {
    let (session, probe) = start_session(HostScript {
        fail_launch: true,
        ..HostScript::default()
    });

    let err = session.ensure_ready().await.unwrap_err();
    assert!(matches!(err, BridgeError::Launch(_)));
    assert!(err.to_string().contains("binary not found"));
    assert!(matches!(session.state(), SessionState::Failed(_)));
    assert!(probe.closes() >= 1);

    // No retry
    let again = session.ensure_ready().await.unwrap_err();
    assert!(matches!(again, BridgeError::NotReady { .. }));
    assert_eq!(probe.launches(), 1);
}

#[tokio::test]
async fn test_module_load_timeout_is_terminal() {
    let (session, probe) = start_session(HostScript {
        never_ready: true,
        ..HostScript::default()
    });

    let err = session.ensure_ready().await.unwrap_err();
    assert!(matches!(err, BridgeError::ModuleLoadTimeout { .. }));
    assert_eq!(
        session.state(),
        SessionState::Failed("module load timeout".to_string())
    );
    assert!(probe.closes() >= 1);

    let again = session.ensure_ready().await.unwrap_err();
    assert!(again.to_string().contains("module load timeout"));
    assert_eq!(probe.launches(), 1);
}

#[tokio::test]
async fn test_stalled_probe_cannot_outlast_load_timeout() {
    let (session, probe) = start_session(HostScript {
        probe_stall: Duration::from_secs(30),
        ..HostScript::default()
    });

    let started = Instant::now();
    let err = session.ensure_ready().await.unwrap_err();
    assert!(matches!(err, BridgeError::ModuleLoadTimeout { .. }));
    // Load timeout is 200ms in the test config
    assert!(started.elapsed() < Duration::from_secs(2));

    let timeouts = probe.timeouts();
    assert!(!timeouts.is_empty());
    assert!(timeouts
        .iter()
        .all(|t| *t <= Duration::from_millis(200)));

    // Shutdown is not stuck behind the failed initialization
    tokio::time::timeout(Duration::from_secs(2), session.shutdown())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_failed_session_releases_host_once() {
    let (session, probe) = start_session(HostScript {
        fail_launch: true,
        ..HostScript::default()
    });

    session.ensure_ready().await.unwrap_err();
    assert_eq!(probe.closes(), 1);

    session.shutdown().await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(probe.closes(), 1);
    assert!(matches!(session.state(), SessionState::Failed(_)));
}

#[tokio::test]
async fn test_status_before_and_after_ready() {
    let (session, _probe) = start_session(HostScript::default());

    let before = session.status().await.unwrap();
    assert_eq!(before.state, SessionState::Uninitialized);
    assert!(before.module.is_none());
    assert!(!before.module_loaded());

    session.ensure_ready().await.unwrap();
    let after = session.status().await.unwrap();
    assert_eq!(after.state, SessionState::Ready);
    assert!(after.module_loaded());
    let module = after.module.unwrap();
    assert_eq!(module.details["module"], serde_json::json!("scripted"));
}

#[tokio::test]
async fn test_subscribers_observe_ready() {
    let (session, _probe) = start_session(HostScript::default());
    let mut updates = session.bridge().subscribe();

    session.ensure_ready().await.unwrap();
    updates
        .wait_for(|snapshot| snapshot.state.is_ready())
        .await
        .unwrap();
    assert_eq!(updates.borrow().source, Some(ModuleSource::Local));
}
