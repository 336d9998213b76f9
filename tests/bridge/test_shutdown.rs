// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shutdown releases the host and abandons queued calls

use channels_decrypt_node::{rpc::schema::RpcCall, session::SessionState, BridgeError};
use std::time::Duration;

use crate::common::{start_session, HostScript};

#[tokio::test]
async fn test_shutdown_closes_ready_session() {
    let (session, probe) = start_session(HostScript::default());
    session.ensure_ready().await.unwrap();

    session.shutdown().await;
    assert_eq!(session.state(), SessionState::Closed);
    assert!(probe.closes() >= 1);

    let err = session
        .bridge()
        .invoke(RpcCall::ModuleStatus)
        .await
        .unwrap_err();
    assert_eq!(err, BridgeError::SessionClosed);
    assert_eq!(
        session.ensure_ready().await.unwrap_err(),
        BridgeError::SessionClosed
    );

    // Second shutdown is a no-op
    session.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_before_launch() {
    let (session, probe) = start_session(HostScript::default());
    session.shutdown().await;

    assert_eq!(session.state(), SessionState::Closed);
    assert_eq!(probe.launches(), 0);
}

#[tokio::test]
async fn test_shutdown_keeps_failed_state() {
    let (session, _probe) = start_session(HostScript {
        fail_launch: true,
        ..HostScript::default()
    });
    assert!(session.ensure_ready().await.is_err());

    session.shutdown().await;
    assert!(matches!(session.state(), SessionState::Failed(_)));
}

#[tokio::test]
async fn test_queued_calls_are_abandoned() {
    let (session, probe) = start_session(HostScript {
        call_delay: Duration::from_millis(150),
        ..HostScript::default()
    });
    session.ensure_ready().await.unwrap();

    let bridge = session.bridge().clone();
    let pending = tokio::spawn(async move {
        futures::future::join_all((0..3).map(|_| bridge.invoke(RpcCall::ModuleStatus))).await
    });

    // Let the first call reach the module
    tokio::time::sleep(Duration::from_millis(40)).await;
    session.shutdown().await;

    let results = pending.await.unwrap();
    assert!(results[0].is_ok());
    assert_eq!(results[1], Err(BridgeError::SessionClosed));
    assert_eq!(results[2], Err(BridgeError::SessionClosed));
    assert_eq!(probe.calls().len(), 1);
}
