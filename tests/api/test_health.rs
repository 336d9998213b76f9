// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! GET /health

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use channels_decrypt_node::api::{create_app, AppState};
use serde_json::Value;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

use crate::common::{start_node, HostScript};

async fn get_health(script: HostScript) -> (StatusCode, Value) {
    let (node, _probe) = start_node(script);
    let app = create_app(Arc::new(AppState::with_node(node)));

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_health_initializes_and_reports_module() {
    let (status, body) = get_health(HostScript {
        cdn: true,
        ..HostScript::default()
    })
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "wechat-decrypt-api");
    assert_eq!(body["version"], "2.0.0");
    assert_eq!(body["wasm"]["loaded"], true);
    assert_eq!(body["wasm"]["source"], "cdn");
    assert_eq!(body["wasm"]["state"], "ready");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_health_reports_launch_failure() {
    let (status, body) = get_health(HostScript {
        fail_launch: true,
        ..HostScript::default()
    })
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], "error");
    assert!(body["error"].as_str().unwrap().contains("launch"));
}

#[tokio::test]
async fn test_health_reports_module_timeout() {
    let (status, body) = get_health(HostScript {
        never_ready: true,
        ..HostScript::default()
    })
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("not callable"));
}
