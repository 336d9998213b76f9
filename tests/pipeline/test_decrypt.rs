// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Full decryption pipeline with the in-process doubles and through the
//! scripted module

use async_trait::async_trait;
use bytes::Bytes;
use channels_decrypt_node::{
    decrypt::{DecryptionEngine, DecryptionPipeline, XorDecryptionEngine},
    keystream::{FixedKeystreamProvider, KeyMaterial, Keystream, KeystreamService},
    BridgeError, BridgeResult,
};
use std::sync::Arc;

use crate::common::{encrypt, sample_mp4, start_node, HostScript};

fn local_pipeline() -> DecryptionPipeline {
    DecryptionPipeline::new(
        KeystreamService::new(Arc::new(FixedKeystreamProvider::new())),
        Arc::new(XorDecryptionEngine::new()),
    )
}

fn key(value: &str) -> KeyMaterial {
    KeyMaterial::new(value).unwrap()
}

/// Engine that drops the last byte of every answer
struct TruncatingEngine;

#[async_trait]
impl DecryptionEngine for TruncatingEngine {
    async fn decrypt(&self, encrypted: Bytes, _keystream: &Keystream) -> BridgeResult<Vec<u8>> {
        let mut data = encrypted.to_vec();
        data.pop();
        Ok(data)
    }

    fn name(&self) -> &'static str {
        "truncating"
    }
}

#[tokio::test]
async fn test_local_pipeline_restores_plaintext() {
    let plain = sample_mp4(300_000);
    let encrypted = encrypt(&plain, "abc123");
    assert_ne!(&encrypted[4..8], b"ftyp");

    let payload = local_pipeline()
        .decrypt(Bytes::from(encrypted), &key("abc123"))
        .await
        .unwrap();
    assert_eq!(payload.data, plain);
}

#[tokio::test]
async fn test_payload_shorter_than_keystream() {
    let plain = sample_mp4(4_096);
    let encrypted = encrypt(&plain, "short-video");

    let payload = local_pipeline()
        .decrypt(Bytes::from(encrypted), &key("short-video"))
        .await
        .unwrap();
    assert_eq!(payload.data.len(), 4_096);
    assert_eq!(payload.data, plain);
}

#[tokio::test]
async fn test_wrong_key_fails_signature_gate() {
    let encrypted = encrypt(&sample_mp4(200_000), "right-key");

    let err = local_pipeline()
        .decrypt(Bytes::from(encrypted), &key("wrong-key"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Decryption(_)));
    assert!(err.to_string().contains("decode_key"));
}

#[tokio::test]
async fn test_length_mismatch_is_protocol_error() {
    let pipeline = DecryptionPipeline::new(
        KeystreamService::new(Arc::new(FixedKeystreamProvider::new())),
        Arc::new(TruncatingEngine),
    );
    let encrypted = encrypt(&sample_mp4(1_000), "abc123");

    let err = pipeline
        .decrypt(Bytes::from(encrypted), &key("abc123"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Protocol(_)));
}

#[tokio::test]
async fn test_module_pipeline_matches_local_pipeline() {
    let (node, probe) = start_node(HostScript::default());
    node.session().ensure_ready().await.unwrap();
    assert_eq!(node.pipeline().engine_name(), "module");

    let plain = sample_mp4(250_000);
    let encrypted = Bytes::from(encrypt(&plain, "abc123"));

    let via_module = node
        .pipeline()
        .decrypt(encrypted.clone(), &key("abc123"))
        .await
        .unwrap();
    let via_local = local_pipeline()
        .decrypt(encrypted, &key("abc123"))
        .await
        .unwrap();
    assert_eq!(via_module.data, plain);
    assert_eq!(via_module.data, via_local.data);

    let calls = probe.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], "generateKeystream(abc123)");
    assert!(calls[1].starts_with("decryptVideo"));
}

#[tokio::test]
async fn test_module_length_mismatch_is_protocol_error() {
    let (node, _probe) = start_node(HostScript {
        truncate_decrypt: 3,
        ..HostScript::default()
    });
    node.session().ensure_ready().await.unwrap();

    let encrypted = encrypt(&sample_mp4(10_000), "abc123");
    let err = node
        .pipeline()
        .decrypt(Bytes::from(encrypted), &key("abc123"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::Protocol(_)));
}

#[tokio::test]
async fn test_decrypt_before_ready_is_not_ready() {
    let (node, probe) = start_node(HostScript::default());

    let err = node
        .pipeline()
        .decrypt(Bytes::from(sample_mp4(100)), &key("abc123"))
        .await
        .unwrap_err();
    assert!(matches!(err, BridgeError::NotReady { .. }));
    assert!(probe.calls().is_empty());
}
