// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

use crate::api::{ErrorResponse, KeystreamRequest, KeystreamResponse};
use crate::keystream::KEYSTREAM_LEN;

/// Arguments for the fetch-keystream command
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Decode key of the video
    #[arg(long)]
    pub decode_key: String,

    /// Base URL of a running decryption node
    #[arg(long, env = "DECRYPT_SERVICE_URL", default_value = "http://127.0.0.1:8010")]
    pub service: String,

    /// File to write the hex keystream to
    #[arg(short, long, default_value = "keystream_131072_bytes.txt")]
    pub output: PathBuf,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 120)]
    pub timeout: u64,
}

/// Request the hex keystream for `decode_key` from a node at `service`
pub async fn fetch_keystream(service: &str, decode_key: &str, timeout: Duration) -> Result<String> {
    let url = format!("{}/api/keystream", service.trim_end_matches('/'));
    debug!("POST {}", url);

    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client
        .post(&url)
        .json(&KeystreamRequest::new(decode_key).with_format("hex"))
        .send()
        .await
        .with_context(|| format!("could not reach {}", url))?;

    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorResponse>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        return Err(anyhow!("node answered {}: {}", status.as_u16(), message));
    }

    let body: KeystreamResponse = response
        .json()
        .await
        .context("node returned an unexpected keystream response")?;
    if body.keystream.len() != KEYSTREAM_LEN * 2 {
        return Err(anyhow!(
            "node returned {} hex characters, expected {}",
            body.keystream.len(),
            KEYSTREAM_LEN * 2
        ));
    }
    Ok(body.keystream)
}

pub async fn run(args: FetchArgs) -> Result<()> {
    println!("🔑 Fetching keystream from {}", args.service);
    let keystream =
        fetch_keystream(&args.service, &args.decode_key, Duration::from_secs(args.timeout)).await?;

    std::fs::write(&args.output, &keystream)
        .with_context(|| format!("could not write {}", args.output.display()))?;
    println!("✅ Saved {} byte keystream to {}", KEYSTREAM_LEN, args.output.display());
    Ok(())
}
