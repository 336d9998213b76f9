// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Offline tools for exported keystreams

pub mod decrypt;
pub mod fetch;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Channels video decryption CLI
#[derive(Parser, Debug)]
#[command(name = "channels-decrypt-cli")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Decrypt Channels videos with an exported keystream", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decrypt a downloaded video with a hex keystream
    Decrypt(decrypt::DecryptArgs),

    /// Ask a running node for the keystream of a decode key and save it
    FetchKeystream(fetch::FetchArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Decrypt(args) => decrypt::run(args).await,
        Commands::FetchKeystream(args) => fetch::run(args).await,
    }
}
