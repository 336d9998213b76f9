// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};

use crate::decrypt::{xor_prefix, CONTAINER_SIGNATURE};
use crate::keystream::KEYSTREAM_LEN;

/// How far into the output to look for the container signature
pub const SIGNATURE_SEARCH_WINDOW: usize = 32;

/// Arguments for the decrypt command
#[derive(Args, Debug)]
#[command(group(
    clap::ArgGroup::new("keystream_source")
        .required(true)
        .args(["keystream", "hex"]),
))]
pub struct DecryptArgs {
    /// Encrypted video file
    #[arg(short, long)]
    pub input: PathBuf,

    /// File holding the exported hex keystream
    #[arg(short, long)]
    pub keystream: Option<PathBuf>,

    /// Hex keystream given inline
    #[arg(short = 'H', long)]
    pub hex: Option<String>,

    /// Output file
    #[arg(short, long, default_value = "wx_decrypted.mp4")]
    pub output: PathBuf,

    /// Only print errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Outcome of decrypting one file
#[derive(Debug, Clone, PartialEq)]
pub struct DecryptReport {
    pub file_size: usize,
    pub decrypted_len: usize,
    /// Offset of `ftyp` within the first 32 bytes, if found
    pub signature_offset: Option<usize>,
}

/// Parse an exported keystream, ignoring all whitespace
pub fn parse_hex_keystream(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&compact).map_err(|e| anyhow!("keystream is not a valid hex string: {}", e))
}

/// Locate `ftyp` near the start of `data`
pub fn find_signature(data: &[u8]) -> Option<usize> {
    let window = &data[..data.len().min(SIGNATURE_SEARCH_WINDOW)];
    window
        .windows(CONTAINER_SIGNATURE.len())
        .position(|w| w == CONTAINER_SIGNATURE)
}

/// XOR the keystream over the start of `input` and write the result.
/// Bytes past the keystream are copied unchanged.
pub fn decrypt_file(input: &Path, keystream: &[u8], output: &Path) -> Result<DecryptReport> {
    let mut data =
        std::fs::read(input).with_context(|| format!("could not read {}", input.display()))?;
    let file_size = data.len();
    let decrypted_len = xor_prefix(&mut data, keystream);
    let signature_offset = find_signature(&data);

    std::fs::write(output, &data)
        .with_context(|| format!("could not write {}", output.display()))?;

    Ok(DecryptReport {
        file_size,
        decrypted_len,
        signature_offset,
    })
}

pub async fn run(args: DecryptArgs) -> Result<()> {
    let verbose = !args.quiet;

    let keystream = match (&args.keystream, &args.hex) {
        (Some(path), _) => {
            if verbose {
                println!("📂 Reading keystream file: {}", path.display());
            }
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("could not read {}", path.display()))?;
            parse_hex_keystream(&text)?
        }
        (None, Some(hex)) => parse_hex_keystream(hex)?,
        (None, None) => bail!("either --keystream or --hex is required"),
    };

    if verbose {
        println!(
            "✅ Keystream size: {} bytes ({:.2} KB)",
            keystream.len(),
            keystream.len() as f64 / 1024.0
        );
    }
    if keystream.len() != KEYSTREAM_LEN {
        eprintln!(
            "⚠️  Keystream is {} bytes, expected {}; output may be corrupt",
            keystream.len(),
            KEYSTREAM_LEN
        );
    }

    let report = decrypt_file(&args.input, &keystream, &args.output)?;

    if verbose {
        println!(
            "🔓 Decrypted {} of {} bytes ({:.2} MB)",
            report.decrypted_len,
            report.file_size,
            report.file_size as f64 / 1024.0 / 1024.0
        );
        println!("💾 Saved to {}", args.output.display());
    }

    match report.signature_offset {
        Some(offset) => {
            if verbose {
                println!("🎬 Found MP4 signature 'ftyp' at offset {}", offset);
            }
            Ok(())
        }
        None => Err(anyhow!(
            "'ftyp' signature not found in {}; the keystream probably does not match this video",
            args.output.display()
        )),
    }
}
