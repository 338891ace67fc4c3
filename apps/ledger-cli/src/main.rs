//! One-shot operator CLI for the ledger-anchoring subsystem. Talks to a
//! running `ledger-daemon` over its HTTP surface the way the original
//! `evidence-cli` talked to the Phoenix API: resolve a transaction ID
//! (inline hex, or hash a file's bytes into one), then POST it to
//! `/register` or `/verify` and print the JSON result.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use sha2::{Digest as _, Sha256};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ledger-cli", version, about = "Operator CLI for the ledger-anchoring subsystem")]
struct Cli {
    /// Base URL of a running ledger-daemon
    #[arg(long, global = true, default_value = "http://localhost:8088")]
    api_url: String,

    /// Opaque asset group identifier forwarded to the subsystem
    #[arg(long, global = true, default_value = "default")]
    asset_group_id: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a transaction ID for batching
    Register {
        #[command(flatten)]
        tx_id: TxIdArg,
    },
    /// Verify a transaction ID's inclusion, blocking until the engine answers
    Verify {
        #[command(flatten)]
        tx_id: TxIdArg,
    },
}

#[derive(clap::Args)]
struct TxIdArg {
    /// 64-character hex-encoded 32-byte transaction ID
    #[arg(long, conflicts_with = "from_file")]
    hex: Option<String>,

    /// Derive the transaction ID by SHA-256 hashing this file's bytes
    #[arg(long, conflicts_with = "hex")]
    from_file: Option<PathBuf>,
}

impl TxIdArg {
    fn resolve(&self) -> Result<String> {
        if let Some(hex_str) = &self.hex {
            if hex_str.len() != 64 || !hex_str.chars().all(|c| c.is_ascii_hexdigit()) {
                anyhow::bail!("--hex must be exactly 64 hex characters (32 bytes), got {}", hex_str.len());
            }
            return Ok(hex_str.to_lowercase());
        }
        if let Some(path) = &self.from_file {
            let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            let digest: [u8; 32] = hasher.finalize().into();
            return Ok(hex::encode(digest));
        }
        anyhow::bail!("one of --hex or --from-file is required")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match &cli.command {
        Commands::Register { tx_id } => {
            let tx_id_hex = tx_id.resolve()?;
            let response = client
                .post(format!("{}/register", cli.api_url))
                .json(&serde_json::json!({
                    "asset_group_id": cli.asset_group_id,
                    "tx_id": tx_id_hex,
                }))
                .send()
                .await
                .context("failed to reach ledger-daemon")?;
            ensure_success(&response)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "registered": true,
                    "tx_id": tx_id_hex,
                }))?
            );
        }
        Commands::Verify { tx_id } => {
            let tx_id_hex = tx_id.resolve()?;
            let response = client
                .post(format!("{}/verify", cli.api_url))
                .json(&serde_json::json!({
                    "asset_group_id": cli.asset_group_id,
                    "tx_id": tx_id_hex,
                }))
                .send()
                .await
                .context("failed to reach ledger-daemon")?;
            ensure_success(&response)?;
            let body: Value = response.json().await.context("failed to parse verify response")?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }

    Ok(())
}

fn ensure_success(response: &reqwest::Response) -> Result<()> {
    if !response.status().is_success() {
        anyhow::bail!("ledger-daemon returned HTTP {}", response.status());
    }
    Ok(())
}
