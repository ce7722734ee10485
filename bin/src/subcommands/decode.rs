//! The `decode` subcommand for the evmgate binary

use super::EvmGateSubcommandDispatcher;
use alloy_primitives::Bytes;
use anyhow::{anyhow, Result};
use clap::Args;
use evmgate_chains::ChainKind;
use evmgate_core::GatewayConfig;
use std::{fs, path::PathBuf, str::FromStr};

/// Command line arguments for `evmgate decode`
#[derive(Args, Debug)]
#[command(author, version, about)]
pub(crate) struct DecodeArgs {
    /// The chain whose verifier layout the proof uses.
    #[arg(long)]
    chain: ChainKind,

    /// The hex encoded proof.
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    proof: Option<Bytes>,

    /// A file holding the hex encoded proof.
    #[arg(long)]
    input: Option<PathBuf>,

    /// The path to write the decoded JSON to. Defaults to stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

impl EvmGateSubcommandDispatcher for DecodeArgs {
    fn dispatch(self, _: &GatewayConfig) -> Result<()> {
        let proof = match (self.proof, &self.input) {
            (Some(proof), _) => proof,
            (None, Some(path)) => {
                tracing::info!(target: "evmgate-cli::decode", "Loading proof from {}", path.display());
                let raw = fs::read_to_string(path)?;
                Bytes::from_str(raw.trim())
                    .map_err(|e| anyhow!("Invalid hex in {}: {e}", path.display()))?
            }
            (None, None) => anyhow::bail!("Either --proof or --input is required"),
        };

        let decoded = self.chain.decode_proof(&proof)?;
        tracing::info!(
            target: "evmgate-cli::decode",
            "Decoded {} proof with {} storage proofs",
            self.chain,
            decoded.storage_proofs.len()
        );

        let json = serde_json::to_string_pretty(&decoded)?;
        match self.output {
            Some(ref output_path) => fs::write(output_path, json).map_err(|_| {
                anyhow!("Failed to write decoded proof to {}", output_path.display())
            })?,
            None => println!("{json}"),
        }
        Ok(())
    }
}
