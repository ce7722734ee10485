//! Command line entrypoint of the `evmgate` binary.

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser};
use evmgate_core::GatewayConfig;
use std::{fs, path::Path, path::PathBuf};
use subcommands::{EvmGateSubcommand, EvmGateSubcommandDispatcher};
use tracing::Level;

mod subcommands;

/// Developer tooling for evmgate storage proof requests.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Verbosity level (0-4)
    #[arg(short, long, action = ArgAction::Count)]
    v: u8,

    /// Path to a JSON gateway configuration. Defaults apply to every missing field.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    subcommand: EvmGateSubcommand,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing_subscriber(cli.v)?;

    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(target: "evmgate-cli", "Using {:?}", config);

    cli.subcommand.dispatch(&config)
}

/// Initializes the tracing subscriber, writing to stderr so that stdout only carries results.
fn init_tracing_subscriber(verbosity_level: u8) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(match verbosity_level {
            0 => Level::ERROR,
            1 => Level::WARN,
            2 => Level::INFO,
            3 => Level::DEBUG,
            _ => Level::TRACE,
        })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).map_err(|e| anyhow!(e))
}

fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let Some(path) = path else {
        return Ok(GatewayConfig::default());
    };

    tracing::info!(target: "evmgate-cli", "Loading gateway configuration from {}", path.display());
    let raw = fs::read(path)
        .map_err(|e| anyhow!("Failed to read configuration {}: {e}", path.display()))?;
    Ok(serde_json::from_slice(&raw)?)
}
