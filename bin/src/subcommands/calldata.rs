//! The `calldata` subcommand for the evmgate binary

use super::{check_command_count, EvmGateSubcommandDispatcher};
use alloy_primitives::{hex, Address, Bytes, B256};
use alloy_sol_types::SolCall;
use anyhow::Result;
use clap::Args;
use evmgate_core::{abi::single::getStorageSlotsCall, GatewayConfig};

/// Command line arguments for `evmgate calldata`
#[derive(Args, Debug)]
#[command(author, version, about)]
pub(crate) struct CalldataArgs {
    /// The contract whose storage is requested.
    #[arg(long)]
    target: Address,

    /// A 32 byte command word. May be repeated.
    #[arg(long = "command", required = true)]
    commands: Vec<B256>,

    /// A constant of the request. May be repeated.
    #[arg(long = "constant")]
    constants: Vec<Bytes>,
}

impl EvmGateSubcommandDispatcher for CalldataArgs {
    fn dispatch(self, config: &GatewayConfig) -> Result<()> {
        check_command_count(self.commands.len(), config)?;

        let call = getStorageSlotsCall {
            target: self.target,
            commands: self.commands,
            constants: self.constants,
        };
        let calldata = call.abi_encode();
        tracing::info!(target: "evmgate-cli::calldata", "Encoded {} bytes of calldata", calldata.len());

        println!("{}", hex::encode_prefixed(calldata));
        Ok(())
    }
}
