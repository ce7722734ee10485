//! The `slot` subcommand for the evmgate binary

use super::{check_command_count, EvmGateSubcommandDispatcher};
use alloy_primitives::{Bytes, B256};
use anyhow::Result;
use clap::Args;
use evmgate_core::{compute_first_slot, Command, GatewayConfig};
use serde_json::{json, Value};

/// Command line arguments for `evmgate slot`
#[derive(Args, Debug)]
#[command(author, version, about)]
pub(crate) struct SlotArgs {
    /// A 32 byte command word. May be repeated.
    #[arg(long = "command", required = true)]
    commands: Vec<B256>,

    /// A constant of the request, indexed by `CONSTANT` operands. May be repeated.
    #[arg(long = "constant")]
    constants: Vec<Bytes>,

    /// A resolved value, indexed by `BACKREF` operands. May be repeated.
    #[arg(long = "value")]
    values: Vec<Bytes>,
}

impl SlotArgs {
    /// Derives the base slot of every command, in order.
    fn derive_slots(&self, config: &GatewayConfig) -> Result<Vec<Value>> {
        check_command_count(self.commands.len(), config)?;

        self.commands
            .iter()
            .map(|&word| -> Result<Value> {
                let first = compute_first_slot(&Command::from(word), &self.constants, &self.values)?;
                tracing::info!(target: "evmgate-cli::slot", "Command {} derives slot {:#x}", word, first.slot);
                Ok(json!({ "command": word, "slot": first.slot, "isDynamic": first.is_dynamic }))
            })
            .collect()
    }
}

impl EvmGateSubcommandDispatcher for SlotArgs {
    fn dispatch(self, config: &GatewayConfig) -> Result<()> {
        let slots = self.derive_slots(config)?;
        println!("{}", serde_json::to_string_pretty(&slots)?);
        Ok(())
    }
}
