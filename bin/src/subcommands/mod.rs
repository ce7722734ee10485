//! Subcommands for the `evmgate` binary

use anyhow::Result;
use clap::Subcommand;
use evmgate_core::GatewayConfig;

mod calldata;
mod decode;
mod slot;

pub(crate) trait EvmGateSubcommandDispatcher {
    /// Dispatches the subcommand
    fn dispatch(self, config: &GatewayConfig) -> Result<()>;
}

/// The subcommands for the `evmgate` binary
#[derive(Subcommand, Debug)]
pub(crate) enum EvmGateSubcommand {
    /// Derive the base storage slots of a list of commands
    Slot(slot::SlotArgs),
    /// Encode a `getStorageSlots` request
    Calldata(calldata::CalldataArgs),
    /// Decode a proof returned by a gateway
    Decode(decode::DecodeArgs),
}

impl EvmGateSubcommandDispatcher for EvmGateSubcommand {
    fn dispatch(self, config: &GatewayConfig) -> Result<()> {
        match self {
            EvmGateSubcommand::Slot(args) => args.dispatch(config),
            EvmGateSubcommand::Calldata(args) => args.dispatch(config),
            EvmGateSubcommand::Decode(args) => args.dispatch(config),
        }
    }
}

/// Rejects requests that a gateway running with `config` would refuse.
fn check_command_count(count: usize, config: &GatewayConfig) -> Result<()> {
    if count > config.max_commands {
        anyhow::bail!(evmgate_core::GatewayError::TooManyCommands { count, max: config.max_commands });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use evmgate_core::GatewayError;

    #[test]
    fn command_count_limit() {
        let config = GatewayConfig { max_commands: 4, ..Default::default() };
        assert!(check_command_count(0, &config).is_ok());
        assert!(check_command_count(4, &config).is_ok());

        let err = check_command_count(5, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<GatewayError>(),
            Some(GatewayError::TooManyCommands { count: 5, max: 4 })
        ));
    }
}
