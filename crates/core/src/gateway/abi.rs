//! Calldata entrypoint of the gateway.
//!
//! A CCIP-Read server hands the `callData` of an `OffchainLookup` straight to
//! [EvmGateway::handle_call] and returns the resulting bytes as the response `data`.

use super::EvmGateway;
use crate::{
    errors::{GatewayError, GatewayResult},
    service::ProofService,
    vm::Command,
};
use alloy_primitives::{hex, Bytes};
use alloy_sol_types::SolCall;

/// The single target form of `getStorageSlots`.
pub mod single {
    use alloy_sol_types::sol;

    sol! {
        /// Proves `commands` against the storage of `target`.
        function getStorageSlots(address target, bytes32[] commands, bytes[] constants) external view returns (bytes witness);
    }
}

/// The multi target form of `getStorageSlots`.
pub mod batch {
    use alloy_sol_types::sol;

    sol! {
        /// One target of a multi target request.
        #[derive(Debug, PartialEq, Eq)]
        struct TargetRequest {
            address target;
            bytes32[] commands;
            bytes[] constants;
            uint256 operationIdx;
        }

        /// Proves every request in order, sharing resolved values between them.
        function getStorageSlots(TargetRequest[] tRequests) external view returns (bytes[] proofs);
    }
}

impl<S: ProofService> EvmGateway<S> {
    /// Decodes a `getStorageSlots` call, runs it and ABI encodes its return value.
    ///
    /// ### Returns
    /// - `Ok(bytes)` with the ABI encoded return data
    /// - `Err(GatewayError::UnknownSelector)` if the calldata targets another function
    /// - `Err(_)` with the first error hit while proving
    pub async fn handle_call(&self, calldata: &[u8]) -> GatewayResult<Bytes> {
        let selector: [u8; 4] = calldata
            .get(..4)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| GatewayError::UnknownSelector(hex::encode(calldata)))?;

        if selector == single::getStorageSlotsCall::SELECTOR {
            let call = single::getStorageSlotsCall::abi_decode(calldata, true)?;
            let commands = call.commands.into_iter().map(Command::from).collect::<Vec<_>>();
            let witness = self.create_proofs(call.target, &commands, &call.constants).await?;
            Ok(single::getStorageSlotsCall::abi_encode_returns(&(witness,)).into())
        } else if selector == batch::getStorageSlotsCall::SELECTOR {
            let call = batch::getStorageSlotsCall::abi_decode(calldata, true)?;
            let proofs = self.get_storage_slots(&call.tRequests).await?;
            Ok(batch::getStorageSlotsCall::abi_encode_returns(&(proofs,)).into())
        } else {
            Err(GatewayError::UnknownSelector(hex::encode(selector)))
        }
    }
}
