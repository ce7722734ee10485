//! This module contains the [EvmGateway], which sequences slot derivation, value resolution and
//! proof fetching for a batch of commands.

use crate::{
    config::GatewayConfig,
    errors::{GatewayError, GatewayResult},
    service::{ProofService, ProvableBlock},
    storage::resolve,
    vm::{compute_first_slot, Command},
};
use alloy_primitives::{Address, Bytes, U256};

pub mod abi;
pub use abi::batch::TargetRequest;

mod builder;
pub use builder::GatewayBuilder;

/// Target addresses at or below this value refer to an earlier resolved value instead of a
/// contract.
const MAX_TARGET_REFERENCE: u64 = 256;

/// The [EvmGateway] proves storage values of contracts on the chain served by its
/// [ProofService].
#[derive(Debug)]
pub struct EvmGateway<S: ProofService> {
    /// The chain specific collaborators.
    pub(crate) service: S,
    /// Limits applied to each batch.
    pub(crate) config: GatewayConfig,
}

impl<S: ProofService> EvmGateway<S> {
    /// Create a new [EvmGateway] with the default [GatewayConfig].
    pub fn new(service: S) -> Self {
        Self { service, config: GatewayConfig::default() }
    }

    /// Returns a reference to the [ProofService].
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Returns a reference to the [GatewayConfig].
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Proves the values described by `commands` in the storage of `address`.
    ///
    /// ### Takes
    /// - `address`: The contract to read.
    /// - `commands`: One command per requested value, in dependency order.
    /// - `constants`: The constants table shared by the commands.
    ///
    /// ### Returns
    /// - The proof encoded for the chain's verifier, or the first error hit by any command.
    pub async fn create_proofs(
        &self,
        address: Address,
        commands: &[Command],
        constants: &[Bytes],
    ) -> GatewayResult<Bytes> {
        let mut values = Vec::with_capacity(commands.len());
        self.prove_target(address, commands, constants, &mut values).await
    }

    /// Proves several targets in one call. Resolved values accumulate across targets, so
    /// backreferences of a later target may point at values of an earlier one, and a target
    /// address of 256 or less is replaced by the address held in the first resolved value.
    ///
    /// ### Returns
    /// - One encoded proof per request, in request order.
    pub async fn get_storage_slots(&self, requests: &[TargetRequest]) -> GatewayResult<Vec<Bytes>> {
        let mut values = Vec::new();
        let mut proofs = Vec::with_capacity(requests.len());

        for request in requests {
            let target = resolve_target(request.target, &values)?;
            let commands = request.commands.iter().copied().map(Command::from).collect::<Vec<_>>();
            proofs.push(self.prove_target(target, &commands, &request.constants, &mut values).await?);
        }

        Ok(proofs)
    }

    async fn prove_target(
        &self,
        address: Address,
        commands: &[Command],
        constants: &[Bytes],
        values: &mut Vec<Bytes>,
    ) -> GatewayResult<Bytes> {
        if commands.len() > self.config.max_commands {
            return Err(GatewayError::TooManyCommands {
                count: commands.len(),
                max: self.config.max_commands,
            });
        }

        let block = self.service.get_provable_block().await?;
        tracing::info!(
            target: "evmgate::gateway",
            "Proving {} values of {} at block {}",
            commands.len(),
            address,
            block.number()
        );

        let mut elements = Vec::with_capacity(commands.len());
        for command in commands {
            let first = compute_first_slot(command, constants, values)?;
            let element = resolve(&self.service, &block, address, first, &self.config).await?;

            // Later commands may backreference this value, so it is resolved before moving on.
            values.push(element.value().await?);
            elements.push(element);
        }

        let slots = elements.into_iter().flat_map(|e| e.into_slots()).collect::<Vec<U256>>();
        tracing::debug!(target: "evmgate::gateway", "Fetching proofs for {} slots", slots.len());

        let proof = self.service.get_proofs(&block, address, &slots).await?;
        proof.ensure_matches(&slots)?;

        block.encode_proof(proof)
    }
}

/// Replaces a referential target with the address held in the first resolved value.
fn resolve_target(target: Address, values: &[Bytes]) -> GatewayResult<Address> {
    if U256::from_be_slice(target.as_slice()) > U256::from(MAX_TARGET_REFERENCE) {
        return Ok(target);
    }

    let word = values.first().ok_or(GatewayError::InvalidTargetReference(target))?;
    if word.len() != 32 || word[..12].iter().any(|b| *b != 0) {
        return Err(GatewayError::InvalidTargetReference(target));
    }

    let resolved = Address::from_slice(&word[12..]);
    tracing::debug!(target: "evmgate::gateway", "Resolved target reference {} to {}", target, resolved);
    Ok(resolved)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        test_utils::{short_word, MockBlock, MockChain},
        vm::{FLAG_DYNAMIC, HALT},
    };
    use alloy_primitives::{address, keccak256, B256};

    const TARGET: Address = address!("5FbDB2315678afecb367f032d93F642f64180aa3");

    fn word(n: u64) -> Bytes {
        Bytes::from(U256::from(n).to_be_bytes::<32>())
    }

    fn mapping_slot(key: &[u8], base: U256) -> U256 {
        let mut preimage = key.to_vec();
        preimage.extend_from_slice(&base.to_be_bytes::<32>());
        U256::from_be_bytes(keccak256(preimage).0)
    }

    #[tokio::test]
    async fn fixed_slot_end_to_end() {
        let chain = MockChain::default();
        chain.set_storage(TARGET, U256::ZERO, B256::from(U256::from(42).to_be_bytes::<32>())).await;
        let gateway = EvmGateway::new(chain);

        let proof = gateway
            .create_proofs(TARGET, &[Command::new(0, &[0x00])], &[word(0)])
            .await
            .unwrap();

        let (block, (_, storage)) = MockBlock::decode_proof(&proof).unwrap();
        assert_eq!(block, 1);
        assert_eq!(storage.len(), 1);
        assert_eq!(MockChain::proven_value(&storage[0]).unwrap(), U256::from(42));
        assert_eq!(gateway.service().provable_block_calls().await, 1);
        assert_eq!(gateway.service().proof_fetches().await, 1);
    }

    #[tokio::test]
    async fn slots_follow_command_order() {
        let long = vec![0x11; 40];
        let chain = MockChain::default();
        chain.set_bytes(TARGET, U256::from(1), &long).await;
        chain.set_storage(TARGET, U256::from(2), B256::repeat_byte(0x22)).await;
        let gateway = EvmGateway::new(chain);

        let commands = [Command::new(FLAG_DYNAMIC, &[0x00]), Command::new(0, &[0x01])];
        gateway.create_proofs(TARGET, &commands, &[word(1), word(2)]).await.unwrap();

        let data = U256::from_be_bytes(keccak256(U256::from(1).to_be_bytes::<32>()).0);
        assert_eq!(
            gateway.service().last_proven_slots().await,
            vec![U256::from(1), data, data + U256::from(1), U256::from(2)]
        );
    }

    #[tokio::test]
    async fn backreference_receives_resolved_long_value() {
        // slot 0: string holding a 40 byte name, slot 1: mapping(string => uint256)
        let name = b"a-name-long-enough-to-spill-over-one-slot".to_vec();
        assert!(name.len() > 31);

        let chain = MockChain::default();
        chain.set_bytes(TARGET, U256::ZERO, &name).await;
        chain.set_storage(TARGET, U256::from(7), B256::repeat_byte(0x01)).await;
        let entry = mapping_slot(&name, U256::from(1));
        chain.set_storage(TARGET, entry, B256::from(U256::from(99).to_be_bytes::<32>())).await;
        let gateway = EvmGateway::new(chain);

        let commands = [
            Command::new(FLAG_DYNAMIC, &[0x00]),
            Command::new(0, &[0x02]),
            Command::new(0, &[0x01, 0x20]),
        ];
        let proof = gateway
            .create_proofs(TARGET, &commands, &[word(0), word(1), word(7)])
            .await
            .unwrap();

        let (_, (_, storage)) = MockBlock::decode_proof(&proof).unwrap();
        assert_eq!(MockChain::proven_value(storage.last().unwrap()).unwrap(), U256::from(99));
        assert_eq!(*gateway.service().last_proven_slots().await.last().unwrap(), entry);
    }

    #[tokio::test]
    async fn nested_lookup_by_dynamic_key() {
        // slot 0: mapping(address => string) nicknames
        // slot 1: mapping(string => mapping(bytes32 => string)) profiles
        let owner = address!("70997970C51812dc3A010C7d01b50e0d17dc79C8");
        let owner_key = Bytes::from(B256::left_padding_from(owner.as_slice()).0);
        let nickname = b"vitalik".to_vec();
        let record_key = Bytes::from(B256::repeat_byte(0x0E).0);
        let record = b"a profile record that is definitely longer than thirty one bytes".to_vec();

        let chain = MockChain::default();
        let nickname_slot = mapping_slot(&owner_key, U256::ZERO);
        chain.set_bytes(TARGET, nickname_slot, &nickname).await;
        let record_slot = mapping_slot(&record_key, mapping_slot(&nickname, U256::from(1)));
        chain.set_bytes(TARGET, record_slot, &record).await;
        let gateway = EvmGateway::new(chain);

        let commands = [
            Command::new(FLAG_DYNAMIC, &[0x00, 0x01, HALT]),
            Command::new(FLAG_DYNAMIC, &[0x02, 0x20, 0x03]),
        ];
        let constants = [word(0), owner_key, word(1), record_key];
        let proof = gateway.create_proofs(TARGET, &commands, &constants).await.unwrap();

        let slots = gateway.service().last_proven_slots().await;
        assert_eq!(slots[0], nickname_slot);
        assert_eq!(slots[1], record_slot);
        assert_eq!(slots.len(), 2 + record.len().div_ceil(32));

        let (_, (_, storage)) = MockBlock::decode_proof(&proof).unwrap();
        let proven = storage[2..]
            .iter()
            .flat_map(|p| MockChain::proven_value(p).unwrap().to_be_bytes::<32>())
            .take(record.len())
            .collect::<Vec<_>>();
        assert_eq!(proven, record);
    }

    #[tokio::test]
    async fn failures_abort_the_batch() {
        let chain = MockChain::default();
        chain.set_storage(TARGET, U256::ZERO, short_word(b"ok")).await;
        let gateway = EvmGateway::new(chain);

        let err = gateway
            .create_proofs(TARGET, &[Command::new(0, &[0x00]), Command::new(0, &[0x60])], &[word(0)])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UnrecognizedOpcode { opcode: 0x60, position: 1 }));
        assert_eq!(gateway.service().proof_fetches().await, 0);

        gateway.service().fail_storage_reads(true).await;
        let err = gateway
            .create_proofs(TARGET, &[Command::new(FLAG_DYNAMIC, &[0x00])], &[word(0)])
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Io(_)));
    }

    #[tokio::test]
    async fn mismatched_proofs_are_inconsistent_state() {
        let chain = MockChain::default();
        chain.drop_last_storage_proof(true).await;
        let gateway = EvmGateway::new(chain);

        let err = gateway
            .create_proofs(TARGET, &[Command::new(0, &[0x00])], &[word(3)])
            .await
            .unwrap_err();
        assert!(err.is_chain_state());
    }

    #[tokio::test]
    async fn command_limit() {
        let gateway = GatewayBuilder::new(MockChain::default()).with_max_commands(1).build();
        let commands = [Command::new(0, &[0x00]), Command::new(0, &[0x00])];
        let err = gateway.create_proofs(TARGET, &commands, &[word(0)]).await.unwrap_err();
        assert!(matches!(err, GatewayError::TooManyCommands { count: 2, max: 1 }));
        assert_eq!(gateway.service().provable_block_calls().await, 0);
    }

    #[tokio::test]
    async fn referential_targets() {
        let resolver = address!("00000000000000000000000000000000000000bb");
        let chain = MockChain::default();
        chain
            .set_storage(TARGET, U256::ZERO, B256::left_padding_from(resolver.as_slice()))
            .await;
        chain.set_bytes(resolver, U256::from(4), b"text").await;
        let gateway = EvmGateway::new(chain);

        let requests = vec![
            TargetRequest {
                target: TARGET,
                commands: vec![Command::new(0, &[0x00]).0],
                constants: vec![word(0)],
                operationIdx: U256::ZERO,
            },
            TargetRequest {
                target: Address::ZERO,
                commands: vec![Command::new(FLAG_DYNAMIC, &[0x00]).0],
                constants: vec![word(4)],
                operationIdx: U256::from(1),
            },
        ];
        let proofs = gateway.get_storage_slots(&requests).await.unwrap();
        assert_eq!(proofs.len(), 2);
        assert_eq!(gateway.service().last_proven_target().await, Some(resolver));
        assert_eq!(gateway.service().provable_block_calls().await, 2);
    }

    #[test]
    fn target_reference_validation() {
        let plain = address!("00000000000000000000000000000000000001ff");
        assert_eq!(resolve_target(plain, &[]).unwrap(), plain);
        assert!(resolve_target(Address::ZERO, &[]).is_err());
        assert!(resolve_target(Address::ZERO, &[Bytes::from_static(b"short")]).is_err());
        assert!(resolve_target(Address::ZERO, &[Bytes::from(B256::repeat_byte(1).0)]).is_err());
    }
}
