//! Interfaces to the chain specific collaborators of the gateway.
//!
//! The gateway never talks to a chain directly. A [ProofService] selects a [ProvableBlock],
//! reads raw storage words while commands are being resolved, and fetches the trie witnesses
//! for every derived slot once per batch.

use crate::{errors::GatewayResult, proof::StateProof};
use alloy_primitives::{Address, Bytes, B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::fmt::Debug;

/// A [ProvableBlock] identifies an L2 state snapshot that can be proven on L1, along with the
/// chain specific anchoring metadata the verifier needs.
pub trait ProvableBlock: Debug + Send + Sync {
    /// The L2 block number storage is read and proven at.
    fn number(&self) -> u64;

    /// Encodes a [StateProof] fetched at this block into the byte layout of the chain's
    /// verifier contract.
    fn encode_proof(&self, proof: StateProof) -> GatewayResult<Bytes>;
}

/// Supplies the block that a batch is proven against.
#[async_trait]
pub trait ProvableBlockSupplier {
    /// The chain specific block handle.
    type Block: ProvableBlock;

    /// Returns the most recent block whose state is provable on L1. The returned block must stay
    /// valid while a batch is being processed.
    async fn get_provable_block(&self) -> Result<Self::Block>;
}

/// Reads raw storage words.
#[async_trait]
pub trait StorageReader<B: ProvableBlock> {
    /// Returns the 32 byte word at `slot` of `address` at `block`.
    async fn get_storage_at(&self, block: &B, address: Address, slot: U256) -> Result<B256>;
}

/// Fetches state and storage trie witnesses.
#[async_trait]
pub trait ProofFetcher<B: ProvableBlock> {
    /// Fetches the account proof of `address` and one storage proof per entry of `slots`, in the
    /// order given.
    async fn get_proofs(&self, block: &B, address: Address, slots: &[U256]) -> Result<StateProof>;
}

/// A [ProofService] is the full set of collaborators a gateway needs for one chain.
pub trait ProofService:
    ProvableBlockSupplier
    + StorageReader<<Self as ProvableBlockSupplier>::Block>
    + ProofFetcher<<Self as ProvableBlockSupplier>::Block>
    + Send
    + Sync
{
}

impl<T> ProofService for T where
    T: ProvableBlockSupplier
        + StorageReader<<T as ProvableBlockSupplier>::Block>
        + ProofFetcher<<T as ProvableBlockSupplier>::Block>
        + Send
        + Sync
{
}
