//! Proofs of L1 state, verified against a recent block hash.

use crate::{
    header::BlockHeader,
    rpc::{BlockTag, EvmProofHelper, JsonRpcClient},
};
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_rlp::Decodable;
use alloy_sol_types::{sol, SolType};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use evmgate_core::{
    GatewayResult, ProofFetcher, ProvableBlock, ProvableBlockSupplier, StateProof, StateTrieProof,
    StorageReader,
};

sol! {
    /// Anchoring data of an L1 proof.
    #[derive(Debug, PartialEq, Eq)]
    struct L1WitnessData {
        uint256 blockNo;
        bytes blockHeader;
    }
}

type L1ProofParams = (L1WitnessData, StateTrieProof);

/// An L1 block, carrying the header the verifier hashes and compares with `blockhash(n)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct L1ProvableBlock {
    pub header: BlockHeader,
}

impl ProvableBlock for L1ProvableBlock {
    fn number(&self) -> u64 {
        self.header.block_number()
    }

    fn encode_proof(&self, proof: StateProof) -> GatewayResult<Bytes> {
        let witness = L1WitnessData {
            blockNo: U256::from(self.number()),
            blockHeader: alloy_rlp::encode(&self.header).into(),
        };
        let params = (witness, proof.into_state_trie_proof());
        Ok(L1ProofParams::abi_encode_params(&params).into())
    }
}

impl L1WitnessData {
    /// Decodes the RLP encoded block header.
    pub fn header(&self) -> GatewayResult<BlockHeader> {
        Ok(BlockHeader::decode(&mut self.blockHeader.as_ref())?)
    }
}

/// Decodes a proof produced by [L1ProvableBlock::encode_proof].
pub fn decode_proof(data: &[u8]) -> GatewayResult<(L1WitnessData, StateTrieProof)> {
    Ok(L1ProofParams::abi_decode_params(data, true)?)
}

/// The [L1ProofService] proves L1 storage at the parent of the latest block, the most recent
/// block whose hash a verifier call can still read.
#[derive(Debug, Clone)]
pub struct L1ProofService<C> {
    helper: EvmProofHelper<C>,
}

impl<C: JsonRpcClient> L1ProofService<C> {
    pub fn new(client: C) -> Self {
        Self { helper: EvmProofHelper::new(client) }
    }

    /// Returns a reference to the [EvmProofHelper].
    pub fn helper(&self) -> &EvmProofHelper<C> {
        &self.helper
    }
}

#[async_trait]
impl<C: JsonRpcClient> ProvableBlockSupplier for L1ProofService<C> {
    type Block = L1ProvableBlock;

    async fn get_provable_block(&self) -> Result<L1ProvableBlock> {
        let latest = self.helper.get_block_header(BlockTag::Latest).await?;
        let number = latest
            .block_number()
            .checked_sub(1)
            .ok_or_else(|| anyhow!("Chain has no block before genesis"))?;

        let header = self.helper.get_block_header(BlockTag::Number(number)).await?;
        tracing::debug!(target: "evmgate::l1", "Selected provable block {} ({})", number, header.hash());
        Ok(L1ProvableBlock { header })
    }
}

#[async_trait]
impl<C: JsonRpcClient> StorageReader<L1ProvableBlock> for L1ProofService<C> {
    async fn get_storage_at(
        &self,
        block: &L1ProvableBlock,
        address: Address,
        slot: U256,
    ) -> Result<B256> {
        self.helper.get_storage_at(block.number(), address, slot).await
    }
}

#[async_trait]
impl<C: JsonRpcClient> ProofFetcher<L1ProvableBlock> for L1ProofService<C> {
    async fn get_proofs(
        &self,
        block: &L1ProvableBlock,
        address: Address,
        slots: &[U256],
    ) -> Result<StateProof> {
        self.helper.get_proofs(block.number(), address, slots).await
    }
}
