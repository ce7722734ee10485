//! JSON-RPC backed storage reads and proof fetching.

use crate::header::BlockHeader;
use alloy_primitives::{Address, B256, U256};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use evmgate_core::{
    proof::EthGetProofResponse, ProofFetcher, ProvableBlock, StateProof, StorageReader,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::fmt::Debug;

/// A [JsonRpcClient] sends a single JSON-RPC request to a node and returns its `result`.
#[async_trait]
pub trait JsonRpcClient: Debug + Send + Sync {
    /// Sends `method` with positional `params`.
    async fn request(&self, method: &str, params: Value) -> Result<Value>;
}

/// A block selector for `eth_getBlockByNumber`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockTag {
    Latest,
    Finalized,
    Number(u64),
}

impl BlockTag {
    fn to_param(self) -> Value {
        match self {
            Self::Latest => json!("latest"),
            Self::Finalized => json!("finalized"),
            Self::Number(n) => json!(format!("{n:#x}")),
        }
    }
}

/// The [EvmProofHelper] reads storage and fetches EIP-1186 proofs through a [JsonRpcClient].
///
/// It implements [StorageReader] and [ProofFetcher] for any [ProvableBlock], using only the
/// block number.
#[derive(Debug, Clone)]
pub struct EvmProofHelper<C> {
    client: C,
}

impl<C: JsonRpcClient> EvmProofHelper<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Returns a reference to the [JsonRpcClient].
    pub fn client(&self) -> &C {
        &self.client
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T> {
        tracing::trace!(target: "evmgate::rpc", "{} {}", method, params);
        let result = self.client.request(method, params).await?;
        serde_json::from_value(result).map_err(|e| anyhow!("Invalid {method} response: {e}"))
    }

    /// Fetches a block header.
    pub async fn get_block_header(&self, tag: BlockTag) -> Result<BlockHeader> {
        let header: Option<BlockHeader> =
            self.call("eth_getBlockByNumber", json!([tag.to_param(), false])).await?;
        header.ok_or_else(|| anyhow!("Block {tag:?} not found"))
    }

    /// Returns the word at `slot` of `address` at block `number`.
    pub async fn get_storage_at(&self, number: u64, address: Address, slot: U256) -> Result<B256> {
        let params = json!([address, B256::from(slot), BlockTag::Number(number).to_param()]);
        self.call("eth_getStorageAt", params).await
    }

    /// Fetches the account proof of `address` and the storage proofs of `slots` at block
    /// `number`.
    pub async fn get_proofs(&self, number: u64, address: Address, slots: &[U256]) -> Result<StateProof> {
        let keys = slots.iter().map(|s| B256::from(*s)).collect::<Vec<_>>();
        let params = json!([address, keys, BlockTag::Number(number).to_param()]);
        let response: EthGetProofResponse = self.call("eth_getProof", params).await?;

        tracing::debug!(
            target: "evmgate::rpc",
            "Fetched {} storage proofs of {} at block {}",
            response.storage_proof.len(),
            address,
            number
        );
        Ok(response.into())
    }
}

#[async_trait]
impl<B: ProvableBlock, C: JsonRpcClient> StorageReader<B> for EvmProofHelper<C> {
    async fn get_storage_at(&self, block: &B, address: Address, slot: U256) -> Result<B256> {
        EvmProofHelper::get_storage_at(self, block.number(), address, slot).await
    }
}

#[async_trait]
impl<B: ProvableBlock, C: JsonRpcClient> ProofFetcher<B> for EvmProofHelper<C> {
    async fn get_proofs(&self, block: &B, address: Address, slots: &[U256]) -> Result<StateProof> {
        EvmProofHelper::get_proofs(self, block.number(), address, slots).await
    }
}
