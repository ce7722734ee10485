//! Testing utilities.

#![allow(missing_docs)]

use crate::{header::BlockHeader, rpc::JsonRpcClient};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256, U64};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use evmgate_core::proof::{EthGetProofResponse, EthStorageProof};
use serde_json::{json, Value};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct NodeState {
    storage: HashMap<(Address, U256), B256>,
    headers: HashMap<u64, BlockHeader>,
    calls: Vec<(String, Value)>,
    fail_requests: bool,
}

/// An in-memory JSON-RPC node serving `eth_getBlockByNumber`, `eth_getStorageAt` and
/// `eth_getProof`. Storage is not versioned by block.
#[derive(Debug, Clone, Default)]
pub struct MockRpc {
    state: Arc<Mutex<NodeState>>,
}

impl MockRpc {
    pub async fn set_storage(&self, address: Address, slot: U256, word: B256) {
        self.state.lock().await.storage.insert((address, slot), word);
    }

    /// Adds a block at `number`, returning its header.
    pub async fn push_block(&self, number: u64) -> BlockHeader {
        let header = BlockHeader {
            number: U64::from(number),
            state_root: keccak256(number.to_be_bytes()),
            base_fee_per_gas: Some(U256::from(7)),
            ..Default::default()
        };
        self.state.lock().await.headers.insert(number, header.clone());
        header
    }

    pub async fn calls(&self) -> Vec<(String, Value)> {
        self.state.lock().await.calls.clone()
    }

    pub async fn fail_requests(&self, fail: bool) {
        self.state.lock().await.fail_requests = fail;
    }

    /// The storage root the node reports for `address`.
    pub fn storage_hash(address: Address) -> B256 {
        keccak256(keccak256(address))
    }

    fn block_number(state: &NodeState, tag: &Value) -> Result<Option<u64>> {
        match tag.as_str() {
            Some("latest") | Some("finalized") => Ok(state.headers.keys().max().copied()),
            Some(hex) => Ok(Some(u64::from_str_radix(hex.trim_start_matches("0x"), 16)?)),
            None => bail!("invalid block tag {tag}"),
        }
    }
}

#[async_trait]
impl JsonRpcClient for MockRpc {
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let mut state = self.state.lock().await;
        state.calls.push((method.to_string(), params.clone()));
        if state.fail_requests {
            bail!("connection refused");
        }

        match method {
            "eth_getBlockByNumber" => {
                let header = Self::block_number(&state, &params[0])?
                    .and_then(|n| state.headers.get(&n).cloned());
                Ok(serde_json::to_value(header)?)
            }
            "eth_getStorageAt" => {
                let address: Address = serde_json::from_value(params[0].clone())?;
                let slot: U256 = serde_json::from_value(params[1].clone())?;
                let word = state.storage.get(&(address, slot)).copied().unwrap_or_default();
                Ok(json!(word))
            }
            "eth_getProof" => {
                let address: Address = serde_json::from_value(params[0].clone())?;
                let keys: Vec<U256> = serde_json::from_value(params[1].clone())?;
                let storage_proof = keys
                    .into_iter()
                    .map(|key| {
                        let word = state.storage.get(&(address, key)).copied().unwrap_or_default();
                        EthStorageProof {
                            key,
                            value: U256::from_be_bytes(word.0),
                            proof: vec![Bytes::from(keccak256(key.to_be_bytes::<32>()).0)],
                        }
                    })
                    .collect();
                let response = EthGetProofResponse {
                    address,
                    balance: U256::ZERO,
                    code_hash: keccak256(b""),
                    nonce: U64::from(1),
                    storage_hash: Self::storage_hash(address),
                    account_proof: vec![Bytes::from(keccak256(address).0)],
                    storage_proof,
                };
                Ok(serde_json::to_value(response)?)
            }
            _ => Err(anyhow!("method {method} not supported")),
        }
    }
}
