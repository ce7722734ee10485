//! Testing utilities.

#![allow(missing_docs)]

use crate::{
    errors::{GatewayError, GatewayResult},
    proof::{StateProof, StateTrieProof, StorageProof},
    service::{ProofFetcher, ProvableBlock, ProvableBlockSupplier, StorageReader},
};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Decodable, RlpDecodable, RlpEncodable};
use alloy_sol_types::{sol, SolType};
use anyhow::Result;
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;

sol! {
    /// Anchoring data of a [MockBlock] proof.
    #[derive(Debug, PartialEq, Eq)]
    struct MockWitnessData {
        uint256 blockNo;
    }
}

/// Returns the storage word of a Solidity short `bytes`/`string` value.
pub fn short_word(value: &[u8]) -> B256 {
    assert!(value.len() < 32, "short values hold at most 31 bytes");
    let mut word = B256::ZERO;
    word[..value.len()].copy_from_slice(value);
    word[31] = (value.len() * 2) as u8;
    word
}

/// A provable block of the [MockChain]. Proofs are encoded as
/// `(tuple(uint256 blockNo), tuple(bytes[] stateTrieWitness, bytes[][] storageProofs))`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MockBlock {
    pub number: u64,
}

type MockProofParams = (MockWitnessData, StateTrieProof);

impl ProvableBlock for MockBlock {
    fn number(&self) -> u64 {
        self.number
    }

    fn encode_proof(&self, proof: StateProof) -> GatewayResult<Bytes> {
        let witness = MockWitnessData { blockNo: U256::from(self.number) };
        Ok(MockProofParams::abi_encode_params(&(witness, proof.into_state_trie_proof())).into())
    }
}

impl MockBlock {
    /// Decodes a proof produced by [MockBlock::encode_proof] into the block number, the account
    /// proof and the storage proofs.
    pub fn decode_proof(data: &[u8]) -> GatewayResult<(u64, (Vec<Bytes>, Vec<Vec<Bytes>>))> {
        let (witness, proof) = MockProofParams::abi_decode_params(data, true)?;
        Ok((witness.blockNo.to::<u64>(), proof.into_nodes()))
    }
}

/// The leaf node the [MockChain] returns as the storage proof of a slot.
#[derive(Clone, Debug, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct StorageLeaf {
    /// `keccak256(slot)`.
    pub path: Bytes,
    /// RLP encoding of the stored value.
    pub value: Bytes,
}

#[derive(Debug, Default)]
struct ChainState {
    storage: HashMap<(Address, U256), B256>,
    storage_reads: usize,
    proof_fetches: usize,
    provable_block_calls: usize,
    last_proven_slots: Vec<U256>,
    last_proven_target: Option<Address>,
    fail_storage_reads: bool,
    drop_last_storage_proof: bool,
}

/// An in-memory chain that counts every call made by the gateway.
#[derive(Debug, Clone)]
pub struct MockChain {
    block_number: u64,
    state: Arc<Mutex<ChainState>>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self { block_number: 1, state: Default::default() }
    }
}

impl MockChain {
    pub async fn set_storage(&self, address: Address, slot: U256, word: B256) {
        self.state.lock().await.storage.insert((address, slot), word);
    }

    /// Stores `value` at `slot` using Solidity's `bytes`/`string` layout.
    pub async fn set_bytes(&self, address: Address, slot: U256, value: &[u8]) {
        if value.len() < 32 {
            return self.set_storage(address, slot, short_word(value)).await;
        }

        let length_word = U256::from(value.len() * 2 + 1);
        self.set_storage(address, slot, B256::from(length_word.to_be_bytes::<32>())).await;

        let data_start = U256::from_be_bytes(keccak256(slot.to_be_bytes::<32>()).0);
        for (i, chunk) in value.chunks(32).enumerate() {
            let mut word = B256::ZERO;
            word[..chunk.len()].copy_from_slice(chunk);
            self.set_storage(address, data_start + U256::from(i), word).await;
        }
    }

    pub async fn storage_reads(&self) -> usize {
        self.state.lock().await.storage_reads
    }

    pub async fn proof_fetches(&self) -> usize {
        self.state.lock().await.proof_fetches
    }

    pub async fn provable_block_calls(&self) -> usize {
        self.state.lock().await.provable_block_calls
    }

    pub async fn last_proven_slots(&self) -> Vec<U256> {
        self.state.lock().await.last_proven_slots.clone()
    }

    pub async fn last_proven_target(&self) -> Option<Address> {
        self.state.lock().await.last_proven_target
    }

    pub async fn fail_storage_reads(&self, fail: bool) {
        self.state.lock().await.fail_storage_reads = fail;
    }

    pub async fn drop_last_storage_proof(&self, drop: bool) {
        self.state.lock().await.drop_last_storage_proof = drop;
    }

    /// Extracts the value proven by a storage proof of the [MockChain].
    pub fn proven_value(proof: &[Bytes]) -> GatewayResult<U256> {
        let node = proof.last().ok_or_else(|| GatewayError::Encoding("empty proof".to_string()))?;
        let leaf = StorageLeaf::decode(&mut node.as_ref())?;
        Ok(U256::decode(&mut leaf.value.as_ref())?)
    }
}

#[async_trait]
impl ProvableBlockSupplier for MockChain {
    type Block = MockBlock;

    async fn get_provable_block(&self) -> Result<MockBlock> {
        self.state.lock().await.provable_block_calls += 1;
        Ok(MockBlock { number: self.block_number })
    }
}

#[async_trait]
impl StorageReader<MockBlock> for MockChain {
    async fn get_storage_at(&self, _: &MockBlock, address: Address, slot: U256) -> Result<B256> {
        let mut state = self.state.lock().await;
        state.storage_reads += 1;
        if state.fail_storage_reads {
            anyhow::bail!("storage read of slot {slot:#x} failed");
        }
        Ok(state.storage.get(&(address, slot)).copied().unwrap_or_default())
    }
}

#[async_trait]
impl ProofFetcher<MockBlock> for MockChain {
    async fn get_proofs(&self, _: &MockBlock, address: Address, slots: &[U256]) -> Result<StateProof> {
        let mut state = self.state.lock().await;
        state.proof_fetches += 1;
        state.last_proven_slots = slots.to_vec();
        state.last_proven_target = Some(address);

        let mut storage_proofs = slots
            .iter()
            .map(|slot| {
                let word = state.storage.get(&(address, *slot)).copied().unwrap_or_default();
                let leaf = StorageLeaf {
                    path: keccak256(slot.to_be_bytes::<32>()).into(),
                    value: alloy_rlp::encode(U256::from_be_bytes(word.0)).into(),
                };
                StorageProof { key: *slot, proof: vec![alloy_rlp::encode(leaf).into()] }
            })
            .collect::<Vec<_>>();
        if state.drop_last_storage_proof {
            storage_proofs.pop();
        }

        let storage_root = keccak256(
            storage_proofs
                .iter()
                .flat_map(|p| p.proof.iter().flat_map(|node| node.iter().copied()))
                .collect::<Vec<u8>>(),
        );

        Ok(StateProof {
            state_trie_witness: vec![alloy_rlp::encode(vec![Bytes::from(keccak256(address).0)]).into()],
            storage_proofs,
            storage_root,
        })
    }
}
