//! Scroll proofs, anchored to a finalized batch of the rollup contract on L1.
//!
//! The Scroll verifier walks a zkTrie proof packed into a single byte string:
//! `u8 count ++ account nodes ++ u8 count ++ storage nodes`.

use alloy_primitives::{Bytes, B256, U256};
use alloy_sol_types::{sol, SolType};
use evmgate_core::{GatewayError, GatewayResult, ProvableBlock, StateProof, StateTrieProof};

sol! {
    /// Anchoring data of a Scroll proof.
    #[derive(Debug, PartialEq, Eq)]
    struct ScrollWitnessData {
        uint256 batchIndex;
        bytes32 storageKey;
        bytes compressedProof;
    }
}

type ScrollProofParams = (ScrollWitnessData, StateTrieProof);

/// An L2 block committed in batch `batch_index`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScrollProvableBlock {
    pub number: u64,
    pub batch_index: U256,
}

impl ProvableBlock for ScrollProvableBlock {
    fn number(&self) -> u64 {
        self.number
    }

    fn encode_proof(&self, proof: StateProof) -> GatewayResult<Bytes> {
        let first = proof.storage_proofs.first();
        let storage_key = first.map(|p| B256::from(p.key)).unwrap_or_default();
        let storage_nodes = first.map(|p| p.proof.as_slice()).unwrap_or_default();

        let witness = ScrollWitnessData {
            batchIndex: self.batch_index,
            storageKey: storage_key,
            compressedProof: compress_proof(&proof.state_trie_witness, storage_nodes)?,
        };
        let params = (witness, proof.into_state_trie_proof());
        Ok(ScrollProofParams::abi_encode_params(&params).into())
    }
}

/// Packs an account proof and a storage proof into the compressed layout.
pub fn compress_proof(account: &[Bytes], storage: &[Bytes]) -> GatewayResult<Bytes> {
    let len = account.iter().chain(storage).map(|n| n.len()).sum::<usize>() + 2;
    let mut out = Vec::with_capacity(len);

    for nodes in [account, storage] {
        let count = u8::try_from(nodes.len()).map_err(|_| {
            GatewayError::Encoding(format!("{} proof nodes exceed the 255 node limit", nodes.len()))
        })?;
        out.push(count);
        nodes.iter().for_each(|n| out.extend_from_slice(n));
    }

    Ok(out.into())
}

/// Splits a compressed proof back into the account proof and the storage proof. Each node must
/// be a single RLP item.
pub fn decompress_proof(data: &[u8]) -> GatewayResult<(Vec<Bytes>, Vec<Bytes>)> {
    let mut buf = data;
    let account = take_nodes(&mut buf)?;
    let storage = take_nodes(&mut buf)?;
    if !buf.is_empty() {
        return Err(GatewayError::Encoding(format!(
            "{} trailing bytes after compressed proof",
            buf.len()
        )));
    }
    Ok((account, storage))
}

fn take_nodes(buf: &mut &[u8]) -> GatewayResult<Vec<Bytes>> {
    let data: &[u8] = *buf;
    let (&count, rest) = data
        .split_first()
        .ok_or_else(|| GatewayError::Encoding("missing node count".to_string()))?;
    *buf = rest;

    (0..count)
        .map(|_| {
            let mut probe = *buf;
            let header = alloy_rlp::Header::decode(&mut probe)?;
            let node_len = buf.len() - probe.len() + header.payload_length;
            if node_len > buf.len() {
                return Err(GatewayError::Rlp(alloy_rlp::Error::InputTooShort));
            }
            let data: &[u8] = *buf;
            let (node, rest) = data.split_at(node_len);
            *buf = rest;
            Ok(Bytes::copy_from_slice(node))
        })
        .collect()
}

/// Decodes a proof produced by [ScrollProvableBlock::encode_proof].
pub fn decode_proof(data: &[u8]) -> GatewayResult<(ScrollWitnessData, StateTrieProof)> {
    Ok(ScrollProofParams::abi_decode_params(data, true)?)
}
