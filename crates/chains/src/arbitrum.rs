//! Arbitrum proofs, anchored to an assertion node of the rollup contract on L1.

use crate::header::BlockHeader;
use alloy_primitives::{Bytes, B256};
use alloy_rlp::Decodable;
use alloy_sol_types::{sol, SolType};
use evmgate_core::{GatewayResult, MerkleTrieProof, ProvableBlock, StateProof};

sol! {
    /// Anchoring data of an Arbitrum proof.
    #[derive(Debug, PartialEq, Eq)]
    struct ArbWitnessData {
        bytes32 version;
        bytes32 sendRoot;
        uint64 nodeIndex;
        bytes rlpEncodedBlock;
    }
}

type ArbProofParams = (ArbWitnessData, MerkleTrieProof);

/// An L2 block confirmed by rollup node `node_index`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArbProvableBlock {
    /// The send root of the node.
    pub send_root: B256,
    /// Index of the rollup node that created the block.
    pub node_index: u64,
    /// The L2 block header. The verifier checks its hash against the node's confirm data.
    pub header: BlockHeader,
}

impl ProvableBlock for ArbProvableBlock {
    fn number(&self) -> u64 {
        self.header.block_number()
    }

    fn encode_proof(&self, proof: StateProof) -> GatewayResult<Bytes> {
        let witness = ArbWitnessData {
            version: B256::ZERO,
            sendRoot: self.send_root,
            nodeIndex: self.node_index,
            rlpEncodedBlock: alloy_rlp::encode(&self.header).into(),
        };
        let params = (witness, proof.into_merkle_trie_proof());
        Ok(ArbProofParams::abi_encode_params(&params).into())
    }
}

impl ArbWitnessData {
    /// Decodes the RLP encoded L2 block header.
    pub fn header(&self) -> GatewayResult<BlockHeader> {
        Ok(BlockHeader::decode(&mut self.rlpEncodedBlock.as_ref())?)
    }
}

/// Decodes a proof produced by [ArbProvableBlock::encode_proof].
pub fn decode_proof(data: &[u8]) -> GatewayResult<(ArbWitnessData, MerkleTrieProof)> {
    Ok(ArbProofParams::abi_decode_params(data, true)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_primitives::{bytes, U256, U64};
    use evmgate_core::StorageProof;

    #[test]
    fn encode_decode() {
        let block = ArbProvableBlock {
            send_root: B256::repeat_byte(0x5E),
            node_index: 1312,
            header: BlockHeader {
                number: U64::from(84),
                base_fee_per_gas: Some(U256::from(100_000_000)),
                ..Default::default()
            },
        };
        let proof = StateProof {
            state_trie_witness: vec![bytes!("c180")],
            storage_proofs: vec![StorageProof { key: U256::from(1), proof: vec![bytes!("c101")] }],
            storage_root: B256::ZERO,
        };

        let encoded = block.encode_proof(proof.clone()).unwrap();
        let (witness, merkle) = decode_proof(&encoded).unwrap();

        assert_eq!(witness.version, B256::ZERO);
        assert_eq!(witness.sendRoot, block.send_root);
        assert_eq!(witness.nodeIndex, 1312);
        assert_eq!(witness.header().unwrap(), block.header);
        assert_eq!(merkle.decode_nodes().unwrap(), (proof.state_trie_witness.clone(), proof.storage_nodes()));
        assert_eq!(block.number(), 84);
    }

    #[test]
    fn rejects_truncated_data() {
        let block = ArbProvableBlock {
            send_root: B256::ZERO,
            node_index: 0,
            header: BlockHeader::default(),
        };
        let encoded = block.encode_proof(StateProof::default()).unwrap();
        assert!(decode_proof(&encoded[..encoded.len() - 1]).is_err());
    }
}
