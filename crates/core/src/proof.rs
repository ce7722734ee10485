//! This module contains the [StateProof] returned by a [crate::ProofFetcher] and the two
//! ABI layouts the verifiers accept for it.

use crate::errors::{GatewayError, GatewayResult};
use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_rlp::Decodable;
use alloy_sol_types::sol;
use serde::{Deserialize, Serialize};

sol! {
    /// Witness layout where each node list is RLP encoded into a single byte string.
    #[derive(Debug, PartialEq, Eq)]
    struct MerkleTrieProof {
        bytes stateTrieWitness;
        bytes[] storageProofs;
    }

    /// Witness layout carrying the raw trie nodes.
    #[derive(Debug, PartialEq, Eq)]
    struct StateTrieProof {
        bytes[] stateTrieWitness;
        bytes[][] storageProofs;
    }
}

/// The storage trie witness of a single slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProof {
    /// The slot being proven.
    pub key: U256,
    /// Trie nodes from the storage root down to the slot.
    pub proof: Vec<Bytes>,
}

/// A [StateProof] holds the account proof of a contract and one storage proof per requested
/// slot, in request order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateProof {
    /// Trie nodes from the state root down to the account.
    pub state_trie_witness: Vec<Bytes>,
    /// Storage proofs, positionally matching the requested slots.
    pub storage_proofs: Vec<StorageProof>,
    /// Root of the account's storage trie.
    pub storage_root: B256,
}

impl StateProof {
    /// Checks that the proof carries exactly one storage proof per requested slot, in order.
    pub fn ensure_matches(&self, slots: &[U256]) -> GatewayResult<()> {
        if self.storage_proofs.len() != slots.len() {
            return Err(GatewayError::InconsistentState(format!(
                "requested {} slots, received {} storage proofs",
                slots.len(),
                self.storage_proofs.len()
            )));
        }

        for (i, (proof, slot)) in self.storage_proofs.iter().zip(slots).enumerate() {
            if proof.key != *slot {
                return Err(GatewayError::InconsistentState(format!(
                    "storage proof {i} is for slot {:#x}, expected {:#x}",
                    proof.key, slot
                )));
            }
        }

        Ok(())
    }

    /// The node lists of every storage proof.
    pub fn storage_nodes(&self) -> Vec<Vec<Bytes>> {
        self.storage_proofs.iter().map(|p| p.proof.clone()).collect()
    }

    /// Converts into the RLP joined [MerkleTrieProof] layout.
    pub fn into_merkle_trie_proof(self) -> MerkleTrieProof {
        MerkleTrieProof {
            stateTrieWitness: alloy_rlp::encode(&self.state_trie_witness).into(),
            storageProofs: self
                .storage_proofs
                .iter()
                .map(|p| alloy_rlp::encode(&p.proof).into())
                .collect(),
        }
    }

    /// Converts into the raw [StateTrieProof] layout.
    pub fn into_state_trie_proof(self) -> StateTrieProof {
        StateTrieProof {
            stateTrieWitness: self.state_trie_witness,
            storageProofs: self.storage_proofs.into_iter().map(|p| p.proof).collect(),
        }
    }
}

impl MerkleTrieProof {
    /// Decodes the RLP joined node lists back into the account proof and the storage proofs.
    pub fn decode_nodes(&self) -> GatewayResult<(Vec<Bytes>, Vec<Vec<Bytes>>)> {
        let state = decode_node_list(&self.stateTrieWitness)?;
        let storage =
            self.storageProofs.iter().map(|p| decode_node_list(p)).collect::<GatewayResult<_>>()?;
        Ok((state, storage))
    }
}

impl StateTrieProof {
    /// Splits into the account proof and the storage proofs.
    pub fn into_nodes(self) -> (Vec<Bytes>, Vec<Vec<Bytes>>) {
        (self.stateTrieWitness, self.storageProofs)
    }
}

fn decode_node_list(mut buf: &[u8]) -> GatewayResult<Vec<Bytes>> {
    let nodes = Vec::<Bytes>::decode(&mut buf)?;
    if !buf.is_empty() {
        return Err(GatewayError::Rlp(alloy_rlp::Error::UnexpectedLength));
    }
    Ok(nodes)
}

/// Response of the `eth_getProof` JSON-RPC method (EIP-1186).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EthGetProofResponse {
    /// The proven account.
    #[serde(default)]
    pub address: Address,
    /// Account balance.
    pub balance: U256,
    /// Code hash of the account.
    pub code_hash: B256,
    /// Account nonce.
    pub nonce: U64,
    /// Root of the account's storage trie.
    pub storage_hash: B256,
    /// Trie nodes from the state root down to the account.
    pub account_proof: Vec<Bytes>,
    /// One entry per requested key.
    pub storage_proof: Vec<EthStorageProof>,
}

/// A single storage entry of an [EthGetProofResponse].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthStorageProof {
    /// The requested slot.
    pub key: U256,
    /// The value stored at the slot.
    pub value: U256,
    /// Trie nodes from the storage root down to the slot.
    pub proof: Vec<Bytes>,
}

impl From<EthGetProofResponse> for StateProof {
    fn from(res: EthGetProofResponse) -> Self {
        Self {
            state_trie_witness: res.account_proof,
            storage_proofs: res
                .storage_proof
                .into_iter()
                .map(|p| StorageProof { key: p.key, proof: p.proof })
                .collect(),
            storage_root: res.storage_hash,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy_primitives::{b256, bytes};

    fn sample() -> StateProof {
        StateProof {
            state_trie_witness: vec![bytes!("f851a0aa"), bytes!("e2a0bb01")],
            storage_proofs: vec![
                StorageProof { key: U256::from(0), proof: vec![bytes!("c0")] },
                StorageProof { key: U256::from(9), proof: vec![bytes!("01"), bytes!("0203")] },
            ],
            storage_root: B256::repeat_byte(0x11),
        }
    }

    #[test]
    fn merkle_trie_proof_round_trip() {
        let proof = sample();
        let merkle = proof.clone().into_merkle_trie_proof();
        let (state, storage) = merkle.decode_nodes().unwrap();
        assert_eq!(state, proof.state_trie_witness);
        assert_eq!(storage, proof.storage_nodes());
    }

    #[test]
    fn state_trie_proof_round_trip() {
        let proof = sample();
        let (state, storage) = proof.clone().into_state_trie_proof().into_nodes();
        assert_eq!(state, proof.state_trie_witness);
        assert_eq!(storage, proof.storage_nodes());
    }

    #[test]
    fn ensure_matches_slots() {
        let proof = sample();
        proof.ensure_matches(&[U256::from(0), U256::from(9)]).unwrap();

        let err = proof.ensure_matches(&[U256::from(0)]).unwrap_err();
        assert!(err.is_chain_state());

        let err = proof.ensure_matches(&[U256::from(9), U256::from(0)]).unwrap_err();
        assert!(matches!(err, GatewayError::InconsistentState(_)));
    }

    #[test]
    fn trailing_rlp_rejected() {
        let merkle = MerkleTrieProof {
            stateTrieWitness: bytes!("c0ff"),
            storageProofs: vec![],
        };
        assert!(matches!(merkle.decode_nodes(), Err(GatewayError::Rlp(_))));
    }

    #[test]
    fn eth_get_proof_json() {
        let json = r#"{
            "address": "0x7f0d15c7faae65896648c8273b6d7e43f58fa842",
            "accountProof": ["0xf90211a0", "0xf8669d33"],
            "balance": "0x0",
            "codeHash": "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470",
            "nonce": "0x1",
            "storageHash": "0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421",
            "storageProof": [
                { "key": "0x0", "value": "0x2a", "proof": ["0xe3a120"] }
            ]
        }"#;
        let res: EthGetProofResponse = serde_json::from_str(json).unwrap();
        assert_eq!(res.storage_proof[0].value, U256::from(42));

        let proof = StateProof::from(res);
        assert_eq!(proof.state_trie_witness, vec![bytes!("f90211a0"), bytes!("f8669d33")]);
        assert_eq!(proof.storage_proofs[0].key, U256::ZERO);
        assert_eq!(proof.storage_proofs[0].proof, vec![bytes!("e3a120")]);
        assert_eq!(
            proof.storage_root,
            b256!("56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421")
        );
    }
}
