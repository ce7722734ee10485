//! Selection of a proof layout by chain.

use crate::{arbitrum, l1, optimism, scroll};
use alloy_primitives::Bytes;
use evmgate_core::GatewayResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// The chains a gateway can serve, each with its own verifier layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChainKind {
    Arbitrum,
    OpOutputOracle,
    OpDisputeGame,
    Scroll,
    L1,
}

/// Error returned when parsing an unknown [ChainKind].
#[derive(Debug, Error)]
#[error("Unknown chain kind `{0}`, expected one of: arbitrum, op-output-oracle, op-dispute-game, scroll, l1")]
pub struct UnknownChainKind(String);

impl ChainKind {
    /// All chain kinds.
    pub const ALL: [ChainKind; 5] =
        [Self::Arbitrum, Self::OpOutputOracle, Self::OpDisputeGame, Self::Scroll, Self::L1];

    /// The name used in configuration and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Arbitrum => "arbitrum",
            Self::OpOutputOracle => "op-output-oracle",
            Self::OpDisputeGame => "op-dispute-game",
            Self::Scroll => "scroll",
            Self::L1 => "l1",
        }
    }

    /// Decodes a proof in this chain's layout.
    pub fn decode_proof(&self, data: &[u8]) -> GatewayResult<DecodedProof> {
        let decoded = match self {
            Self::Arbitrum => {
                let (witness, proof) = arbitrum::decode_proof(data)?;
                let (account_proof, storage_proofs) = proof.decode_nodes()?;
                DecodedProof {
                    chain: *self,
                    witness: json!({
                        "version": witness.version,
                        "sendRoot": witness.sendRoot,
                        "nodeIndex": witness.nodeIndex,
                        "block": witness.header()?,
                    }),
                    account_proof,
                    storage_proofs,
                }
            }
            Self::OpOutputOracle => {
                let (witness, proof) = optimism::decode_output_oracle_proof(data)?;
                let (account_proof, storage_proofs) = proof.decode_nodes()?;
                DecodedProof {
                    chain: *self,
                    witness: json!({
                        "l2OutputIndex": witness.l2OutputIndex,
                        "outputRootProof": output_root_json(&witness.outputRootProof),
                    }),
                    account_proof,
                    storage_proofs,
                }
            }
            Self::OpDisputeGame => {
                let (witness, proof) = optimism::decode_dispute_game_proof(data)?;
                let (account_proof, storage_proofs) = proof.into_nodes();
                DecodedProof {
                    chain: *self,
                    witness: json!({
                        "disputeGameIndex": witness.disputeGameIndex,
                        "outputRootProof": output_root_json(&witness.outputRootProof),
                    }),
                    account_proof,
                    storage_proofs,
                }
            }
            Self::Scroll => {
                let (witness, proof) = scroll::decode_proof(data)?;
                let (compressed_account, compressed_storage) =
                    scroll::decompress_proof(&witness.compressedProof)?;
                let (account_proof, storage_proofs) = proof.into_nodes();
                DecodedProof {
                    chain: *self,
                    witness: json!({
                        "batchIndex": witness.batchIndex,
                        "storageKey": witness.storageKey,
                        "compressedProof": {
                            "accountProof": compressed_account,
                            "storageProof": compressed_storage,
                        },
                    }),
                    account_proof,
                    storage_proofs,
                }
            }
            Self::L1 => {
                let (witness, proof) = l1::decode_proof(data)?;
                let (account_proof, storage_proofs) = proof.into_nodes();
                DecodedProof {
                    chain: *self,
                    witness: json!({
                        "blockNo": witness.blockNo,
                        "blockHeader": witness.header()?,
                    }),
                    account_proof,
                    storage_proofs,
                }
            }
        };

        Ok(decoded)
    }
}

fn output_root_json(output: &optimism::OutputRootProof) -> Value {
    json!({
        "version": output.version,
        "stateRoot": output.stateRoot,
        "messagePasserStorageRoot": output.messagePasserStorageRoot,
        "latestBlockhash": output.latestBlockhash,
        "outputRoot": output.output_root(),
    })
}

impl fmt::Display for ChainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChainKind {
    type Err = UnknownChainKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownChainKind(s.to_string()))
    }
}

/// A proof split back into its anchoring data and trie nodes.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecodedProof {
    pub chain: ChainKind,
    pub witness: Value,
    pub account_proof: Vec<Bytes>,
    pub storage_proofs: Vec<Vec<Bytes>>,
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{header::BlockHeader, l1::L1ProvableBlock, scroll::ScrollProvableBlock};
    use alloy_primitives::{bytes, B256, U256, U64};
    use evmgate_core::{ProvableBlock, StateProof, StorageProof};

    fn proof() -> StateProof {
        StateProof {
            state_trie_witness: vec![bytes!("c180")],
            storage_proofs: vec![StorageProof { key: U256::from(1), proof: vec![bytes!("c101")] }],
            storage_root: B256::ZERO,
        }
    }

    #[test]
    fn parse_and_display() {
        for kind in ChainKind::ALL {
            assert_eq!(kind.to_string().parse::<ChainKind>().unwrap(), kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
        assert_eq!("L1".parse::<ChainKind>().unwrap(), ChainKind::L1);
        assert!("optimism".parse::<ChainKind>().is_err());
    }

    #[test]
    fn decode_l1_proof() {
        let block = L1ProvableBlock {
            header: BlockHeader { number: U64::from(77), ..Default::default() },
        };
        let decoded = ChainKind::L1.decode_proof(&block.encode_proof(proof()).unwrap()).unwrap();

        assert_eq!(decoded.witness["blockNo"], json!(U256::from(77)));
        assert_eq!(decoded.witness["blockHeader"]["number"], json!("0x4d"));
        assert_eq!(decoded.account_proof, proof().state_trie_witness);
        assert_eq!(decoded.storage_proofs, proof().storage_nodes());
    }

    #[test]
    fn decode_scroll_proof() {
        let block = ScrollProvableBlock { number: 5, batch_index: U256::from(2) };
        let decoded =
            ChainKind::Scroll.decode_proof(&block.encode_proof(proof()).unwrap()).unwrap();

        assert_eq!(decoded.witness["compressedProof"]["accountProof"], json!(["0xc180"]));
        assert_eq!(decoded.witness["compressedProof"]["storageProof"], json!(["0xc101"]));
    }

    #[test]
    fn wrong_layout_is_an_error() {
        assert!(ChainKind::Arbitrum.decode_proof(&[0u8; 7]).is_err());
    }
}
