//! OP Stack proofs, anchored to an output root posted to L1 either through the legacy
//! `L2OutputOracle` or through a dispute game.

use crate::rpc::{BlockTag, EvmProofHelper, JsonRpcClient};
use alloy_primitives::{address, keccak256, Address, Bytes, B256, U256};
use alloy_sol_types::{sol, SolType};
use anyhow::Result;
use evmgate_core::{
    GatewayError, GatewayResult, MerkleTrieProof, ProvableBlock, StateProof, StateTrieProof,
};

/// The `L2ToL1MessagePasser` predeploy, whose storage root is committed to by every output root.
pub const L2_TO_L1_MESSAGE_PASSER: Address = address!("4200000000000000000000000000000000000016");

sol! {
    /// The preimage of an output root.
    #[derive(Debug, PartialEq, Eq)]
    struct OutputRootProof {
        bytes32 version;
        bytes32 stateRoot;
        bytes32 messagePasserStorageRoot;
        bytes32 latestBlockhash;
    }

    /// Anchoring data of a proof against the `L2OutputOracle`.
    #[derive(Debug, PartialEq, Eq)]
    struct OutputOracleWitnessData {
        uint256 l2OutputIndex;
        OutputRootProof outputRootProof;
    }

    /// Anchoring data of a proof against a dispute game.
    #[derive(Debug, PartialEq, Eq)]
    struct DisputeGameWitnessData {
        uint256 disputeGameIndex;
        OutputRootProof outputRootProof;
    }
}

type OutputOracleProofParams = (OutputOracleWitnessData, MerkleTrieProof);
type DisputeGameProofParams = (DisputeGameWitnessData, StateTrieProof);

impl OutputRootProof {
    /// Builds the output root preimage of L2 block `number`.
    pub async fn fetch<C: JsonRpcClient>(helper: &EvmProofHelper<C>, number: u64) -> Result<Self> {
        let header = helper.get_block_header(BlockTag::Number(number)).await?;
        let passer = helper.get_proofs(number, L2_TO_L1_MESSAGE_PASSER, &[]).await?;

        Ok(Self {
            version: B256::ZERO,
            stateRoot: header.state_root,
            messagePasserStorageRoot: passer.storage_root,
            latestBlockhash: header.hash(),
        })
    }

    /// `keccak256(version ++ stateRoot ++ messagePasserStorageRoot ++ latestBlockhash)`.
    pub fn output_root(&self) -> B256 {
        let mut preimage = [0u8; 128];
        preimage[..32].copy_from_slice(self.version.as_slice());
        preimage[32..64].copy_from_slice(self.stateRoot.as_slice());
        preimage[64..96].copy_from_slice(self.messagePasserStorageRoot.as_slice());
        preimage[96..].copy_from_slice(self.latestBlockhash.as_slice());
        keccak256(preimage)
    }

    /// Checks the preimage against the output root posted on L1.
    pub fn ensure_output_root(&self, expected: B256) -> GatewayResult<()> {
        let actual = self.output_root();
        if actual != expected {
            return Err(GatewayError::InconsistentState(format!(
                "output root {actual} does not match the posted root {expected}"
            )));
        }
        Ok(())
    }
}

/// An L2 block proposed in output `l2_output_index` of the `L2OutputOracle`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputOracleBlock {
    pub number: u64,
    pub l2_output_index: U256,
    pub output: OutputRootProof,
}

impl ProvableBlock for OutputOracleBlock {
    fn number(&self) -> u64 {
        self.number
    }

    fn encode_proof(&self, proof: StateProof) -> GatewayResult<Bytes> {
        let witness = OutputOracleWitnessData {
            l2OutputIndex: self.l2_output_index,
            outputRootProof: self.output.clone(),
        };
        let params = (witness, proof.into_merkle_trie_proof());
        Ok(OutputOracleProofParams::abi_encode_params(&params).into())
    }
}

/// An L2 block whose output root is the root claim of dispute game `dispute_game_index`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisputeGameBlock {
    pub number: u64,
    pub dispute_game_index: U256,
    pub output: OutputRootProof,
}

impl ProvableBlock for DisputeGameBlock {
    fn number(&self) -> u64 {
        self.number
    }

    fn encode_proof(&self, proof: StateProof) -> GatewayResult<Bytes> {
        let witness = DisputeGameWitnessData {
            disputeGameIndex: self.dispute_game_index,
            outputRootProof: self.output.clone(),
        };
        let params = (witness, proof.into_state_trie_proof());
        Ok(DisputeGameProofParams::abi_encode_params(&params).into())
    }
}

/// Decodes a proof produced by [OutputOracleBlock::encode_proof].
pub fn decode_output_oracle_proof(
    data: &[u8],
) -> GatewayResult<(OutputOracleWitnessData, MerkleTrieProof)> {
    Ok(OutputOracleProofParams::abi_decode_params(data, true)?)
}

/// Decodes a proof produced by [DisputeGameBlock::encode_proof].
pub fn decode_dispute_game_proof(
    data: &[u8],
) -> GatewayResult<(DisputeGameWitnessData, StateTrieProof)> {
    Ok(DisputeGameProofParams::abi_decode_params(data, true)?)
}
