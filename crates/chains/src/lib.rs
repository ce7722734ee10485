#![doc = include_str!("../README.md")]

pub mod header;
pub use header::BlockHeader;

pub mod rpc;
pub use rpc::{BlockTag, EvmProofHelper, JsonRpcClient};

pub mod arbitrum;
pub use arbitrum::ArbProvableBlock;

pub mod optimism;
pub use optimism::{DisputeGameBlock, OutputOracleBlock, OutputRootProof};

pub mod scroll;
pub use scroll::ScrollProvableBlock;

pub mod l1;
pub use l1::{L1ProofService, L1ProvableBlock};

mod kind;
pub use kind::{ChainKind, DecodedProof, UnknownChainKind};

#[cfg(any(feature = "test-utils", test))]
pub mod test_utils;
