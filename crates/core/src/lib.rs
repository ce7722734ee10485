#![doc = include_str!("../README.md")]

pub mod config;
pub use config::GatewayConfig;

pub mod errors;
pub use errors::{GatewayError, GatewayResult};

pub mod vm;
pub use vm::{compute_first_slot, Command, FirstSlot};

pub mod storage;
pub use storage::StorageElement;

pub mod proof;
pub use proof::{MerkleTrieProof, StateProof, StateTrieProof, StorageProof};

pub mod service;
pub use service::{ProofFetcher, ProofService, ProvableBlock, ProvableBlockSupplier, StorageReader};

mod gateway;
pub use gateway::{abi, EvmGateway, GatewayBuilder, TargetRequest};

#[cfg(any(feature = "test-utils", test))]
pub mod test_utils;
