//! Error types for the gateway.

use alloy_primitives::{Address, U256};
use std::sync::Arc;
use thiserror::Error;

/// A [Result] type over a generic value with [GatewayError].
pub type GatewayResult<T> = Result<T, GatewayError>;

/// An error raised while deriving, resolving, fetching or encoding a storage proof.
///
/// Nothing in this crate retries on error. A failure anywhere in a batch aborts the whole batch.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The instruction at `position` carries an opcode the VM does not implement.
    #[error("Unrecognized opcode 0x{opcode:02x} at position {position}")]
    UnrecognizedOpcode {
        /// The opcode bits of the instruction.
        opcode: u8,
        /// Byte offset of the instruction within the command word.
        position: usize,
    },
    /// A `CONSTANT` operand indexes past the end of the constants table.
    #[error("Constant operand {index} out of range ({len} constants)")]
    OperandOutOfRange {
        /// The operand.
        index: usize,
        /// Number of constants supplied.
        len: usize,
    },
    /// A `BACKREF` operand indexes a value that has not been resolved yet.
    #[error("Backreference {index} is not resolved yet ({available} values available)")]
    ForwardBackreference {
        /// The operand.
        index: usize,
        /// Number of values resolved so far.
        available: usize,
    },
    /// The command cannot be executed at all.
    #[error("Malformed command: {0}")]
    MalformedCommand(String),
    /// The seed value does not fit in a 256 bit word.
    #[error("Seed value of {0} bytes does not fit in a storage slot")]
    SeedTooLarge(usize),
    /// The batch holds more commands than the gateway accepts.
    #[error("Too many commands: {count} > {max}")]
    TooManyCommands {
        /// Commands in the batch.
        count: usize,
        /// Configured maximum.
        max: usize,
    },
    /// A referential target could not be resolved from earlier values.
    #[error("Invalid target reference {0}")]
    InvalidTargetReference(Address),
    /// The calldata does not match any supported gateway function.
    #[error("Unknown function selector 0x{0}")]
    UnknownSelector(String),
    /// The returned proof does not line up with the requested slots, or the chain returned
    /// state that no longer matches the provable block.
    #[error("Inconsistent chain state: {0}")]
    InconsistentState(String),
    /// A storage word could not be decoded as a Solidity dynamic value.
    #[error("Malformed dynamic value at slot {slot}: {reason}")]
    MalformedValue {
        /// The slot holding the length word.
        slot: U256,
        /// What was wrong with it.
        reason: String,
    },
    /// A long dynamic value exceeds the configured maximum length.
    #[error("Dynamic value at slot {slot} is {len} bytes, limit is {max}")]
    ValueTooLarge {
        /// The slot holding the length word.
        slot: U256,
        /// The encoded length.
        len: U256,
        /// Configured maximum.
        max: usize,
    },
    /// A proof could not be packed into the verifier's layout.
    #[error("Encoding error: {0}")]
    Encoding(String),
    /// ABI coding failure.
    #[error(transparent)]
    Abi(#[from] alloy_sol_types::Error),
    /// RLP coding failure.
    #[error("RLP error: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    /// A provable block supplier, storage reader or proof fetcher failed.
    #[error(transparent)]
    Io(#[from] anyhow::Error),
    /// A failure recorded by a single-flight accessor, returned to every caller of it.
    #[error(transparent)]
    Memoized(Arc<GatewayError>),
}

impl GatewayError {
    /// Returns `true` if the error was caused by chain state that may have moved on since the
    /// provable block was selected. Callers may retry with a freshly fetched block.
    pub fn is_chain_state(&self) -> bool {
        if let Self::Memoized(inner) = self {
            return inner.is_chain_state();
        }
        matches!(
            self,
            Self::InconsistentState(_) | Self::MalformedValue { .. } | Self::ValueTooLarge { .. }
        )
    }

    /// Returns `true` if the request itself is malformed and will never succeed.
    pub fn is_malformed_program(&self) -> bool {
        if let Self::Memoized(inner) = self {
            return inner.is_malformed_program();
        }
        matches!(
            self,
            Self::UnrecognizedOpcode { .. }
                | Self::OperandOutOfRange { .. }
                | Self::ForwardBackreference { .. }
                | Self::MalformedCommand(_)
                | Self::SeedTooLarge(_)
                | Self::TooManyCommands { .. }
                | Self::InvalidTargetReference(_)
                | Self::UnknownSelector(_)
                | Self::Abi(_)
        )
    }
}
