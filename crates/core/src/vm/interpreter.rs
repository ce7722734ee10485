//! Execution of [Command]s into base storage slots.

use super::{Command, Instruction, Opcode};
use crate::errors::{GatewayError, GatewayResult};
use alloy_primitives::{keccak256, Bytes, U256};

/// The output of [compute_first_slot].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FirstSlot {
    /// The base storage slot of the value.
    pub slot: U256,
    /// Whether the value stored at `slot` is dynamic length.
    pub is_dynamic: bool,
}

/// Executes a single instruction byte.
///
/// ### Takes
/// - `byte`: The raw instruction.
/// - `position`: Offset of the instruction in the command word, used for error reporting.
/// - `constants`: The constants table of the batch.
/// - `values`: The values resolved so far in the batch.
///
/// ### Returns
/// - `Ok(Some(bytes))` with the pushed operand value
/// - `Ok(None)` on `HALT`
/// - `Err(_)` on an unknown opcode or an operand that does not index an available value
pub fn execute_operation<'a>(
    byte: u8,
    position: usize,
    constants: &'a [Bytes],
    values: &'a [Bytes],
) -> GatewayResult<Option<&'a [u8]>> {
    let Instruction { opcode, operand } = Instruction::decode(byte)
        .map_err(|opcode| GatewayError::UnrecognizedOpcode { opcode, position })?;

    match opcode {
        Opcode::CONSTANT => constants
            .get(operand)
            .map(|c| Some(c.as_ref()))
            .ok_or(GatewayError::OperandOutOfRange { index: operand, len: constants.len() }),
        Opcode::BACKREF => values
            .get(operand)
            .map(|v| Some(v.as_ref()))
            .ok_or(GatewayError::ForwardBackreference { index: operand, available: values.len() }),
        Opcode::HALT => Ok(None),
    }
}

/// Computes the base slot of a [Command].
///
/// The instruction at position 1 seeds the slot with its value read as a big-endian integer.
/// Each following instruction up to `HALT` or the end of the word pushes an index, and the slot
/// becomes `keccak256(index ++ slot)` with the slot as a 32 byte big-endian word.
pub fn compute_first_slot(
    command: &Command,
    constants: &[Bytes],
    values: &[Bytes],
) -> GatewayResult<FirstSlot> {
    let instructions = command.instructions();

    let seed = execute_operation(instructions[0], 1, constants, values)?.ok_or_else(|| {
        GatewayError::MalformedCommand("command halts before its seed instruction".to_string())
    })?;
    let mut slot = U256::try_from_be_slice(seed).ok_or(GatewayError::SeedTooLarge(seed.len()))?;

    let mut preimage = Vec::with_capacity(64);
    for (offset, byte) in instructions.iter().enumerate().skip(1) {
        let Some(index) = execute_operation(*byte, offset + 1, constants, values)? else {
            break;
        };

        preimage.clear();
        preimage.extend_from_slice(index);
        preimage.extend_from_slice(&slot.to_be_bytes::<32>());
        slot = U256::from_be_bytes(keccak256(&preimage).0);
    }

    tracing::trace!(target: "evmgate::vm", "Derived slot {:#x} from command {}", slot, command.0);

    Ok(FirstSlot { slot, is_dynamic: command.is_dynamic() })
}
