//! Instruction encoding of the slot derivation VM.

use alloy_primitives::B256;
use serde::{Deserialize, Serialize};

/// Flag bit marking a command whose value is dynamic length (`bytes`, `string`).
pub const FLAG_DYNAMIC: u8 = 0x01;

/// Mask selecting the opcode bits of an instruction.
pub const OPCODE_MASK: u8 = 0xE0;

/// Mask selecting the operand bits of an instruction.
pub const OPERAND_MASK: u8 = 0x1F;

/// The canonical halt instruction. Unused trailing bytes of a command are filled with it.
pub const HALT: u8 = 0xFF;

def_enum!(Opcode {
    CONSTANT = 0x00,
    BACKREF = 0x20,
    HALT = 0xE0,
});

/// A single decoded VM instruction.
///
/// **Encoding:**
/// | Bit Offset | Description |
/// | ---------- | ----------- |
/// | `[0, 3)`   | Opcode      |
/// | `[3, 8)`   | Operand     |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Instruction {
    /// The opcode.
    pub opcode: Opcode,
    /// Index into the constants table or the resolved values.
    pub operand: usize,
}

impl Instruction {
    /// Decodes an instruction byte.
    ///
    /// ### Returns
    /// - `Ok(Instruction)` if the opcode bits name a known [Opcode]
    /// - `Err(opcode)` with the raw opcode bits otherwise
    pub fn decode(byte: u8) -> Result<Self, u8> {
        let opcode = Opcode::try_from(byte & OPCODE_MASK)?;
        Ok(Self { opcode, operand: (byte & OPERAND_MASK) as usize })
    }

    /// Encodes the instruction back into its byte form.
    pub fn encode(&self) -> u8 {
        self.opcode as u8 | (self.operand as u8 & OPERAND_MASK)
    }
}

/// A [Command] describes the storage location of one requested value.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command(pub B256);

impl Command {
    /// Assembles a command from its flags and instruction bytes, padding the remainder of the
    /// word with [HALT].
    ///
    /// ### Panics
    /// Panics if more than 31 instructions are given.
    pub fn new(flags: u8, instructions: &[u8]) -> Self {
        assert!(instructions.len() < 32, "a command holds at most 31 instructions");
        let mut word = [HALT; 32];
        word[0] = flags;
        word[1..=instructions.len()].copy_from_slice(instructions);
        Self(B256::from(word))
    }

    /// The flags byte.
    pub fn flags(&self) -> u8 {
        self.0[0]
    }

    /// Returns `true` if the value at the derived slot is dynamic length.
    pub fn is_dynamic(&self) -> bool {
        self.flags() & FLAG_DYNAMIC != 0
    }

    /// The raw instruction bytes, positions 1 through 31 of the word.
    pub fn instructions(&self) -> &[u8] {
        &self.0[1..]
    }
}

impl From<B256> for Command {
    fn from(word: B256) -> Self {
        Self(word)
    }
}

impl From<Command> for B256 {
    fn from(command: Command) -> Self {
        command.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn decode_instructions() {
        let constant = Instruction::decode(0x03).unwrap();
        assert_eq!(constant.opcode, Opcode::CONSTANT);
        assert_eq!(constant.operand, 3);

        let backref = Instruction::decode(0x3F).unwrap();
        assert_eq!(backref.opcode, Opcode::BACKREF);
        assert_eq!(backref.operand, 31);

        let halt = Instruction::decode(HALT).unwrap();
        assert_eq!(halt.opcode, Opcode::HALT);

        assert_eq!(Instruction::decode(0x41), Err(0x40));
        assert_eq!(Instruction::decode(0x80), Err(0x80));
    }

    #[test]
    fn encode_instruction() {
        let ins = Instruction { opcode: Opcode::BACKREF, operand: 2 };
        assert_eq!(ins.encode(), 0x22);
        assert_eq!(Instruction::decode(ins.encode()).unwrap(), ins);
    }

    #[test]
    fn command_padding() {
        let command = Command::new(FLAG_DYNAMIC, &[0x00, 0x21]);
        assert!(command.is_dynamic());
        assert_eq!(command.0[1], 0x00);
        assert_eq!(command.0[2], 0x21);
        assert!(command.0[3..].iter().all(|b| *b == HALT));
        assert!(!Command::new(0, &[0x00]).is_dynamic());
    }
}
