//! The VM module contains the storage slot derivation machine.
//!
//! A [Command] is a 32 byte word: one flags byte followed by up to 31 single byte instructions.
//! The first instruction seeds the slot and every following instruction pushes an index that
//! is hashed into the running slot the way Solidity locates mapping entries.

/// Defines an enum type with underlying [u8] representation on variants, and a [TryFrom]
/// implementation automatically generated. The error carries the rejected value.
macro_rules! def_enum {
    ($enum:ident { $($variant:ident = $value:literal),* $(,)? }) => {
        #[doc = concat!("Supported ", stringify!($enum), "s within the slot derivation VM.")]
        #[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
        #[allow(clippy::upper_case_acronyms)]
        #[repr(u8)]
        pub enum $enum {
            $( $variant = $value ),*
        }

        impl TryFrom<u8> for $enum {
            type Error = u8;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $(
                        $value => Ok(Self::$variant),
                    )*
                    _ => Err(value),
                }
            }
        }
    }
}

pub(crate) use def_enum;

mod isa;
pub use isa::{Command, Instruction, Opcode, FLAG_DYNAMIC, HALT, OPCODE_MASK, OPERAND_MASK};

mod interpreter;
pub use interpreter::{compute_first_slot, execute_operation, FirstSlot};
