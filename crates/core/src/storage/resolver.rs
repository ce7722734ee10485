//! Resolution of derived slots into [StorageElement]s.

use super::element::{Accessor, StorageElement};
use crate::{
    config::GatewayConfig,
    errors::{GatewayError, GatewayResult},
    service::ProofService,
    vm::FirstSlot,
};
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use tokio::sync::OnceCell;

/// The decoded layout of a Solidity `bytes`/`string` value from the word at its base slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DynamicLayout {
    /// Up to 31 bytes stored inline in the base slot. The lowest byte is `len * 2`.
    Short(Bytes),
    /// The base slot holds `len * 2 + 1` and the data starts at `keccak256(slot)`.
    Long {
        /// Value length in bytes.
        len: usize,
        /// The `ceil(len / 32)` slots holding the data.
        data_slots: Vec<U256>,
    },
}

/// Decodes the length word of a dynamic value stored at `slot`.
///
/// ### Takes
/// - `slot`: The base slot the word was read from.
/// - `word`: The raw storage word.
/// - `max_len`: The largest long value accepted.
pub fn decode_dynamic_word(slot: U256, word: B256, max_len: usize) -> GatewayResult<DynamicLayout> {
    let last = word[31];

    if last & 0x01 == 0 {
        let len = (last / 2) as usize;
        if len > 31 {
            return Err(GatewayError::MalformedValue {
                slot,
                reason: format!("short value length {len} exceeds 31 bytes"),
            });
        }
        return Ok(DynamicLayout::Short(Bytes::copy_from_slice(&word[..len])));
    }

    let encoded_len = (U256::from_be_bytes(word.0) - U256::from(1)) / U256::from(2);
    let len = usize::try_from(encoded_len)
        .ok()
        .filter(|len| *len <= max_len)
        .ok_or(GatewayError::ValueTooLarge { slot, len: encoded_len, max: max_len })?;

    let data_start = U256::from_be_bytes(keccak256(slot.to_be_bytes::<32>()).0);
    let data_slots =
        (0..len.div_ceil(32)).map(|i| data_start.wrapping_add(U256::from(i))).collect();

    Ok(DynamicLayout::Long { len, data_slots })
}

/// Builds the [StorageElement] for a value whose base slot has been derived by the VM.
///
/// Fixed values produce a single slot element without any I/O. Dynamic values read the length
/// word at the base slot first to learn how many slots the value spans.
pub async fn resolve<'a, S: ProofService>(
    service: &'a S,
    block: &'a S::Block,
    address: Address,
    first: FirstSlot,
    config: &GatewayConfig,
) -> GatewayResult<StorageElement<'a, S>> {
    let FirstSlot { slot, is_dynamic } = first;

    let (slots, accessor) = if is_dynamic {
        let word = service.get_storage_at(block, address, slot).await?;
        match decode_dynamic_word(slot, word, config.max_value_length)? {
            DynamicLayout::Short(value) => {
                tracing::debug!(target: "evmgate::storage", "Short value of {} bytes at {:#x}", value.len(), slot);
                (vec![slot], Accessor::Inline(value))
            }
            DynamicLayout::Long { len, data_slots } => {
                tracing::debug!(target: "evmgate::storage", "Long value of {} bytes at {:#x}", len, slot);
                let mut slots = Vec::with_capacity(data_slots.len() + 1);
                slots.push(slot);
                slots.extend(data_slots);
                (slots, Accessor::Span { len })
            }
        }
    } else {
        (vec![slot], Accessor::Word)
    };

    Ok(StorageElement {
        service,
        block,
        address,
        slots,
        is_dynamic,
        parallel_reads: config.parallel_reads,
        accessor,
        value: OnceCell::new(),
    })
}
