//! Contains the [StorageElement] produced for each command of a batch.

use crate::{
    errors::{GatewayError, GatewayResult},
    service::ProofService,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use futures::{stream, StreamExt, TryStreamExt};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Maximum number of continuation slots read at once when reads are parallel.
pub const MAX_CONCURRENT_READS: usize = 16;

/// How the value of a [StorageElement] is obtained.
#[derive(Debug)]
pub(crate) enum Accessor {
    /// A single 32 byte word read from the base slot.
    Word,
    /// A short dynamic value that was already decoded from the length word.
    Inline(Bytes),
    /// A long dynamic value of `len` bytes spread over the continuation slots.
    Span { len: usize },
}

/// A [StorageElement] is the set of slots that prove one requested value, together with a lazy
/// accessor for the value itself.
///
/// The accessor is single-flight: the first call to [StorageElement::value] performs the storage
/// reads, and every later or concurrent call observes the same result, failures included. An element only lives as
/// long as the batch that created it.
#[derive(Debug)]
pub struct StorageElement<'a, S: ProofService> {
    pub(crate) service: &'a S,
    pub(crate) block: &'a S::Block,
    pub(crate) address: Address,
    /// The base slot first, followed by the continuation slots of a long value.
    pub(crate) slots: Vec<U256>,
    pub(crate) is_dynamic: bool,
    pub(crate) parallel_reads: bool,
    pub(crate) accessor: Accessor,
    pub(crate) value: OnceCell<Result<Bytes, Arc<GatewayError>>>,
}

impl<'a, S: ProofService> StorageElement<'a, S> {
    /// The contract the value is read from.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Every slot needed to prove the value, base slot first.
    pub fn slots(&self) -> &[U256] {
        &self.slots
    }

    /// Returns `true` if the value is dynamic length.
    pub fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Consumes the element, returning its slots.
    pub fn into_slots(self) -> Vec<U256> {
        self.slots
    }

    /// Returns the value, reading storage on the first call only.
    ///
    /// Fixed values are the full 32 byte word. Dynamic values are the decoded `bytes`/`string`
    /// contents.
    pub async fn value(&self) -> GatewayResult<Bytes> {
        let outcome = self.value.get_or_init(|| async { self.fetch().await.map_err(Arc::new) }).await;
        outcome.clone().map_err(GatewayError::Memoized)
    }

    async fn fetch(&self) -> GatewayResult<Bytes> {
        match &self.accessor {
            Accessor::Inline(value) => Ok(value.clone()),
            Accessor::Word => {
                let word = self.read(self.slots[0]).await?;
                Ok(Bytes::copy_from_slice(word.as_slice()))
            }
            Accessor::Span { len } => {
                let data_slots = &self.slots[1..];
                tracing::debug!(
                    target: "evmgate::storage",
                    "Reading {} continuation slots of {:#x} at {}",
                    data_slots.len(),
                    self.slots[0],
                    self.address
                );

                let words = if self.parallel_reads {
                    stream::iter(data_slots)
                        .map(|slot| self.read(*slot))
                        .buffered(MAX_CONCURRENT_READS)
                        .try_collect::<Vec<_>>()
                        .await?
                } else {
                    let mut words = Vec::with_capacity(data_slots.len());
                    for slot in data_slots {
                        words.push(self.read(*slot).await?);
                    }
                    words
                };

                let mut value = Vec::with_capacity(words.len() * 32);
                words.iter().for_each(|w| value.extend_from_slice(w.as_slice()));
                value.truncate(*len);
                Ok(value.into())
            }
        }
    }

    async fn read(&self, slot: U256) -> GatewayResult<B256> {
        Ok(self.service.get_storage_at(self.block, self.address, slot).await?)
    }
}
