//! The storage module turns derived slots into [StorageElement]s, decoding Solidity's layout for
//! dynamic values.

mod element;
pub use element::{StorageElement, MAX_CONCURRENT_READS};

mod resolver;
pub use resolver::{decode_dynamic_word, resolve, DynamicLayout};
