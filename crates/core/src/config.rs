//! Runtime configuration of an [crate::EvmGateway].

use serde::{Deserialize, Serialize};

/// Limits and tuning knobs applied to every batch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewayConfig {
    /// Maximum number of commands accepted in one batch.
    pub max_commands: usize,
    /// Maximum length in bytes of a single long dynamic value. Each 32 bytes costs one storage
    /// read and one storage proof.
    pub max_value_length: usize,
    /// Read the continuation slots of a long value concurrently.
    pub parallel_reads: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { max_commands: 32, max_value_length: 1 << 20, parallel_reads: true }
    }
}
