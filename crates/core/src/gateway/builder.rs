//! The [GatewayBuilder] struct is a helper for building an [EvmGateway] struct.

use super::EvmGateway;
use crate::{config::GatewayConfig, service::ProofService};

/// The [GatewayBuilder] struct is a helper for building an [EvmGateway] struct.
#[derive(Debug)]
pub struct GatewayBuilder<S: ProofService> {
    /// The chain specific collaborators.
    service: S,
    /// The configuration to start from.
    config: GatewayConfig,
}

impl<S: ProofService> GatewayBuilder<S> {
    /// Starts a builder around `service` with the default [GatewayConfig].
    pub fn new(service: S) -> Self {
        Self { service, config: GatewayConfig::default() }
    }

    /// Builds the [EvmGateway] from the information contained within the [GatewayBuilder].
    pub fn build(self) -> EvmGateway<S> {
        tracing::debug!(target: "evmgate::gateway", "Building gateway with {:?}", self.config);
        EvmGateway { service: self.service, config: self.config }
    }

    pub fn with_config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_commands(mut self, max_commands: usize) -> Self {
        self.config.max_commands = max_commands;
        self
    }

    pub fn with_max_value_length(mut self, max_value_length: usize) -> Self {
        self.config.max_value_length = max_value_length;
        self
    }

    pub fn with_parallel_reads(mut self, parallel_reads: bool) -> Self {
        self.config.parallel_reads = parallel_reads;
        self
    }
}
