//! Transfer protocol registry.
//!
//! Maps a [`TransferProtocol`] name to the factory that builds its
//! [`DataTransferClient`]. The composition root creates one registry, lets each
//! transport crate register itself during startup, and then shares it behind an
//! `Arc` with every worker client. Registration takes `&mut self`, so once the
//! registry is shared the set of protocols is fixed for the life of the process.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::{DataTransferClient, TransferConfig, TransferError, TransferProtocol};

/// Builds a transport for one worker.
pub type TransferClientFactory = Box<
    dyn Fn(&TransferConfig) -> Result<Arc<dyn DataTransferClient>, TransferError> + Send + Sync,
>;

/// Protocol name → transport factory.
#[derive(Default)]
pub struct TransferRegistry {
    factories: HashMap<TransferProtocol, TransferClientFactory>,
}

impl TransferRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `protocol`.
    ///
    /// # Errors
    ///
    /// [`TransferError::DuplicateProtocol`] if `protocol` is already
    /// registered. The existing factory is kept.
    pub fn register<F>(&mut self, protocol: TransferProtocol, factory: F) -> Result<(), TransferError>
    where
        F: Fn(&TransferConfig) -> Result<Arc<dyn DataTransferClient>, TransferError>
            + Send
            + Sync
            + 'static,
    {
        if self.factories.contains_key(&protocol) {
            return Err(TransferError::DuplicateProtocol { protocol });
        }
        debug!(protocol = %protocol, "registered transfer protocol");
        self.factories.insert(protocol, Box::new(factory));
        Ok(())
    }

    /// Builds a transport for `config` using the factory registered under `protocol`.
    ///
    /// # Errors
    ///
    /// [`TransferError::ProtocolNotFound`] if nothing is registered under
    /// `protocol`; otherwise whatever the factory returns.
    pub fn build(
        &self,
        protocol: &TransferProtocol,
        config: &TransferConfig,
    ) -> Result<Arc<dyn DataTransferClient>, TransferError> {
        let factory =
            self.factories
                .get(protocol)
                .ok_or_else(|| TransferError::ProtocolNotFound {
                    protocol: protocol.clone(),
                    available: self.protocols().iter().map(ToString::to_string).collect(),
                })?;
        factory(config)
    }

    /// Returns `true` if a factory is registered under `protocol`.
    pub fn contains(&self, protocol: &TransferProtocol) -> bool {
        self.factories.contains_key(protocol)
    }

    /// Registered protocol names, sorted.
    pub fn protocols(&self) -> Vec<TransferProtocol> {
        let mut names: Vec<_> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for TransferRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferRegistry")
            .field("protocols", &self.protocols())
            .finish()
    }
}
