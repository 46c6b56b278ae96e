//! Worker client facade.
//!
//! A [`WorkerClient`] is the handle a consumer holds for one worker. It decides
//! which transfer protocol to use, builds the transport through the shared
//! [`TransferRegistry`] on first use, and forwards element reads and
//! cancellation to it.
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** The facade sequences calls between the registry,
//! the local worker table, and whichever transport it built. It contains no
//! transport logic of its own.
//!
//! ## Protocol selection
//!
//! A client asked to use [`TransferProtocol::GRPC`] for an address where a
//! worker is running in this process switches to [`TransferProtocol::LOCAL`].
//! The choice is made once, when the transport is first built. If the local
//! worker later goes away the client does not fall back to the network: reads
//! fail with [`TransferError::Cancelled`], which keeps one task from being
//! served over two transports in the same session.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, instrument};
use transfer::{
    BandwidthCeiling, ClientId, DataTransferClient, ElementRequest, ElementResult, LocalWorkers,
    ProtocolName, TransferConfig, TransferError, TransferProtocol, TransferRegistry,
    WorkerAddress,
};

/// Caller-supplied settings for one worker client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerClientConfig {
    /// Worker to read from.
    pub address: WorkerAddress,
    /// Base protocol used to obtain credentials.
    pub protocol: ProtocolName,
    /// Preferred transfer protocol; may be overridden by [`TransferProtocol::LOCAL`].
    pub transfer_protocol: TransferProtocol,
    /// Bandwidth ceiling requested for network reads.
    pub max_bandwidth: Option<BandwidthCeiling>,
}

/// Handle for reading elements from one worker.
pub struct WorkerClient {
    id: ClientId,
    config: WorkerClientConfig,
    registry: Arc<TransferRegistry>,
    local_workers: Arc<LocalWorkers>,
    transport: Mutex<Option<Transport>>,
}

struct Transport {
    protocol: TransferProtocol,
    client: Arc<dyn DataTransferClient>,
}

impl WorkerClient {
    /// Creates a client. The transport is built on first use.
    pub fn new(
        config: WorkerClientConfig,
        registry: Arc<TransferRegistry>,
        local_workers: Arc<LocalWorkers>,
    ) -> Self {
        Self {
            id: ClientId::new_random(),
            config,
            registry,
            local_workers,
            transport: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn config(&self) -> &WorkerClientConfig {
        &self.config
    }

    /// The transfer protocol in use, once the transport has been built.
    pub fn transfer_protocol(&self) -> Option<TransferProtocol> {
        self.transport.lock().as_ref().map(|t| t.protocol.clone())
    }

    /// Builds the transport if it has not been built yet.
    ///
    /// Safe to call concurrently; exactly one transport is ever built. A
    /// failed attempt leaves the client uninitialised, so the next call tries
    /// again.
    ///
    /// # Errors
    ///
    /// Whatever the registry or the transport factory returns, e.g.
    /// [`TransferError::ProtocolNotFound`] or [`TransferError::Credentials`].
    pub fn initialize(&self) -> Result<(), TransferError> {
        self.ensure_initialized().map(|_| ())
    }

    /// Reads the next element of the request's task. Errors are not retried.
    #[instrument(
        name = "worker_client.get_element",
        skip_all,
        fields(client_id = %self.id, address = %self.config.address, task_id = %request.task_id())
    )]
    pub async fn get_element(&self, request: &ElementRequest) -> Result<ElementResult, TransferError> {
        let transport = self.ensure_initialized()?;
        transport.get_element(request).await
    }

    /// Cancels the transport. A no-op if no transport has been built.
    pub fn try_cancel(&self) {
        let transport = self.transport.lock().as_ref().map(|t| t.client.clone());
        match transport {
            Some(client) => {
                debug!(client_id = %self.id, address = %self.config.address, "cancelling worker client");
                client.try_cancel();
            }
            None => {
                debug!(client_id = %self.id, "cancel requested before transport was built");
            }
        }
    }

    fn ensure_initialized(&self) -> Result<Arc<dyn DataTransferClient>, TransferError> {
        let mut transport = self.transport.lock();
        if let Some(existing) = transport.as_ref() {
            return Ok(existing.client.clone());
        }

        let protocol = self.data_transfer_protocol();
        let transfer_config = TransferConfig {
            protocol: self.config.protocol.clone(),
            address: self.config.address.clone(),
            max_bandwidth: self.config.max_bandwidth,
        };
        let client = self.registry.build(&protocol, &transfer_config)?;
        debug!(
            client_id = %self.id,
            address = %self.config.address,
            requested = %self.config.transfer_protocol,
            protocol = %protocol,
            "built worker transport"
        );
        *transport = Some(Transport {
            protocol,
            client: client.clone(),
        });
        Ok(client)
    }

    fn data_transfer_protocol(&self) -> TransferProtocol {
        if self.config.transfer_protocol.is_grpc() && self.local_workers.contains(&self.config.address)
        {
            return TransferProtocol::local();
        }
        self.config.transfer_protocol.clone()
    }
}

#[async_trait]
impl DataTransferClient for WorkerClient {
    async fn get_element(&self, request: &ElementRequest) -> Result<ElementResult, TransferError> {
        WorkerClient::get_element(self, request).await
    }

    fn try_cancel(&self) {
        WorkerClient::try_cancel(self);
    }
}

impl std::fmt::Debug for WorkerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerClient")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("transfer_protocol", &self.transfer_protocol())
            .finish()
    }
}

/// Creates a [`WorkerClient`] and builds its transport immediately.
///
/// # Errors
///
/// The initialisation error, if the transport cannot be built.
pub fn create_worker_client(
    config: WorkerClientConfig,
    registry: Arc<TransferRegistry>,
    local_workers: Arc<LocalWorkers>,
) -> Result<WorkerClient, TransferError> {
    let client = WorkerClient::new(config, registry, local_workers);
    client.initialize()?;
    Ok(client)
}
