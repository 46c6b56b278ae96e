//! In-process transfer protocol.
//!
//! When the worker serving a task lives in the consumer's own process, elements
//! are read by calling the worker directly: no channel, no serialisation, and
//! no bandwidth accounting. The worker is looked up by address in the shared
//! [`LocalWorkers`] table on every request, so a worker that shuts down is
//! noticed on the next read.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Registered under [`TransferProtocol::LOCAL`]; the
//! facade switches to it automatically when a network read targets an address
//! that has a local worker.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, trace};
use transfer::{
    DataTransferClient, ElementRequest, ElementResult, LocalWorker, LocalWorkers, TransferError,
    TransferProtocol, TransferRegistry, WorkerAddress,
};

/// Reads elements from a worker in the same process.
pub struct LocalDataTransferClient {
    worker_address: WorkerAddress,
    local_workers: Arc<LocalWorkers>,
    cancelled: Mutex<bool>,
}

impl LocalDataTransferClient {
    pub fn new(worker_address: WorkerAddress, local_workers: Arc<LocalWorkers>) -> Self {
        debug!(address = %worker_address, "creating local data transfer client");
        Self {
            worker_address,
            local_workers,
            cancelled: Mutex::new(false),
        }
    }

    pub fn worker_address(&self) -> &WorkerAddress {
        &self.worker_address
    }

    fn verify_not_cancelled(&self) -> Result<(), TransferError> {
        if *self.cancelled.lock() {
            return Err(TransferError::cancelled(format!(
                "client for worker {} has been cancelled",
                self.worker_address
            )));
        }
        Ok(())
    }

    // A missing worker ends the task for this consumer: reported as a
    // cancellation, not as something to retry.
    fn worker(&self, request: &ElementRequest) -> Result<Arc<dyn LocalWorker>, TransferError> {
        self.local_workers.get(&self.worker_address).ok_or_else(|| {
            TransferError::cancelled(format!(
                "local worker at address {} is no longer available; cancel request for task {}",
                self.worker_address,
                request.task_id()
            ))
        })
    }
}

#[async_trait]
impl DataTransferClient for LocalDataTransferClient {
    async fn get_element(&self, request: &ElementRequest) -> Result<ElementResult, TransferError> {
        trace!(task_id = %request.task_id(), "get element from local worker");
        self.verify_not_cancelled()?;
        let worker = self.worker(request)?;
        worker.get_element_result(request).await
    }

    /// Rejects future reads only.
    ///
    /// Local reads are served first-come-first-served, so a read already handed
    /// to the worker is left to finish. Coordinated reads would need in-flight
    /// reads interrupted too, since they can wait indefinitely.
    fn try_cancel(&self) {
        debug!(address = %self.worker_address, "cancelling local data transfer client");
        *self.cancelled.lock() = true;
    }
}

impl std::fmt::Debug for LocalDataTransferClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalDataTransferClient")
            .field("worker_address", &self.worker_address)
            .field("cancelled", &*self.cancelled.lock())
            .finish()
    }
}

/// Registers the in-process transport under [`TransferProtocol::LOCAL`].
///
/// # Errors
///
/// [`TransferError::DuplicateProtocol`] if `local` is already registered.
pub fn register(
    registry: &mut TransferRegistry,
    local_workers: Arc<LocalWorkers>,
) -> Result<(), TransferError> {
    registry.register(TransferProtocol::local(), move |config| {
        Ok(Arc::new(LocalDataTransferClient::new(
            config.address.clone(),
            local_workers.clone(),
        )) as Arc<dyn DataTransferClient>)
    })
}
