//! In-process workers.
//!
//! When a worker runs inside the consumer's process it publishes itself in a
//! [`LocalWorkers`] table under its address. Transports only read the table;
//! the surrounding system adds a worker when it starts and removes it when it
//! shuts down.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{ElementRequest, ElementResult, TransferError, WorkerAddress};

/// Entry point a co-located worker exposes for direct element reads.
#[async_trait]
pub trait LocalWorker: Send + Sync {
    /// Produces the next element for the request's task without serialisation.
    async fn get_element_result(
        &self,
        request: &ElementRequest,
    ) -> Result<ElementResult, TransferError>;
}

/// Address → live in-process worker.
#[derive(Default)]
pub struct LocalWorkers {
    workers: RwLock<HashMap<WorkerAddress, Arc<dyn LocalWorker>>>,
}

impl LocalWorkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `worker` at `address`, returning the worker it replaced.
    pub fn add(
        &self,
        address: WorkerAddress,
        worker: Arc<dyn LocalWorker>,
    ) -> Option<Arc<dyn LocalWorker>> {
        self.workers.write().insert(address, worker)
    }

    /// Returns the worker published at `address`, if it is still running.
    pub fn get(&self, address: &WorkerAddress) -> Option<Arc<dyn LocalWorker>> {
        self.workers.read().get(address).cloned()
    }

    /// Withdraws the worker at `address`.
    pub fn remove(&self, address: &WorkerAddress) -> Option<Arc<dyn LocalWorker>> {
        self.workers.write().remove(address)
    }

    pub fn contains(&self, address: &WorkerAddress) -> bool {
        self.workers.read().contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.workers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.read().is_empty()
    }
}

impl std::fmt::Debug for LocalWorkers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let workers = self.workers.read();
        let mut addresses: Vec<_> = workers.keys().map(WorkerAddress::as_str).collect();
        addresses.sort_unstable();
        f.debug_struct("LocalWorkers")
            .field("addresses", &addresses)
            .finish()
    }
}
