//! Network transfer protocol.
//!
//! Implements [`transfer::DataTransferClient`] over gRPC: one lazily connected
//! tonic channel per worker, cancellable in-flight calls, and an optional
//! [`ByteBlockChecker`] shared by every client so the bandwidth ceiling holds
//! for the whole process.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Channel setup, credentials, wire messages, and
//! throttling all live here. The facade sees only the `grpc` entry in the
//! [`transfer::TransferRegistry`].
//!
//! ## Registration
//!
//! ```rust,ignore
//! let mut registry = TransferRegistry::new();
//! let limiter = BandwidthCeiling::new(1_000_000_000).map(ByteBlockChecker::new).map(Arc::new);
//! grpc::register(&mut registry, Arc::new(DefaultCredentialsFactory::new()), limiter)?;
//! ```

pub mod client;
pub mod credentials;
pub mod proto;
pub mod stub;
pub mod throttle;

use std::sync::Arc;

use tracing::{debug, warn};
use transfer::{DataTransferClient, TransferError, TransferProtocol, TransferRegistry};

pub use client::GrpcDataTransferClient;
pub use credentials::{Credentials, CredentialsFactory, DefaultCredentialsFactory};
pub use stub::{TonicWorkerStub, WorkerStub};
pub use throttle::{ByteBlockChecker, DEFAULT_CHECK_BLOCK_SIZE};

/// Registers the network transport under [`TransferProtocol::GRPC`].
///
/// `byte_block_checker` is the process-wide throttle. It is attached to every
/// client whose configuration requests a bandwidth ceiling; clients without a
/// ceiling are unthrottled. Clients are built on a tokio runtime.
///
/// # Errors
///
/// [`TransferError::DuplicateProtocol`] if `grpc` is already registered.
pub fn register(
    registry: &mut TransferRegistry,
    credentials: Arc<dyn CredentialsFactory>,
    byte_block_checker: Option<Arc<ByteBlockChecker>>,
) -> Result<(), TransferError> {
    registry.register(TransferProtocol::grpc(), move |config| {
        let channel_credentials = credentials.client_credentials(&config.protocol)?;
        let checker = match (config.max_bandwidth, &byte_block_checker) {
            (None, _) => None,
            (Some(requested), Some(checker)) => {
                if requested != checker.ceiling() {
                    debug!(
                        address = %config.address,
                        requested = %requested,
                        enforced = %checker.ceiling(),
                        "worker shares the process-wide bandwidth ceiling"
                    );
                }
                Some(checker.clone())
            }
            (Some(requested), None) => {
                warn!(
                    address = %config.address,
                    requested = %requested,
                    "bandwidth ceiling requested but no throttle is installed; transfers are unthrottled"
                );
                None
            }
        };
        let client =
            GrpcDataTransferClient::connect(&channel_credentials, config.address.clone(), checker)?;
        Ok(Arc::new(client) as Arc<dyn DataTransferClient>)
    })
}
