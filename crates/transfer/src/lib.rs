//! Transfer domain for the data-service worker client.
//!
//! This crate contains the element types, identifiers, error taxonomy, and the
//! port traits that transports and in-process workers implement. Transport
//! crates implement [`DataTransferClient`]; they never add domain rules.
//!
//! ## Architectural Layer
//!
//! **Domain + port definitions.** This crate has no I/O dependencies.
//! It defines *what* a transport does; adapter crates (`grpc`, `local`)
//! define *how*.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`WorkerAddress`, `TransferProtocol`, `TaskId`, etc.) |
//! | [`types`] | Requests, results, tensors, and transport configuration |
//! | [`errors`] | `TransferError` and `RetryPolicy` |
//! | [`client`] | The `DataTransferClient` port |
//! | [`registry`] | Protocol name → transport factory |
//! | [`local_workers`] | In-process worker port and address table |

pub mod client;
pub mod errors;
pub mod identifiers;
pub mod local_workers;
pub mod registry;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use client::DataTransferClient;
pub use errors::{RetryPolicy, TransferError};
pub use identifiers::{ClientId, ProtocolName, TaskId, TransferProtocol, WorkerAddress};
pub use local_workers::{LocalWorker, LocalWorkers};
pub use registry::{TransferClientFactory, TransferRegistry};
pub use types::{
    BandwidthCeiling, Component, CompressedElement, DataType, ElementRequest, ElementResult,
    Tensor, TransferConfig,
};
