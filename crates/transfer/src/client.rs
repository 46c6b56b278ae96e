//! The transport port.
//!
//! A [`DataTransferClient`] fetches elements from one worker over one transfer
//! protocol and can be cancelled. Implementations live in adapter crates and
//! are built through [`crate::TransferRegistry`].

use async_trait::async_trait;

use crate::{ElementRequest, ElementResult, TransferError};

/// Fetches elements from a single worker.
///
/// Shared behind an `Arc` and called from many tasks at once; implementations
/// must be internally synchronised.
#[async_trait]
pub trait DataTransferClient: Send + Sync {
    /// Fetches the next element for the request's task.
    ///
    /// Fails with [`TransferError::Cancelled`] without contacting the worker
    /// once [`try_cancel`](Self::try_cancel) has been called.
    async fn get_element(&self, request: &ElementRequest) -> Result<ElementResult, TransferError>;

    /// Rejects all future requests and interrupts in-flight ones where the
    /// transport supports it. Calling it more than once has no further effect.
    fn try_cancel(&self);
}
