//! The network transport.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use prost::Message;
use tokio_util::sync::CancellationToken;
use tonic::{Code, Status};
use tracing::{debug, trace};
use transfer::{DataTransferClient, ElementRequest, ElementResult, TransferError, WorkerAddress};

use crate::credentials::Credentials;
use crate::proto::GetElementRequest;
use crate::stub::{connect_lazy, TonicWorkerStub, WorkerStub};
use crate::throttle::ByteBlockChecker;

/// Fetches elements from a remote worker over gRPC.
///
/// Every in-flight call is registered with a cancellation token so that
/// [`try_cancel`](DataTransferClient::try_cancel) can abort it. Completed calls
/// report their request and response sizes to the shared
/// [`ByteBlockChecker`], if one is bound; failed calls report the request
/// size only, and calls aborted by `try_cancel` are not charged at all.
pub struct GrpcDataTransferClient<S = TonicWorkerStub> {
    address: WorkerAddress,
    stub: S,
    byte_block_checker: Option<Arc<ByteBlockChecker>>,
    calls: Mutex<CallState>,
}

#[derive(Default)]
struct CallState {
    cancelled: bool,
    next_call_id: u64,
    active: HashMap<u64, CancellationToken>,
}

impl GrpcDataTransferClient<TonicWorkerStub> {
    /// Creates a client for `address` on a lazily connected channel.
    ///
    /// # Errors
    ///
    /// [`TransferError::InvalidConfiguration`] if the channel cannot be set up,
    /// including when called outside a tokio runtime.
    pub fn connect(
        credentials: &Credentials,
        address: WorkerAddress,
        byte_block_checker: Option<Arc<ByteBlockChecker>>,
    ) -> Result<Self, TransferError> {
        debug!(address = %address, "creating gRPC data transfer client");
        let channel = connect_lazy(&address, credentials)?;
        Ok(Self::with_stub(
            address,
            TonicWorkerStub::new(channel),
            byte_block_checker,
        ))
    }
}

impl<S: WorkerStub> GrpcDataTransferClient<S> {
    /// Creates a client that issues its calls through `stub`.
    pub fn with_stub(
        address: WorkerAddress,
        stub: S,
        byte_block_checker: Option<Arc<ByteBlockChecker>>,
    ) -> Self {
        Self {
            address,
            stub,
            byte_block_checker,
            calls: Mutex::new(CallState::default()),
        }
    }

    pub fn address(&self) -> &WorkerAddress {
        &self.address
    }

    /// Number of calls currently registered for cancellation.
    pub fn active_calls(&self) -> usize {
        self.calls.lock().active.len()
    }

    fn begin_call(&self) -> Result<ActiveCall<'_>, TransferError> {
        let mut calls = self.calls.lock();
        if calls.cancelled {
            return Err(TransferError::cancelled("client was cancelled"));
        }
        let id = calls.next_call_id;
        calls.next_call_id += 1;
        let token = CancellationToken::new();
        calls.active.insert(id, token.clone());
        Ok(ActiveCall {
            calls: &self.calls,
            id,
            token,
        })
    }
}

/// Registration of one in-flight call; removed from the active set on drop.
struct ActiveCall<'a> {
    calls: &'a Mutex<CallState>,
    id: u64,
    token: CancellationToken,
}

impl Drop for ActiveCall<'_> {
    fn drop(&mut self) {
        self.calls.lock().active.remove(&self.id);
    }
}

#[async_trait]
impl<S: WorkerStub> DataTransferClient for GrpcDataTransferClient<S> {
    async fn get_element(&self, request: &ElementRequest) -> Result<ElementResult, TransferError> {
        trace!(
            task_id = %request.task_id(),
            address = %self.address,
            "get element from gRPC worker"
        );
        let call = self.begin_call()?;

        let wire_request = GetElementRequest::from(request);
        let request_bytes = wire_request.encoded_len();
        let outcome = tokio::select! {
            response = self.stub.get_element(wire_request) => response,
            () = call.token.cancelled() => {
                return Err(TransferError::cancelled(format!(
                    "request for task {} to worker {} was cancelled",
                    request.task_id(),
                    self.address
                )));
            }
        };

        if let Some(checker) = &self.byte_block_checker {
            let response_bytes = outcome.as_ref().map_or(0, Message::encoded_len);
            checker
                .add_and_sleep_check((request_bytes + response_bytes) as u64)
                .await;
        }

        let response = outcome.map_err(|status| wrap_status("failed to get element", &status))?;
        let result = ElementResult::try_from(response)?;
        drop(call);
        Ok(result)
    }

    fn try_cancel(&self) {
        debug!(address = %self.address, "cancelling gRPC data transfer client");
        let mut calls = self.calls.lock();
        calls.cancelled = true;
        for token in calls.active.values() {
            token.cancel();
        }
    }
}

fn wrap_status(context: &str, status: &Status) -> TransferError {
    TransferError::Rpc {
        context: context.to_owned(),
        code: format!("{:?}", status.code()),
        message: status.message().to_owned(),
        retryable: matches!(
            status.code(),
            Code::Unavailable | Code::DeadlineExceeded | Code::ResourceExhausted | Code::Aborted
        ),
    }
}

impl<S> std::fmt::Debug for GrpcDataTransferClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let calls = self.calls.lock();
        f.debug_struct("GrpcDataTransferClient")
            .field("address", &self.address)
            .field("throttled", &self.byte_block_checker.is_some())
            .field("cancelled", &calls.cancelled)
            .field("active_calls", &calls.active.len())
            .finish()
    }
}
