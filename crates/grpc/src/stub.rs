//! The element-serving call, behind a seam.
//!
//! [`WorkerStub`] is the one RPC the network transport makes. The production
//! implementation, [`TonicWorkerStub`], issues it on a tonic channel; tests
//! substitute scripted stubs.

use async_trait::async_trait;
use tonic::codec::ProstCodec;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::Status;
use transfer::{TransferError, WorkerAddress};

use crate::credentials::Credentials;
use crate::proto::{GetElementRequest, GetElementResponse, GET_ELEMENT_PATH};

/// Issues `GetElement` against one worker.
#[async_trait]
pub trait WorkerStub: Send + Sync {
    /// Sends `request` and waits for the worker's response.
    ///
    /// Dropping the returned future abandons the call.
    async fn get_element(&self, request: GetElementRequest) -> Result<GetElementResponse, Status>;
}

/// [`WorkerStub`] over a tonic channel.
#[derive(Debug, Clone)]
pub struct TonicWorkerStub {
    inner: tonic::client::Grpc<Channel>,
}

impl TonicWorkerStub {
    /// Binds a stub to `channel`. Elements can be large, so the receive size is unbounded.
    pub fn new(channel: Channel) -> Self {
        let inner = tonic::client::Grpc::new(channel).max_decoding_message_size(usize::MAX);
        Self { inner }
    }
}

#[async_trait]
impl WorkerStub for TonicWorkerStub {
    async fn get_element(&self, request: GetElementRequest) -> Result<GetElementResponse, Status> {
        let mut grpc = self.inner.clone();
        grpc.ready()
            .await
            .map_err(|e| Status::unknown(format!("Service was not ready: {e}")))?;
        let codec = ProstCodec::default();
        let path = PathAndQuery::from_static(GET_ELEMENT_PATH);
        let response = grpc.unary(tonic::Request::new(request), path, codec).await?;
        Ok(response.into_inner())
    }
}

/// Creates a channel to `address` that connects on first use.
///
/// The channel's connection task is spawned on the current tokio runtime.
///
/// # Errors
///
/// [`TransferError::InvalidConfiguration`] if no tokio runtime is running on
/// this thread, `address` does not form a valid URI, or the TLS settings are
/// rejected.
pub fn connect_lazy(address: &WorkerAddress, credentials: &Credentials) -> Result<Channel, TransferError> {
    if let Err(e) = tokio::runtime::Handle::try_current() {
        return Err(TransferError::InvalidConfiguration {
            message: format!("channel to '{address}' needs a tokio runtime: {e}"),
        });
    }
    let scheme = match credentials {
        Credentials::Insecure => "http",
        Credentials::Tls(_) => "https",
    };
    let mut endpoint = Endpoint::from_shared(format!("{scheme}://{address}")).map_err(|e| {
        TransferError::InvalidConfiguration {
            message: format!("invalid worker address '{address}': {e}"),
        }
    })?;
    if let Credentials::Tls(tls) = credentials {
        endpoint = endpoint
            .tls_config(tls.clone())
            .map_err(|e| TransferError::InvalidConfiguration {
                message: format!("invalid TLS configuration for '{address}': {e}"),
            })?;
    }
    Ok(endpoint.connect_lazy())
}
