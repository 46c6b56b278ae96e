//! Client credentials for the network transport.
//!
//! The base protocol named in a worker client's configuration decides which
//! credentials the channel is built with. [`DefaultCredentialsFactory`] knows
//! `grpc` (plaintext) and `grpc+tls` (TLS against the platform roots, or a
//! pinned CA); deployments with other schemes provide their own
//! [`CredentialsFactory`].

use tonic::transport::{Certificate, ClientTlsConfig};
use transfer::{ProtocolName, TransferError};

/// Base protocol for plaintext channels.
pub const INSECURE_PROTOCOL: &str = "grpc";

/// Base protocol for TLS channels.
pub const TLS_PROTOCOL: &str = "grpc+tls";

/// Credentials a channel is built with.
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Plaintext HTTP/2.
    Insecure,
    /// HTTP/2 over TLS.
    Tls(ClientTlsConfig),
}

/// Produces channel credentials for a base protocol.
pub trait CredentialsFactory: Send + Sync {
    /// # Errors
    ///
    /// [`TransferError::Credentials`] if `protocol` is not supported.
    fn client_credentials(&self, protocol: &ProtocolName) -> Result<Credentials, TransferError>;
}

/// Credentials for `grpc` and `grpc+tls`.
#[derive(Debug, Clone, Default)]
pub struct DefaultCredentialsFactory {
    ca_certificate: Option<Vec<u8>>,
    domain_name: Option<String>,
}

impl DefaultCredentialsFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trusts only `pem` (instead of the platform roots) for `grpc+tls`.
    #[must_use]
    pub fn with_ca_certificate(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_certificate = Some(pem.into());
        self
    }

    /// Overrides the server name checked against the worker's certificate.
    #[must_use]
    pub fn with_domain_name(mut self, domain_name: impl Into<String>) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    fn tls_config(&self) -> ClientTlsConfig {
        let mut config = ClientTlsConfig::new();
        config = match &self.ca_certificate {
            Some(pem) => config.ca_certificate(Certificate::from_pem(pem)),
            None => config.with_native_roots(),
        };
        if let Some(domain) = &self.domain_name {
            config = config.domain_name(domain.clone());
        }
        config
    }
}

impl CredentialsFactory for DefaultCredentialsFactory {
    fn client_credentials(&self, protocol: &ProtocolName) -> Result<Credentials, TransferError> {
        match protocol.as_str() {
            INSECURE_PROTOCOL => Ok(Credentials::Insecure),
            TLS_PROTOCOL => Ok(Credentials::Tls(self.tls_config())),
            other => Err(TransferError::Credentials {
                protocol: other.to_owned(),
                message: format!(
                    "unsupported protocol; expected '{INSECURE_PROTOCOL}' or '{TLS_PROTOCOL}'"
                ),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_grpc_is_insecure() {
        let creds = DefaultCredentialsFactory::new()
            .client_credentials(&ProtocolName::new("grpc").unwrap())
            .unwrap();
        assert!(matches!(creds, Credentials::Insecure));
    }

    #[test]
    fn tls_protocol_yields_tls_config() {
        let creds = DefaultCredentialsFactory::new()
            .with_domain_name("worker.internal")
            .client_credentials(&ProtocolName::new("grpc+tls").unwrap())
            .unwrap();
        assert!(matches!(creds, Credentials::Tls(_)));
    }

    #[test]
    fn unknown_protocol_fails() {
        let err = DefaultCredentialsFactory::new()
            .client_credentials(&ProtocolName::new("carrier-pigeon").unwrap())
            .unwrap_err();
        assert!(
            matches!(err, TransferError::Credentials { ref protocol, .. } if protocol == "carrier-pigeon")
        );
    }
}
