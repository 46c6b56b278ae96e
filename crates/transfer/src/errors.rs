//! Error and retry-policy types for element transfers.
//!
//! [`TransferError`] is the single error type every transport, the registry,
//! and the worker client facade return. Nothing in this workspace retries on
//! its own; [`TransferError::retry_policy`] tells the caller whether it may.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::TransferProtocol;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: transient network failures (`Unavailable`,
///   `DeadlineExceeded`, `ResourceExhausted`, `Aborted`).
/// - `NonRetryable` errors: cancellation, unknown protocol, malformed payloads,
///   credential and configuration failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means retry
        /// immediately or apply the caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Transfer errors
// ---------------------------------------------------------------------------

/// Errors produced while building a transport or fetching an element.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The transport was cancelled, or the local worker it targets has gone away.
    ///
    /// Terminal for the request; callers handle both causes the same way.
    #[error("Cancelled: {message}")]
    Cancelled {
        /// Human-readable reason, including the worker address where known.
        message: String,
    },

    /// No transport factory is registered under the requested name.
    #[error("No transfer protocol named '{protocol}' is registered (available: {})", .available.join(", "))]
    ProtocolNotFound {
        /// The protocol that was asked for.
        protocol: TransferProtocol,
        /// Protocols that are registered.
        available: Vec<String>,
    },

    /// A second factory was registered under a name already in use.
    ///
    /// The first registration is kept.
    #[error("Transfer protocol '{protocol}' is already registered")]
    DuplicateProtocol {
        /// The contested protocol name.
        protocol: TransferProtocol,
    },

    /// The worker's response could not be decoded.
    #[error("Internal error: {message}")]
    Internal {
        /// Description of what failed to decode.
        message: String,
    },

    /// The underlying RPC failed.
    #[error("{context}: {code}: {message}")]
    Rpc {
        /// What the transport was doing, e.g. `"failed to get element"`.
        context: String,
        /// Status code name reported by the RPC layer.
        code: String,
        /// Status message reported by the RPC layer.
        message: String,
        /// Whether the status code indicates a transient failure.
        retryable: bool,
    },

    /// Transport credentials could not be created for the base protocol.
    #[error("Failed to create credentials for protocol '{protocol}': {message}")]
    Credentials {
        /// Base protocol the credentials were requested for.
        protocol: String,
        /// Description of the failure.
        message: String,
    },

    /// The transport configuration is unusable (e.g. malformed address).
    #[error("Invalid transfer configuration: {message}")]
    InvalidConfiguration {
        /// Description of the configuration problem.
        message: String,
    },
}

impl TransferError {
    /// Shorthand for [`TransferError::Cancelled`].
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::Cancelled {
            message: message.into(),
        }
    }

    /// Shorthand for [`TransferError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns `true` for [`TransferError::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Whether the caller may retry the failed operation.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Rpc {
                retryable: true, ..
            } => RetryPolicy::Retryable { after: None },
            _ => RetryPolicy::NonRetryable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_rpc_failures_are_retryable() {
        let transient = TransferError::Rpc {
            context: "failed to get element".into(),
            code: "Unavailable".into(),
            message: "connection refused".into(),
            retryable: true,
        };
        assert_eq!(
            transient.retry_policy(),
            RetryPolicy::Retryable { after: None }
        );
        assert_eq!(
            TransferError::cancelled("gone").retry_policy(),
            RetryPolicy::NonRetryable
        );
    }

    #[test]
    fn rpc_error_message_carries_context() {
        let err = TransferError::Rpc {
            context: "failed to get element".into(),
            code: "Unavailable".into(),
            message: "connection refused".into(),
            retryable: true,
        };
        assert_eq!(
            err.to_string(),
            "failed to get element: Unavailable: connection refused"
        );
    }
}
