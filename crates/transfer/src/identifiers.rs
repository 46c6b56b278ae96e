//! Newtype domain identifiers.
//!
//! Worker addresses, protocol names, and task ids all travel through the same
//! call paths as plain strings and integers. Wrapping each in its own newtype
//! keeps a [`ProtocolName`] (the credentials protocol) from being passed where a
//! [`TransferProtocol`] (the transport selector) is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers — String-backed
// ---------------------------------------------------------------------------

string_id! {
    /// Network address of a worker, e.g. `"localhost:5051"`.
    ///
    /// Also the key under which an in-process worker is published in
    /// [`crate::LocalWorkers`].
    WorkerAddress
}

string_id! {
    /// Base protocol used to obtain transport credentials (e.g. `"grpc"`).
    ProtocolName
}

string_id! {
    /// Selects the transport used to move elements from a worker to the caller.
    ///
    /// Well-known values are [`TransferProtocol::GRPC`] and
    /// [`TransferProtocol::LOCAL`]; further transports register their own names.
    TransferProtocol
}

impl TransferProtocol {
    /// Name of the network transport.
    pub const GRPC: &'static str = "grpc";

    /// Name of the in-process transport.
    pub const LOCAL: &'static str = "local";

    /// The network transfer protocol.
    pub fn grpc() -> Self {
        Self(Self::GRPC.to_owned())
    }

    /// The in-process transfer protocol.
    pub fn local() -> Self {
        Self(Self::LOCAL.to_owned())
    }

    /// Returns `true` if this is the network transfer protocol.
    pub fn is_grpc(&self) -> bool {
        self.0 == Self::GRPC
    }
}

// ---------------------------------------------------------------------------
// Identifiers — integer-backed
// ---------------------------------------------------------------------------

/// Identifies a task whose elements are being consumed.
///
/// Assigned by the dispatcher; this workspace only carries it through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(i64);

impl TaskId {
    /// Creates a new identifier from a raw integer.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Returns the underlying integer value.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Identifiers — UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies one worker client facade.
///
/// Generated fresh for every facade and recorded on its tracing spans so all
/// activity against one worker can be correlated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Generates a new random client identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying [`Uuid`].
    pub fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
