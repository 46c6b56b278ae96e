//! Value types exchanged between callers and transports.
//!
//! [`ElementRequest`] and [`ElementResult`] are the two halves of every
//! transfer. [`TransferConfig`] is handed to a transport factory exactly once.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ProtocolName, TaskId, WorkerAddress};

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Asks a worker for the next element of a task.
///
/// Immutable once built; transports forward it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRequest {
    task_id: TaskId,
    consumer_index: Option<i64>,
    round_index: Option<i64>,
    allow_skip: bool,
}

impl ElementRequest {
    /// Creates a request for the next element of `task_id`.
    pub fn new(task_id: TaskId) -> Self {
        Self {
            task_id,
            consumer_index: None,
            round_index: None,
            allow_skip: false,
        }
    }

    /// Sets the consumer index used by round-robin reads.
    #[must_use]
    pub fn with_consumer_index(mut self, consumer_index: i64) -> Self {
        self.consumer_index = Some(consumer_index);
        self
    }

    /// Sets the round being read.
    #[must_use]
    pub fn with_round_index(mut self, round_index: i64) -> Self {
        self.round_index = Some(round_index);
        self
    }

    /// Allows the worker to answer with `skip` instead of an element.
    #[must_use]
    pub fn with_allow_skip(mut self, allow_skip: bool) -> Self {
        self.allow_skip = allow_skip;
        self
    }

    pub fn task_id(&self) -> TaskId {
        self.task_id
    }

    pub fn consumer_index(&self) -> Option<i64> {
        self.consumer_index
    }

    pub fn round_index(&self) -> Option<i64> {
        self.round_index
    }

    pub fn allow_skip(&self) -> bool {
        self.allow_skip
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one element request.
///
/// `end_of_sequence` and `skip` are relayed verbatim from the worker.
/// `components` holds either a single [`Component::Compressed`] or one
/// [`Component::Tensor`] per element component, never a mix of both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementResult {
    /// The task has no more elements.
    pub end_of_sequence: bool,
    /// The worker asked the caller to skip this round without consuming a slot.
    pub skip: bool,
    /// Element components in the order the worker produced them.
    pub components: Vec<Component>,
}

impl ElementResult {
    /// A result carrying only the end-of-sequence marker.
    pub fn end_of_sequence() -> Self {
        Self {
            end_of_sequence: true,
            ..Self::default()
        }
    }

    /// Returns `true` if the result carries a compressed element.
    pub fn is_compressed(&self) -> bool {
        matches!(self.components.as_slice(), [Component::Compressed(_)])
    }
}

/// One component of an element.
#[derive(Debug, Clone, PartialEq)]
pub enum Component {
    /// Opaque packed blob representing every component of the element.
    Compressed(CompressedElement),
    /// A single decoded value.
    Tensor(Tensor),
}

/// Compressed element, encoded exactly as the worker sent it. Never inspected here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompressedElement {
    data: Bytes,
}

impl CompressedElement {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tensors
// ---------------------------------------------------------------------------

/// Element type of a [`Tensor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    BFloat16,
    Float32,
    Float64,
    /// Variable-width byte strings; content length is not checked.
    String,
}

impl DataType {
    /// Width of one value in bytes, or `None` for variable-width types.
    pub fn size(self) -> Option<usize> {
        match self {
            DataType::Bool | DataType::Int8 | DataType::UInt8 => Some(1),
            DataType::Int16 | DataType::UInt16 | DataType::Float16 | DataType::BFloat16 => Some(2),
            DataType::Int32 | DataType::UInt32 | DataType::Float32 => Some(4),
            DataType::Int64 | DataType::UInt64 | DataType::Float64 => Some(8),
            DataType::String => None,
        }
    }
}

/// A decoded element component: dtype, shape, and raw little-endian content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tensor {
    dtype: DataType,
    shape: Vec<u64>,
    data: Bytes,
}

impl Tensor {
    /// Creates a [`Tensor`], returning `None` if `data` does not hold exactly
    /// `product(shape)` values of `dtype`.
    ///
    /// An empty shape is a scalar (one value).
    #[must_use]
    pub fn new(dtype: DataType, shape: Vec<u64>, data: impl Into<Bytes>) -> Option<Self> {
        let data = data.into();
        if let Some(width) = dtype.size() {
            let expected = shape
                .iter()
                .try_fold(1u64, |acc, dim| acc.checked_mul(*dim))
                .and_then(|n| n.checked_mul(width as u64))?;
            if expected != data.len() as u64 {
                return None;
            }
        }
        Some(Self { dtype, shape, data })
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    pub fn shape(&self) -> &[u64] {
        &self.shape
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Number of values held, `product(shape)`.
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Maximum aggregate network throughput, in bits per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BandwidthCeiling(u64);

impl BandwidthCeiling {
    /// Creates a ceiling, returning `None` unless `bits_per_second` is positive.
    #[must_use]
    pub fn new(bits_per_second: u64) -> Option<Self> {
        if bits_per_second > 0 {
            Some(Self(bits_per_second))
        } else {
            None
        }
    }

    pub fn bits_per_second(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for BandwidthCeiling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} bps", self.0)
    }
}

/// Everything a transport factory needs to build a transport for one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    /// Base protocol used to obtain credentials.
    pub protocol: ProtocolName,
    /// Worker to talk to.
    pub address: WorkerAddress,
    /// Ceiling requested for this worker; `None` means unthrottled.
    pub max_bandwidth: Option<BandwidthCeiling>,
}
