//! Error types for the sending and receiving ends of the channel.

use procam_protocol::{DecodeError, TransactionError};
use thiserror::Error;

/// Submission failures reported to the caller of a sender method.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("No endpoint bound at {0}")]
    UnknownDestination(String),

    #[error("Endpoint {0} is no longer receiving")]
    Disconnected(String),

    /// The channel only carries one-way transactions.
    #[error("Transactions expecting a reply are not supported")]
    ReplyUnsupported,
}

/// A shared-buffer handle that could not be turned into readable bytes.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("Unknown shared heap {0}")]
    UnknownHeap(u64),

    #[error("Region {offset}+{size} lies outside heap {heap_id} ({heap_len} bytes)")]
    OutOfBounds {
        heap_id: u64,
        offset: u32,
        size: u32,
        heap_len: usize,
    },

    #[error("Heap of {0} bytes cannot be addressed by a handle")]
    HeapTooLarge(usize),
}

/// Why a received transaction was refused without reaching the listener.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("Image buffer unavailable: {0}")]
    Buffer(#[from] ResolveError),
}

impl DispatchError {
    /// Stable label used for logging and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            DispatchError::Transaction(TransactionError::ProtocolMismatch { .. }) => {
                "protocol_mismatch"
            }
            DispatchError::Transaction(TransactionError::UnknownOperation(_)) => {
                "unknown_operation"
            }
            DispatchError::Transaction(TransactionError::Decode(e)) => match e {
                DecodeError::Truncated { .. } => "truncated",
                DecodeError::InvalidLength { .. } => "invalid_length",
                DecodeError::InvalidString(_) => "invalid_string",
            },
            DispatchError::Buffer(_) => "unresolved_buffer",
        }
    }
}
