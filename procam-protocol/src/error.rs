//! Error types for message decoding and transaction validation.

use thiserror::Error;

/// Errors raised while reading the body of a message.
///
/// Every variant is produced before the offending bytes are touched, so a
/// decode failure never implies an out-of-bounds read.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The message ends before a field that was declared or required.
    #[error("Message truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    /// A declared count or size is negative, overflows, exceeds the
    /// configured limit, or leaves unconsumed bytes behind.
    #[error("Invalid length for {field}: {value}")]
    InvalidLength { field: &'static str, value: i64 },

    /// A UTF-16 string field is not valid UTF-16 or lacks its terminator.
    #[error("Malformed string in {0}")]
    InvalidString(&'static str),
}

impl DecodeError {
    pub(crate) fn invalid_length(field: &'static str, value: impl TryInto<i64>) -> Self {
        DecodeError::InvalidLength {
            field,
            value: value.try_into().unwrap_or(i64::MAX),
        }
    }
}

/// Reasons a whole transaction is refused before any listener sees it.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// The interface token names a different interface.
    #[error("Interface token mismatch: expected {expected}, found {}", .found.as_deref().unwrap_or("<none>"))]
    ProtocolMismatch {
        expected: String,
        found: Option<String>,
    },

    /// The opcode does not map to any known event kind.
    #[error("Unknown transaction opcode {0}")]
    UnknownOperation(u32),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_length_saturates_oversized_values() {
        let err = DecodeError::invalid_length("faces", u64::MAX);
        assert_eq!(
            err,
            DecodeError::InvalidLength {
                field: "faces",
                value: i64::MAX
            }
        );
    }

    #[test]
    fn mismatch_display_handles_null_descriptor() {
        let err = TransactionError::ProtocolMismatch {
            expected: "a.B".into(),
            found: None,
        };
        assert_eq!(
            err.to_string(),
            "Interface token mismatch: expected a.B, found <none>"
        );
    }
}
