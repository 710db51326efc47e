//! Error types produced while decoding Kafka wire data.

use std::fmt;

use thiserror::Error;

use crate::field_path::FieldPath;

/// The reason a read from the wire failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Expected {what} length to be {expected} bytes, got {remaining} bytes")]
    Truncated {
        what: &'static str,
        expected: usize,
        remaining: usize,
    },

    #[error("{0}")]
    MalformedVarint(String),

    #[error("{0}")]
    InvalidLength(String),

    #[error("Expected CRC value for the record batch to be {expected}, got {actual} instead")]
    CrcMismatch { expected: String, actual: String },

    #[error("{0}")]
    BatchSizeMismatch(String),

    #[error("Expected tag buffer to be empty, got {0} tagged fields")]
    UnsupportedTags(u64),

    #[error("{0}")]
    InvalidValue(String),
}

impl CodecError {
    /// Short label for the failure kind, used in log output.
    pub fn kind_name(&self) -> &'static str {
        match self {
            CodecError::Truncated { .. } => "TRUNCATED",
            CodecError::MalformedVarint(_) => "MALFORMED_VARINT",
            CodecError::InvalidLength(_) => "INVALID_LENGTH",
            CodecError::CrcMismatch { .. } => "CRC_MISMATCH",
            CodecError::BatchSizeMismatch(_) => "BATCH_SIZE_MISMATCH",
            CodecError::UnsupportedTags(_) => "UNSUPPORTED_TAGS",
            CodecError::InvalidValue(_) => "INVALID_VALUE",
        }
    }
}

/// A [`CodecError`] anchored at the field path and byte range where it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    pub path: FieldPath,
    pub start_offset: usize,
    pub end_offset: usize,
    pub kind: CodecError,
}

impl DecodeError {
    pub fn new(path: FieldPath, start_offset: usize, end_offset: usize, kind: CodecError) -> Self {
        Self {
            path,
            start_offset,
            end_offset,
            kind,
        }
    }

    /// The human-readable message, without the path prefix.
    pub fn message(&self) -> String {
        self.kind.to_string()
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_message() {
        let err = CodecError::Truncated {
            what: "int16",
            expected: 2,
            remaining: 1,
        };
        assert_eq!(err.to_string(), "Expected int16 length to be 2 bytes, got 1 bytes");
        assert_eq!(err.kind_name(), "TRUNCATED");
    }

    #[test]
    fn test_decode_error_displays_kind() {
        let err = DecodeError::new(
            FieldPath::parse("FetchResponse.Body.ErrorCode"),
            10,
            11,
            CodecError::UnsupportedTags(2),
        );
        assert_eq!(err.to_string(), "Expected tag buffer to be empty, got 2 tagged fields");
        assert_eq!(err.path.to_string(), "FetchResponse.Body.ErrorCode");
    }
}
