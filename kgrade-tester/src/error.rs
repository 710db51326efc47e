//! Failures reported to the candidate.

use kgrade_protocol::{DecodeError, FieldPath};
use thiserror::Error;

/// A decoded value that did not match its expectation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct AssertionError {
    pub path: FieldPath,
    pub start_offset: usize,
    pub end_offset: usize,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum TesterError {
    /// The 4-byte size prefix is missing or disagrees with the payload.
    #[error("{0}")]
    MessageLength(String),

    #[error(transparent)]
    Assertion(#[from] AssertionError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A check spanning several fields, run after a clean decode.
    #[error("{0}")]
    Composite(String),

    #[error("{0}")]
    OnDisk(String),
}

impl TesterError {
    pub fn composite(message: impl Into<String>) -> Self {
        TesterError::Composite(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TesterError>;
