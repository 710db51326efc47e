//! Common error types for the grader


/// A specialized `Result` type for grader operations
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for grader operations that are not tied to a wire field
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An invalid argument was provided
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}
