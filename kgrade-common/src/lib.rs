//! Shared error type, logging setup and fixed identities for the kgrade workspace

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod constants;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
