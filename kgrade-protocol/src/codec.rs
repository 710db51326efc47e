//! Traits for encoding and decoding fixed-width wire values

use bytes::{Buf, BufMut};

use crate::error::CodecError;

/// A type that can be encoded into a buffer.
///
/// Encoding into a growable buffer cannot fail, so this trait returns nothing.
pub trait Encodable {
    /// Write the big-endian representation of the value into `buf`.
    fn encode(&self, buf: &mut impl BufMut);
}

/// A type that can be decoded from a buffer.
pub trait Decodable: Sized {
    /// Read a value from the front of `buf`, advancing it.
    fn decode(buf: &mut impl Buf) -> Result<Self, CodecError>;
}
