//! Primitive Kafka wire types: fixed-width integers, varints, strings, UUIDs and tag buffers.
//!
//! [`Decoder`] reads from a borrowed byte slice and tracks how far it has read, which the
//! field-addressed layer uses to attach byte offsets to every value. [`Encoder`] is the
//! mirror image over a growable buffer.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::codec::{Decodable, Encodable};
use crate::error::CodecError;

/// The longest a 64-bit varint can be on the wire.
pub const MAX_VARINT_BYTES: usize = 10;

// --- Implementations for primitive integer types ---

macro_rules! impl_codec_for_int {
    ($($t:ty => $label:literal),*) => {
        $(
            impl Encodable for $t {
                fn encode(&self, buf: &mut impl BufMut) {
                    buf.put_slice(&self.to_be_bytes());
                }
            }

            impl Decodable for $t {
                fn decode(buf: &mut impl Buf) -> Result<Self, CodecError> {
                    const SIZE: usize = std::mem::size_of::<$t>();
                    if buf.remaining() < SIZE {
                        return Err(CodecError::Truncated {
                            what: $label,
                            expected: SIZE,
                            remaining: buf.remaining(),
                        });
                    }
                    let mut raw = [0u8; SIZE];
                    buf.copy_to_slice(&mut raw);
                    Ok(<$t>::from_be_bytes(raw))
                }
            }
        )*
    };
}

impl_codec_for_int!(i8 => "int8", i16 => "int16", i32 => "int32", i64 => "int64", u32 => "uint32");

// --- Varint Utils ---

pub fn encode_unsigned_varint(mut n: u64, buf: &mut impl BufMut) {
    while n >= 0x80 {
        buf.put_u8((n as u8) | 0x80);
        n >>= 7;
    }
    buf.put_u8(n as u8);
}

pub fn decode_unsigned_varint(buf: &mut impl Buf) -> Result<u64, CodecError> {
    let mut value: u64 = 0;
    let mut shift = 0u32;
    for read in 0..MAX_VARINT_BYTES {
        if !buf.has_remaining() {
            return Err(CodecError::MalformedVarint(format!(
                "Unexpected end of data after decoding {read} varint bytes"
            )));
        }
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }
    Err(CodecError::MalformedVarint(format!(
        "Unexpected unsigned varint overflow after decoding {MAX_VARINT_BYTES} bytes"
    )))
}

/// Zig-zag encoding of a signed varint.
pub fn encode_varint(n: i64, buf: &mut impl BufMut) {
    encode_unsigned_varint(((n << 1) ^ (n >> 63)) as u64, buf);
}

pub fn decode_varint(buf: &mut impl Buf) -> Result<i64, CodecError> {
    let raw = decode_unsigned_varint(buf)?;
    Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
}

/// Prefix `payload` with its big-endian int32 length.
pub fn pack_as_message(payload: &[u8]) -> Bytes {
    let mut framed = BytesMut::with_capacity(payload.len() + 4);
    (payload.len() as i32).encode(&mut framed);
    framed.put_slice(payload);
    framed.freeze()
}

fn bytes_to_string(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

// --- Decoder ---

/// Reads primitive values from a byte slice while tracking the read offset.
#[derive(Debug, Clone)]
pub struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Number of bytes consumed so far.
    pub fn read_bytes_count(&self) -> usize {
        self.offset
    }

    pub fn remaining_bytes_count(&self) -> usize {
        self.bytes.len() - self.offset
    }

    pub fn remaining(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }

    /// The slice between two absolute offsets already seen by this decoder.
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        &self.bytes[start..end]
    }

    /// Hides every byte from absolute offset `end` onwards and returns the full input,
    /// to be handed back to [`Decoder::unlimit`]. Offsets stay absolute.
    pub fn limit(&mut self, end: usize) -> &'a [u8] {
        let full = self.bytes;
        self.bytes = &full[..end.clamp(self.offset, full.len())];
        full
    }

    pub fn unlimit(&mut self, full: &'a [u8]) {
        self.bytes = full;
    }

    fn read<T: Decodable>(&mut self) -> Result<T, CodecError> {
        let mut rest = self.remaining();
        let before = rest.len();
        let value = T::decode(&mut rest)?;
        self.offset += before - rest.len();
        Ok(value)
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], CodecError> {
        if self.remaining_bytes_count() < n {
            return Err(CodecError::Truncated {
                what,
                expected: n,
                remaining: self.remaining_bytes_count(),
            });
        }
        let start = self.offset;
        self.offset += n;
        Ok(&self.bytes[start..self.offset])
    }

    pub fn read_int8(&mut self) -> Result<i8, CodecError> {
        self.read()
    }

    pub fn read_int16(&mut self) -> Result<i16, CodecError> {
        self.read()
    }

    pub fn read_int32(&mut self) -> Result<i32, CodecError> {
        self.read()
    }

    pub fn read_int64(&mut self) -> Result<i64, CodecError> {
        self.read()
    }

    pub fn read_uint32(&mut self) -> Result<u32, CodecError> {
        self.read()
    }

    pub fn read_unsigned_varint(&mut self) -> Result<u64, CodecError> {
        let mut rest = self.remaining();
        let before = rest.len();
        let value = decode_unsigned_varint(&mut rest)?;
        self.offset += before - rest.len();
        Ok(value)
    }

    pub fn read_varint(&mut self) -> Result<i64, CodecError> {
        let mut rest = self.remaining();
        let before = rest.len();
        let value = decode_varint(&mut rest)?;
        self.offset += before - rest.len();
        Ok(value)
    }

    pub fn read_raw_bytes(&mut self, n: usize) -> Result<Bytes, CodecError> {
        self.take(n, "raw bytes").map(Bytes::copy_from_slice)
    }

    /// A compact string whose length prefix may not be zero.
    pub fn read_compact_string(&mut self) -> Result<String, CodecError> {
        let length = self.read_unsigned_varint()?;
        if length == 0 {
            return Err(CodecError::InvalidLength(
                "Expected COMPACT_STRING length to be > 0, got 0".to_string(),
            ));
        }
        self.read_string_contents(length - 1)
    }

    pub fn read_compact_nullable_string(&mut self) -> Result<Option<String>, CodecError> {
        let length = self.read_unsigned_varint()?;
        if length == 0 {
            return Ok(None);
        }
        self.read_string_contents(length - 1).map(Some)
    }

    /// An int16-length-prefixed nullable string.
    pub fn read_string(&mut self) -> Result<Option<String>, CodecError> {
        let length = self.read_int16()?;
        match length {
            -1 => Ok(None),
            n if n < -1 => Err(CodecError::InvalidLength(format!(
                "Expected string length to be -1 or a non-negative number, got {n}"
            ))),
            n => self.read_string_contents(n as u64).map(Some),
        }
    }

    fn read_string_contents(&mut self, length: u64) -> Result<String, CodecError> {
        let length = usize::try_from(length).unwrap_or(usize::MAX);
        self.take(length, "string").map(bytes_to_string)
    }

    pub fn read_uuid(&mut self) -> Result<Uuid, CodecError> {
        let raw = self.take(16, "UUID")?;
        let mut uuid = [0u8; 16];
        uuid.copy_from_slice(raw);
        Ok(Uuid::from_bytes(uuid))
    }

    pub fn read_boolean(&mut self) -> Result<bool, CodecError> {
        match self.read_int8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidValue(format!(
                "Expected bool to be 1 or 0, got {other}"
            ))),
        }
    }

    /// Reads the tagged-field count, which must be zero.
    pub fn consume_tag_buffer(&mut self) -> Result<u64, CodecError> {
        let count = self.read_unsigned_varint()?;
        if count != 0 {
            return Err(CodecError::UnsupportedTags(count));
        }
        Ok(count)
    }
}

// --- Encoder ---

/// Writes primitive values into a growable buffer.
#[derive(Debug, Default, Clone)]
pub struct Encoder {
    buf: BytesMut,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn write_int8(&mut self, v: i8) {
        v.encode(&mut self.buf);
    }

    pub fn write_int16(&mut self, v: i16) {
        v.encode(&mut self.buf);
    }

    pub fn write_int32(&mut self, v: i32) {
        v.encode(&mut self.buf);
    }

    pub fn write_int64(&mut self, v: i64) {
        v.encode(&mut self.buf);
    }

    pub fn write_uint32(&mut self, v: u32) {
        v.encode(&mut self.buf);
    }

    pub fn write_unsigned_varint(&mut self, v: u64) {
        encode_unsigned_varint(v, &mut self.buf);
    }

    pub fn write_varint(&mut self, v: i64) {
        encode_varint(v, &mut self.buf);
    }

    pub fn write_raw_bytes(&mut self, raw: &[u8]) {
        self.buf.put_slice(raw);
    }

    pub fn write_compact_string(&mut self, s: &str) {
        self.write_unsigned_varint(s.len() as u64 + 1);
        self.buf.put_slice(s.as_bytes());
    }

    pub fn write_compact_nullable_string(&mut self, s: Option<&str>) {
        match s {
            Some(s) => self.write_compact_string(s),
            None => self.write_unsigned_varint(0),
        }
    }

    /// An int16-length-prefixed nullable string.
    ///
    /// # Panics
    ///
    /// Panics when `s` is longer than `i16::MAX` bytes, which the prefix cannot express.
    pub fn write_string(&mut self, s: Option<&str>) {
        match s {
            Some(s) => {
                let Ok(length) = i16::try_from(s.len()) else {
                    panic!("Internal Error: STRING of {} bytes exceeds the int16 length prefix", s.len());
                };
                self.write_int16(length);
                self.buf.put_slice(s.as_bytes());
            }
            None => self.write_int16(-1),
        }
    }

    pub fn write_uuid(&mut self, uuid: &Uuid) {
        self.buf.put_slice(uuid.as_bytes());
    }

    pub fn write_boolean(&mut self, v: bool) {
        self.write_int8(i8::from(v));
    }

    pub fn write_empty_tag_buffer(&mut self) {
        self.write_unsigned_varint(0);
    }
}
