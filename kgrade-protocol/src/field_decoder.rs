//! A decoder that records every value it reads as a [`Field`] under the current path.

use bytes::Bytes;
use tracing::trace;
use uuid::Uuid;

use crate::error::{CodecError, DecodeError};
use crate::field::{Field, FieldAnchor, PathScope, PathStack};
use crate::field_path::FieldPath;
use crate::primitives::{Decoder, MAX_VARINT_BYTES};
use crate::value::Value;

/// Segment used for every tag buffer; assertions treat these fields as structural.
pub const TAG_BUFFER: &str = "TAG_BUFFER";

#[derive(Debug)]
pub struct FieldDecoder<'a> {
    decoder: Decoder<'a>,
    path: Vec<String>,
    decoded_fields: Vec<Field>,
}

impl PathStack for FieldDecoder<'_> {
    fn push_segment(&mut self, segment: String) {
        self.path.push(segment);
    }

    fn pop_segment(&mut self) {
        self.path.pop();
    }
}

impl<'a> FieldDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            decoder: Decoder::new(bytes),
            path: Vec::new(),
            decoded_fields: Vec::new(),
        }
    }

    /// Enters a nested path segment until the returned guard is dropped.
    pub fn scope(&mut self, segment: impl Into<String>) -> PathScope<'_, Self> {
        PathScope::new(self, segment)
    }

    pub fn current_path(&self) -> FieldPath {
        FieldPath::new(self.path.clone())
    }

    pub fn decoded_fields(&self) -> &[Field] {
        &self.decoded_fields
    }

    pub fn into_decoded_fields(self) -> Vec<Field> {
        self.decoded_fields
    }

    pub fn read_bytes_count(&self) -> usize {
        self.decoder.read_bytes_count()
    }

    pub fn remaining_bytes_count(&self) -> usize {
        self.decoder.remaining_bytes_count()
    }

    /// Raw bytes between two absolute offsets that were already read.
    pub fn slice(&self, start: usize, end: usize) -> &'a [u8] {
        self.decoder.slice(start, end)
    }

    /// Runs `read` with only the next `len` bytes visible.
    pub fn read_bounded<T>(
        &mut self,
        len: usize,
        read: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        let end = self.read_bytes_count() + len;
        let full = self.decoder.limit(end);
        let result = read(self);
        self.decoder.unlimit(full);
        result
    }

    /// Location of the most recently decoded field.
    ///
    /// # Panics
    ///
    /// Panics if nothing has been decoded yet.
    pub fn last_anchor(&self) -> FieldAnchor {
        match self.decoded_fields.last() {
            Some(field) => field.anchor(),
            None => panic!("Internal Error: no field decoded yet"),
        }
    }

    /// An error under the current path covering every byte not read yet.
    pub fn error_over_remaining(&self, kind: CodecError) -> DecodeError {
        let offset = self.read_bytes_count();
        DecodeError::new(self.current_path(), offset, offset + self.remaining_bytes_count(), kind)
    }

    /// End of the byte range blamed for a read that started at `start` and failed.
    fn failed_read_end(&self, start: usize, kind: &CodecError) -> usize {
        let total = self.decoder.read_bytes_count() + self.decoder.remaining_bytes_count();
        match kind {
            CodecError::Truncated { .. } => total,
            CodecError::MalformedVarint(_) => (start + MAX_VARINT_BYTES).min(total),
            _ => self.decoder.read_bytes_count().max(start + 1).min(total),
        }
    }

    fn read_field<T>(
        &mut self,
        segment: &str,
        read: impl FnOnce(&mut Decoder<'a>) -> Result<T, CodecError>,
        to_value: impl FnOnce(&T) -> Value,
    ) -> Result<T, DecodeError> {
        let path = self.current_path().child(segment);
        let start_offset = self.decoder.read_bytes_count();
        match read(&mut self.decoder) {
            Ok(decoded) => {
                let value = to_value(&decoded);
                trace!(path = %path, value = %value, "decoded field");
                self.decoded_fields.push(Field {
                    path,
                    value,
                    start_offset,
                    end_offset: self.decoder.read_bytes_count(),
                });
                Ok(decoded)
            }
            Err(kind) => {
                let end_offset = self.failed_read_end(start_offset, &kind);
                Err(DecodeError::new(path, start_offset, end_offset, kind))
            }
        }
    }

    pub fn read_int8(&mut self, segment: &str) -> Result<i8, DecodeError> {
        self.read_field(segment, Decoder::read_int8, |v| Value::Int8(*v))
    }

    pub fn read_int16(&mut self, segment: &str) -> Result<i16, DecodeError> {
        self.read_field(segment, Decoder::read_int16, |v| Value::Int16(*v))
    }

    pub fn read_int32(&mut self, segment: &str) -> Result<i32, DecodeError> {
        self.read_field(segment, Decoder::read_int32, |v| Value::Int32(*v))
    }

    pub fn read_int64(&mut self, segment: &str) -> Result<i64, DecodeError> {
        self.read_field(segment, Decoder::read_int64, |v| Value::Int64(*v))
    }

    /// A 4-byte unsigned value such as a CRC, recorded as its signed bit pattern.
    pub fn read_uint32(&mut self, segment: &str) -> Result<u32, DecodeError> {
        self.read_field(segment, Decoder::read_uint32, |v| Value::Int32(*v as i32))
    }

    pub fn read_unsigned_varint(&mut self, segment: &str) -> Result<u64, DecodeError> {
        self.read_field(segment, Decoder::read_unsigned_varint, |v| {
            Value::UnsignedVarint(*v)
        })
    }

    pub fn read_varint(&mut self, segment: &str) -> Result<i64, DecodeError> {
        self.read_field(segment, Decoder::read_varint, |v| Value::Varint(*v))
    }

    pub fn read_compact_string(&mut self, segment: &str) -> Result<String, DecodeError> {
        self.read_field(segment, Decoder::read_compact_string, |v| {
            Value::CompactString(v.clone())
        })
    }

    pub fn read_compact_nullable_string(
        &mut self,
        segment: &str,
    ) -> Result<Option<String>, DecodeError> {
        self.read_field(segment, Decoder::read_compact_nullable_string, |v| {
            Value::CompactNullableString(v.clone())
        })
    }

    pub fn read_string(&mut self, segment: &str) -> Result<Option<String>, DecodeError> {
        self.read_field(segment, Decoder::read_string, |v| Value::String(v.clone()))
    }

    pub fn read_uuid(&mut self, segment: &str) -> Result<Uuid, DecodeError> {
        self.read_field(segment, Decoder::read_uuid, |v| Value::Uuid(*v))
    }

    pub fn read_boolean(&mut self, segment: &str) -> Result<bool, DecodeError> {
        self.read_field(segment, Decoder::read_boolean, |v| Value::Boolean(*v))
    }

    pub fn read_raw_bytes(&mut self, segment: &str, n: usize) -> Result<Bytes, DecodeError> {
        self.read_field(segment, |d| d.read_raw_bytes(n), |v| Value::RawBytes(v.clone()))
    }

    /// The raw `N + 1` compact array length.
    pub fn read_compact_array_length(&mut self, segment: &str) -> Result<u64, DecodeError> {
        self.read_field(segment, Decoder::read_unsigned_varint, |v| {
            Value::CompactArrayLength(*v)
        })
    }

    /// The raw `N + 1` compact record-batch stream size.
    pub fn read_compact_record_size(&mut self, segment: &str) -> Result<u64, DecodeError> {
        self.read_field(segment, Decoder::read_unsigned_varint, |v| {
            Value::CompactRecordSize(*v)
        })
    }

    pub fn consume_tag_buffer(&mut self) -> Result<(), DecodeError> {
        self.read_field(TAG_BUFFER, Decoder::consume_tag_buffer, |v| {
            Value::UnsignedVarint(*v)
        })
        .map(|_| ())
    }

    // --- Arrays ---

    /// Reads a compact array under `name`: a `Length` field followed by one nested
    /// `name[i]` scope per element. A null array decodes as empty.
    pub fn read_compact_array<T>(
        &mut self,
        name: &str,
        mut element: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let mut scope = self.scope(name);
        let raw_length = scope.read_compact_array_length("Length")?;
        let mut items = Vec::new();
        for i in 0..raw_length.saturating_sub(1) {
            let mut item = scope.scope(format!("{name}[{i}]"));
            items.push(element(&mut *item)?);
        }
        Ok(items)
    }

    /// Compact array of int32 values, each recorded directly as `name[i]`.
    pub fn read_compact_int32_array(&mut self, name: &str) -> Result<Vec<i32>, DecodeError> {
        let mut scope = self.scope(name);
        let raw_length = scope.read_compact_array_length("Length")?;
        let mut items = Vec::new();
        for i in 0..raw_length.saturating_sub(1) {
            items.push(scope.read_int32(&format!("{name}[{i}]"))?);
        }
        Ok(items)
    }

    /// An int32-length array under `name`. `-1` is null and decodes as empty.
    pub fn read_array<T>(
        &mut self,
        name: &str,
        mut element: impl FnMut(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<Vec<T>, DecodeError> {
        let mut scope = self.scope(name);
        let length = scope.read_int32("Length")?;
        if length < -1 {
            return Err(scope.last_anchor().error(CodecError::InvalidLength(format!(
                "Expected array length to be -1 or a non-negative number, got {length}"
            ))));
        }
        let mut items = Vec::new();
        for i in 0..length.max(0) {
            let mut item = scope.scope(format!("{name}[{i}]"));
            items.push(element(&mut *item)?);
        }
        Ok(items)
    }
}
