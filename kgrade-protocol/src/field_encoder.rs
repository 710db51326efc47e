//! The encoding mirror of [`crate::field_decoder::FieldDecoder`].

use bytes::Bytes;
use uuid::Uuid;

use crate::field::{Field, PathScope, PathStack};
use crate::field_decoder::TAG_BUFFER;
use crate::field_path::FieldPath;
use crate::primitives::Encoder;
use crate::value::Value;

#[derive(Debug, Default)]
pub struct FieldEncoder {
    encoder: Encoder,
    path: Vec<String>,
    encoded_fields: Vec<Field>,
}

impl PathStack for FieldEncoder {
    fn push_segment(&mut self, segment: String) {
        self.path.push(segment);
    }

    fn pop_segment(&mut self) {
        self.path.pop();
    }
}

impl FieldEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope(&mut self, segment: impl Into<String>) -> PathScope<'_, Self> {
        PathScope::new(self, segment)
    }

    pub fn encoded_fields(&self) -> &[Field] {
        &self.encoded_fields
    }

    pub fn bytes(&self) -> &[u8] {
        self.encoder.bytes()
    }

    pub fn len(&self) -> usize {
        self.encoder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoder.is_empty()
    }

    pub fn into_parts(self) -> (Bytes, Vec<Field>) {
        (self.encoder.into_bytes(), self.encoded_fields)
    }

    pub fn into_bytes(self) -> Bytes {
        self.encoder.into_bytes()
    }

    fn write_field(&mut self, segment: &str, value: Value, write: impl FnOnce(&mut Encoder)) {
        let start_offset = self.encoder.len();
        write(&mut self.encoder);
        self.encoded_fields.push(Field {
            path: FieldPath::new(self.path.clone()).child(segment),
            value,
            start_offset,
            end_offset: self.encoder.len(),
        });
    }

    pub fn write_int8(&mut self, segment: &str, v: i8) {
        self.write_field(segment, Value::Int8(v), |e| e.write_int8(v));
    }

    pub fn write_int16(&mut self, segment: &str, v: i16) {
        self.write_field(segment, Value::Int16(v), |e| e.write_int16(v));
    }

    pub fn write_int32(&mut self, segment: &str, v: i32) {
        self.write_field(segment, Value::Int32(v), |e| e.write_int32(v));
    }

    pub fn write_int64(&mut self, segment: &str, v: i64) {
        self.write_field(segment, Value::Int64(v), |e| e.write_int64(v));
    }

    pub fn write_uint32(&mut self, segment: &str, v: u32) {
        self.write_field(segment, Value::Int32(v as i32), |e| e.write_uint32(v));
    }

    pub fn write_unsigned_varint(&mut self, segment: &str, v: u64) {
        self.write_field(segment, Value::UnsignedVarint(v), |e| {
            e.write_unsigned_varint(v)
        });
    }

    pub fn write_varint(&mut self, segment: &str, v: i64) {
        self.write_field(segment, Value::Varint(v), |e| e.write_varint(v));
    }

    pub fn write_compact_string(&mut self, segment: &str, s: &str) {
        self.write_field(segment, Value::CompactString(s.to_string()), |e| {
            e.write_compact_string(s)
        });
    }

    pub fn write_compact_nullable_string(&mut self, segment: &str, s: Option<&str>) {
        let value = Value::CompactNullableString(s.map(str::to_string));
        self.write_field(segment, value, |e| e.write_compact_nullable_string(s));
    }

    pub fn write_string(&mut self, segment: &str, s: Option<&str>) {
        let value = Value::String(s.map(str::to_string));
        self.write_field(segment, value, |e| e.write_string(s));
    }

    pub fn write_uuid(&mut self, segment: &str, uuid: &Uuid) {
        self.write_field(segment, Value::Uuid(*uuid), |e| e.write_uuid(uuid));
    }

    pub fn write_boolean(&mut self, segment: &str, v: bool) {
        self.write_field(segment, Value::Boolean(v), |e| e.write_boolean(v));
    }

    pub fn write_raw_bytes(&mut self, segment: &str, raw: &[u8]) {
        let value = Value::RawBytes(Bytes::copy_from_slice(raw));
        self.write_field(segment, value, |e| e.write_raw_bytes(raw));
    }

    pub fn write_compact_array_length(&mut self, segment: &str, raw: u64) {
        self.write_field(segment, Value::CompactArrayLength(raw), |e| {
            e.write_unsigned_varint(raw)
        });
    }

    pub fn write_compact_record_size(&mut self, segment: &str, raw: u64) {
        self.write_field(segment, Value::CompactRecordSize(raw), |e| {
            e.write_unsigned_varint(raw)
        });
    }

    pub fn write_empty_tag_buffer(&mut self) {
        self.write_field(TAG_BUFFER, Value::UnsignedVarint(0), |e| {
            e.write_empty_tag_buffer()
        });
    }

    // --- Arrays ---

    pub fn write_compact_array<T>(
        &mut self,
        name: &str,
        items: &[T],
        mut element: impl FnMut(&mut Self, &T),
    ) {
        let mut scope = self.scope(name);
        scope.write_compact_array_length("Length", items.len() as u64 + 1);
        for (i, item) in items.iter().enumerate() {
            let mut entry = scope.scope(format!("{name}[{i}]"));
            element(&mut *entry, item);
        }
    }

    pub fn write_compact_int32_array(&mut self, name: &str, items: &[i32]) {
        let mut scope = self.scope(name);
        scope.write_compact_array_length("Length", items.len() as u64 + 1);
        for (i, item) in items.iter().enumerate() {
            scope.write_int32(&format!("{name}[{i}]"), *item);
        }
    }

    pub fn write_array<T>(&mut self, name: &str, items: &[T], mut element: impl FnMut(&mut Self, &T)) {
        let mut scope = self.scope(name);
        scope.write_int32("Length", items.len() as i32);
        for (i, item) in items.iter().enumerate() {
            let mut entry = scope.scope(format!("{name}[{i}]"));
            element(&mut *entry, item);
        }
    }
}
