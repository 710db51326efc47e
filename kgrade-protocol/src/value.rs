//! Typed values recorded for every field that crosses the wire.

use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

/// The wire type of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Int8,
    Int16,
    Int32,
    Int64,
    UnsignedVarint,
    Varint,
    CompactString,
    CompactNullableString,
    CompactArrayLength,
    CompactRecordSize,
    RawBytes,
    Uuid,
    Boolean,
    String,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Int8 => "INT8",
            ValueType::Int16 => "INT16",
            ValueType::Int32 => "INT32",
            ValueType::Int64 => "INT64",
            ValueType::UnsignedVarint => "UNSIGNED_VARINT",
            ValueType::Varint => "VARINT",
            ValueType::CompactString => "COMPACT_STRING",
            ValueType::CompactNullableString => "COMPACT_NULLABLE_STRING",
            ValueType::CompactArrayLength => "COMPACT_ARRAY_LENGTH",
            ValueType::CompactRecordSize => "COMPACT_RECORD_SIZE",
            ValueType::RawBytes => "RAW_BYTES",
            ValueType::Uuid => "UUID",
            ValueType::Boolean => "BOOLEAN",
            ValueType::String => "STRING",
        };
        f.write_str(name)
    }
}

/// A decoded or encoded wire value.
///
/// Compact array lengths and record sizes keep their raw on-wire number (`N + 1`), so
/// `0` means null and `1` means empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UnsignedVarint(u64),
    Varint(i64),
    CompactString(String),
    CompactNullableString(Option<String>),
    CompactArrayLength(u64),
    CompactRecordSize(u64),
    RawBytes(Bytes),
    Uuid(Uuid),
    Boolean(bool),
    String(Option<String>),
}

macro_rules! value_accessor {
    ($fn_name:ident, $variant:ident, $t:ty) => {
        /// Returns the inner value.
        ///
        /// # Panics
        ///
        /// Panics when the value has a different type; a field addressed by path always
        /// carries the same type, so a mismatch is a bug in the caller.
        pub fn $fn_name(&self) -> $t {
            match self {
                Value::$variant(v) => v.clone(),
                other => panic!(
                    "Internal Error - Value of type {} is not {}",
                    other.value_type(),
                    ValueType::$variant
                ),
            }
        }
    };
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Int8(_) => ValueType::Int8,
            Value::Int16(_) => ValueType::Int16,
            Value::Int32(_) => ValueType::Int32,
            Value::Int64(_) => ValueType::Int64,
            Value::UnsignedVarint(_) => ValueType::UnsignedVarint,
            Value::Varint(_) => ValueType::Varint,
            Value::CompactString(_) => ValueType::CompactString,
            Value::CompactNullableString(_) => ValueType::CompactNullableString,
            Value::CompactArrayLength(_) => ValueType::CompactArrayLength,
            Value::CompactRecordSize(_) => ValueType::CompactRecordSize,
            Value::RawBytes(_) => ValueType::RawBytes,
            Value::Uuid(_) => ValueType::Uuid,
            Value::Boolean(_) => ValueType::Boolean,
            Value::String(_) => ValueType::String,
        }
    }

    value_accessor!(as_int8, Int8, i8);
    value_accessor!(as_int16, Int16, i16);
    value_accessor!(as_int32, Int32, i32);
    value_accessor!(as_int64, Int64, i64);
    value_accessor!(as_unsigned_varint, UnsignedVarint, u64);
    value_accessor!(as_varint, Varint, i64);
    value_accessor!(as_compact_string, CompactString, String);
    value_accessor!(as_compact_nullable_string, CompactNullableString, Option<String>);
    value_accessor!(as_compact_array_length, CompactArrayLength, u64);
    value_accessor!(as_compact_record_size, CompactRecordSize, u64);
    value_accessor!(as_raw_bytes, RawBytes, Bytes);
    value_accessor!(as_uuid, Uuid, Uuid);
    value_accessor!(as_boolean, Boolean, bool);
    value_accessor!(as_string, String, Option<String>);
}

fn fmt_string(f: &mut fmt::Formatter<'_>, s: Option<&str>) -> fmt::Result {
    match s {
        None => f.write_str("NULL"),
        Some("") => f.write_str("\"\""),
        Some(s) => f.write_str(s),
    }
}

fn fmt_compact_length(f: &mut fmt::Formatter<'_>, raw: u64, kind: &str, label: &str) -> fmt::Result {
    match raw {
        0 => write!(f, "0 (NULL {kind})"),
        1 => write!(f, "1 (EMPTY {kind})"),
        n => write!(f, "{n} ({label}({}) + 1)", n - 1),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UnsignedVarint(v) => write!(f, "{v}"),
            Value::Varint(v) => write!(f, "{v}"),
            Value::CompactString(s) => fmt_string(f, Some(s)),
            Value::CompactNullableString(s) => fmt_string(f, s.as_deref()),
            Value::String(s) => fmt_string(f, s.as_deref()),
            Value::CompactArrayLength(n) => fmt_compact_length(f, *n, "ARRAY", "Array length"),
            Value::CompactRecordSize(n) => fmt_compact_length(f, *n, "RECORD", "Record size"),
            Value::RawBytes(b) => write!(f, "{:?} -> UTF-8: ({})", b.as_ref(), String::from_utf8_lossy(b)),
            Value::Uuid(u) => write!(f, "{u}"),
            Value::Boolean(true) => f.write_str("True"),
            Value::Boolean(false) => f.write_str("False"),
        }
    }
}
