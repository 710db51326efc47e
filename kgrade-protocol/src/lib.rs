//! Kafka wire-protocol definitions for grading broker implementations.
//!
//! Every value the decoder reads is recorded as a [`Field`] under a dotted [`FieldPath`],
//! so failures can be reported against the exact location in the response.

pub mod api;
pub mod api_keys;
pub mod batch;
pub mod builder;
pub mod cluster_metadata;
pub mod codec;
pub mod error;
pub mod error_codes;
pub mod field;
pub mod field_decoder;
pub mod field_encoder;
pub mod field_path;
pub mod field_tree_printer;
pub mod hex_dump;
pub mod primitives;
pub mod value;

mod field_tree_printer_prop_test;

pub use api::*;
pub use api_keys::ApiKey;
pub use batch::{decode_record_batches, encode_record_batches, Record, RecordBatch, RecordHeader};
pub use builder::*;
pub use cluster_metadata::*;
pub use codec::*;
pub use error::{CodecError, DecodeError};
pub use error_codes::ErrorCode;
pub use field::Field;
pub use field_decoder::{FieldDecoder, TAG_BUFFER};
pub use field_encoder::FieldEncoder;
pub use field_path::FieldPath;
pub use field_tree_printer::FieldTreePrinter;
pub use hex_dump::InspectableHexDump;
pub use value::{Value, ValueType};
