//! Kafka v2 record batches.
//!
//! The CRC is CRC-32C (Castagnoli) over every byte from `Attributes` to the end of the
//! batch. `BatchLength` counts the bytes after itself: leader epoch, magic, CRC and the
//! CRC-covered region.

use bytes::{Bytes, BytesMut};

use crate::error::{CodecError, DecodeError};
use crate::field_decoder::FieldDecoder;
use crate::field_encoder::FieldEncoder;

pub const MAGIC: i8 = 2;

/// Bytes of `PartitionLeaderEpoch`, `Magic` and `CRC`, which `BatchLength` counts on top
/// of the CRC-covered region.
const PRE_CRC_LENGTH: usize = 4 + 1 + 4;

/// Bytes of `BaseOffset` and `BatchLength`, which `BatchLength` does not count.
pub const BATCH_OVERHEAD: usize = 8 + 4;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordHeader {
    pub key: String,
    pub value: Option<Bytes>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Record {
    pub attributes: i8,
    pub timestamp_delta: i64,
    /// Always written as the record's index within its batch.
    pub offset_delta: i32,
    pub key: Option<Bytes>,
    pub value: Option<Bytes>,
    pub headers: Vec<RecordHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordBatch {
    pub base_offset: i64,
    /// Recomputed on encode.
    pub batch_length: i32,
    pub partition_leader_epoch: i32,
    pub magic: i8,
    /// Recomputed on encode.
    pub crc: u32,
    pub attributes: i16,
    pub last_offset_delta: i32,
    pub first_timestamp: i64,
    pub max_timestamp: i64,
    pub producer_id: i64,
    pub producer_epoch: i16,
    pub base_sequence: i32,
    pub records: Vec<Record>,
}

impl Default for RecordBatch {
    fn default() -> Self {
        Self {
            base_offset: 0,
            batch_length: 0,
            partition_leader_epoch: 0,
            magic: MAGIC,
            crc: 0,
            attributes: 0,
            last_offset_delta: 0,
            first_timestamp: 0,
            max_timestamp: 0,
            producer_id: -1,
            producer_epoch: -1,
            base_sequence: -1,
            records: Vec::new(),
        }
    }
}

fn write_varint_bytes(e: &mut FieldEncoder, length_segment: &str, segment: &str, raw: Option<&[u8]>) {
    match raw {
        Some(raw) => {
            e.write_varint(length_segment, raw.len() as i64);
            e.write_raw_bytes(segment, raw);
        }
        None => e.write_varint(length_segment, -1),
    }
}

fn read_varint_bytes(
    d: &mut FieldDecoder<'_>,
    length_segment: &str,
    segment: &str,
) -> Result<Option<Bytes>, DecodeError> {
    let length = d.read_varint(length_segment)?;
    match length {
        -1 => Ok(None),
        n if n < -1 => Err(d.last_anchor().error(CodecError::InvalidLength(format!(
            "Expected {length_segment} to be -1 or a non-negative number, got {n}"
        )))),
        n => d.read_raw_bytes(segment, n as usize).map(Some),
    }
}

// --- RecordHeader ---

impl RecordHeader {
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
        }
    }

    fn encode(&self, e: &mut FieldEncoder) {
        write_varint_bytes(e, "KeyLength", "Key", Some(self.key.as_bytes()));
        write_varint_bytes(e, "ValueLength", "Value", self.value.as_deref());
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let key = read_varint_bytes(d, "KeyLength", "Key")?;
        let value = read_varint_bytes(d, "ValueLength", "Value")?;
        Ok(Self {
            key: key.map(|k| String::from_utf8_lossy(&k).into_owned()).unwrap_or_default(),
            value,
        })
    }
}

// --- Record ---

impl Record {
    pub fn with_value(value: impl Into<Bytes>) -> Self {
        Self {
            value: Some(value.into()),
            ..Default::default()
        }
    }

    fn encode_contents(&self, offset_delta: i32, e: &mut FieldEncoder) {
        e.write_int8("Attributes", self.attributes);
        e.write_varint("TimestampDelta", self.timestamp_delta);
        e.write_varint("OffsetDelta", i64::from(offset_delta));
        write_varint_bytes(e, "KeyLength", "Key", self.key.as_deref());
        write_varint_bytes(e, "ValueLength", "Value", self.value.as_deref());
        e.write_varint("HeadersLength", self.headers.len() as i64);
        for (i, header) in self.headers.iter().enumerate() {
            let mut scope = e.scope(format!("Headers[{i}]"));
            header.encode(&mut scope);
        }
    }

    fn encode(&self, offset_delta: i32, e: &mut FieldEncoder) {
        let mut scratch = FieldEncoder::new();
        self.encode_contents(offset_delta, &mut scratch);
        e.write_varint("Size", scratch.len() as i64);
        self.encode_contents(offset_delta, e);
    }

    pub fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let declared_size = d.read_varint("Size")?;
        let size_anchor = d.last_anchor();
        let start = d.read_bytes_count();

        let attributes = d.read_int8("Attributes")?;
        let timestamp_delta = d.read_varint("TimestampDelta")?;
        let raw_offset_delta = d.read_varint("OffsetDelta")?;
        let offset_delta = i32::try_from(raw_offset_delta).map_err(|_| {
            d.last_anchor().error(CodecError::InvalidValue(format!(
                "Expected OffsetDelta to fit in an int32, got {raw_offset_delta}"
            )))
        })?;
        let key = read_varint_bytes(d, "KeyLength", "Key")?;
        let value = read_varint_bytes(d, "ValueLength", "Value")?;
        let headers_length = d.read_varint("HeadersLength")?;
        if headers_length < -1 {
            return Err(d.last_anchor().error(CodecError::InvalidLength(format!(
                "Expected HeadersLength to be -1 or a non-negative number, got {headers_length}"
            ))));
        }
        let mut headers = Vec::new();
        for i in 0..headers_length.max(0) {
            let mut scope = d.scope(format!("Headers[{i}]"));
            headers.push(RecordHeader::decode(&mut scope)?);
        }

        let actual_size = (d.read_bytes_count() - start) as i64;
        if actual_size != declared_size {
            return Err(size_anchor.error(CodecError::BatchSizeMismatch(format!(
                "Expected record length to be {actual_size} (actual size of record), got {declared_size} instead"
            ))));
        }

        Ok(Self {
            attributes,
            timestamp_delta,
            offset_delta,
            key,
            value,
            headers,
        })
    }
}

// --- RecordBatch ---

impl RecordBatch {
    /// Everything from `Attributes` to the end of the batch.
    fn encode_properties(&self, e: &mut FieldEncoder) {
        e.write_int16("Attributes", self.attributes);
        e.write_int32("LastOffsetDelta", self.records.len() as i32 - 1);
        e.write_int64("FirstTimestamp", self.first_timestamp);
        e.write_int64("MaxTimestamp", self.max_timestamp);
        e.write_int64("ProducerId", self.producer_id);
        e.write_int16("ProducerEpoch", self.producer_epoch);
        e.write_int32("BaseSequence", self.base_sequence);

        let mut records = e.scope("Records");
        records.write_int32("Length", self.records.len() as i32);
        for (i, record) in self.records.iter().enumerate() {
            let mut scope = records.scope(format!("Records[{i}]"));
            record.encode(i as i32, &mut scope);
        }
    }

    fn properties_bytes(&self) -> Bytes {
        let mut scratch = FieldEncoder::new();
        self.encode_properties(&mut scratch);
        scratch.into_bytes()
    }

    pub fn encode(&self, e: &mut FieldEncoder) {
        let properties = self.properties_bytes();
        e.write_int64("BaseOffset", self.base_offset);
        e.write_int32("BatchLength", (properties.len() + PRE_CRC_LENGTH) as i32);
        e.write_int32("PartitionLeaderEpoch", self.partition_leader_epoch);
        e.write_int8("Magic", MAGIC);
        e.write_uint32("CRC", crc32c::crc32c(&properties));
        self.encode_properties(e);
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut encoder = FieldEncoder::new();
        self.encode(&mut encoder);
        encoder.into_bytes()
    }

    /// The batch exactly as it reads back after an encode: computed length and CRC,
    /// magic 2, offset deltas equal to record indices.
    pub fn normalized(&self) -> RecordBatch {
        let properties = self.properties_bytes();
        let mut batch = self.clone();
        batch.batch_length = (properties.len() + PRE_CRC_LENGTH) as i32;
        batch.magic = MAGIC;
        batch.crc = crc32c::crc32c(&properties);
        batch.last_offset_delta = batch.records.len() as i32 - 1;
        for (i, record) in batch.records.iter_mut().enumerate() {
            record.offset_delta = i as i32;
        }
        batch
    }

    /// Offset of the last record in this batch.
    pub fn last_offset(&self) -> i64 {
        self.base_offset + self.records.len() as i64 - 1
    }

    pub fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let base_offset = d.read_int64("BaseOffset")?;
        let batch_length = d.read_int32("BatchLength")?;
        let length_anchor = d.last_anchor();
        if batch_length <= 0 {
            return Err(length_anchor.error(CodecError::InvalidLength(format!(
                "Expected RecordBatch length to be positive, got {batch_length}"
            ))));
        }
        let length_region_start = d.read_bytes_count();

        let partition_leader_epoch = d.read_int32("PartitionLeaderEpoch")?;
        let magic = d.read_int8("Magic")?;
        if magic != MAGIC {
            return Err(d.last_anchor().error(CodecError::InvalidValue(format!(
                "Expected magic byte to be {MAGIC}, got {magic}"
            ))));
        }
        let crc = d.read_uint32("CRC")?;
        let crc_anchor = d.last_anchor();
        let crc_region_start = d.read_bytes_count();

        let attributes = d.read_int16("Attributes")?;
        let last_offset_delta = d.read_int32("LastOffsetDelta")?;
        let first_timestamp = d.read_int64("FirstTimestamp")?;
        let max_timestamp = d.read_int64("MaxTimestamp")?;
        let producer_id = d.read_int64("ProducerId")?;
        let producer_epoch = d.read_int16("ProducerEpoch")?;
        let base_sequence = d.read_int32("BaseSequence")?;
        let records = d.read_array("Records", Record::decode)?;

        let end = d.read_bytes_count();
        let actual_length = (end - length_region_start) as i64;
        if actual_length != i64::from(batch_length) {
            return Err(length_anchor.error(CodecError::BatchSizeMismatch(format!(
                "Expected RecordBatch length to be {actual_length} (actual record length), got {batch_length}"
            ))));
        }

        let computed_crc = crc32c::crc32c(d.slice(crc_region_start, end));
        if computed_crc != crc {
            return Err(crc_anchor.error(CodecError::CrcMismatch {
                expected: format!("{computed_crc:#010x}"),
                actual: format!("{crc:#010x}"),
            }));
        }

        Ok(Self {
            base_offset,
            batch_length,
            partition_leader_epoch,
            magic,
            crc,
            attributes,
            last_offset_delta,
            first_timestamp,
            max_timestamp,
            producer_id,
            producer_epoch,
            base_sequence,
            records,
        })
    }
}

// --- Record batch streams ---

/// Writes a compact-size-prefixed run of batches under `name`: `Size` holds the byte
/// count plus one, followed by `name[i]` for each batch.
pub fn write_compact_record_batches(e: &mut FieldEncoder, name: &str, batches: &[RecordBatch]) {
    let total: usize = batches.iter().map(|b| b.to_bytes().len()).sum();
    let mut scope = e.scope(name);
    scope.write_compact_record_size("Size", total as u64 + 1);
    for (i, batch) in batches.iter().enumerate() {
        let mut entry = scope.scope(format!("{name}[{i}]"));
        batch.encode(&mut entry);
    }
}

/// Reads the stream written by [`write_compact_record_batches`]. A size of 0 or 1 is an
/// empty stream.
pub fn read_compact_record_batches(
    d: &mut FieldDecoder<'_>,
    name: &str,
) -> Result<Vec<RecordBatch>, DecodeError> {
    let mut scope = d.scope(name);
    let raw_size = scope.read_compact_record_size("Size")?;
    let size_anchor = scope.last_anchor();
    if raw_size <= 1 {
        return Ok(Vec::new());
    }

    let size = (raw_size - 1) as usize;
    let remaining = scope.remaining_bytes_count();
    if remaining < size {
        return Err(size_anchor.error(CodecError::BatchSizeMismatch(format!(
            "RecordBatch byte count was decoded as {size} bytes, got {remaining} bytes remaining"
        ))));
    }

    let start = scope.read_bytes_count();
    let batches = scope.read_bounded(size, |d| {
        let mut batches = Vec::new();
        while d.remaining_bytes_count() > 0 {
            let mut entry = d.scope(format!("{name}[{}]", batches.len()));
            batches.push(RecordBatch::decode(&mut entry)?);
        }
        Ok(batches)
    })?;

    let consumed = scope.read_bytes_count() - start;
    if consumed != size {
        return Err(size_anchor.error(CodecError::BatchSizeMismatch(format!(
            "Expected RecordBatch byte count to be {size}, got {consumed} instead"
        ))));
    }
    Ok(batches)
}

/// Concatenated batch bytes, as stored in a partition's `.log` file.
pub fn encode_record_batches(batches: &[RecordBatch]) -> Bytes {
    let mut out = BytesMut::new();
    for batch in batches {
        out.extend_from_slice(&batch.to_bytes());
    }
    out.freeze()
}

/// Reads back-to-back batches until the input is exhausted.
pub fn decode_record_batches(bytes: &[u8]) -> Result<Vec<RecordBatch>, DecodeError> {
    let mut decoder = FieldDecoder::new(bytes);
    let mut scope = decoder.scope("RecordBatches");
    let mut batches = Vec::new();
    while scope.remaining_bytes_count() > 0 {
        let mut entry = scope.scope(format!("RecordBatches[{}]", batches.len()));
        batches.push(RecordBatch::decode(&mut entry)?);
    }
    Ok(batches)
}
