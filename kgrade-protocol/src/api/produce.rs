use crate::api::{RequestBody, ResponseBody, ResponseHeaderVersion};
use crate::api_keys::ApiKey;
use crate::batch::{read_compact_record_batches, write_compact_record_batches, RecordBatch};
use crate::error::DecodeError;
use crate::field_decoder::FieldDecoder;
use crate::field_encoder::FieldEncoder;

// --- Request ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceRequestPartition {
    pub id: i32,
    pub record_batches: Vec<RecordBatch>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProduceRequestTopic {
    pub name: String,
    pub partitions: Vec<ProduceRequestPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceRequestBody {
    pub transactional_id: Option<String>,
    pub acks: i16,
    pub timeout_ms: i32,
    pub topics: Vec<ProduceRequestTopic>,
}

impl RequestBody for ProduceRequestBody {
    const API_KEY: ApiKey = ApiKey::Produce;

    fn encode(&self, e: &mut FieldEncoder) {
        let mut body = e.scope("Body");
        body.write_compact_nullable_string("TransactionalID", self.transactional_id.as_deref());
        body.write_int16("Acks", self.acks);
        body.write_int32("TimeoutMs", self.timeout_ms);
        body.write_compact_array("Topics", &self.topics, |e, topic| {
            e.write_compact_string("Name", &topic.name);
            e.write_compact_array("Partitions", &topic.partitions, |e, partition| {
                e.write_int32("ID", partition.id);
                write_compact_record_batches(e, "RecordBatches", &partition.record_batches);
                e.write_empty_tag_buffer();
            });
            e.write_empty_tag_buffer();
        });
        body.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut body = d.scope("Body");
        let transactional_id = body.read_compact_nullable_string("TransactionalID")?;
        let acks = body.read_int16("Acks")?;
        let timeout_ms = body.read_int32("TimeoutMs")?;
        let topics = body.read_compact_array("Topics", |d| {
            let name = d.read_compact_string("Name")?;
            let partitions = d.read_compact_array("Partitions", |d| {
                let id = d.read_int32("ID")?;
                let record_batches = read_compact_record_batches(d, "RecordBatches")?;
                d.consume_tag_buffer()?;
                Ok(ProduceRequestPartition { id, record_batches })
            })?;
            d.consume_tag_buffer()?;
            Ok(ProduceRequestTopic { name, partitions })
        })?;
        body.consume_tag_buffer()?;
        Ok(Self {
            transactional_id,
            acks,
            timeout_ms,
            topics,
        })
    }
}

// --- Response ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    pub batch_index: i32,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceResponsePartition {
    pub id: i32,
    pub error_code: i16,
    pub base_offset: i64,
    pub log_append_time_ms: i64,
    pub log_start_offset: i64,
    pub record_errors: Vec<RecordError>,
    pub error_message: Option<String>,
}

impl ProduceResponsePartition {
    fn encode(&self, e: &mut FieldEncoder) {
        e.write_int32("ID", self.id);
        e.write_int16("ErrorCode", self.error_code);
        e.write_int64("BaseOffset", self.base_offset);
        e.write_int64("LogAppendTimeMs", self.log_append_time_ms);
        e.write_int64("LogStartOffset", self.log_start_offset);
        e.write_compact_array("RecordErrors", &self.record_errors, |e, record_error| {
            e.write_int32("BatchIndex", record_error.batch_index);
            e.write_compact_nullable_string("ErrorMessage", record_error.error_message.as_deref());
            e.write_empty_tag_buffer();
        });
        e.write_compact_nullable_string("ErrorMessage", self.error_message.as_deref());
        e.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let id = d.read_int32("ID")?;
        let error_code = d.read_int16("ErrorCode")?;
        let base_offset = d.read_int64("BaseOffset")?;
        let log_append_time_ms = d.read_int64("LogAppendTimeMs")?;
        let log_start_offset = d.read_int64("LogStartOffset")?;
        let record_errors = d.read_compact_array("RecordErrors", |d| {
            let batch_index = d.read_int32("BatchIndex")?;
            let error_message = d.read_compact_nullable_string("ErrorMessage")?;
            d.consume_tag_buffer()?;
            Ok(RecordError {
                batch_index,
                error_message,
            })
        })?;
        let error_message = d.read_compact_nullable_string("ErrorMessage")?;
        d.consume_tag_buffer()?;
        Ok(Self {
            id,
            error_code,
            base_offset,
            log_append_time_ms,
            log_start_offset,
            record_errors,
            error_message,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceResponseTopic {
    pub name: String,
    pub partitions: Vec<ProduceResponsePartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProduceResponseBody {
    pub topics: Vec<ProduceResponseTopic>,
    pub throttle_time_ms: i32,
}

impl ResponseBody for ProduceResponseBody {
    const API_KEY: ApiKey = ApiKey::Produce;
    const HEADER_VERSION: ResponseHeaderVersion = ResponseHeaderVersion::V1;

    fn encode(&self, e: &mut FieldEncoder) {
        let mut body = e.scope("Body");
        body.write_compact_array("Topics", &self.topics, |e, topic| {
            e.write_compact_string("Name", &topic.name);
            e.write_compact_array("Partitions", &topic.partitions, |e, partition| {
                partition.encode(e)
            });
            e.write_empty_tag_buffer();
        });
        body.write_int32("ThrottleTimeMs", self.throttle_time_ms);
        body.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut body = d.scope("Body");
        let topics = body.read_compact_array("Topics", |d| {
            let name = d.read_compact_string("Name")?;
            let partitions = d.read_compact_array("Partitions", ProduceResponsePartition::decode)?;
            d.consume_tag_buffer()?;
            Ok(ProduceResponseTopic { name, partitions })
        })?;
        let throttle_time_ms = body.read_int32("ThrottleTimeMs")?;
        body.consume_tag_buffer()?;
        Ok(Self {
            topics,
            throttle_time_ms,
        })
    }
}
