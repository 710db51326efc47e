use uuid::Uuid;

use crate::api::{RequestBody, ResponseBody, ResponseHeaderVersion};
use crate::api_keys::ApiKey;
use crate::batch::{read_compact_record_batches, write_compact_record_batches, RecordBatch};
use crate::error::DecodeError;
use crate::field_decoder::FieldDecoder;
use crate::field_encoder::FieldEncoder;

// --- Request ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequestPartition {
    pub id: i32,
    pub current_leader_epoch: i32,
    pub fetch_offset: i64,
    pub last_fetched_offset: i32,
    pub log_start_offset: i64,
    pub partition_max_bytes: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequestTopic {
    pub topic_uuid: Uuid,
    pub partitions: Vec<FetchRequestPartition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForgottenTopic {
    pub topic_uuid: Uuid,
    pub partition_ids: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchRequestBody {
    pub max_wait_ms: i32,
    pub min_bytes: i32,
    pub max_bytes: i32,
    pub isolation_level: i8,
    pub session_id: i32,
    pub session_epoch: i32,
    pub topics: Vec<FetchRequestTopic>,
    pub forgotten_topics: Vec<ForgottenTopic>,
    pub rack_id: String,
}

impl RequestBody for FetchRequestBody {
    const API_KEY: ApiKey = ApiKey::Fetch;

    fn encode(&self, e: &mut FieldEncoder) {
        let mut body = e.scope("Body");
        body.write_int32("MaxWaitMS", self.max_wait_ms);
        body.write_int32("MinBytes", self.min_bytes);
        body.write_int32("MaxBytes", self.max_bytes);
        body.write_int8("IsolationLevel", self.isolation_level);
        body.write_int32("SessionId", self.session_id);
        body.write_int32("SessionEpoch", self.session_epoch);
        body.write_compact_array("Topics", &self.topics, |e, topic| {
            e.write_uuid("UUID", &topic.topic_uuid);
            e.write_compact_array("Partitions", &topic.partitions, |e, partition| {
                e.write_int32("ID", partition.id);
                e.write_int32("CurrentLeaderEpoch", partition.current_leader_epoch);
                e.write_int64("FetchOffset", partition.fetch_offset);
                e.write_int32("LastFetchedOffset", partition.last_fetched_offset);
                e.write_int64("LogStartOffset", partition.log_start_offset);
                e.write_int32("PartitionMaxBytes", partition.partition_max_bytes);
                e.write_empty_tag_buffer();
            });
            e.write_empty_tag_buffer();
        });
        body.write_compact_array("ForgottenTopics", &self.forgotten_topics, |e, topic| {
            e.write_uuid("UUID", &topic.topic_uuid);
            e.write_compact_int32_array("PartitionIds", &topic.partition_ids);
            e.write_empty_tag_buffer();
        });
        body.write_compact_string("RackId", &self.rack_id);
        body.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut body = d.scope("Body");
        let max_wait_ms = body.read_int32("MaxWaitMS")?;
        let min_bytes = body.read_int32("MinBytes")?;
        let max_bytes = body.read_int32("MaxBytes")?;
        let isolation_level = body.read_int8("IsolationLevel")?;
        let session_id = body.read_int32("SessionId")?;
        let session_epoch = body.read_int32("SessionEpoch")?;
        let topics = body.read_compact_array("Topics", |d| {
            let topic_uuid = d.read_uuid("UUID")?;
            let partitions = d.read_compact_array("Partitions", |d| {
                let partition = FetchRequestPartition {
                    id: d.read_int32("ID")?,
                    current_leader_epoch: d.read_int32("CurrentLeaderEpoch")?,
                    fetch_offset: d.read_int64("FetchOffset")?,
                    last_fetched_offset: d.read_int32("LastFetchedOffset")?,
                    log_start_offset: d.read_int64("LogStartOffset")?,
                    partition_max_bytes: d.read_int32("PartitionMaxBytes")?,
                };
                d.consume_tag_buffer()?;
                Ok(partition)
            })?;
            d.consume_tag_buffer()?;
            Ok(FetchRequestTopic {
                topic_uuid,
                partitions,
            })
        })?;
        let forgotten_topics = body.read_compact_array("ForgottenTopics", |d| {
            let topic_uuid = d.read_uuid("UUID")?;
            let partition_ids = d.read_compact_int32_array("PartitionIds")?;
            d.consume_tag_buffer()?;
            Ok(ForgottenTopic {
                topic_uuid,
                partition_ids,
            })
        })?;
        let rack_id = body.read_compact_string("RackId")?;
        body.consume_tag_buffer()?;
        Ok(Self {
            max_wait_ms,
            min_bytes,
            max_bytes,
            isolation_level,
            session_id,
            session_epoch,
            topics,
            forgotten_topics,
            rack_id,
        })
    }
}

// --- Response ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AbortedTransaction {
    pub producer_id: i64,
    pub first_offset: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponsePartition {
    pub id: i32,
    pub error_code: i16,
    pub high_watermark: i64,
    pub last_stable_offset: i64,
    pub log_start_offset: i64,
    pub aborted_transactions: Vec<AbortedTransaction>,
    pub preferred_read_replica: i32,
    pub record_batches: Vec<RecordBatch>,
}

impl FetchResponsePartition {
    fn encode(&self, e: &mut FieldEncoder) {
        e.write_int32("ID", self.id);
        e.write_int16("ErrorCode", self.error_code);
        e.write_int64("HighWatermark", self.high_watermark);
        e.write_int64("LastStableOffset", self.last_stable_offset);
        e.write_int64("LogStartOffset", self.log_start_offset);
        e.write_compact_array("AbortedTransactions", &self.aborted_transactions, |e, txn| {
            e.write_int64("ProducerID", txn.producer_id);
            e.write_int64("FirstOffset", txn.first_offset);
            e.write_empty_tag_buffer();
        });
        e.write_int32("PreferredReadReplica", self.preferred_read_replica);
        write_compact_record_batches(e, "RecordBatches", &self.record_batches);
        e.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let id = d.read_int32("ID")?;
        let error_code = d.read_int16("ErrorCode")?;
        let high_watermark = d.read_int64("HighWatermark")?;
        let last_stable_offset = d.read_int64("LastStableOffset")?;
        let log_start_offset = d.read_int64("LogStartOffset")?;
        let aborted_transactions = d.read_compact_array("AbortedTransactions", |d| {
            let producer_id = d.read_int64("ProducerID")?;
            let first_offset = d.read_int64("FirstOffset")?;
            d.consume_tag_buffer()?;
            Ok(AbortedTransaction {
                producer_id,
                first_offset,
            })
        })?;
        let preferred_read_replica = d.read_int32("PreferredReadReplica")?;
        let record_batches = read_compact_record_batches(d, "RecordBatches")?;
        d.consume_tag_buffer()?;
        Ok(Self {
            id,
            error_code,
            high_watermark,
            last_stable_offset,
            log_start_offset,
            aborted_transactions,
            preferred_read_replica,
            record_batches,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponseTopic {
    pub topic_uuid: Uuid,
    pub partitions: Vec<FetchResponsePartition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchResponseBody {
    pub throttle_time_ms: i32,
    pub error_code: i16,
    pub session_id: i32,
    pub topics: Vec<FetchResponseTopic>,
}

impl ResponseBody for FetchResponseBody {
    const API_KEY: ApiKey = ApiKey::Fetch;
    const HEADER_VERSION: ResponseHeaderVersion = ResponseHeaderVersion::V1;

    fn encode(&self, e: &mut FieldEncoder) {
        let mut body = e.scope("Body");
        body.write_int32("ThrottleTimeMs", self.throttle_time_ms);
        body.write_int16("ErrorCode", self.error_code);
        body.write_int32("SessionId", self.session_id);
        body.write_compact_array("Topics", &self.topics, |e, topic| {
            e.write_uuid("UUID", &topic.topic_uuid);
            e.write_compact_array("Partitions", &topic.partitions, |e, partition| {
                partition.encode(e)
            });
            e.write_empty_tag_buffer();
        });
        body.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut body = d.scope("Body");
        let throttle_time_ms = body.read_int32("ThrottleTimeMs")?;
        let error_code = body.read_int16("ErrorCode")?;
        let session_id = body.read_int32("SessionId")?;
        let topics = body.read_compact_array("Topics", |d| {
            let topic_uuid = d.read_uuid("UUID")?;
            let partitions = d.read_compact_array("Partitions", FetchResponsePartition::decode)?;
            d.consume_tag_buffer()?;
            Ok(FetchResponseTopic {
                topic_uuid,
                partitions,
            })
        })?;
        body.consume_tag_buffer()?;
        Ok(Self {
            throttle_time_ms,
            error_code,
            session_id,
            topics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{FetchResponse, ResponseHeader};
    use crate::batch::Record;

    #[test]
    fn test_record_batch_paths_inside_fetch_response() {
        let batch = RecordBatch {
            records: vec![Record::with_value("msg1")],
            ..Default::default()
        }
        .normalized();
        let response = FetchResponse {
            header: ResponseHeader { correlation_id: 3 },
            body: FetchResponseBody {
                topics: vec![FetchResponseTopic {
                    topic_uuid: Uuid::from_u128(1),
                    partitions: vec![FetchResponsePartition {
                        record_batches: vec![batch],
                        ..Default::default()
                    }],
                }],
                ..Default::default()
            },
        };

        let (decoded, fields) = FetchResponse::decode_payload(&response.encode()).unwrap();
        assert_eq!(decoded, response);
        let value_path = "FetchResponse.Body.Topics.Topics[0].Partitions.Partitions[0].RecordBatches.RecordBatches[0].Records.Records[0].Value";
        assert!(fields.iter().any(|f| f.path.is(value_path)));
    }
}
