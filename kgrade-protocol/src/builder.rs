//! Fluent builders that pre-fill requests with the defaults the assertions expect.

use bytes::Bytes;
use uuid::Uuid;

use crate::api::{
    ApiVersionsRequest, ApiVersionsRequestBody, Cursor, DescribeTopicPartitionsRequest,
    DescribeTopicPartitionsRequestBody, FetchRequest, FetchRequestBody, FetchRequestPartition,
    FetchRequestTopic, ProduceRequest, ProduceRequestBody, ProduceRequestPartition,
    ProduceRequestTopic, Request, RequestBody, RequestHeader, DEFAULT_CLIENT_ID,
};
use crate::batch::{Record, RecordBatch, RecordHeader};

pub const API_VERSIONS_VERSION: i16 = 4;
pub const DESCRIBE_TOPIC_PARTITIONS_VERSION: i16 = 0;
pub const FETCH_VERSION: i16 = 16;
pub const PRODUCE_VERSION: i16 = 11;

// --- Header ---

#[derive(Debug, Clone)]
pub struct RequestHeaderBuilder {
    api_key: i16,
    api_version: i16,
    correlation_id: i32,
    client_id: Option<String>,
}

impl RequestHeaderBuilder {
    pub fn new(api_key: i16, api_version: i16) -> Self {
        Self {
            api_key,
            api_version,
            correlation_id: 0,
            client_id: Some(DEFAULT_CLIENT_ID.to_string()),
        }
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn api_version(mut self, api_version: i16) -> Self {
        self.api_version = api_version;
        self
    }

    pub fn client_id(mut self, client_id: Option<&str>) -> Self {
        self.client_id = client_id.map(str::to_string);
        self
    }

    pub fn build(self) -> RequestHeader {
        RequestHeader {
            api_key: self.api_key,
            api_version: self.api_version,
            correlation_id: self.correlation_id,
            client_id: self.client_id,
        }
    }
}

fn header_for<B: RequestBody>(version: i16) -> RequestHeaderBuilder {
    RequestHeaderBuilder::new(B::API_KEY.code(), version)
}

// --- ApiVersions ---

#[derive(Debug, Clone)]
pub struct ApiVersionsRequestBuilder {
    header: RequestHeaderBuilder,
    body: ApiVersionsRequestBody,
}

impl Default for ApiVersionsRequestBuilder {
    fn default() -> Self {
        Self {
            header: header_for::<ApiVersionsRequestBody>(API_VERSIONS_VERSION),
            body: ApiVersionsRequestBody {
                client_software_name: "kafka-cli".to_string(),
                client_software_version: "0.1".to_string(),
            },
        }
    }
}

impl ApiVersionsRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.header = self.header.correlation_id(correlation_id);
        self
    }

    /// Requests a version the broker may not support, for the UNSUPPORTED_VERSION case.
    pub fn api_version(mut self, api_version: i16) -> Self {
        self.header = self.header.api_version(api_version);
        self
    }

    pub fn client_id(mut self, client_id: Option<&str>) -> Self {
        self.header = self.header.client_id(client_id);
        self
    }

    pub fn client_software(mut self, name: &str, version: &str) -> Self {
        self.body.client_software_name = name.to_string();
        self.body.client_software_version = version.to_string();
        self
    }

    pub fn build(self) -> ApiVersionsRequest {
        Request {
            header: self.header.build(),
            body: self.body,
        }
    }
}

// --- DescribeTopicPartitions ---

#[derive(Debug, Clone)]
pub struct DescribeTopicPartitionsRequestBuilder {
    header: RequestHeaderBuilder,
    body: DescribeTopicPartitionsRequestBody,
}

impl Default for DescribeTopicPartitionsRequestBuilder {
    fn default() -> Self {
        Self {
            header: header_for::<DescribeTopicPartitionsRequestBody>(
                DESCRIBE_TOPIC_PARTITIONS_VERSION,
            ),
            body: DescribeTopicPartitionsRequestBody {
                topic_names: Vec::new(),
                response_partition_limit: 2000,
                cursor: None,
            },
        }
    }
}

impl DescribeTopicPartitionsRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.header = self.header.correlation_id(correlation_id);
        self
    }

    pub fn topic_names<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.body.topic_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn response_partition_limit(mut self, limit: i32) -> Self {
        self.body.response_partition_limit = limit;
        self
    }

    pub fn cursor(mut self, topic_name: &str, partition_index: i32) -> Self {
        self.body.cursor = Some(Cursor {
            topic_name: topic_name.to_string(),
            partition_index,
        });
        self
    }

    pub fn build(self) -> DescribeTopicPartitionsRequest {
        Request {
            header: self.header.build(),
            body: self.body,
        }
    }
}

// --- Fetch ---

/// Fetch partition with log-reading defaults: start at offset 0, 1 MiB per partition.
pub fn fetch_partition(id: i32) -> FetchRequestPartition {
    FetchRequestPartition {
        id,
        current_leader_epoch: -1,
        fetch_offset: 0,
        last_fetched_offset: -1,
        log_start_offset: -1,
        partition_max_bytes: 1048576,
    }
}

#[derive(Debug, Clone)]
pub struct FetchRequestBuilder {
    header: RequestHeaderBuilder,
    body: FetchRequestBody,
}

impl Default for FetchRequestBuilder {
    fn default() -> Self {
        Self {
            header: header_for::<FetchRequestBody>(FETCH_VERSION),
            body: FetchRequestBody {
                max_wait_ms: 500,
                min_bytes: 1,
                max_bytes: 52428800,
                isolation_level: 0,
                session_id: 0,
                session_epoch: 0,
                topics: Vec::new(),
                forgotten_topics: Vec::new(),
                rack_id: String::new(),
            },
        }
    }
}

impl FetchRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.header = self.header.correlation_id(correlation_id);
        self
    }

    pub fn max_wait_ms(mut self, max_wait_ms: i32) -> Self {
        self.body.max_wait_ms = max_wait_ms;
        self
    }

    pub fn session(mut self, session_id: i32, session_epoch: i32) -> Self {
        self.body.session_id = session_id;
        self.body.session_epoch = session_epoch;
        self
    }

    /// Adds a topic, fetching each listed partition with [`fetch_partition`] defaults.
    pub fn topic(mut self, topic_uuid: Uuid, partition_ids: &[i32]) -> Self {
        self.body.topics.push(FetchRequestTopic {
            topic_uuid,
            partitions: partition_ids.iter().copied().map(fetch_partition).collect(),
        });
        self
    }

    pub fn topic_with_partitions(
        mut self,
        topic_uuid: Uuid,
        partitions: Vec<FetchRequestPartition>,
    ) -> Self {
        self.body.topics.push(FetchRequestTopic {
            topic_uuid,
            partitions,
        });
        self
    }

    pub fn build(self) -> FetchRequest {
        Request {
            header: self.header.build(),
            body: self.body,
        }
    }
}

// --- Produce ---

#[derive(Debug, Clone)]
pub struct ProduceRequestBuilder {
    header: RequestHeaderBuilder,
    body: ProduceRequestBody,
}

impl Default for ProduceRequestBuilder {
    fn default() -> Self {
        Self {
            header: header_for::<ProduceRequestBody>(PRODUCE_VERSION),
            body: ProduceRequestBody {
                transactional_id: None,
                acks: 1,
                timeout_ms: 5000,
                topics: Vec::new(),
            },
        }
    }
}

impl ProduceRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.header = self.header.correlation_id(correlation_id);
        self
    }

    pub fn acks(mut self, acks: i16) -> Self {
        self.body.acks = acks;
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: i32) -> Self {
        self.body.timeout_ms = timeout_ms;
        self
    }

    pub fn transactional_id(mut self, transactional_id: Option<&str>) -> Self {
        self.body.transactional_id = transactional_id.map(str::to_string);
        self
    }

    /// Appends batches for `(topic, partition)`, merging into an existing entry.
    pub fn batches(mut self, topic: &str, partition_id: i32, batches: Vec<RecordBatch>) -> Self {
        let index = match self.body.topics.iter().position(|t| t.name == topic) {
            Some(index) => index,
            None => {
                self.body.topics.push(ProduceRequestTopic {
                    name: topic.to_string(),
                    partitions: Vec::new(),
                });
                self.body.topics.len() - 1
            }
        };
        let partitions = &mut self.body.topics[index].partitions;
        match partitions.iter_mut().find(|p| p.id == partition_id) {
            Some(partition) => partition.record_batches.extend(batches),
            None => partitions.push(ProduceRequestPartition {
                id: partition_id,
                record_batches: batches,
            }),
        }
        self
    }

    pub fn build(self) -> ProduceRequest {
        Request {
            header: self.header.build(),
            body: self.body,
        }
    }
}

// --- RecordBatch ---

#[derive(Debug, Clone, Default)]
pub struct RecordBatchBuilder {
    batch: RecordBatch,
}

impl RecordBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn base_offset(mut self, base_offset: i64) -> Self {
        self.batch.base_offset = base_offset;
        self
    }

    pub fn partition_leader_epoch(mut self, epoch: i32) -> Self {
        self.batch.partition_leader_epoch = epoch;
        self
    }

    pub fn attributes(mut self, attributes: i16) -> Self {
        self.batch.attributes = attributes;
        self
    }

    /// Sets both first and max timestamp.
    pub fn timestamp(mut self, timestamp: i64) -> Self {
        self.batch.first_timestamp = timestamp;
        self.batch.max_timestamp = timestamp;
        self
    }

    pub fn producer(mut self, producer_id: i64, producer_epoch: i16, base_sequence: i32) -> Self {
        self.batch.producer_id = producer_id;
        self.batch.producer_epoch = producer_epoch;
        self.batch.base_sequence = base_sequence;
        self
    }

    pub fn record(mut self, record: Record) -> Self {
        self.batch.records.push(record);
        self
    }

    /// Adds a record with an empty (non-null) key and the given value.
    pub fn value(self, value: impl Into<Bytes>) -> Self {
        self.record(Record {
            key: Some(Bytes::new()),
            value: Some(value.into()),
            ..Default::default()
        })
    }

    pub fn header_record(self, value: impl Into<Bytes>, headers: Vec<RecordHeader>) -> Self {
        self.record(Record {
            value: Some(value.into()),
            headers,
            ..Default::default()
        })
    }

    /// The batch with its length, CRC and offset deltas filled in.
    pub fn build(self) -> RecordBatch {
        self.batch.normalized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_defaults() {
        let request = FetchRequestBuilder::new()
            .correlation_id(11)
            .topic(Uuid::from_u128(7), &[0, 1])
            .build();
        assert_eq!(request.header.api_key, 1);
        assert_eq!(request.header.api_version, 16);
        assert_eq!(request.header.client_id.as_deref(), Some("kafka-tester"));
        assert_eq!(request.body.max_bytes, 52428800);
        assert_eq!(request.body.topics[0].partitions.len(), 2);
        assert_eq!(request.body.topics[0].partitions[1].partition_max_bytes, 1048576);
        assert_eq!(request.body.topics[0].partitions[1].last_fetched_offset, -1);
    }

    #[test]
    fn test_produce_merges_partitions() {
        let batch = RecordBatchBuilder::new().value("a").build();
        let request = ProduceRequestBuilder::new()
            .batches("t", 0, vec![batch.clone()])
            .batches("t", 0, vec![batch.clone()])
            .batches("t", 1, vec![batch])
            .build();
        assert_eq!(request.body.acks, 1);
        assert_eq!(request.body.timeout_ms, 5000);
        assert_eq!(request.body.topics.len(), 1);
        assert_eq!(request.body.topics[0].partitions.len(), 2);
        assert_eq!(request.body.topics[0].partitions[0].record_batches.len(), 2);
    }

    #[test]
    fn test_record_batch_builder_normalizes() {
        let batch = RecordBatchBuilder::new()
            .timestamp(1726045973899)
            .producer(0, 0, 0)
            .value("one")
            .value("two")
            .build();
        assert_eq!(batch.last_offset_delta, 1);
        assert_eq!(batch.records[1].offset_delta, 1);
        assert_eq!(batch.crc, crc32c::crc32c(&batch.to_bytes()[21..]));
    }

    #[test]
    fn test_api_versions_defaults() {
        let request = ApiVersionsRequestBuilder::new().correlation_id(7).build();
        assert_eq!(request.header.api_key, 18);
        assert_eq!(request.header.api_version, 4);
        assert_eq!(request.body.client_software_name, "kafka-cli");
    }
}
