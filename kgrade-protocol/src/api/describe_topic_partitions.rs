use uuid::Uuid;

use crate::api::{RequestBody, ResponseBody, ResponseHeaderVersion};
use crate::api_keys::ApiKey;
use crate::error::{CodecError, DecodeError};
use crate::field_decoder::FieldDecoder;
use crate::field_encoder::FieldEncoder;

/// Pagination cursor. On the wire it is a nullable struct: `IsCursorPresent` is `-1` when
/// absent and `1` when the fields follow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub topic_name: String,
    pub partition_index: i32,
}

fn write_cursor(e: &mut FieldEncoder, cursor: Option<&Cursor>) {
    let mut scope = e.scope("Cursor");
    match cursor {
        None => scope.write_int8("IsCursorPresent", -1),
        Some(cursor) => {
            scope.write_int8("IsCursorPresent", 1);
            scope.write_compact_string("TopicName", &cursor.topic_name);
            scope.write_int32("PartitionIndex", cursor.partition_index);
            scope.write_empty_tag_buffer();
        }
    }
}

fn read_cursor(d: &mut FieldDecoder<'_>) -> Result<Option<Cursor>, DecodeError> {
    let mut scope = d.scope("Cursor");
    match scope.read_int8("IsCursorPresent")? {
        -1 => Ok(None),
        1 => {
            let topic_name = scope.read_compact_string("TopicName")?;
            let partition_index = scope.read_int32("PartitionIndex")?;
            scope.consume_tag_buffer()?;
            Ok(Some(Cursor {
                topic_name,
                partition_index,
            }))
        }
        other => Err(scope.last_anchor().error(CodecError::InvalidValue(format!(
            "Expected IsCursorPresent to be -1 or 1, got {other}"
        )))),
    }
}

// --- Request ---

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeTopicPartitionsRequestBody {
    pub topic_names: Vec<String>,
    pub response_partition_limit: i32,
    pub cursor: Option<Cursor>,
}

impl RequestBody for DescribeTopicPartitionsRequestBody {
    const API_KEY: ApiKey = ApiKey::DescribeTopicPartitions;

    fn encode(&self, e: &mut FieldEncoder) {
        let mut body = e.scope("Body");
        body.write_compact_array("Topics", &self.topic_names, |e, name| {
            e.write_compact_string("Name", name);
            e.write_empty_tag_buffer();
        });
        body.write_int32("ResponsePartitionLimit", self.response_partition_limit);
        write_cursor(&mut body, self.cursor.as_ref());
        body.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut body = d.scope("Body");
        let topic_names = body.read_compact_array("Topics", |d| {
            let name = d.read_compact_string("Name")?;
            d.consume_tag_buffer()?;
            Ok(name)
        })?;
        let response_partition_limit = body.read_int32("ResponsePartitionLimit")?;
        let cursor = read_cursor(&mut body)?;
        body.consume_tag_buffer()?;
        Ok(Self {
            topic_names,
            response_partition_limit,
            cursor,
        })
    }
}

// --- Response ---

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeTopicPartitionsResponsePartition {
    pub error_code: i16,
    pub partition_index: i32,
    pub leader_id: i32,
    pub leader_epoch: i32,
    pub replica_nodes: Vec<i32>,
    pub isr_nodes: Vec<i32>,
    pub eligible_leader_replicas: Vec<i32>,
    pub last_known_elr: Vec<i32>,
    pub offline_replicas: Vec<i32>,
}

impl DescribeTopicPartitionsResponsePartition {
    fn encode(&self, e: &mut FieldEncoder) {
        e.write_int16("ErrorCode", self.error_code);
        e.write_int32("PartitionIndex", self.partition_index);
        e.write_int32("LeaderID", self.leader_id);
        e.write_int32("LeaderEpoch", self.leader_epoch);
        e.write_compact_int32_array("ReplicaNodes", &self.replica_nodes);
        e.write_compact_int32_array("IsrNodes", &self.isr_nodes);
        e.write_compact_int32_array("EligibleLeaderReplicas", &self.eligible_leader_replicas);
        e.write_compact_int32_array("LastKnownELR", &self.last_known_elr);
        e.write_compact_int32_array("OfflineReplicas", &self.offline_replicas);
        e.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let partition = Self {
            error_code: d.read_int16("ErrorCode")?,
            partition_index: d.read_int32("PartitionIndex")?,
            leader_id: d.read_int32("LeaderID")?,
            leader_epoch: d.read_int32("LeaderEpoch")?,
            replica_nodes: d.read_compact_int32_array("ReplicaNodes")?,
            isr_nodes: d.read_compact_int32_array("IsrNodes")?,
            eligible_leader_replicas: d.read_compact_int32_array("EligibleLeaderReplicas")?,
            last_known_elr: d.read_compact_int32_array("LastKnownELR")?,
            offline_replicas: d.read_compact_int32_array("OfflineReplicas")?,
        };
        d.consume_tag_buffer()?;
        Ok(partition)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeTopicPartitionsResponseTopic {
    pub error_code: i16,
    pub name: Option<String>,
    pub topic_uuid: Uuid,
    pub is_internal: bool,
    pub partitions: Vec<DescribeTopicPartitionsResponsePartition>,
    pub topic_authorized_operations: i32,
}

impl DescribeTopicPartitionsResponseTopic {
    fn encode(&self, e: &mut FieldEncoder) {
        e.write_int16("ErrorCode", self.error_code);
        e.write_compact_nullable_string("Name", self.name.as_deref());
        e.write_uuid("TopicUUID", &self.topic_uuid);
        e.write_boolean("IsInternal", self.is_internal);
        e.write_compact_array("Partitions", &self.partitions, |e, partition| {
            partition.encode(e)
        });
        e.write_int32("TopicAuthorizedOperations", self.topic_authorized_operations);
        e.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let topic = Self {
            error_code: d.read_int16("ErrorCode")?,
            name: d.read_compact_nullable_string("Name")?,
            topic_uuid: d.read_uuid("TopicUUID")?,
            is_internal: d.read_boolean("IsInternal")?,
            partitions: d.read_compact_array(
                "Partitions",
                DescribeTopicPartitionsResponsePartition::decode,
            )?,
            topic_authorized_operations: d.read_int32("TopicAuthorizedOperations")?,
        };
        d.consume_tag_buffer()?;
        Ok(topic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DescribeTopicPartitionsResponseBody {
    pub throttle_time_ms: i32,
    pub topics: Vec<DescribeTopicPartitionsResponseTopic>,
    pub next_cursor: Option<Cursor>,
}

impl ResponseBody for DescribeTopicPartitionsResponseBody {
    const API_KEY: ApiKey = ApiKey::DescribeTopicPartitions;
    const HEADER_VERSION: ResponseHeaderVersion = ResponseHeaderVersion::V1;

    fn encode(&self, e: &mut FieldEncoder) {
        let mut body = e.scope("Body");
        body.write_int32("ThrottleTimeMs", self.throttle_time_ms);
        body.write_compact_array("Topics", &self.topics, |e, topic| topic.encode(e));
        write_cursor(&mut body, self.next_cursor.as_ref());
        body.write_empty_tag_buffer();
    }

    fn decode(d: &mut FieldDecoder<'_>) -> Result<Self, DecodeError> {
        let mut body = d.scope("Body");
        let throttle_time_ms = body.read_int32("ThrottleTimeMs")?;
        let topics = body.read_compact_array("Topics", DescribeTopicPartitionsResponseTopic::decode)?;
        let next_cursor = read_cursor(&mut body)?;
        body.consume_tag_buffer()?;
        Ok(Self {
            throttle_time_ms,
            topics,
            next_cursor,
        })
    }
}
