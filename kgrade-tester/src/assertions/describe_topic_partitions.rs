use kgrade_protocol::error_codes::describe_error_code;
use kgrade_protocol::{
    DescribeTopicPartitionsResponse, DescribeTopicPartitionsResponseBody, ErrorCode, Field,
};
use kgrade_storage::GeneratedTopicData;
use tracing::info;
use uuid::Uuid;

use super::{expect_compact_array_length, expect_int32, expect_int8, matches_path, unhandled_path};
use crate::asserter::{FieldResult, ResponseAssertion};
use crate::error::{Result, TesterError};

const ROOT: &str = "DescribeTopicPartitionsResponse";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedPartition {
    pub partition_index: i32,
    pub error_code: i16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedTopic {
    pub name: String,
    pub uuid: Uuid,
    pub error_code: i16,
    pub partitions: Vec<ExpectedPartition>,
}

impl ExpectedTopic {
    /// A topic the broker has never seen: error 3, nil UUID, no partitions.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: Uuid::nil(),
            error_code: ErrorCode::UnknownTopicOrPartition.code(),
            partitions: Vec::new(),
        }
    }

    pub fn from_generated(topic: &GeneratedTopicData) -> Self {
        Self {
            name: topic.name.clone(),
            uuid: topic.uuid,
            error_code: 0,
            partitions: topic
                .partitions
                .iter()
                .map(|p| ExpectedPartition {
                    partition_index: p.partition_id,
                    error_code: 0,
                })
                .collect(),
        }
    }
}

/// Expected topics in the order the broker must return them: sorted by name.
pub fn expected_topics_from_generated<'a>(
    topics: impl IntoIterator<Item = &'a GeneratedTopicData>,
) -> Vec<ExpectedTopic> {
    let mut expected: Vec<ExpectedTopic> = topics.into_iter().map(ExpectedTopic::from_generated).collect();
    expected.sort_by(|a, b| a.name.cmp(&b.name));
    expected
}

#[derive(Debug, Clone, Default)]
pub struct DescribeTopicPartitionsResponseAssertion {
    correlation_id: i32,
    topics: Vec<ExpectedTopic>,
}

impl DescribeTopicPartitionsResponseAssertion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn topics(mut self, topics: Vec<ExpectedTopic>) -> Self {
        self.topics = topics;
        self
    }
}

impl ResponseAssertion<DescribeTopicPartitionsResponseBody> for DescribeTopicPartitionsResponseAssertion {
    fn assert_single_field(&self, field: &Field) -> FieldResult {
        let path = &field.path;
        if path.is("DescribeTopicPartitionsResponse.Header.CorrelationID") {
            return expect_int32(field, self.correlation_id);
        }
        if path.is("DescribeTopicPartitionsResponse.Body.Topics.Length") {
            return expect_compact_array_length(field, self.topics.len());
        }
        if path.is("DescribeTopicPartitionsResponse.Body.Cursor.IsCursorPresent") {
            return expect_int8(field, -1);
        }
        if path.is("DescribeTopicPartitionsResponse.Body.ThrottleTimeMs")
            || matches_path(path, "DescribeTopicPartitionsResponse.Body.Topics.**")
            || matches_path(path, "DescribeTopicPartitionsResponse.Body.Cursor.**")
        {
            return Ok(());
        }
        unhandled_path(field)
    }

    fn assert_across_fields(&self, response: &DescribeTopicPartitionsResponse) -> Result<()> {
        info!("✓ CorrelationID: {}", self.correlation_id);
        let actual_topics = &response.body.topics;
        if actual_topics.len() != self.topics.len() {
            return Err(TesterError::composite(format!(
                "Expected {ROOT} to contain {} topics, got {}",
                self.topics.len(),
                actual_topics.len()
            )));
        }

        for (expected, actual) in self.topics.iter().zip(actual_topics) {
            let actual_name = actual.name.as_deref().unwrap_or("null");
            if actual_name != expected.name {
                return Err(TesterError::composite(format!(
                    "Expected Topic Name to be {}, got {actual_name}",
                    expected.name
                )));
            }
            if actual.error_code != expected.error_code {
                return Err(TesterError::composite(format!(
                    "Expected Topic Error Code to be {}, got {}",
                    describe_error_code(expected.error_code),
                    describe_error_code(actual.error_code)
                )));
            }
            info!("✓ Topic Error Code: {}", describe_error_code(actual.error_code));
            info!("✓ Topic Name: {actual_name}");

            if actual.topic_uuid != expected.uuid {
                return Err(TesterError::composite(format!(
                    "Expected Topic UUID to be {}, got {}",
                    expected.uuid, actual.topic_uuid
                )));
            }
            info!("✓ Topic UUID: {}", actual.topic_uuid);

            if actual.partitions.len() != expected.partitions.len() {
                return Err(TesterError::composite(format!(
                    "Expected Partitions array to have length {}, got {}",
                    expected.partitions.len(),
                    actual.partitions.len()
                )));
            }
            for (expected_partition, actual_partition) in expected.partitions.iter().zip(&actual.partitions) {
                if actual_partition.error_code != expected_partition.error_code {
                    return Err(TesterError::composite(format!(
                        "Expected Partition Error Code to be {}, got {}",
                        describe_error_code(expected_partition.error_code),
                        describe_error_code(actual_partition.error_code)
                    )));
                }
                info!("  ✓ Partition Error Code: {}", actual_partition.error_code);

                if actual_partition.partition_index != expected_partition.partition_index {
                    return Err(TesterError::composite(format!(
                        "Expected Partition Index to be {}, got {}",
                        expected_partition.partition_index, actual_partition.partition_index
                    )));
                }
                info!("  ✓ PartitionIndex: {}", actual_partition.partition_index);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kgrade_protocol::{
        DescribeTopicPartitionsResponsePartition, DescribeTopicPartitionsResponseTopic, ResponseHeader,
    };
    use kgrade_storage::GeneratedPartitionData;

    fn generated(name: &str, uuid: u128, partitions: &[i32]) -> GeneratedTopicData {
        GeneratedTopicData {
            name: name.to_string(),
            uuid: Uuid::from_u128(uuid),
            partitions: partitions
                .iter()
                .map(|&partition_id| GeneratedPartitionData {
                    partition_id,
                    record_batches: Vec::new(),
                })
                .collect(),
        }
    }

    fn response_topic(name: &str, uuid: u128, partitions: &[i32]) -> DescribeTopicPartitionsResponseTopic {
        DescribeTopicPartitionsResponseTopic {
            error_code: 0,
            name: Some(name.to_string()),
            topic_uuid: Uuid::from_u128(uuid),
            is_internal: false,
            partitions: partitions
                .iter()
                .map(|&partition_index| DescribeTopicPartitionsResponsePartition {
                    partition_index,
                    ..Default::default()
                })
                .collect(),
            topic_authorized_operations: 0x0df8,
        }
    }

    fn response(topics: Vec<DescribeTopicPartitionsResponseTopic>) -> DescribeTopicPartitionsResponse {
        DescribeTopicPartitionsResponse {
            header: ResponseHeader { correlation_id: 3 },
            body: DescribeTopicPartitionsResponseBody {
                throttle_time_ms: 0,
                topics,
                next_cursor: None,
            },
        }
    }

    #[test]
    fn test_expected_topics_are_sorted() {
        let topics = [generated("quz", 2, &[0]), generated("bar", 1, &[0, 1])];
        let expected = expected_topics_from_generated(&topics);
        let names: Vec<&str> = expected.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["bar", "quz"]);
        assert_eq!(expected[0].partitions.len(), 2);
    }

    #[test]
    fn test_matching_response() {
        let topics = [generated("bar", 1, &[0, 1])];
        let assertion = DescribeTopicPartitionsResponseAssertion::new()
            .correlation_id(3)
            .topics(expected_topics_from_generated(&topics));
        assert!(assertion
            .assert_across_fields(&response(vec![response_topic("bar", 1, &[0, 1])]))
            .is_ok());
    }

    #[test]
    fn test_wrong_uuid() {
        let topics = [generated("bar", 1, &[0])];
        let assertion = DescribeTopicPartitionsResponseAssertion::new()
            .topics(expected_topics_from_generated(&topics));
        let err = assertion
            .assert_across_fields(&response(vec![response_topic("bar", 2, &[0])]))
            .unwrap_err();
        assert!(err.to_string().starts_with("Expected Topic UUID to be 00000000-0000-0000-0000-000000000001"));
    }

    #[test]
    fn test_unknown_topic_error_code() {
        let assertion = DescribeTopicPartitionsResponseAssertion::new().topics(vec![ExpectedTopic::unknown("foo")]);
        let mut topic = response_topic("foo", 0, &[]);
        topic.topic_uuid = Uuid::nil();
        let err = assertion.assert_across_fields(&response(vec![topic])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected Topic Error Code to be 3 (UNKNOWN_TOPIC_OR_PARTITION), got 0 (NO_ERROR)"
        );
    }

    #[test]
    fn test_cursor_must_be_absent() {
        let field = Field {
            path: "DescribeTopicPartitionsResponse.Body.Cursor.IsCursorPresent".into(),
            value: kgrade_protocol::Value::Int8(1),
            start_offset: 10,
            end_offset: 11,
        };
        assert_eq!(
            DescribeTopicPartitionsResponseAssertion::new()
                .assert_single_field(&field)
                .unwrap_err(),
            "Expected IsCursorPresent to be -1, got 1"
        );
    }
}
