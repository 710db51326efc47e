use kgrade_protocol::error_codes::describe_error_code;
use kgrade_protocol::{encode_record_batches, Field, FetchResponse, FetchResponseBody, RecordBatch};
use tracing::info;
use uuid::Uuid;

use super::{expect_compact_array_length, expect_int16, expect_int32, matches_path, unhandled_path};
use crate::asserter::{FieldResult, ResponseAssertion};
use crate::error::{Result, TesterError};

#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedFetchPartition {
    pub id: i32,
    pub error_code: i16,
    /// `None` skips the record batch comparison.
    pub record_batches: Option<Vec<RecordBatch>>,
}

impl ExpectedFetchPartition {
    pub fn error(id: i32, error_code: i16) -> Self {
        Self {
            id,
            error_code,
            record_batches: None,
        }
    }

    pub fn with_batches(id: i32, record_batches: Vec<RecordBatch>) -> Self {
        Self {
            id,
            error_code: 0,
            record_batches: Some(record_batches),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedFetchTopic {
    pub uuid: Uuid,
    pub partitions: Vec<ExpectedFetchPartition>,
}

#[derive(Debug, Clone, Default)]
pub struct FetchResponseAssertion {
    correlation_id: i32,
    error_code: i16,
    session_id: i32,
    topics: Vec<ExpectedFetchTopic>,
}

impl FetchResponseAssertion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn error_code(mut self, error_code: i16) -> Self {
        self.error_code = error_code;
        self
    }

    /// Sessionless fetches expect 0.
    pub fn session_id(mut self, session_id: i32) -> Self {
        self.session_id = session_id;
        self
    }

    pub fn topic(mut self, topic: ExpectedFetchTopic) -> Self {
        self.topics.push(topic);
        self
    }

    fn assert_record_batches(&self, expected: &[RecordBatch], actual: &[RecordBatch]) -> Result<()> {
        if actual.len() != expected.len() {
            return Err(TesterError::composite(format!(
                "Expected RecordBatches array to have length {}, got {}",
                expected.len(),
                actual.len()
            )));
        }
        for (i, (expected_batch, actual_batch)) in expected.iter().zip(actual).enumerate() {
            let expected_bytes = encode_record_batches(std::slice::from_ref(expected_batch));
            let actual_bytes = encode_record_batches(std::slice::from_ref(actual_batch));
            if expected_bytes != actual_bytes {
                return Err(TesterError::composite(
                    "RecordBatch bytes do not match with the contents on disk",
                ));
            }
            info!("    ✓ RecordBatch[{i}] bytes match with the contents on disk");
            for record in &actual_batch.records {
                if let Some(value) = &record.value {
                    info!("      ✓ Record Value: {}", String::from_utf8_lossy(value));
                }
            }
        }
        Ok(())
    }
}

impl ResponseAssertion<FetchResponseBody> for FetchResponseAssertion {
    fn assert_single_field(&self, field: &Field) -> FieldResult {
        let path = &field.path;
        if path.is("FetchResponse.Header.CorrelationID") {
            return expect_int32(field, self.correlation_id);
        }
        if path.is("FetchResponse.Body.ThrottleTimeMs") {
            return expect_int32(field, 0);
        }
        if path.is("FetchResponse.Body.ErrorCode") {
            return expect_int16(field, self.error_code);
        }
        if path.is("FetchResponse.Body.Topics.Length") {
            return expect_compact_array_length(field, self.topics.len());
        }
        if path.is("FetchResponse.Body.SessionId") {
            return expect_int32(field, self.session_id);
        }
        if matches_path(path, "FetchResponse.Body.Topics.**") {
            return Ok(());
        }
        unhandled_path(field)
    }

    fn assert_across_fields(&self, response: &FetchResponse) -> Result<()> {
        info!("✓ CorrelationID: {}", self.correlation_id);
        info!("✓ ThrottleTimeMs: 0");
        info!("✓ ErrorCode: {}", describe_error_code(self.error_code));
        info!("✓ SessionId: {}", self.session_id);

        let actual_topics = &response.body.topics;
        if actual_topics.len() != self.topics.len() {
            return Err(TesterError::composite(format!(
                "Expected Topics array to have length {}, got {}",
                self.topics.len(),
                actual_topics.len()
            )));
        }

        for (expected, actual) in self.topics.iter().zip(actual_topics) {
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
                info!("  ✓ Partition Error Code: {}", describe_error_code(actual_partition.error_code));

                if actual_partition.id != expected_partition.id {
                    return Err(TesterError::composite(format!(
                        "Expected Partition ID to be {}, got {}",
                        expected_partition.id, actual_partition.id
                    )));
                }
                info!("  ✓ Partition ID: {}", actual_partition.id);

                if let Some(expected_batches) = &expected_partition.record_batches {
                    self.assert_record_batches(expected_batches, &actual_partition.record_batches)?;
                    info!("  ✓ RecordBatches: {}", actual_partition.record_batches.len());
                }
            }
        }
        Ok(())
    }
}
