use kgrade_protocol::error_codes::describe_error_code;
use kgrade_protocol::{Field, ProduceResponse, ProduceResponseBody};
use tracing::info;

use super::{expect_int32, matches_path, unhandled_path};
use crate::asserter::{FieldResult, ResponseAssertion};
use crate::error::{Result, TesterError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedProducePartition {
    pub id: i32,
    pub error_code: i16,
    pub base_offset: i64,
    pub log_start_offset: i64,
}

impl ExpectedProducePartition {
    /// An append to an empty log: the batch lands at `base_offset`, the log starts at 0.
    pub fn success(id: i32, base_offset: i64) -> Self {
        Self {
            id,
            error_code: 0,
            base_offset,
            log_start_offset: 0,
        }
    }

    /// A rejected append: every offset is -1.
    pub fn error(id: i32, error_code: i16) -> Self {
        Self {
            id,
            error_code,
            base_offset: -1,
            log_start_offset: -1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedProduceTopic {
    pub name: String,
    pub partitions: Vec<ExpectedProducePartition>,
}

impl ExpectedProduceTopic {
    pub fn new(name: impl Into<String>, partitions: Vec<ExpectedProducePartition>) -> Self {
        Self {
            name: name.into(),
            partitions,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProduceResponseAssertion {
    correlation_id: i32,
    topics: Vec<ExpectedProduceTopic>,
    /// `None` accepts any append time.
    log_append_time_ms: Option<i64>,
}

impl Default for ProduceResponseAssertion {
    fn default() -> Self {
        Self {
            correlation_id: 0,
            topics: Vec::new(),
            log_append_time_ms: Some(-1),
        }
    }
}

impl ProduceResponseAssertion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn correlation_id(mut self, correlation_id: i32) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn topic(mut self, topic: ExpectedProduceTopic) -> Self {
        self.topics.push(topic);
        self
    }

    pub fn log_append_time_ms(mut self, log_append_time_ms: Option<i64>) -> Self {
        self.log_append_time_ms = log_append_time_ms;
        self
    }
}

impl ResponseAssertion<ProduceResponseBody> for ProduceResponseAssertion {
    fn assert_single_field(&self, field: &Field) -> FieldResult {
        let path = &field.path;
        if path.is("ProduceResponse.Header.CorrelationID") {
            return expect_int32(field, self.correlation_id);
        }
        if path.is("ProduceResponse.Body.ThrottleTimeMs") {
            return expect_int32(field, 0);
        }
        if matches_path(path, "ProduceResponse.Body.Topics.**") {
            return Ok(());
        }
        unhandled_path(field)
    }

    fn assert_across_fields(&self, response: &ProduceResponse) -> Result<()> {
        info!("✓ CorrelationID: {}", self.correlation_id);
        info!("✓ Throttle Time: 0");

        let actual_topics = &response.body.topics;
        if actual_topics.len() != self.topics.len() {
            return Err(TesterError::composite(format!(
                "Expected topics.length to be {}, got {}",
                self.topics.len(),
                actual_topics.len()
            )));
        }

        for expected in &self.topics {
            let Some(actual) = actual_topics.iter().find(|t| t.name == expected.name) else {
                return Err(TesterError::composite(format!(
                    "Expected topic {} to be present in the response",
                    expected.name
                )));
            };
            info!("✓ Topic: {}", actual.name);

            if actual.partitions.len() != expected.partitions.len() {
                return Err(TesterError::composite(format!(
                    "Expected topic {} to have {} partitions, got {}",
                    expected.name,
                    expected.partitions.len(),
                    actual.partitions.len()
                )));
            }

            for expected_partition in &expected.partitions {
                let Some(actual_partition) = actual.partitions.iter().find(|p| p.id == expected_partition.id)
                else {
                    return Err(TesterError::composite(format!(
                        "Expected partition {} to be present in topic {}",
                        expected_partition.id, expected.name
                    )));
                };
                let label = format!("{}-{}", expected.name, expected_partition.id);

                if actual_partition.error_code != expected_partition.error_code {
                    return Err(TesterError::composite(format!(
                        "Expected error code for {label} to be {}, got {}",
                        describe_error_code(expected_partition.error_code),
                        describe_error_code(actual_partition.error_code)
                    )));
                }
                info!("  ✓ Error code: {}", describe_error_code(actual_partition.error_code));

                if actual_partition.base_offset != expected_partition.base_offset {
                    return Err(TesterError::composite(format!(
                        "Expected base offset for {label} to be {}, got {}",
                        expected_partition.base_offset, actual_partition.base_offset
                    )));
                }
                info!("  ✓ Base offset: {}", actual_partition.base_offset);

                if let Some(expected_time) = self.log_append_time_ms {
                    if actual_partition.log_append_time_ms != expected_time {
                        return Err(TesterError::composite(format!(
                            "Expected log append time for {label} to be {expected_time}, got {}",
                            actual_partition.log_append_time_ms
                        )));
                    }
                    info!("  ✓ Log append time: {expected_time}");
                }

                if actual_partition.log_start_offset != expected_partition.log_start_offset {
                    return Err(TesterError::composite(format!(
                        "Expected log start offset for {label} to be {}, got {}",
                        expected_partition.log_start_offset, actual_partition.log_start_offset
                    )));
                }
                info!("  ✓ Log start offset: {}", actual_partition.log_start_offset);
            }
        }
        Ok(())
    }
}
