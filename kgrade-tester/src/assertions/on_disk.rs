//! Checks a broker persisted produced batches byte for byte.

use kgrade_common::constants::LOG_FILE_NAME;
use kgrade_protocol::{encode_record_batches, RecordBatch};
use kgrade_storage::{read_log_file, LogDirectoryConfig};
use tracing::info;

use crate::error::{Result, TesterError};

/// The full contents one partition log should have after the produce requests.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedPartitionLog {
    pub topic: String,
    pub partition: i32,
    pub record_batches: Vec<RecordBatch>,
}

impl ExpectedPartitionLog {
    pub fn new(topic: impl Into<String>, partition: i32, record_batches: Vec<RecordBatch>) -> Self {
        Self {
            topic: topic.into(),
            partition,
            record_batches,
        }
    }
}

/// Positions that differ, plus any length difference.
pub fn count_differing_bytes(expected: &[u8], actual: &[u8]) -> usize {
    let common = expected.iter().zip(actual).filter(|(a, b)| a != b).count();
    common + expected.len().abs_diff(actual.len())
}

pub fn assert_files_on_disk(config: &LogDirectoryConfig, expected: &[ExpectedPartitionLog]) -> Result<()> {
    for partition_log in expected {
        let dir = config.partition_dir(&partition_log.topic, partition_log.partition);
        let path = dir.join(LOG_FILE_NAME);
        let actual = read_log_file(&dir)
            .map_err(|e| TesterError::OnDisk(format!("Expected {} to exist: {e:#}", path.display())))?;
        let wanted = encode_record_batches(&partition_log.record_batches);

        if actual[..] != wanted[..] {
            return Err(TesterError::OnDisk(format!(
                "Expected {} to contain the produced record batches, got {} bytes that differ",
                path.display(),
                count_differing_bytes(&wanted, &actual)
            )));
        }
        info!(
            "✓ {} contains {} record batches ({} bytes)",
            path.display(),
            partition_log.record_batches.len(),
            actual.len()
        );
    }
    Ok(())
}
