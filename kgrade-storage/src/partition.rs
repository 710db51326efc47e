//! Topic partition directories: `partition.metadata` and the first log segment.

use std::path::Path;

use anyhow::{Context, Result};
use kgrade_common::constants::{LOG_FILE_NAME, PARTITION_METADATA_FILE_NAME};
use kgrade_protocol::builder::RecordBatchBuilder;
use kgrade_protocol::{encode_record_batches, RecordBatch};
use tracing::debug;
use uuid::Uuid;

use crate::config::PartitionGenerationConfig;
use crate::uuid_to_base64;

/// Timestamp carried by every generated message batch.
pub const MESSAGE_TIMESTAMP: i64 = 1726045973899;

pub fn partition_metadata(topic_uuid: &Uuid) -> String {
    format!("version: 0\ntopic_id: {}", uuid_to_base64(topic_uuid))
}

/// One batch per message, each holding a single record with an empty key.
pub fn record_batches_from_logs(logs: &[String]) -> Vec<RecordBatch> {
    logs.iter()
        .enumerate()
        .map(|(i, message)| {
            RecordBatchBuilder::new()
                .base_offset(i as i64)
                .timestamp(MESSAGE_TIMESTAMP)
                .producer(0, 0, 0)
                .value(message.clone())
                .build()
        })
        .collect()
}

/// Writes `dir/partition.metadata` and `dir/00000000000000000000.log`, returning the
/// batches written to the log.
pub fn write_partition(
    dir: &Path,
    topic_uuid: &Uuid,
    config: &PartitionGenerationConfig,
) -> Result<Vec<RecordBatch>> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create partition directory: {:?}", dir))?;

    let metadata_path = dir.join(PARTITION_METADATA_FILE_NAME);
    std::fs::write(&metadata_path, partition_metadata(topic_uuid))
        .with_context(|| format!("Failed to write partition metadata: {:?}", metadata_path))?;

    let batches = record_batches_from_logs(&config.logs);
    let log_path = dir.join(LOG_FILE_NAME);
    std::fs::write(&log_path, encode_record_batches(&batches))
        .with_context(|| format!("Failed to write log file: {:?}", log_path))?;

    debug!(
        "Wrote {} record batches for partition {} at {}",
        batches.len(),
        config.partition_id,
        log_path.display()
    );
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_batch_per_message() {
        let batches = record_batches_from_logs(&["a".to_string(), "bc".to_string()]);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].base_offset, 1);
        assert_eq!(batches[1].records.len(), 1);
        assert_eq!(batches[1].records[0].key.as_deref(), Some(&b""[..]));
        assert_eq!(batches[1].records[0].value.as_deref(), Some(&b"bc"[..]));
        assert_eq!(batches[1].producer_id, 0);
        assert_eq!(batches[1].first_timestamp, MESSAGE_TIMESTAMP);
    }

    #[test]
    fn test_partition_metadata_format() {
        let uuid = Uuid::from_u128(1);
        assert_eq!(
            partition_metadata(&uuid),
            "version: 0\ntopic_id: AAAAAAAAAAAAAAAAAAAAAQ=="
        );
    }
}
